use super::{CanvasPoint, Color};

/// One continuous pencil path from pointer-down to pointer-up.
#[derive(Debug, Clone, PartialEq)]
pub struct PenStroke {
    pub points: Vec<CanvasPoint>,
    pub color: Color,
    pub width: f32,
}

impl PenStroke {
    pub fn new(start: CanvasPoint, color: Color, width: f32) -> Self {
        Self {
            points: vec![start],
            color,
            width,
        }
    }

    pub fn from_points(points: &[CanvasPoint], color: Color, width: f32) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut stroke = Self::new(*first, color, width);
        for point in rest {
            stroke.append_point(*point);
        }
        Some(stroke)
    }

    /// Appends `point` unless it repeats the last one.
    pub fn append_point(&mut self, point: CanvasPoint) -> bool {
        if self.points.last() == Some(&point) {
            return false;
        }
        self.points.push(point);
        true
    }

    pub fn last_segment(&self) -> Option<(CanvasPoint, CanvasPoint)> {
        match self.points.as_slice() {
            [.., from, to] => Some((*from, *to)),
            _ => None,
        }
    }

    pub fn is_dot(&self) -> bool {
        self.points.len() == 1
    }
}
