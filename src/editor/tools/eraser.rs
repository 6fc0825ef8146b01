use super::CanvasPoint;

pub const ERASER_RADIUS_FACTOR: f32 = 5.0;

/// Centers cleared by one eraser gesture. Every center is applied as soon as
/// it arrives; the pass only exists so the gesture commits once.
#[derive(Debug, Clone, PartialEq)]
pub struct EraserPass {
    pub centers: Vec<CanvasPoint>,
    pub radius: f32,
}

impl EraserPass {
    pub fn new(start: CanvasPoint, radius: f32) -> Self {
        Self {
            centers: vec![start],
            radius,
        }
    }

    pub fn push(&mut self, center: CanvasPoint) {
        self.centers.push(center);
    }
}
