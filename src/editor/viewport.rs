use crate::geometry::{CanvasPoint, Size, ViewportPoint};

const VIEWPORT_ZOOM_MIN: f32 = 0.5;
const VIEWPORT_ZOOM_MAX: f32 = 5.0;
const VIEWPORT_ZOOM_STEP: f32 = 1.25;

fn clamp_zoom(zoom: f32) -> f32 {
    zoom.clamp(VIEWPORT_ZOOM_MIN, VIEWPORT_ZOOM_MAX)
}

/// Zoom factor and pan offset applied to the displayed canvas.
///
/// The viewport never touches pixel data; it only decides how pointer
/// positions map onto the backing store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorViewport {
    zoom: f32,
    pan_x: f32,
    pan_y: f32,
}

impl Default for EditorViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorViewport {
    pub const fn new() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub const fn zoom(&self) -> f32 {
        self.zoom
    }

    pub const fn pan_x(&self) -> f32 {
        self.pan_x
    }

    pub const fn pan_y(&self) -> f32 {
        self.pan_y
    }

    pub const fn min_zoom() -> f32 {
        VIEWPORT_ZOOM_MIN
    }

    pub const fn max_zoom() -> f32 {
        VIEWPORT_ZOOM_MAX
    }

    /// Stores `zoom` clamped to the supported range. NaN is ignored.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_nan() {
            tracing::debug!("ignoring NaN zoom request");
            return;
        }
        self.zoom = clamp_zoom(zoom);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * VIEWPORT_ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / VIEWPORT_ZOOM_STEP);
    }

    pub fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    pub fn pan_by(&mut self, delta_x: f32, delta_y: f32) {
        if !delta_x.is_finite() || !delta_y.is_finite() {
            return;
        }
        self.pan_x += delta_x;
        self.pan_y += delta_y;
    }

    /// Maps a viewport position onto the canvas backing store.
    ///
    /// The pan offset is removed first, then the zoom, then the result is
    /// rescaled by the ratio of backing-store size to displayed size.
    pub fn to_canvas(&self, point: ViewportPoint, display: Size, canvas: Size) -> CanvasPoint {
        let ratio_x = canvas.width as f32 / display.width.max(1) as f32;
        let ratio_y = canvas.height as f32 / display.height.max(1) as f32;
        CanvasPoint::new(
            (point.x - self.pan_x) / self.zoom * ratio_x,
            (point.y - self.pan_y) / self.zoom * ratio_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn viewport_defaults_to_unit_zoom_and_origin() {
        let viewport = EditorViewport::new();
        assert_eq!(viewport.zoom(), 1.0);
        assert_eq!(viewport.pan_x(), 0.0);
        assert_eq!(viewport.pan_y(), 0.0);
    }

    #[test]
    fn set_zoom_never_leaves_supported_range() {
        let mut viewport = EditorViewport::new();
        for request in [
            -1000.0,
            -1.0,
            0.0,
            0.1,
            0.5,
            2.5,
            5.0,
            7.0,
            1.0e9,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
        ] {
            viewport.set_zoom(request);
            let zoom = viewport.zoom();
            assert!(
                (EditorViewport::min_zoom()..=EditorViewport::max_zoom()).contains(&zoom),
                "zoom {zoom} escaped range after request {request}"
            );
        }
    }

    #[test]
    fn nan_zoom_keeps_previous_value() {
        let mut viewport = EditorViewport::new();
        viewport.set_zoom(2.0);
        viewport.set_zoom(f32::NAN);
        assert_eq!(viewport.zoom(), 2.0);
    }

    #[test]
    fn zoom_steps_clamp_at_bounds() {
        let mut viewport = EditorViewport::new();
        for _ in 0..50 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.zoom(), 5.0);
        for _ in 0..50 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.zoom(), 0.5);
    }

    #[test]
    fn reset_view_restores_zoom_and_pan() {
        let mut viewport = EditorViewport::new();
        viewport.set_zoom(3.0);
        viewport.pan_by(40.0, -12.0);
        viewport.reset_view();
        assert_eq!(viewport, EditorViewport::new());
    }

    #[test]
    fn unit_view_only_applies_backing_store_ratio() {
        let viewport = EditorViewport::new();
        let point = viewport.to_canvas(
            ViewportPoint::new(100.0, 50.0),
            Size::new(400, 300),
            Size::new(1600, 1200),
        );
        assert!(approx(point.x, 400.0));
        assert!(approx(point.y, 200.0));
    }

    #[test]
    fn doubling_zoom_halves_distance_from_origin() {
        let display = Size::new(400, 300);
        let canvas = Size::new(1600, 1200);
        let at_unit = EditorViewport::new().to_canvas(ViewportPoint::new(120.0, 90.0), display, canvas);

        let mut zoomed = EditorViewport::new();
        zoomed.set_zoom(2.0);
        let at_double = zoomed.to_canvas(ViewportPoint::new(120.0, 90.0), display, canvas);

        assert!(approx(at_double.x, at_unit.x / 2.0));
        assert!(approx(at_double.y, at_unit.y / 2.0));
    }

    #[test]
    fn pan_offset_is_removed_before_zoom() {
        let mut viewport = EditorViewport::new();
        viewport.pan_by(20.0, 10.0);
        viewport.set_zoom(2.0);
        let point = viewport.to_canvas(
            ViewportPoint::new(120.0, 110.0),
            Size::new(100, 100),
            Size::new(100, 100),
        );
        assert!(approx(point.x, 50.0));
        assert!(approx(point.y, 50.0));
    }

    #[test]
    fn zero_display_size_does_not_divide_by_zero() {
        let point = EditorViewport::new().to_canvas(
            ViewportPoint::new(3.0, 4.0),
            Size::new(0, 0),
            Size::new(10, 10),
        );
        assert!(point.x.is_finite());
        assert!(point.y.is_finite());
    }
}
