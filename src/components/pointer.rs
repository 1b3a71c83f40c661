use serde::{Deserialize, Serialize};

/// Surface-local position in pixels; (0, 0) is the surface's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub x: f32,
    pub y: f32,
}

impl SurfacePoint {
    pub const ORIGIN: SurfacePoint = SurfacePoint { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// On-screen bounds of the surface, in the same client space as the events.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct BoundingRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub client_x: f32,
    pub client_y: f32,
}

/// Raw input as delivered by the windowing layer.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent {
    Mouse { client_x: f32, client_y: f32 },
    /// Active touch points, first one wins.
    Touch { touches: Vec<TouchPoint> },
}

impl PointerEvent {
    pub fn mouse(client_x: f32, client_y: f32) -> Self {
        PointerEvent::Mouse { client_x, client_y }
    }
}

/// Map an event to surface-local coordinates.
///
/// The rect must be the surface's bounds at the time of *this* event; layout
/// can move the surface between events.  A touch event without touch points
/// maps to the origin rather than failing the stroke.
pub fn surface_point(event: &PointerEvent, rect: &BoundingRect) -> SurfacePoint {
    let (client_x, client_y) = match event {
        PointerEvent::Mouse { client_x, client_y } => (*client_x, *client_y),
        PointerEvent::Touch { touches } => match touches.first() {
            Some(t) => (t.client_x, t.client_y),
            None => return SurfacePoint::ORIGIN,
        },
    };
    SurfacePoint {
        x: client_x - rect.left,
        y: client_y - rect.top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: BoundingRect = BoundingRect {
        left: 40.0,
        top: 25.0,
        width: 800.0,
        height: 600.0,
    };

    #[test]
    fn mouse_is_offset_by_rect() {
        let p = surface_point(&PointerEvent::mouse(140.0, 125.0), &RECT);
        assert_eq!(p, SurfacePoint::new(100.0, 100.0));
    }

    #[test]
    fn rect_is_read_per_event() {
        let ev = PointerEvent::mouse(140.0, 125.0);
        let moved = BoundingRect {
            left: 0.0,
            top: 0.0,
            ..RECT
        };
        assert_eq!(surface_point(&ev, &RECT), SurfacePoint::new(100.0, 100.0));
        assert_eq!(surface_point(&ev, &moved), SurfacePoint::new(140.0, 125.0));
    }

    #[test]
    fn first_touch_wins() {
        let ev = PointerEvent::Touch {
            touches: vec![
                TouchPoint { client_x: 50.0, client_y: 30.0 },
                TouchPoint { client_x: 500.0, client_y: 300.0 },
            ],
        };
        assert_eq!(surface_point(&ev, &RECT), SurfacePoint::new(10.0, 5.0));
    }

    #[test]
    fn empty_touch_list_maps_to_origin() {
        let ev = PointerEvent::Touch { touches: Vec::new() };
        assert_eq!(surface_point(&ev, &RECT), SurfacePoint::ORIGIN);
    }
}
