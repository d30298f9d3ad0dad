use foundation::math::Vec2;

/// Pointer input in viewport pixels, origin top-left.
///
/// Hosts push these between frames; the engine applies them at the start of
/// the next tick in arrival order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    Down { at: Vec2 },
    Move { at: Vec2 },
    Up { at: Vec2 },
    /// Negative `delta_y` zooms in.
    Wheel { at: Vec2, delta_y: f64 },
}
