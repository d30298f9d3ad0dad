//! Screen anchor for the hovered pin's tooltip.

use foundation::ids::TripId;
use foundation::math::{PerspectiveCamera, ScreenPoint, Vec2, Vec3, Viewport};
use scene::PinMarker;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipState {
    pub trip_id: Option<TripId>,
    /// Pixel anchor, or [`ScreenPoint::OFF_SCREEN`] when there is nothing to show.
    pub anchor: ScreenPoint,
    /// False while nothing is hovered or the user is dragging.
    pub visible: bool,
}

impl Default for TooltipState {
    fn default() -> Self {
        Self {
            trip_id: None,
            anchor: ScreenPoint::OFF_SCREEN,
            visible: false,
        }
    }
}

/// Whether `point` on the globe faces away from the eye.
///
/// A surface point is visible only if it is closer than the tangent
/// distance `sqrt(d^2 - r^2)`, where `d` is the eye's distance from the centre.
pub fn is_behind_globe(eye: Vec3, center: Vec3, sphere_radius: f64, point: Vec3) -> bool {
    let d2 = eye.distance(center).powi(2);
    let horizon = (d2 - sphere_radius * sphere_radius).max(0.0).sqrt();
    eye.distance(point) > horizon
}

/// Projects a pin position to viewport pixels.
///
/// Returns `None` when the viewport has no area; the caller keeps its last
/// anchor until a valid resize. Occluded points and points outside the clip
/// depth map to [`ScreenPoint::OFF_SCREEN`].
pub fn project_anchor(
    world: Vec3,
    camera: &PerspectiveCamera,
    viewport: Viewport,
    sphere_radius: f64,
) -> Option<ScreenPoint> {
    if viewport.is_degenerate() {
        return None;
    }
    if is_behind_globe(camera.position, camera.target, sphere_radius, world) {
        return Some(ScreenPoint::OFF_SCREEN);
    }
    let projected = camera.project(world);
    if !projected.in_depth_range() {
        return Some(ScreenPoint::OFF_SCREEN);
    }
    viewport.ndc_to_pixel(Vec2::new(projected.ndc.x, projected.ndc.y))
}

#[derive(Debug, Clone, Default)]
pub struct TooltipProjector {
    state: TooltipState,
}

impl TooltipProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TooltipState {
        &self.state
    }

    /// Re-projects the hovered pin for this frame.
    pub fn update(
        &mut self,
        hovered: Option<&PinMarker>,
        camera: Option<&PerspectiveCamera>,
        viewport: Viewport,
        sphere_radius: f64,
        dragging: bool,
    ) -> &TooltipState {
        let Some(pin) = hovered else {
            self.state = TooltipState::default();
            return &self.state;
        };

        if self.state.trip_id.as_ref() != Some(&pin.trip_id) {
            self.state.trip_id = Some(pin.trip_id.clone());
            self.state.anchor = ScreenPoint::OFF_SCREEN;
        }
        if let Some(anchor) =
            camera.and_then(|camera| project_anchor(pin.position, camera, viewport, sphere_radius))
        {
            self.state.anchor = anchor;
        }
        self.state.visible = !dragging;
        trace!(
            trip = %pin.trip_id,
            x = self.state.anchor.x,
            y = self.state.anchor.y,
            visible = self.state.visible,
            "tooltip projected"
        );
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::{TooltipProjector, TooltipState, is_behind_globe, project_anchor};
    use foundation::ids::TripId;
    use foundation::math::{GeoCoordinate, PerspectiveCamera, ScreenPoint, Vec3, Viewport, lat_lng_to_cartesian};
    use pretty_assertions::assert_eq;
    use scene::prefabs::GlobeSettings;
    use scene::{PinStyle, SceneGraph, Trip};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    const FOV_DEG: f64 = 45.0;
    const W: f64 = 1024.0;
    const H: f64 = 768.0;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::look_at(Vec3::new(20.0, 0.0, 0.0), Vec3::ZERO, FOV_DEG.to_radians(), W / H, 0.1, 1000.0)
    }

    /// Pinhole projection written out by hand for a camera on +X looking at the origin.
    fn pinhole(p: Vec3) -> (f64, f64) {
        let eye = Vec3::new(20.0, 0.0, 0.0);
        let forward = Vec3::new(-1.0, 0.0, 0.0);
        let right = Vec3::new(0.0, 0.0, -1.0);
        let up = Vec3::new(0.0, 1.0, 0.0);
        let rel = p - eye;
        let depth = rel.dot(forward);
        let tan_half = (FOV_DEG.to_radians() / 2.0).tan();
        let nx = rel.dot(right) / (depth * tan_half * (W / H));
        let ny = rel.dot(up) / (depth * tan_half);
        ((nx + 1.0) / 2.0 * W, (1.0 - ny) / 2.0 * H)
    }

    #[test]
    fn near_side_point_matches_independent_projection() {
        let p = lat_lng_to_cartesian(10.0, 20.0, 5.0);
        let anchor = project_anchor(p, &camera(), Viewport::new(W, H), 5.0).expect("viewport ok");
        let (x, y) = pinhole(p);
        assert!(!anchor.is_off_screen());
        assert_close(anchor.x, x, 1.0);
        assert_close(anchor.y, y, 1.0);
    }

    #[test]
    fn far_side_point_is_off_screen() {
        let p = lat_lng_to_cartesian(0.0, 180.0, 5.0);
        assert!(is_behind_globe(Vec3::new(20.0, 0.0, 0.0), Vec3::ZERO, 5.0, p));
        let anchor = project_anchor(p, &camera(), Viewport::new(W, H), 5.0).expect("viewport ok");
        assert_eq!(anchor, ScreenPoint::OFF_SCREEN);
    }

    #[test]
    fn point_behind_the_eye_is_off_screen() {
        let p = Vec3::new(30.0, 0.0, 0.0);
        let anchor = project_anchor(p, &camera(), Viewport::new(W, H), 0.0).expect("viewport ok");
        assert_eq!(anchor, ScreenPoint::OFF_SCREEN);
    }

    #[test]
    fn degenerate_viewport_skips_projection() {
        let p = lat_lng_to_cartesian(0.0, 0.0, 5.0);
        assert_eq!(project_anchor(p, &camera(), Viewport::new(0.0, H), 5.0), None);
    }

    fn scene() -> SceneGraph {
        let mut scene = SceneGraph::new(&GlobeSettings::default(), PinStyle::default());
        scene.rebuild_pins(&[Trip::new("lisbon", 38.72, -9.14), Trip::new("centre", 0.0, 0.0)]);
        scene
    }

    #[test]
    fn projector_follows_hover_and_drag() {
        let scene = scene();
        let pin = scene.pin(&TripId::new("centre")).expect("pin");
        let cam = camera();
        let vp = Viewport::new(W, H);
        let mut projector = TooltipProjector::new();

        let state = projector.update(Some(pin), Some(&cam), vp, 5.0, false).clone();
        assert_eq!(state.trip_id, Some(TripId::new("centre")));
        assert!(state.visible);
        assert_close(state.anchor.x, W / 2.0, 1e-6);
        assert_close(state.anchor.y, H / 2.0, 1e-6);

        let state = projector.update(Some(pin), Some(&cam), vp, 5.0, true);
        assert!(!state.visible);
        assert!(!state.anchor.is_off_screen(), "dragging hides, it does not move");

        let state = projector.update(None, Some(&cam), vp, 5.0, false);
        assert_eq!(*state, TooltipState::default());
    }

    #[test]
    fn projector_keeps_last_anchor_while_viewport_is_empty() {
        let scene = scene();
        let pin = scene.pin(&TripId::new("centre")).expect("pin");
        let cam = camera();
        let mut projector = TooltipProjector::new();
        let before = projector.update(Some(pin), Some(&cam), Viewport::new(W, H), 5.0, false).anchor;
        let after = projector.update(Some(pin), None, Viewport::new(0.0, 0.0), 5.0, false).anchor;
        assert_eq!(before, after);
    }

    #[test]
    fn switching_pins_does_not_reuse_the_old_anchor() {
        let scene = scene();
        let centre = scene.pin(&TripId::new("centre")).expect("pin");
        let lisbon = scene.pin(&TripId::new("lisbon")).expect("pin");
        let cam = camera();
        let mut projector = TooltipProjector::new();
        projector.update(Some(centre), Some(&cam), Viewport::new(W, H), 5.0, false);
        let state = projector.update(Some(lisbon), None, Viewport::new(0.0, 0.0), 5.0, false);
        assert_eq!(state.anchor, ScreenPoint::OFF_SCREEN);
        assert_eq!(lisbon.coordinate, GeoCoordinate::new(38.72, -9.14));
    }
}
