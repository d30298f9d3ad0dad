//! Orbit camera with damping, auto-rotate and fly-to.
//!
//! The camera always looks at the orbit target (the globe centre). User input
//! accumulates into pending rotation and zoom which [`CameraController::update_orbit`]
//! releases a fraction at a time, so motion eases out after the pointer stops.

use std::f64::consts::PI;

use foundation::math::{GeoCoordinate, PerspectiveCamera, Vec2, Vec3, Viewport, geo_to_cartesian};
use tracing::{debug, info, trace};

use crate::config::EngineConfig;

/// Keeps the polar angle off the poles so the view basis never collapses.
const POLAR_EPSILON: f64 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CameraMode {
    Idle,
    UserDragging,
    FlyingTo,
}

/// Snapshot of the camera for collaborators and tests.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub orbit_target: Vec3,
    pub distance: f64,
    pub auto_rotate: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraSettings {
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub damping_factor: f64,
    pub auto_rotate_speed: f64,
    pub rotate_speed: f64,
    pub wheel_zoom_scale: f64,
    pub fly_lerp_factor: f64,
    pub arrival_epsilon: f64,
    pub fly_distance_band: [f64; 2],
    pub zoom_in_factor: f64,
    pub zoom_out_factor: f64,
}

impl CameraSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        let cam = &config.camera;
        Self {
            fov_y_deg: cam.fov_y_deg,
            near: cam.near,
            far: cam.far,
            min_distance: cam.min_distance,
            max_distance: cam.max_distance,
            damping_factor: cam.damping_factor,
            auto_rotate_speed: cam.auto_rotate_speed,
            rotate_speed: cam.rotate_speed,
            wheel_zoom_scale: cam.wheel_zoom_scale,
            fly_lerp_factor: config.fly_to.lerp_factor,
            arrival_epsilon: config.fly_to.arrival_epsilon,
            fly_distance_band: config.fly_to.distance_band,
            zoom_in_factor: config.zoom.zoom_in_factor,
            zoom_out_factor: config.zoom.zoom_out_factor,
        }
    }

    fn clamp_distance(&self, distance: f64) -> f64 {
        distance.clamp(self.min_distance, self.max_distance)
    }
}

/// Result of one fly-to step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FlyToProgress {
    /// No transition in flight.
    Inactive,
    InFlight { remaining: f64 },
    Arrived,
}

#[derive(Debug, Clone)]
pub struct CameraController {
    settings: CameraSettings,
    position: Vec3,
    orbit_target: Vec3,
    auto_rotate: bool,
    pointer_down: bool,
    dragging: bool,
    last_pointer: Option<Vec2>,
    /// Pending azimuth and polar rotation in radians.
    rotate_delta: (f64, f64),
    /// Pending multiplicative zoom from the wheel.
    pending_scale: f64,
    fly_to: Option<Vec3>,
}

impl CameraController {
    pub fn new(settings: CameraSettings, initial_position: Vec3) -> Self {
        let clamped = settings.clamp_distance(initial_position.length());
        let position = initial_position.try_normalize().unwrap_or(Vec3::Z) * clamped;
        Self {
            settings,
            position,
            orbit_target: Vec3::ZERO,
            auto_rotate: true,
            pointer_down: false,
            dragging: false,
            last_pointer: None,
            rotate_delta: (0.0, 0.0),
            pending_scale: 1.0,
            fly_to: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(CameraSettings::from_config(config), config.initial_camera_position())
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn mode(&self) -> CameraMode {
        if self.dragging {
            CameraMode::UserDragging
        } else if self.fly_to.is_some() {
            CameraMode::FlyingTo
        } else {
            CameraMode::Idle
        }
    }

    pub fn state(&self) -> CameraState {
        CameraState {
            position: self.position,
            orbit_target: self.orbit_target,
            distance: self.distance(),
            auto_rotate: self.auto_rotate,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn distance(&self) -> f64 {
        self.position.distance(self.orbit_target)
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.auto_rotate
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn fly_to_target(&self) -> Option<Vec3> {
        self.fly_to
    }

    pub fn disable_auto_rotate(&mut self) {
        if self.auto_rotate {
            debug!("auto-rotate disabled");
        }
        self.auto_rotate = false;
    }

    pub fn pointer_down(&mut self, at: Vec2) {
        self.pointer_down = true;
        self.last_pointer = Some(at);
        self.disable_auto_rotate();
    }

    /// Rotation follows pointer travel: a drag across the full viewport
    /// height turns the globe once.
    pub fn pointer_move(&mut self, at: Vec2, viewport: Viewport) {
        let previous = self.last_pointer.replace(at);
        if !self.pointer_down {
            return;
        }
        let Some(previous) = previous else {
            return;
        };
        let delta = at - previous;
        if delta.x == 0.0 && delta.y == 0.0 {
            return;
        }
        if !self.dragging {
            self.dragging = true;
            if self.fly_to.take().is_some() {
                debug!("fly-to cancelled by drag");
            }
        }
        if viewport.is_degenerate() {
            return;
        }
        let turn = 2.0 * PI * self.settings.rotate_speed / viewport.height;
        self.rotate_delta.0 -= delta.x * turn;
        self.rotate_delta.1 -= delta.y * turn;
    }

    pub fn pointer_up(&mut self) {
        self.pointer_down = false;
        self.dragging = false;
    }

    /// Negative `delta_y` zooms in, positive zooms out.
    pub fn wheel(&mut self, delta_y: f64) {
        self.disable_auto_rotate();
        if self.fly_to.take().is_some() {
            debug!("fly-to cancelled by wheel");
        }
        let scale = self.settings.wheel_zoom_scale;
        if delta_y < 0.0 {
            self.pending_scale *= scale;
        } else if delta_y > 0.0 {
            self.pending_scale /= scale;
        }
    }

    pub fn zoom_in(&mut self) {
        self.scale_distance(self.settings.zoom_in_factor);
    }

    pub fn zoom_out(&mut self) {
        self.scale_distance(self.settings.zoom_out_factor);
    }

    fn scale_distance(&mut self, factor: f64) {
        let offset = self.position - self.orbit_target;
        let distance = self.settings.clamp_distance(offset.length() * factor);
        self.position = self.orbit_target + offset.with_length(distance);
    }

    /// Starts a transition toward the point above `coordinate`.
    ///
    /// The viewing distance keeps the current one, pulled into the fly-to
    /// band and then into the orbit limits.
    pub fn fly_to(&mut self, coordinate: GeoCoordinate) -> Vec3 {
        let [band_lo, band_hi] = self.settings.fly_distance_band;
        let distance = self
            .settings
            .clamp_distance(self.distance().clamp(band_lo, band_hi));
        let target = self.orbit_target + geo_to_cartesian(coordinate, distance);
        self.disable_auto_rotate();
        self.fly_to = Some(target);
        info!(
            lat = coordinate.lat,
            lng = coordinate.lng,
            distance,
            "fly-to started"
        );
        target
    }

    /// Damped orbit physics for one frame.
    pub fn update_orbit(&mut self) {
        let s = self.settings;
        if self.auto_rotate && self.mode() == CameraMode::Idle {
            self.rotate_delta.0 -= 2.0 * PI / 60.0 / 60.0 * s.auto_rotate_speed;
        }

        let offset = self.position - self.orbit_target;
        let radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.5 * PI
        };

        theta += self.rotate_delta.0 * s.damping_factor;
        phi += self.rotate_delta.1 * s.damping_factor;
        phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        let radius = s.clamp_distance(radius * self.pending_scale);

        self.position = self.orbit_target + spherical_to_vec3(radius, phi, theta);

        self.rotate_delta.0 *= 1.0 - s.damping_factor;
        self.rotate_delta.1 *= 1.0 - s.damping_factor;
        self.pending_scale = 1.0;
    }

    /// Moves a fraction of the way toward the fly-to target.
    pub fn advance_fly_to(&mut self) -> FlyToProgress {
        let Some(target) = self.fly_to else {
            return FlyToProgress::Inactive;
        };
        let s = &self.settings;
        let next = fly_to_step(
            self.position - self.orbit_target,
            target - self.orbit_target,
            s.fly_lerp_factor,
            s.min_distance,
        );
        let clamped = next.with_length(s.clamp_distance(next.length()));
        self.position = self.orbit_target + clamped;

        let remaining = self.position.distance(target);
        if remaining < s.arrival_epsilon {
            self.fly_to = None;
            info!(remaining, "fly-to arrived");
            return FlyToProgress::Arrived;
        }
        trace!(remaining, "fly-to step");
        FlyToProgress::InFlight { remaining }
    }

    /// Camera for the current frame, or `None` while the viewport has no area.
    pub fn perspective_camera(&self, viewport: Viewport) -> Option<PerspectiveCamera> {
        let aspect = viewport.aspect()?;
        Some(PerspectiveCamera::look_at(
            self.position,
            self.orbit_target,
            self.settings.fov_y_deg.to_radians(),
            aspect,
            self.settings.near,
            self.settings.far,
        ))
    }
}

fn spherical_to_vec3(radius: f64, phi: f64, theta: f64) -> Vec3 {
    let sin_phi = phi.sin();
    Vec3::new(
        radius * sin_phi * theta.sin(),
        radius * phi.cos(),
        radius * sin_phi * theta.cos(),
    )
}

/// One fly-to step in target-relative coordinates.
///
/// Moves `factor` of the remaining way along the straight line. When that
/// line would dip below `min_distance` the step instead swings around the
/// centre, turning the same fraction of the angle and closing the same
/// fraction of the length gap.
pub fn fly_to_step(position: Vec3, target: Vec3, factor: f64, min_distance: f64) -> Vec3 {
    let next = position.lerp(target, factor);
    if next.length() >= min_distance {
        return next;
    }

    let from_len = position.length();
    let to_len = target.length();
    let from_dir = position.try_normalize().unwrap_or(Vec3::Z);
    let to_dir = target.try_normalize().unwrap_or(from_dir);
    let angle = from_dir.dot(to_dir).clamp(-1.0, 1.0).acos();
    // Antipodal start: any axis perpendicular to the start works.
    let axis = from_dir
        .cross(to_dir)
        .try_normalize()
        .unwrap_or_else(|| any_perpendicular(from_dir));
    let dir = rotate_about_axis(from_dir, axis, angle * factor);
    let len = from_len + (to_len - from_len) * factor;
    dir * len.max(min_distance)
}

fn any_perpendicular(v: Vec3) -> Vec3 {
    let candidate = if v.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
    v.cross(candidate).normalize_or_zero()
}

/// Rodrigues rotation of `v` by `angle` radians about unit `axis`.
fn rotate_about_axis(v: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    v * cos + axis.cross(v) * sin + axis * (axis.dot(v) * (1.0 - cos))
}
