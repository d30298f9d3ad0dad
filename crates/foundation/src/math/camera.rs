use super::{Mat4, Vec2, Vec3, view_basis};

/// Drawable area in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Zero or non-finite extent, e.g. mid-layout.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect(&self) -> Option<f64> {
        (!self.is_degenerate()).then(|| self.width / self.height)
    }

    /// Pixel position (origin top-left, y down) to normalized device coordinates.
    pub fn pixel_to_ndc(&self, px: Vec2) -> Option<Vec2> {
        if self.is_degenerate() {
            return None;
        }
        Some(Vec2::new(
            (px.x / self.width) * 2.0 - 1.0,
            -(px.y / self.height) * 2.0 + 1.0,
        ))
    }

    pub fn ndc_to_pixel(&self, ndc: Vec2) -> Option<ScreenPoint> {
        if self.is_degenerate() {
            return None;
        }
        Some(ScreenPoint::new(
            (ndc.x * 0.5 + 0.5) * self.width,
            (-(ndc.y * 0.5) + 0.5) * self.height,
        ))
    }
}

/// Position in viewport pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    /// Far outside any realistic viewport; overlays parked here stay laid out.
    pub const OFF_SCREEN: Self = Self {
        x: -9999.0,
        y: -9999.0,
    };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_off_screen(&self) -> bool {
        *self == Self::OFF_SCREEN
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// A point pushed through view and projection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projected {
    /// Normalized device coordinates; `z` is depth in `[0, 1]` when inside the clip range.
    pub ndc: Vec3,
    /// Clip-space `w`; not positive for points behind the eye.
    pub w: f64,
}

impl Projected {
    pub fn in_depth_range(&self) -> bool {
        self.w > 0.0 && (0.0..=1.0).contains(&self.ndc.z)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl PerspectiveCamera {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            fov_y_rad,
            aspect,
            near,
            far,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_z0(self.fov_y_rad, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection().mul(&self.view())
    }

    pub fn project(&self, world: Vec3) -> Projected {
        let clip = self.view_projection().transform_point4(world);
        let w = clip[3];
        let inv = if w.abs() > f64::EPSILON { 1.0 / w } else { 0.0 };
        Projected {
            ndc: Vec3::new(clip[0] * inv, clip[1] * inv, clip[2] * inv),
            w,
        }
    }

    /// Ray from the eye through a point given in normalized device coordinates.
    pub fn ray_through_ndc(&self, ndc: Vec2) -> Ray {
        let (s, u, f) = view_basis(self.position, self.target, self.up);
        let tan_half = (0.5 * self.fov_y_rad).tan();
        let dir = f + s * (ndc.x * tan_half * self.aspect) + u * (ndc.y * tan_half);
        Ray::new(self.position, dir.normalize_or_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::{PerspectiveCamera, ScreenPoint, Viewport};
    use crate::math::{Vec2, Vec3};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::look_at(
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::ZERO,
            45f64.to_radians(),
            16.0 / 9.0,
            0.1,
            1000.0,
        )
    }

    #[test]
    fn pixel_ndc_round_trip() {
        let vp = Viewport::new(800.0, 600.0);
        let ndc = vp.pixel_to_ndc(Vec2::new(200.0, 150.0)).expect("ndc");
        assert_close(ndc.x, -0.5, 1e-12);
        assert_close(ndc.y, 0.5, 1e-12);
        let px = vp.ndc_to_pixel(ndc).expect("px");
        assert_close(px.x, 200.0, 1e-9);
        assert_close(px.y, 150.0, 1e-9);
    }

    #[test]
    fn degenerate_viewport_refuses_conversion() {
        let vp = Viewport::new(0.0, 600.0);
        assert!(vp.is_degenerate());
        assert!(vp.aspect().is_none());
        assert!(vp.pixel_to_ndc(Vec2::new(1.0, 1.0)).is_none());
        assert!(vp.ndc_to_pixel(Vec2::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn off_screen_sentinel() {
        assert!(ScreenPoint::OFF_SCREEN.is_off_screen());
        assert!(!ScreenPoint::new(10.0, 10.0).is_off_screen());
    }

    #[test]
    fn center_ray_points_at_target() {
        let ray = camera().ray_through_ndc(Vec2::new(0.0, 0.0));
        assert_close(ray.dir.x, 0.0, 1e-12);
        assert_close(ray.dir.y, 0.0, 1e-12);
        assert_close(ray.dir.z, -1.0, 1e-12);
    }

    #[test]
    fn ray_and_projection_agree() {
        let cam = camera();
        let ndc = Vec2::new(0.3, -0.4);
        let ray = cam.ray_through_ndc(ndc);
        let p = cam.project(ray.at(12.0));
        assert_close(p.ndc.x, 0.3, 1e-9);
        assert_close(p.ndc.y, -0.4, 1e-9);
        assert!(p.in_depth_range());
    }

    #[test]
    fn points_behind_eye_are_out_of_range() {
        let p = camera().project(Vec3::new(0.0, 0.0, 30.0));
        assert!(!p.in_depth_range());
    }
}
