use super::Vec3;

/// Column-major 4x4 matrix: `cols[c][r]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Right-handed view matrix looking from `eye` toward `target`.
    ///
    /// When `up` is parallel to the view direction a fallback up axis is
    /// used so the basis never collapses.
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let (s, u, f) = view_basis(eye, target, up);

        let ex = -s.dot(eye);
        let ey = -u.dot(eye);
        let ez = f.dot(eye);

        Self {
            cols: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [ex, ey, ez, 1.0],
            ],
        }
    }

    /// Right-handed perspective projection with depth mapped to `[0, 1]`.
    pub fn perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        let m00 = f / aspect;
        let m11 = f;
        let m22 = far / (near - far);
        let m23 = (near * far) / (near - far);

        Self {
            cols: [
                [m00, 0.0, 0.0, 0.0],
                [0.0, m11, 0.0, 0.0],
                [0.0, 0.0, m22, -1.0],
                [0.0, 0.0, m23, 0.0],
            ],
        }
    }

    pub fn mul(&self, b: &Mat4) -> Mat4 {
        let a = &self.cols;
        let mut c = [[0.0f64; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                c[col][row] = a[0][row] * b.cols[col][0]
                    + a[1][row] * b.cols[col][1]
                    + a[2][row] * b.cols[col][2]
                    + a[3][row] * b.cols[col][3];
            }
        }
        Mat4 { cols: c }
    }

    /// Multiplies `(p, 1)` and returns the homogeneous result.
    pub fn transform_point4(&self, p: Vec3) -> [f64; 4] {
        let m = &self.cols;
        let mut out = [0.0; 4];
        for (row, v) in out.iter_mut().enumerate() {
            *v = m[0][row] * p.x + m[1][row] * p.y + m[2][row] * p.z + m[3][row];
        }
        out
    }

    /// GPU upload form.
    pub fn to_f32(&self) -> [[f32; 4]; 4] {
        let mut out = [[0.0f32; 4]; 4];
        for (col, dst) in out.iter_mut().enumerate() {
            for (row, v) in dst.iter_mut().enumerate() {
                *v = self.cols[col][row] as f32;
            }
        }
        out
    }
}

/// Orthonormal camera basis `(right, up, forward)`.
pub fn view_basis(eye: Vec3, target: Vec3, up: Vec3) -> (Vec3, Vec3, Vec3) {
    let f = (target - eye).try_normalize().unwrap_or(-Vec3::Z);
    let side = f.cross(up);
    let s = if side.length() > 1e-9 {
        side.normalize_or_zero()
    } else {
        // Looking straight along `up` (e.g. over a pole).
        f.cross(Vec3::Z).try_normalize().unwrap_or(Vec3::X)
    };
    let u = s.cross(f);
    (s, u, f)
}

#[cfg(test)]
mod tests {
    use super::{Mat4, view_basis};
    use crate::math::Vec3;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn identity_is_neutral() {
        let m = Mat4::perspective_rh_z0(1.0, 1.5, 0.1, 100.0);
        assert_eq!(Mat4::IDENTITY.mul(&m), m);
        assert_eq!(m.mul(&Mat4::IDENTITY), m);
    }

    #[test]
    fn look_at_puts_target_on_negative_z() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let p = view.transform_point4(Vec3::ZERO);
        assert_close(p[0], 0.0, 1e-12);
        assert_close(p[1], 0.0, 1e-12);
        assert_close(p[2], -10.0, 1e-12);
        assert_close(p[3], 1.0, 1e-12);
    }

    #[test]
    fn perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective_rh_z0(1.0, 1.0, 0.5, 50.0);
        let near = proj.transform_point4(Vec3::new(0.0, 0.0, -0.5));
        let far = proj.transform_point4(Vec3::new(0.0, 0.0, -50.0));
        assert_close(near[2] / near[3], 0.0, 1e-12);
        assert_close(far[2] / far[3], 1.0, 1e-12);
    }

    #[test]
    fn basis_survives_looking_down_the_up_axis() {
        let (s, u, f) = view_basis(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Y);
        assert_close(f.y, -1.0, 1e-12);
        assert_close(s.length(), 1.0, 1e-12);
        assert_close(u.length(), 1.0, 1e-12);
        assert_close(s.dot(f), 0.0, 1e-12);
    }
}
