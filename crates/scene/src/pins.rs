use foundation::handles::Handle;
use foundation::ids::TripId;
use foundation::math::{GeoCoordinate, Vec3, geo_to_cartesian};

use crate::prefabs::Color;

/// Handle of one visual part of a pin. This is what ray tests return.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartHandle(pub Handle);

impl PartHandle {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PinPartKind {
    /// Visible sphere sitting on the surface.
    Dot,
    /// Thin torus lying in the tangent plane around the dot.
    Ring,
    /// Invisible oversized sphere that makes pins easy to hit.
    HitTarget,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PinPart {
    pub handle: PartHandle,
    pub kind: PinPartKind,
}

/// Look shared by every pin. Dimensions are in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PinStyle {
    pub dot_radius: f64,
    pub ring_radius: f64,
    pub ring_tube: f64,
    pub hit_radius: f64,
    pub dot_color: Color,
    pub ring_color: Color,
    pub ring_opacity: f32,
}

impl Default for PinStyle {
    fn default() -> Self {
        Self {
            dot_radius: 0.12,
            ring_radius: 0.25,
            ring_tube: 0.02,
            hit_radius: 0.6,
            dot_color: Color::from_hex(0x60a5fa),
            ring_color: Color::from_hex(0x93c5fd),
            ring_opacity: 0.7,
        }
    }
}

/// One trip plotted on the globe.
///
/// All parts are centred on `position`; the pin's local +Z is `normal`, so the
/// ring lies flat on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PinMarker {
    pub trip_id: TripId,
    pub coordinate: GeoCoordinate,
    pub position: Vec3,
    pub normal: Vec3,
    /// Radius of the hit target, the pin's outermost extent.
    pub radius: f64,
    pub parts: [PinPart; 3],
}

impl PinMarker {
    pub fn new(
        trip_id: TripId,
        coordinate: GeoCoordinate,
        sphere_radius: f64,
        style: &PinStyle,
        handles: [PartHandle; 3],
    ) -> Self {
        let position = geo_to_cartesian(coordinate, sphere_radius);
        let normal = position.try_normalize().unwrap_or(Vec3::Y);
        let [dot, ring, hit] = handles;
        Self {
            trip_id,
            coordinate,
            position,
            normal,
            radius: style.hit_radius,
            parts: [
                PinPart {
                    handle: dot,
                    kind: PinPartKind::Dot,
                },
                PinPart {
                    handle: ring,
                    kind: PinPartKind::Ring,
                },
                PinPart {
                    handle: hit,
                    kind: PinPartKind::HitTarget,
                },
            ],
        }
    }

    pub fn part(&self, kind: PinPartKind) -> PinPart {
        // Construction always fills all three kinds, in this order.
        match kind {
            PinPartKind::Dot => self.parts[0],
            PinPartKind::Ring => self.parts[1],
            PinPartKind::HitTarget => self.parts[2],
        }
    }

    /// Rotation taking local +Z onto the surface normal, as `[x, y, z, w]`.
    pub fn orientation(&self) -> [f64; 4] {
        quat_from_unit_vectors(Vec3::Z, self.normal)
    }
}

fn quat_from_unit_vectors(a: Vec3, b: Vec3) -> [f64; 4] {
    let dot = a.dot(b).clamp(-1.0, 1.0);

    // Nearly opposite vectors: pick arbitrary orthogonal axis.
    if dot < -0.999999 {
        let mut axis = Vec3::X.cross(a);
        if axis.length_squared() < 1e-12 {
            axis = Vec3::Y.cross(a);
        }
        let axis = axis.normalize_or_zero();
        return [axis.x, axis.y, axis.z, 0.0];
    }

    let axis = a.cross(b);
    let w = 1.0 + dot;
    let n = (axis.length_squared() + w * w).sqrt();
    [axis.x / n, axis.y / n, axis.z / n, w / n]
}

#[cfg(test)]
mod tests {
    use super::{PartHandle, PinMarker, PinPartKind, PinStyle};
    use foundation::handles::Handle;
    use foundation::ids::TripId;
    use foundation::math::{GeoCoordinate, Vec3};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn marker(lat: f64, lng: f64) -> PinMarker {
        PinMarker::new(
            TripId::new("t"),
            GeoCoordinate::new(lat, lng),
            5.0,
            &PinStyle::default(),
            [
                PartHandle(Handle::new(0, 0)),
                PartHandle(Handle::new(1, 0)),
                PartHandle(Handle::new(2, 0)),
            ],
        )
    }

    #[test]
    fn sits_on_sphere_with_outward_normal() {
        let pin = marker(31.1103, -3.9785);
        assert_close(pin.position.length(), 5.0, 1e-12);
        assert_close(pin.normal.dot(pin.position.normalize_or_zero()), 1.0, 1e-12);
        assert_eq!(pin.radius, 0.6);
    }

    #[test]
    fn parts_are_addressable_by_kind() {
        let pin = marker(0.0, 0.0);
        assert_eq!(pin.part(PinPartKind::Ring).handle, PartHandle(Handle::new(1, 0)));
        assert_eq!(pin.part(PinPartKind::HitTarget).kind, PinPartKind::HitTarget);
    }

    #[test]
    fn orientation_maps_local_z_to_normal() {
        let pin = marker(40.7128, -74.006);
        let [x, y, z, w] = pin.orientation();
        let q = Vec3::new(x, y, z);
        // v' = v + 2w(q x v) + 2 q x (q x v)
        let v = Vec3::Z;
        let t = q.cross(v) * 2.0;
        let rotated = v + t * w + q.cross(t);
        assert_close(rotated.x, pin.normal.x, 1e-9);
        assert_close(rotated.y, pin.normal.y, 1e-9);
        assert_close(rotated.z, pin.normal.z, 1e-9);
    }
}
