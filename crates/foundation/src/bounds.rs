use crate::math::Vec3;

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    /// Tight box around a sphere.
    pub fn around_sphere(center: Vec3, radius: f64) -> Self {
        let r = radius.abs();
        Aabb3::new(
            [center.x - r, center.y - r, center.z - r],
            [center.x + r, center.y + r, center.z + r],
        )
    }

    pub fn union(&self, other: &Aabb3) -> Aabb3 {
        Aabb3::new(
            [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        )
    }
}
