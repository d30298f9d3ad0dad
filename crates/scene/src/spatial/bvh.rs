//! Bounding volume hierarchy over pin hit spheres.
//!
//! Volumes are stored flat and reordered during the build so every leaf owns
//! a contiguous run. Internal nodes carry the box around their children; the
//! leaf test is against the sphere itself.

use foundation::bounds::Aabb3;
use foundation::math::precision::TotalF64;
use foundation::math::{Ray, Vec3};

use crate::pins::PartHandle;

const LEAF_SIZE: usize = 4;

/// Hit sphere of one pin, keyed by the part that owns it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PinVolume {
    pub part: PartHandle,
    pub center: Vec3,
    pub radius: f64,
}

impl PinVolume {
    fn bounds(&self) -> Aabb3 {
        Aabb3::around_sphere(self.center, self.radius)
    }

    fn crossed_by(&self, ray: &Ray, t_max: f64) -> bool {
        let to_center = self.center - ray.origin;
        let along = to_center.dot(ray.dir).clamp(0.0, t_max);
        ray.at(along).distance(self.center) <= self.radius
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { bounds: Aabb3, start: usize, len: usize },
    Split { bounds: Aabb3, left: usize, right: usize },
}

impl Node {
    fn bounds(&self) -> &Aabb3 {
        match self {
            Node::Leaf { bounds, .. } | Node::Split { bounds, .. } => bounds,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bvh {
    volumes: Vec<PinVolume>,
    nodes: Vec<Node>,
}

impl Bvh {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(mut volumes: Vec<PinVolume>) -> Self {
        // Sort first so the tree shape does not depend on trip order.
        volumes.sort_by_key(|v| v.part);
        let mut bvh = Bvh {
            volumes,
            nodes: Vec::new(),
        };
        if !bvh.volumes.is_empty() {
            let len = bvh.volumes.len();
            bvh.split(0, len);
        }
        bvh
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Parts whose sphere the ray crosses within `[0, t_max]`, in ascending
    /// handle order. `ray.dir` must be unit length.
    pub fn query_ray(&self, ray: &Ray, t_max: f64) -> Vec<PartHandle> {
        let mut out = Vec::new();
        if self.nodes.is_empty() {
            return out;
        }
        let inv = Vec3::new(1.0 / ray.dir.x, 1.0 / ray.dir.y, 1.0 / ray.dir.z);
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !slab_hit(node.bounds(), ray.origin, inv, t_max) {
                continue;
            }
            match *node {
                Node::Leaf { start, len, .. } => out.extend(
                    self.volumes[start..start + len]
                        .iter()
                        .filter(|v| v.crossed_by(ray, t_max))
                        .map(|v| v.part),
                ),
                Node::Split { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out.sort();
        out
    }

    /// Builds the node for `volumes[start..start + len]` and returns its index.
    fn split(&mut self, start: usize, len: usize) -> usize {
        let run = &mut self.volumes[start..start + len];
        let bounds = run
            .iter()
            .map(PinVolume::bounds)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| Aabb3::new([0.0; 3], [0.0; 3]));

        let idx = self.nodes.len();
        if len <= LEAF_SIZE {
            self.nodes.push(Node::Leaf { bounds, start, len });
            return idx;
        }

        let axis = widest_axis(run.iter().map(|v| v.center));
        run.sort_by_key(|v| (TotalF64(v.center.as_array()[axis]), v.part));

        // Placeholder until the children exist.
        self.nodes.push(Node::Leaf { bounds, start, len });
        let half = len / 2;
        let left = self.split(start, half);
        let right = self.split(start + half, len - half);
        self.nodes[idx] = Node::Split { bounds, left, right };
        idx
    }
}

fn widest_axis(centers: impl Iterator<Item = Vec3>) -> usize {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for c in centers {
        for (axis, v) in c.as_array().into_iter().enumerate() {
            lo[axis] = lo[axis].min(v);
            hi[axis] = hi[axis].max(v);
        }
    }
    (0..3)
        .max_by(|&a, &b| (hi[a] - lo[a]).total_cmp(&(hi[b] - lo[b])))
        .unwrap_or(0)
}

fn slab_hit(bounds: &Aabb3, origin: Vec3, inv_dir: Vec3, t_max: f64) -> bool {
    let (o, inv) = (origin.as_array(), inv_dir.as_array());
    let mut near = 0.0_f64;
    let mut far = t_max;
    for axis in 0..3 {
        let a = (bounds.min[axis] - o[axis]) * inv[axis];
        let b = (bounds.max[axis] - o[axis]) * inv[axis];
        // 0 * inf on a parallel axis with the origin on a face.
        let (a, b) = if a.is_nan() || b.is_nan() {
            (f64::NEG_INFINITY, f64::INFINITY)
        } else {
            (a.min(b), a.max(b))
        };
        near = near.max(a);
        far = far.min(b);
        if near > far {
            return false;
        }
    }
    true
}
