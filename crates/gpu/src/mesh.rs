//! CPU-side geometry for the globe and pin parts, laid out for upload.

use std::f32::consts::{PI, TAU};

use scene::PinMarker;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StarVertex {
    pub position: [f32; 3],
    pub _pad: f32,
}

/// Per-pin transform: translation plus a rotation quaternion `[x, y, z, w]`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PinInstance {
    pub translation: [f32; 3],
    pub _pad: f32,
    pub rotation: [f32; 4],
}

impl PinInstance {
    pub fn from_marker(pin: &PinMarker) -> Self {
        let [x, y, z, w] = pin.orientation();
        Self {
            translation: pin.position.as_f32(),
            _pad: 0.0,
            rotation: [x as f32, y as f32, z as f32, w as f32],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

/// UV sphere. Texture `u = 0` sits on longitude -180 so equirectangular
/// maps line up with the geo projection.
pub fn generate_sphere_mesh(radius: f32, lat_segments: u32, lon_segments: u32) -> MeshData {
    let lat_segments = lat_segments.max(3);
    let lon_segments = lon_segments.max(3);

    let mut vertices = Vec::with_capacity(((lat_segments + 1) * (lon_segments + 1)) as usize);
    for lat in 0..=lat_segments {
        let v = lat as f32 / lat_segments as f32;
        let theta = v * PI;
        let sin_t = theta.sin();
        let cos_t = theta.cos();

        for lon in 0..=lon_segments {
            let u = lon as f32 / lon_segments as f32;
            let phi = u * TAU;

            let n = [-phi.cos() * sin_t, cos_t, phi.sin() * sin_t];
            vertices.push(Vertex {
                position: [n[0] * radius, n[1] * radius, n[2] * radius],
                normal: n,
                uv: [u, 1.0 - v],
            });
        }
    }

    let indices = grid_indices(lat_segments, lon_segments);
    MeshData { vertices, indices }
}

/// Torus around the local Z axis, lying in the XY plane.
pub fn generate_torus_mesh(
    radius: f32,
    tube: f32,
    radial_segments: u32,
    tubular_segments: u32,
) -> MeshData {
    let radial_segments = radial_segments.max(3);
    let tubular_segments = tubular_segments.max(3);

    let mut vertices =
        Vec::with_capacity(((radial_segments + 1) * (tubular_segments + 1)) as usize);
    for j in 0..=radial_segments {
        let v = j as f32 / radial_segments as f32 * TAU;
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * TAU;

            let ring = radius + tube * v.cos();
            let position = [ring * u.cos(), ring * u.sin(), tube * v.sin()];
            let center = [radius * u.cos(), radius * u.sin(), 0.0];
            let normal = normalize([
                position[0] - center[0],
                position[1] - center[1],
                position[2] - center[2],
            ]);
            vertices.push(Vertex {
                position,
                normal,
                uv: [
                    i as f32 / tubular_segments as f32,
                    j as f32 / radial_segments as f32,
                ],
            });
        }
    }

    let indices = grid_indices(radial_segments, tubular_segments);
    MeshData { vertices, indices }
}

fn grid_indices(rows: u32, cols: u32) -> Vec<u16> {
    let stride = cols + 1;
    let mut indices = Vec::with_capacity((rows * cols * 6) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let i0 = row * stride + col;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;

            indices.push(i0 as u16);
            indices.push(i2 as u16);
            indices.push(i1 as u16);
            indices.push(i1 as u16);
            indices.push(i2 as u16);
            indices.push(i3 as u16);
        }
    }
    indices
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f32::EPSILON {
        return [0.0, 0.0, 1.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}
