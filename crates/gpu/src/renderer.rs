use foundation::math::PerspectiveCamera;
use scene::SceneGraph;
use scene::prefabs::{Color, Light};
use tracing::{debug, trace, warn};

use crate::device::{
    BufferDesc, BufferId, BufferUsage, ProgramDesc, ProgramId, ProgramKind, RenderDevice,
    ResourceCounts, TextureDesc, TextureId,
};
use crate::error::GpuError;
use crate::mesh::{MeshData, PinInstance, StarVertex, generate_sphere_mesh, generate_torus_mesh};
use crate::textures::{DecodedTexture, TextureSlot};

const GLOBE_SEGMENTS: (u32, u32) = (64, 64);
const DOT_SEGMENTS: (u32, u32) = (12, 12);
const RING_SEGMENTS: (u32, u32) = (8, 24);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GpuMesh {
    pub vertices: BufferId,
    pub indices: BufferId,
    pub index_count: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InstanceRange {
    pub buffer: BufferId,
    pub count: u32,
}

/// Shading inputs for one draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub color: [f32; 3],
    pub opacity: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub clearcoat: f32,
    pub albedo_map: Option<TextureId>,
    pub roughness_map: Option<TextureId>,
    pub normal_map: Option<TextureId>,
}

impl Material {
    pub fn unlit(color: Color, opacity: f32) -> Self {
        Self {
            color: color.as_array(),
            opacity,
            roughness: 1.0,
            metalness: 0.0,
            clearcoat: 0.0,
            albedo_map: None,
            roughness_map: None,
            normal_map: None,
        }
    }

    pub fn textures(&self) -> impl Iterator<Item = TextureId> {
        [self.albedo_map, self.roughness_map, self.normal_map]
            .into_iter()
            .flatten()
    }

    pub fn map(&self, slot: TextureSlot) -> Option<TextureId> {
        match slot {
            TextureSlot::Albedo => self.albedo_map,
            TextureSlot::Roughness => self.roughness_map,
            TextureSlot::Normal => self.normal_map,
        }
    }

    fn map_mut(&mut self, slot: TextureSlot) -> &mut Option<TextureId> {
        match slot {
            TextureSlot::Albedo => &mut self.albedo_map,
            TextureSlot::Roughness => &mut self.roughness_map,
            TextureSlot::Normal => &mut self.normal_map,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RenderCommand {
    Mesh {
        program: ProgramId,
        mesh: GpuMesh,
        instances: Option<InstanceRange>,
        material: Material,
    },
    Points {
        program: ProgramId,
        vertices: BufferId,
        count: u32,
        color: [f32; 3],
        opacity: f32,
        size: f32,
    },
}

/// Everything a backend needs to draw one frame, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 3],
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    pub lights: Vec<Light>,
    pub commands: Vec<RenderCommand>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Programs {
    surface: ProgramId,
    atmosphere: ProgramId,
    starfield: ProgramId,
    pin: ProgramId,
}

/// GPU mirror of a [`SceneGraph`].
///
/// Static geometry is uploaded once; the pin instance buffer is replaced
/// whenever the scene's pin revision moves.
#[derive(Debug)]
pub struct Renderer {
    programs: Programs,
    globe: GpuMesh,
    atmosphere: GpuMesh,
    dot: GpuMesh,
    ring: GpuMesh,
    stars: Option<InstanceRange>,
    pins: Option<InstanceRange>,
    pin_revision: Option<u64>,
    surface: Material,
}

impl Renderer {
    /// Uploads the static scene and the current pins.
    ///
    /// On failure everything created so far is released again before the
    /// error is returned.
    pub fn new<D: RenderDevice>(device: &mut D, scene: &SceneGraph) -> Result<Self, GpuError> {
        let mut staging = Staging::default();
        let mut renderer = match Self::upload_static(device, scene, &mut staging) {
            Ok(renderer) => renderer,
            Err(err) => {
                staging.discard(device);
                return Err(err);
            }
        };
        if let Err(err) = renderer.sync_pins(device, scene) {
            if let Err(cleanup) = renderer.release(device) {
                warn!(error = %cleanup, "cleanup after failed pin upload");
            }
            return Err(err);
        }
        debug!(live = ?device.live_resources(), "renderer initialised");
        Ok(renderer)
    }

    fn upload_static<D: RenderDevice>(
        device: &mut D,
        scene: &SceneGraph,
        staging: &mut Staging,
    ) -> Result<Self, GpuError> {
        let globe = scene.globe();
        let style = scene.pin_style();

        let programs = Programs {
            surface: staging.program(device, "globe-surface", ProgramKind::Surface)?,
            atmosphere: staging.program(device, "globe-atmosphere", ProgramKind::Atmosphere)?,
            starfield: staging.program(device, "starfield", ProgramKind::Starfield)?,
            pin: staging.program(device, "pin", ProgramKind::Pin)?,
        };

        let (lat, lon) = GLOBE_SEGMENTS;
        let globe_mesh = staging.mesh(
            device,
            "globe",
            &generate_sphere_mesh(globe.radius as f32, lat, lon),
        )?;
        let atmosphere = staging.mesh(
            device,
            "atmosphere",
            &generate_sphere_mesh(globe.atmosphere.radius as f32, lat, lon),
        )?;
        let (lat, lon) = DOT_SEGMENTS;
        let dot = staging.mesh(
            device,
            "pin-dot",
            &generate_sphere_mesh(style.dot_radius as f32, lat, lon),
        )?;
        let (radial, tubular) = RING_SEGMENTS;
        let ring = staging.mesh(
            device,
            "pin-ring",
            &generate_torus_mesh(
                style.ring_radius as f32,
                style.ring_tube as f32,
                radial,
                tubular,
            ),
        )?;

        let stars = if globe.starfield.points.is_empty() {
            None
        } else {
            let vertices: Vec<StarVertex> = globe
                .starfield
                .points
                .iter()
                .map(|p| StarVertex {
                    position: p.as_f32(),
                    _pad: 0.0,
                })
                .collect();
            let buffer = staging.buffer(
                device,
                &BufferDesc {
                    label: "starfield",
                    usage: BufferUsage::Vertex,
                    contents: bytemuck::cast_slice(&vertices),
                },
            )?;
            Some(InstanceRange {
                buffer,
                count: vertices.len() as u32,
            })
        };

        let material = &globe.surface;
        let surface = Material {
            color: material.base_color.as_array(),
            opacity: 1.0,
            roughness: material.roughness,
            metalness: material.metalness,
            clearcoat: material.clearcoat,
            albedo_map: None,
            roughness_map: None,
            normal_map: None,
        };

        Ok(Self {
            programs,
            globe: globe_mesh,
            atmosphere,
            dot,
            ring,
            stars,
            pins: None,
            pin_revision: None,
            surface,
        })
    }

    /// Re-uploads pin instances if the scene rebuilt its pins. Returns whether it did.
    ///
    /// The old buffer is released before the new one is created.
    pub fn sync_pins<D: RenderDevice>(
        &mut self,
        device: &mut D,
        scene: &SceneGraph,
    ) -> Result<bool, GpuError> {
        if self.pin_revision == Some(scene.pin_revision()) {
            return Ok(false);
        }

        if let Some(old) = self.pins.take() {
            device.release_buffer(old.buffer)?;
        }

        let instances: Vec<PinInstance> = scene.pins().iter().map(PinInstance::from_marker).collect();
        if !instances.is_empty() {
            let buffer = device.create_buffer(&BufferDesc {
                label: "pin-instances",
                usage: BufferUsage::Instance,
                contents: bytemuck::cast_slice(&instances),
            })?;
            self.pins = Some(InstanceRange {
                buffer,
                count: instances.len() as u32,
            });
        }
        self.pin_revision = Some(scene.pin_revision());
        debug!(pins = instances.len(), revision = scene.pin_revision(), "synced pin instances");
        Ok(true)
    }

    /// Uploads a surface map, replacing whatever was bound to `slot`.
    pub fn apply_texture<D: RenderDevice>(
        &mut self,
        device: &mut D,
        slot: TextureSlot,
        texture: &DecodedTexture,
    ) -> Result<TextureId, GpuError> {
        let id = device.create_texture(&TextureDesc {
            label: slot.label(),
            width: texture.width,
            height: texture.height,
            format: slot.format(),
            rgba: &texture.rgba,
        })?;
        if let Some(old) = self.surface.map_mut(slot).replace(id) {
            device.release_texture(old)?;
        }
        debug!(?slot, width = texture.width, height = texture.height, "applied surface texture");
        Ok(id)
    }

    pub fn surface_material(&self) -> &Material {
        &self.surface
    }

    pub fn pin_instances(&self) -> Option<InstanceRange> {
        self.pins
    }

    /// Draw list for the current scene: stars, globe, pins, then the additive atmosphere.
    pub fn build_frame(&self, camera: &PerspectiveCamera, scene: &SceneGraph) -> RenderFrame {
        let globe = scene.globe();
        let style = scene.pin_style();
        let mut commands = Vec::with_capacity(6);

        if let Some(stars) = self.stars {
            commands.push(RenderCommand::Points {
                program: self.programs.starfield,
                vertices: stars.buffer,
                count: stars.count,
                color: globe.starfield.color.as_array(),
                opacity: globe.starfield.opacity,
                size: globe.starfield.size,
            });
        }

        commands.push(RenderCommand::Mesh {
            program: self.programs.surface,
            mesh: self.globe,
            instances: None,
            material: self.surface,
        });

        if let Some(pins) = self.pins {
            commands.push(RenderCommand::Mesh {
                program: self.programs.pin,
                mesh: self.dot,
                instances: Some(pins),
                material: Material::unlit(style.dot_color, 1.0),
            });
            commands.push(RenderCommand::Mesh {
                program: self.programs.pin,
                mesh: self.ring,
                instances: Some(pins),
                material: Material::unlit(style.ring_color, style.ring_opacity),
            });
        }

        commands.push(RenderCommand::Mesh {
            program: self.programs.atmosphere,
            mesh: self.atmosphere,
            instances: None,
            material: Material::unlit(globe.atmosphere.color, 1.0),
        });

        RenderFrame {
            view_proj: camera.view_projection().to_f32(),
            eye: camera.position.as_f32(),
            fog_color: globe.fog.color.as_array(),
            fog_density: globe.fog.density,
            lights: globe.lights.clone(),
            commands,
        }
    }

    /// Syncs pins and submits one frame.
    pub fn draw<D: RenderDevice>(
        &mut self,
        device: &mut D,
        camera: &PerspectiveCamera,
        scene: &SceneGraph,
    ) -> Result<(), GpuError> {
        self.sync_pins(device, scene)?;
        let frame = self.build_frame(camera, scene);
        trace!(commands = frame.commands.len(), "draw");
        device.draw(&frame)
    }

    /// Releases every object this renderer created and reports how many.
    ///
    /// A failed release does not stop the rest; the first error is returned
    /// once everything else has been attempted.
    pub fn release<D: RenderDevice>(self, device: &mut D) -> Result<ResourceCounts, GpuError> {
        let mut released = ResourceCounts::default();
        let mut first_err = None;
        let mut note = |result: Result<(), GpuError>, count: &mut usize| match result {
            Ok(()) => *count += 1,
            Err(err) => {
                warn!(error = %err, "release failed");
                first_err.get_or_insert(err);
            }
        };

        let mut buffers = Vec::new();
        for mesh in [self.globe, self.atmosphere, self.dot, self.ring] {
            buffers.push(mesh.vertices);
            buffers.push(mesh.indices);
        }
        buffers.extend(self.stars.map(|s| s.buffer));
        buffers.extend(self.pins.map(|p| p.buffer));
        for buffer in buffers {
            note(device.release_buffer(buffer), &mut released.buffers);
        }

        for texture in self.surface.textures() {
            note(device.release_texture(texture), &mut released.textures);
        }

        let p = self.programs;
        for program in [p.surface, p.atmosphere, p.starfield, p.pin] {
            note(device.release_program(program), &mut released.programs);
        }

        debug!(?released, "renderer released");
        match first_err {
            Some(err) => Err(err),
            None => Ok(released),
        }
    }
}

/// Objects created during [`Renderer::new`], so a failed build can undo them.
#[derive(Debug, Default)]
struct Staging {
    buffers: Vec<BufferId>,
    programs: Vec<ProgramId>,
}

impl Staging {
    fn program<D: RenderDevice>(
        &mut self,
        device: &mut D,
        label: &str,
        kind: ProgramKind,
    ) -> Result<ProgramId, GpuError> {
        let id = device.create_program(&ProgramDesc { label, kind })?;
        self.programs.push(id);
        Ok(id)
    }

    fn buffer<D: RenderDevice>(&mut self, device: &mut D, desc: &BufferDesc<'_>) -> Result<BufferId, GpuError> {
        let id = device.create_buffer(desc)?;
        self.buffers.push(id);
        Ok(id)
    }

    fn mesh<D: RenderDevice>(&mut self, device: &mut D, label: &str, mesh: &MeshData) -> Result<GpuMesh, GpuError> {
        let vertices = self.buffer(
            device,
            &BufferDesc {
                label,
                usage: BufferUsage::Vertex,
                contents: bytemuck::cast_slice(&mesh.vertices),
            },
        )?;
        let indices = self.buffer(
            device,
            &BufferDesc {
                label,
                usage: BufferUsage::Index,
                contents: bytemuck::cast_slice(&mesh.indices),
            },
        )?;
        Ok(GpuMesh {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
        })
    }

    fn discard<D: RenderDevice>(self, device: &mut D) {
        let (buffers, programs) = (self.buffers.len(), self.programs.len());
        for id in self.buffers {
            if let Err(err) = device.release_buffer(id) {
                warn!(error = %err, "discarding staged buffer");
            }
        }
        for id in self.programs {
            if let Err(err) = device.release_program(id) {
                warn!(error = %err, "discarding staged program");
            }
        }
        debug!(buffers, programs, "discarded partial renderer");
    }
}

#[cfg(test)]
mod tests {
    use super::{RenderCommand, RenderFrame, Renderer};
    use crate::device::{
        BufferDesc, BufferId, HeadlessDevice, ProgramDesc, ProgramId, ProgramKind, RenderDevice,
        ResourceCounts, TextureDesc, TextureId,
    };
    use crate::error::GpuError;
    use crate::textures::{DecodedTexture, TextureSlot};
    use foundation::math::{PerspectiveCamera, Vec3};
    use pretty_assertions::assert_eq;
    use scene::prefabs::GlobeSettings;
    use scene::{PinStyle, SceneGraph, Trip};

    fn scene() -> SceneGraph {
        let settings = GlobeSettings {
            starfield_count: 32,
            ..GlobeSettings::default()
        };
        SceneGraph::new(&settings, PinStyle::default())
    }

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::look_at(
            Vec3::new(0.0, 10.0, 22.0),
            Vec3::ZERO,
            45f64.to_radians(),
            1.5,
            0.1,
            1000.0,
        )
    }

    #[test]
    fn first_frame_draws_with_placeholder_material() {
        let mut device = HeadlessDevice::new(800, 600);
        let scene = scene();
        let mut renderer = Renderer::new(&mut device, &scene).expect("renderer");
        renderer.draw(&mut device, &camera(), &scene).expect("draw");

        let frame = device.last_frame().expect("frame");
        // Stars, globe, atmosphere; no pins yet.
        assert_eq!(frame.commands.len(), 3);
        let RenderCommand::Mesh {
            program, material, ..
        } = frame.commands[1]
        else {
            panic!("globe should be a mesh draw");
        };
        assert_eq!(device.program(program), Some(ProgramKind::Surface));
        assert_eq!(material.textures().count(), 0);
    }

    #[test]
    fn pin_rebuild_replaces_the_instance_buffer() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = scene();
        scene.rebuild_pins(&[Trip::new("a", 1.0, 2.0), Trip::new("b", 3.0, 4.0)]);
        let mut renderer = Renderer::new(&mut device, &scene).expect("renderer");
        let before = device.live_resources();
        let first = renderer.pin_instances().expect("pins");
        assert_eq!(first.count, 2);

        assert!(!renderer.sync_pins(&mut device, &scene).expect("sync"));

        scene.rebuild_pins(&[Trip::new("c", 5.0, 6.0)]);
        assert!(renderer.sync_pins(&mut device, &scene).expect("sync"));
        let second = renderer.pin_instances().expect("pins");
        assert_eq!(second.count, 1);
        assert!(device.buffer(first.buffer).is_none());
        assert_eq!(device.live_resources(), before);

        scene.rebuild_pins(&[]);
        renderer.sync_pins(&mut device, &scene).expect("sync");
        assert!(renderer.pin_instances().is_none());
        assert_eq!(device.live_resources().buffers, before.buffers - 1);
    }

    #[test]
    fn textures_bind_per_slot_and_replace_in_place() {
        let mut device = HeadlessDevice::new(800, 600);
        let scene = scene();
        let mut renderer = Renderer::new(&mut device, &scene).expect("renderer");

        let first = renderer
            .apply_texture(&mut device, TextureSlot::Albedo, &DecodedTexture::solid(2, 2, [10; 4]))
            .expect("albedo");
        let second = renderer
            .apply_texture(&mut device, TextureSlot::Albedo, &DecodedTexture::solid(2, 2, [20; 4]))
            .expect("albedo again");
        renderer
            .apply_texture(&mut device, TextureSlot::Normal, &DecodedTexture::solid(1, 1, [0; 4]))
            .expect("normal");

        assert!(device.texture(first).is_none());
        assert_eq!(renderer.surface_material().map(TextureSlot::Albedo), Some(second));
        assert_eq!(renderer.surface_material().map(TextureSlot::Roughness), None);
        assert_eq!(device.live_resources().textures, 2);
        renderer.draw(&mut device, &camera(), &scene).expect("draw");
    }

    #[test]
    fn release_frees_everything() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = scene();
        scene.rebuild_pins(&[Trip::new("a", 1.0, 2.0)]);
        let mut renderer = Renderer::new(&mut device, &scene).expect("renderer");
        renderer
            .apply_texture(&mut device, TextureSlot::Roughness, &DecodedTexture::solid(1, 1, [0; 4]))
            .expect("roughness");

        let live = device.live_resources();
        let released = renderer.release(&mut device).expect("release");
        assert_eq!(released, live);
        assert_eq!(device.live_resources(), ResourceCounts::default());
    }

    /// Headless device that runs out of buffer memory after `buffers_left` uploads.
    struct ExhaustibleDevice {
        inner: HeadlessDevice,
        buffers_left: usize,
    }

    impl RenderDevice for ExhaustibleDevice {
        fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, GpuError> {
            if self.buffers_left == 0 {
                return Err(GpuError::Backend(format!("out of memory for {}", desc.label)));
            }
            self.buffers_left -= 1;
            self.inner.create_buffer(desc)
        }
        fn release_buffer(&mut self, id: BufferId) -> Result<(), GpuError> {
            self.inner.release_buffer(id)
        }
        fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, GpuError> {
            self.inner.create_texture(desc)
        }
        fn release_texture(&mut self, id: TextureId) -> Result<(), GpuError> {
            self.inner.release_texture(id)
        }
        fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, GpuError> {
            self.inner.create_program(desc)
        }
        fn release_program(&mut self, id: ProgramId) -> Result<(), GpuError> {
            self.inner.release_program(id)
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.inner.resize(width, height);
        }
        fn draw(&mut self, frame: &RenderFrame) -> Result<(), GpuError> {
            self.inner.draw(frame)
        }
        fn live_resources(&self) -> ResourceCounts {
            self.inner.live_resources()
        }
    }

    #[test]
    fn failed_static_upload_leaves_nothing_behind() {
        let mut device = ExhaustibleDevice {
            inner: HeadlessDevice::new(800, 600),
            buffers_left: 3,
        };
        let err = Renderer::new(&mut device, &scene()).expect_err("out of buffers");
        assert!(matches!(err, GpuError::Backend(_)));
        assert_eq!(device.live_resources(), ResourceCounts::default());
    }

    #[test]
    fn failed_pin_upload_releases_the_static_scene() {
        let mut scene = scene();
        scene.rebuild_pins(&[Trip::new("a", 1.0, 2.0)]);
        // Four meshes of two buffers each plus the starfield; the pin buffer is the one that fails.
        let mut device = ExhaustibleDevice {
            inner: HeadlessDevice::new(800, 600),
            buffers_left: 9,
        };
        assert!(Renderer::new(&mut device, &scene).is_err());
        assert_eq!(device.live_resources(), ResourceCounts::default());
    }

    #[test]
    fn release_keeps_going_after_a_failure() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut scene = scene();
        scene.rebuild_pins(&[Trip::new("a", 1.0, 2.0)]);
        let mut renderer = Renderer::new(&mut device, &scene).expect("renderer");
        renderer
            .apply_texture(&mut device, TextureSlot::Albedo, &DecodedTexture::solid(1, 1, [0; 4]))
            .expect("albedo");
        let pins = renderer.pin_instances().expect("pins").buffer;
        device.release_buffer(pins).expect("release behind the renderer's back");

        let err = renderer.release(&mut device).expect_err("pin buffer already gone");
        assert!(matches!(err, GpuError::UnknownBuffer(id) if id == pins));
        assert_eq!(device.live_resources(), ResourceCounts::default());
    }
}
