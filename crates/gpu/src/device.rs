use std::collections::BTreeMap;

use tracing::trace;

use crate::error::GpuError;
use crate::renderer::{RenderCommand, RenderFrame};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Instance,
}

#[derive(Debug, Copy, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    pub contents: &'a [u8],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureFormat {
    /// Color data.
    Rgba8Srgb,
    /// Roughness and normal maps.
    Rgba8Linear,
}

#[derive(Debug, Copy, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub rgba: &'a [u8],
}

impl TextureDesc<'_> {
    pub fn validate(&self) -> Result<(), GpuError> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.rgba.len() != expected || expected == 0 {
            return Err(GpuError::TextureSize {
                width: self.width,
                height: self.height,
                expected,
                actual: self.rgba.len(),
            });
        }
        Ok(())
    }
}

/// The fixed set of shading programs the globe needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgramKind {
    /// Lit, optionally textured globe surface.
    Surface,
    /// Additive back-face rim glow.
    Atmosphere,
    Starfield,
    /// Unlit instanced pin parts.
    Pin,
}

#[derive(Debug, Copy, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub kind: ProgramKind,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub buffers: usize,
    pub textures: usize,
    pub programs: usize,
}

impl ResourceCounts {
    pub fn total(&self) -> usize {
        self.buffers + self.textures + self.programs
    }
}

/// Owner of GPU-resident objects.
///
/// Every `create_*` must eventually be paired with its `release_*`; the
/// renderer does this on resync and on teardown.
pub trait RenderDevice {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, GpuError>;
    fn release_buffer(&mut self, id: BufferId) -> Result<(), GpuError>;

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, GpuError>;
    fn release_texture(&mut self, id: TextureId) -> Result<(), GpuError>;

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, GpuError>;
    fn release_program(&mut self, id: ProgramId) -> Result<(), GpuError>;

    fn resize(&mut self, width: u32, height: u32);

    fn draw(&mut self, frame: &RenderFrame) -> Result<(), GpuError>;

    fn live_resources(&self) -> ResourceCounts;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    pub label: String,
    pub usage: BufferUsage,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Bookkeeping-only device.
///
/// Tracks every live object and validates that each draw references only
/// live ones, which is what tests and the native viewer need.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u64,
    buffers: BTreeMap<BufferId, BufferInfo>,
    textures: BTreeMap<TextureId, TextureInfo>,
    programs: BTreeMap<ProgramId, ProgramKind>,
    size: (u32, u32),
    frames_drawn: u64,
    last_frame: Option<RenderFrame>,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Self::default()
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn last_frame(&self) -> Option<&RenderFrame> {
        self.last_frame.as_ref()
    }

    pub fn buffer(&self, id: BufferId) -> Option<&BufferInfo> {
        self.buffers.get(&id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureInfo> {
        self.textures.get(&id)
    }

    pub fn program(&self, id: ProgramId) -> Option<ProgramKind> {
        self.programs.get(&id).copied()
    }

    fn check_buffer(&self, id: BufferId) -> Result<(), GpuError> {
        if self.buffers.contains_key(&id) {
            Ok(())
        } else {
            Err(GpuError::UnknownBuffer(id))
        }
    }

    fn check_program(&self, id: ProgramId) -> Result<(), GpuError> {
        if self.programs.contains_key(&id) {
            Ok(())
        } else {
            Err(GpuError::UnknownProgram(id))
        }
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, GpuError> {
        let id = BufferId(self.next());
        self.buffers.insert(
            id,
            BufferInfo {
                label: desc.label.to_owned(),
                usage: desc.usage,
                len: desc.contents.len(),
            },
        );
        trace!(?id, label = desc.label, len = desc.contents.len(), "create buffer");
        Ok(id)
    }

    fn release_buffer(&mut self, id: BufferId) -> Result<(), GpuError> {
        self.buffers
            .remove(&id)
            .map(|_| ())
            .ok_or(GpuError::UnknownBuffer(id))
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, GpuError> {
        desc.validate()?;
        let id = TextureId(self.next());
        self.textures.insert(
            id,
            TextureInfo {
                label: desc.label.to_owned(),
                width: desc.width,
                height: desc.height,
                format: desc.format,
            },
        );
        trace!(?id, label = desc.label, "create texture");
        Ok(id)
    }

    fn release_texture(&mut self, id: TextureId) -> Result<(), GpuError> {
        self.textures
            .remove(&id)
            .map(|_| ())
            .ok_or(GpuError::UnknownTexture(id))
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, GpuError> {
        let id = ProgramId(self.next());
        self.programs.insert(id, desc.kind);
        trace!(?id, label = desc.label, "create program");
        Ok(id)
    }

    fn release_program(&mut self, id: ProgramId) -> Result<(), GpuError> {
        self.programs
            .remove(&id)
            .map(|_| ())
            .ok_or(GpuError::UnknownProgram(id))
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn draw(&mut self, frame: &RenderFrame) -> Result<(), GpuError> {
        for command in &frame.commands {
            match command {
                RenderCommand::Mesh {
                    program,
                    mesh,
                    instances,
                    material,
                } => {
                    self.check_program(*program)?;
                    self.check_buffer(mesh.vertices)?;
                    self.check_buffer(mesh.indices)?;
                    if let Some(instances) = instances {
                        self.check_buffer(instances.buffer)?;
                    }
                    for texture in material.textures() {
                        if !self.textures.contains_key(&texture) {
                            return Err(GpuError::UnknownTexture(texture));
                        }
                    }
                }
                RenderCommand::Points {
                    program, vertices, ..
                } => {
                    self.check_program(*program)?;
                    self.check_buffer(*vertices)?;
                }
            }
        }
        self.frames_drawn += 1;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn live_resources(&self) -> ResourceCounts {
        ResourceCounts {
            buffers: self.buffers.len(),
            textures: self.textures.len(),
            programs: self.programs.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BufferDesc, BufferUsage, HeadlessDevice, ProgramDesc, ProgramKind, RenderDevice,
        ResourceCounts, TextureDesc, TextureFormat,
    };
    use crate::error::GpuError;

    #[test]
    fn tracks_live_objects() {
        let mut device = HeadlessDevice::new(640, 480);
        let buffer = device
            .create_buffer(&BufferDesc {
                label: "b",
                usage: BufferUsage::Vertex,
                contents: &[0u8; 12],
            })
            .expect("buffer");
        let program = device
            .create_program(&ProgramDesc {
                label: "p",
                kind: ProgramKind::Surface,
            })
            .expect("program");
        assert_eq!(
            device.live_resources(),
            ResourceCounts {
                buffers: 1,
                textures: 0,
                programs: 1,
            }
        );
        assert_eq!(device.buffer(buffer).map(|b| b.len), Some(12));

        device.release_buffer(buffer).expect("release");
        device.release_program(program).expect("release");
        assert_eq!(device.live_resources().total(), 0);
        assert!(matches!(
            device.release_buffer(buffer),
            Err(GpuError::UnknownBuffer(_))
        ));
    }

    #[test]
    fn rejects_texture_with_wrong_byte_count() {
        let mut device = HeadlessDevice::new(1, 1);
        let err = device
            .create_texture(&TextureDesc {
                label: "t",
                width: 2,
                height: 2,
                format: TextureFormat::Rgba8Srgb,
                rgba: &[0u8; 4],
            })
            .expect_err("size mismatch");
        assert!(matches!(err, GpuError::TextureSize { expected: 16, .. }));
    }
}
