use std::path::PathBuf;

use crate::device::{BufferId, ProgramId, TextureId};

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureId),
    #[error("unknown program {0:?}")]
    UnknownProgram(ProgramId),
    #[error("texture data is {actual} bytes, expected {expected} for {width}x{height} rgba8")]
    TextureSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(String),
    #[error("GPU backend error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to read texture {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture loader went away before completing")]
    Disconnected,
}
