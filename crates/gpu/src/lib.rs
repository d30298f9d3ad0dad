pub mod device;
pub mod error;
pub mod mesh;
pub mod renderer;
pub mod textures;
#[cfg(feature = "wgpu")]
pub mod wgpu_device;

pub use device::*;
pub use error::*;
pub use renderer::*;
pub use textures::*;
#[cfg(feature = "wgpu")]
pub use wgpu_device::WgpuDevice;
