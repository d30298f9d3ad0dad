//! Interactive travel globe: camera, picking, tooltip projection and the
//! frame loop that ties them to a scene and a render device.

pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod interaction;
pub mod picker;
pub mod tooltip;

pub use camera::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use input::*;
pub use interaction::*;
pub use picker::*;
pub use tooltip::*;
