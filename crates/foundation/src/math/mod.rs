pub mod camera;
pub mod geo;
pub mod matrix;
pub mod precision;
pub mod vec;

pub use camera::*;
pub use geo::*;
pub use matrix::*;
pub use precision::*;
pub use vec::*;
