pub mod graph;
pub mod picking;
pub mod pins;
pub mod prefabs;
pub mod spatial;
pub mod trip;

pub use graph::*;
pub use pins::*;
pub use trip::*;
