pub mod bounds;
pub mod handles;
pub mod ids;
pub mod math;

// Math lives under `math::` and is not flattened here.
pub use bounds::*;
pub use handles::*;
pub use ids::*;
