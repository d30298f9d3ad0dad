pub mod cadence;
pub mod event_bus;
pub mod frame;
pub mod observable;
pub mod scheduler;

pub use cadence::*;
pub use event_bus::*;
pub use frame::*;
pub use observable::*;
pub use scheduler::*;
