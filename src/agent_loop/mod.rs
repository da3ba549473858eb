//! Agent loop primitives (turn controller, events, run types).

pub mod events;
pub mod runner;
pub mod types;

pub use events::*;
pub use runner::*;
pub use types::*;
