//! Core types for Helm.

pub mod generation;
pub mod message;

pub use generation::*;
pub use message::*;
