//! Application layer: the engine façade.

pub mod engine;

pub use engine::{Engine, Repositories};
