//! Internal utilities for the runtime.

pub mod arena;

pub use arena::{Arena, ArenaIndex};
