//! taskrt: a cooperative task and effect runtime for single-threaded hosts.
//!
//! # Overview
//!
//! Application logic describes asynchronous work as inert, composable
//! [`Task`] values. The runtime executes them as independently scheduled,
//! mailbox-equipped processes, sharing the host's one thread fairly with its
//! other duties (rendering, input) by working in bounded rounds and asking the
//! host to schedule the next one.
//!
//! Side effects are requested declaratively: a [`Bag`] of commands and
//! subscriptions is dispatched on every state change, flattened per category,
//! and handed to the [`EffectManager`] that owns each category. Managers are
//! processes too; they report results back to the application's mailbox
//! through a [`Router`].
//!
//! # Core Guarantees
//!
//! - **Flat host stack**: task chains of any depth are evaluated against an
//!   explicit per-process continuation stack
//! - **Bounded rounds**: one round never visits more task nodes than its budget
//! - **Exactly-once completion**: a `Bind` honours its first completion only;
//!   late completions after a kill or after the runtime is gone are no-ops
//! - **Isolated failures**: an unhandled failure ends only its own process
//!
//! # Module Structure
//!
//! - [`task`]: The task algebra and `Bind` completion handles
//! - [`runtime`]: Processes, the step engine, the round scheduler, config
//! - [`effect`]: Effect bags and flattening
//! - [`manager`]: Effect manager contract, registry and router
//! - [`program`]: Headless init / update / subscriptions programs
//! - [`types`]: Process ids, categories, messages
//! - [`error`]: Error types
//! - [`util`]: Generational arena

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod effect;
pub mod error;
pub mod manager;
pub mod program;
pub mod runtime;
pub mod task;
pub mod tracing_compat;
pub mod types;
pub mod util;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenient access to core types
pub use effect::{flatten, Bag, Effect, EffectKind, Effects, Tagger};
pub use error::{Error, ErrorCategory, ErrorKind, Result};
pub use manager::{EffectManager, ManagerKind, NoEffect, Router};
pub use program::{Launched, ModelCell, Program};
pub use runtime::{
    Host, ProcessState, RoundReport, Runtime, RuntimeBuilder, RuntimeConfig, RuntimeHandle,
};
pub use task::{CancelHook, Resolver, Task};
pub use types::{Category, Message, ProcessId};
