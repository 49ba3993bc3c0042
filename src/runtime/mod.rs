//! Runtime state and scheduling.
//!
//! This module contains the core runtime machinery:
//!
//! - [`config`]: Runtime configuration types
//! - [`builder`]: Runtime builder, the runtime itself, and weak handles
//! - [`env_config`]: Environment variable and TOML overrides
//! - [`host`]: The host's "yield and resume" primitive
//! - [`process`]: Process lifecycle states
//! - [`scheduler`]: FIFO ready queue
//!
//! # Runtime Builder
//!
//! The runtime is configured with a fluent, move-based builder API. Each
//! builder method consumes `self` and returns an updated builder.
//!
//! ## Headless
//!
//! ```
//! use taskrt::{RuntimeBuilder, Task};
//!
//! let mut runtime = RuntimeBuilder::headless().build().unwrap();
//! let pid = runtime.spawn(Task::<(), u32>::succeed(7).map(|n| n * 6));
//! runtime.run_until_idle();
//! assert_eq!(runtime.take_exit::<(), u32>(pid), Some(Ok(42)));
//! ```
//!
//! ## Embedded in a host loop
//!
//! ```
//! use std::rc::Rc;
//! use taskrt::runtime::ManualHost;
//! use taskrt::{RuntimeBuilder, Task};
//!
//! let host = Rc::new(ManualHost::new());
//! let mut runtime = RuntimeBuilder::interactive(host.clone()).build().unwrap();
//! runtime.spawn(Task::<(), ()>::succeed(()));
//!
//! // One turn of the host's event loop.
//! while host.take_request() {
//!     runtime.run_round();
//! }
//! assert!(runtime.is_idle());
//! ```
//!
//! ## Environment Overrides
//!
//! ```ignore
//! use taskrt::RuntimeBuilder;
//!
//! // TASKRT_ROUND_BUDGET=64 TASKRT_MAX_DRAIN_ROUNDS=10
//! let runtime = RuntimeBuilder::from_env()?.build()?;
//! ```

pub mod builder;
pub mod config;
pub mod env_config;
pub mod host;
pub mod process;
pub mod scheduler;
pub(crate) mod state;
mod step;

pub use builder::{RoundReport, Runtime, RuntimeBuilder, RuntimeHandle};
pub use config::{FailureHook, RuntimeConfig};
pub use env_config::ConfigError;
pub use host::{Host, ManualHost, NoopHost};
pub use process::ProcessState;
pub use scheduler::ReadyQueue;
