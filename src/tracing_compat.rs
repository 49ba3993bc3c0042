//! Logging facade used throughout the runtime.
//!
//! With the `tracing-integration` feature (on by default) the macros below are
//! the ones from the `tracing` crate. Without it they expand to nothing, so an
//! embedding host that does not want a logging dependency pays nothing for the
//! runtime's diagnostics.
//!
//! ```rust,ignore
//! use taskrt::tracing_compat::{debug, warn};
//!
//! debug!(process = %id, "process spawned");
//! warn!(category = %category, "no manager registered");
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    /// No-op trace-level logging macro.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// No-op debug-level logging macro.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// No-op info-level logging macro.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    /// No-op warn-level logging macro.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    /// No-op error-level logging macro.
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    pub use crate::{debug, error, info, trace, warn};
}

#[cfg(not(feature = "tracing-integration"))]
pub use noop::*;
