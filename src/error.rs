//! Error types for taskrt.
//!
//! Runtime errors are deliberately few. Task-level failures are ordinary
//! values flowing through [`Task`](crate::task::Task) and never surface here;
//! what remains are bring-up mistakes (a malformed manager registration, a
//! dispatch before the managers exist) and configuration problems.
//!
//! # Error Categories
//!
//! - **Registration**: duplicate category, registration after start
//! - **Lifecycle**: managers not started, runtime already dropped
//! - **Config**: invalid configuration values or unreadable config files

use core::fmt;

use crate::types::{Category, ProcessId};

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Registration ===
    /// A manager for this category is already registered.
    DuplicateCategory,
    /// Managers were already started; the registry is frozen.
    RegistryFrozen,

    // === Lifecycle ===
    /// Effects were dispatched before the managers were started.
    ManagersNotStarted,
    /// The process id does not name a live process.
    UnknownProcess,
    /// The runtime behind a handle has been dropped.
    RuntimeDropped,

    // === Config ===
    /// A configuration value could not be parsed or is out of range.
    InvalidConfig,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateCategory | Self::RegistryFrozen => ErrorCategory::Registration,
            Self::ManagersNotStarted | Self::UnknownProcess | Self::RuntimeDropped => {
                ErrorCategory::Lifecycle
            }
            Self::InvalidConfig => ErrorCategory::Config,
        }
    }

    /// Returns true if this kind is a programming error that should abort
    /// application bring-up rather than be handled.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateCategory | Self::RegistryFrozen)
    }
}

/// High-level error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Manager registration errors.
    Registration,
    /// Runtime or process lifecycle errors.
    Lifecycle,
    /// Configuration errors.
    Config,
}

/// The main error type for taskrt operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns true if this error should abort bring-up.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// A second registration for `category`.
    #[must_use]
    pub fn duplicate_category(category: &Category) -> Self {
        Self::new(ErrorKind::DuplicateCategory)
            .with_message(format!("effect manager `{category}` registered twice"))
    }

    /// Registration attempted after the managers were started.
    #[must_use]
    pub fn registry_frozen(category: &Category) -> Self {
        Self::new(ErrorKind::RegistryFrozen).with_message(format!(
            "cannot register `{category}`: managers already started"
        ))
    }

    /// `process` does not name a live process.
    #[must_use]
    pub fn unknown_process(process: ProcessId) -> Self {
        Self::new(ErrorKind::UnknownProcess).with_message(format!("no live process {process}"))
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig).with_message(detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// A specialized Result type for taskrt operations.
pub type Result<T> = core::result::Result<T, Error>;
