//! Runtime configuration types.
//!
//! In most cases use [`RuntimeBuilder`](super::builder::RuntimeBuilder) rather
//! than filling in a [`RuntimeConfig`] directly.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `round_budget` | 1000 node visits |
//! | `max_drain_rounds` | 100 000 rounds |
//! | `on_unhandled_failure` | `None` |

use core::fmt;
use std::any::Any;
use std::rc::Rc;

use crate::types::ProcessId;

/// Default number of task nodes visited per round.
pub const DEFAULT_ROUND_BUDGET: usize = 1_000;

/// Default cap on rounds run by one `run_until_idle` call.
pub const DEFAULT_MAX_DRAIN_ROUNDS: usize = 100_000;

/// Observer for failures that reach a process boundary unhandled.
///
/// Receives the process id and the erased failure value. Purely diagnostic:
/// the failing process has already ended and nothing is restarted.
pub type FailureHook = Rc<dyn Fn(ProcessId, &dyn Any)>;

/// Runtime configuration.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Total task nodes one round may visit before yielding to the host.
    pub round_budget: usize,
    /// Upper bound on rounds for one `run_until_idle` call.
    pub max_drain_rounds: usize,
    /// Optional diagnostic hook for unhandled task failures.
    pub on_unhandled_failure: Option<FailureHook>,
}

impl RuntimeConfig {
    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        if self.round_budget == 0 {
            self.round_budget = 1;
        }
        if self.max_drain_rounds == 0 {
            self.max_drain_rounds = 1;
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            round_budget: DEFAULT_ROUND_BUDGET,
            max_drain_rounds: DEFAULT_MAX_DRAIN_ROUNDS,
            on_unhandled_failure: None,
        }
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("round_budget", &self.round_budget)
            .field("max_drain_rounds", &self.max_drain_rounds)
            .field(
                "on_unhandled_failure",
                &self.on_unhandled_failure.as_ref().map(|_| "<hook>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn default_config_sane() {
        init_test("default_config_sane");
        let config = RuntimeConfig::default();
        crate::assert_with_log!(
            config.round_budget == DEFAULT_ROUND_BUDGET,
            "round_budget",
            DEFAULT_ROUND_BUDGET,
            config.round_budget
        );
        crate::assert_with_log!(
            config.on_unhandled_failure.is_none(),
            "on_unhandled_failure",
            "None",
            format!("{config:?}")
        );
    }

    #[test]
    fn normalize_fixes_zero_values() {
        init_test("normalize_fixes_zero_values");
        let mut config = RuntimeConfig {
            round_budget: 0,
            max_drain_rounds: 0,
            on_unhandled_failure: None,
        };
        config.normalize();
        assert_eq!(config.round_budget, 1);
        assert_eq!(config.max_drain_rounds, 1);
    }

    #[test]
    fn debug_hides_hook_body() {
        let config = RuntimeConfig {
            on_unhandled_failure: Some(Rc::new(|_, _| {})),
            ..RuntimeConfig::default()
        };
        assert!(format!("{config:?}").contains("<hook>"));
    }
}
