//! Runtime builder and handles.

use core::fmt;
use std::rc::{Rc, Weak};

use super::config::RuntimeConfig;
use super::env_config;
use super::host::{Host, NoopHost};
use super::process::ProcessState;
use super::state::{self, Shared};
use super::step::step;
use crate::effect::{flatten, Bag};
use crate::error::Result;
use crate::manager::{self, EffectManager};
use crate::program::{self, Launched, Program};
use crate::task::Task;
use crate::tracing_compat::{debug, trace, warn};
use crate::types::{Category, Message, ProcessId};

/// Builder for constructing a runtime with custom configuration.
#[derive(Clone)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    host: Rc<dyn Host>,
}

impl RuntimeBuilder {
    /// Create a new builder with default configuration and a no-op host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            host: Rc::new(NoopHost),
        }
    }

    /// Set the number of task nodes visited per round.
    #[must_use]
    pub fn round_budget(mut self, budget: usize) -> Self {
        self.config.round_budget = budget;
        self
    }

    /// Set the round cap for [`Runtime::run_until_idle`].
    #[must_use]
    pub fn max_drain_rounds(mut self, rounds: usize) -> Self {
        self.config.max_drain_rounds = rounds;
        self
    }

    /// Register a diagnostic hook for failures no `on_error` handled.
    #[must_use]
    pub fn on_unhandled_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(ProcessId, &dyn std::any::Any) + 'static,
    {
        self.config.on_unhandled_failure = Some(Rc::new(f));
        self
    }

    /// Set the host that receives round requests.
    #[must_use]
    pub fn host(mut self, host: Rc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    /// Apply `TASKRT_*` environment overrides on top of the current settings.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        env_config::apply_env_overrides(&mut self.config)?;
        Ok(self)
    }

    /// Create a builder from defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::new().with_env_overrides()
    }

    /// Create a builder from a TOML config file.
    #[cfg(feature = "config-file")]
    pub fn from_toml(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let parsed = env_config::parse_toml_file(path.as_ref())?;
        let mut builder = Self::new();
        env_config::apply_toml_config(&mut builder.config, &parsed);
        Ok(builder)
    }

    /// Create a builder from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let parsed = env_config::parse_toml_str(toml)?;
        let mut builder = Self::new();
        env_config::apply_toml_config(&mut builder.config, &parsed);
        Ok(builder)
    }

    /// Build a runtime from this configuration.
    pub fn build(self) -> Result<Runtime> {
        Runtime::with_config(self.config, self.host)
    }

    /// Preset for drivers that call `run_until_idle` themselves.
    #[must_use]
    pub fn headless() -> Self {
        Self::new()
    }

    /// Preset for hosts that also render: short rounds keep frames responsive.
    #[must_use]
    pub fn interactive(host: Rc<dyn Host>) -> Self {
        Self::new().round_budget(200).host(host)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// What one round did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Task nodes visited, never more than the round budget.
    pub nodes_visited: usize,
    /// Processes taken off the ready queue and stepped.
    pub processes_stepped: usize,
    /// True if ready work was left for a later round.
    pub deferred: bool,
}

/// A cooperative runtime instance created from a [`RuntimeBuilder`].
///
/// The runtime never runs on its own: the host calls [`run_round`] when
/// asked to through [`Host::request_round`], or a headless driver calls
/// [`run_until_idle`].
///
/// [`run_round`]: Runtime::run_round
/// [`run_until_idle`]: Runtime::run_until_idle
pub struct Runtime {
    shared: Rc<Shared>,
}

impl Runtime {
    /// Construct a runtime from the given configuration.
    pub fn with_config(mut config: RuntimeConfig, host: Rc<dyn Host>) -> Result<Self> {
        config.normalize();
        debug!(?config, "runtime created");
        Ok(Self {
            shared: Rc::new(Shared::new(config, host)),
        })
    }

    /// Returns the runtime configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Returns a weak handle for use outside the runtime's owner.
    #[must_use]
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle::from_weak(Rc::downgrade(&self.shared))
    }

    // === Processes ===

    /// Spawns `task` as a new process.
    ///
    /// The exit value is kept until [`take_exit`](Self::take_exit) or
    /// [`reap`](Self::reap) is called.
    pub fn spawn<E: 'static, A: 'static>(&mut self, task: Task<E, A>) -> ProcessId {
        self.shared.spawn_raw(task.into_raw(), true)
    }

    /// Delivers `msg` to the mailbox of `process`.
    ///
    /// Returns false, dropping the message, if the process has exited.
    pub fn send<M: 'static>(&mut self, process: ProcessId, msg: M) -> bool {
        self.shared.deliver(process, Message::new(msg))
    }

    /// Delivers an already wrapped message.
    pub fn deliver(&mut self, process: ProcessId, msg: Message) -> bool {
        self.shared.deliver(process, msg)
    }

    /// Kills `process`, firing its outstanding cancel hook if it has one.
    ///
    /// Returns false if the process had already exited.
    pub fn kill(&mut self, process: ProcessId) -> bool {
        self.shared.kill(process)
    }

    /// Returns the state of `process`, or `None` once it has been reaped.
    #[must_use]
    pub fn status(&self, process: ProcessId) -> Option<ProcessState> {
        self.shared.status(process)
    }

    /// Takes the exit value of a finished process and forgets the process.
    ///
    /// Returns `None` if the process is still live, was killed, was reaped,
    /// or exited with values of other types.
    pub fn take_exit<E: 'static, A: 'static>(
        &mut self,
        process: ProcessId,
    ) -> Option<core::result::Result<A, E>> {
        self.shared.take_exit::<E, A>(process)
    }

    /// Forgets an exited process without looking at its exit value.
    pub fn reap(&mut self, process: ProcessId) -> bool {
        self.shared.reap(process)
    }

    /// Returns the number of process records, live or retained.
    #[must_use]
    pub fn process_count(&self) -> usize {
        self.shared.process_count()
    }

    /// Returns the number of processes waiting to be stepped.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.shared.ready_len()
    }

    /// Returns true if no process is ready to run.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.ready_len() == 0
    }

    // === Scheduling ===

    /// Runs one bounded round.
    ///
    /// Steps ready processes in queue order until the queue drains or the
    /// round budget is spent. A process that exhausts the remaining budget
    /// goes to the back of the queue and continues in a later round, which
    /// is requested from the host.
    pub fn run_round(&mut self) -> RoundReport {
        let budget = self.shared.config.round_budget;
        let mut report = RoundReport::default();
        self.shared.begin_round();
        while report.nodes_visited < budget {
            let Some(pid) = self.shared.pop_ready() else {
                break;
            };
            report.nodes_visited += step(&self.shared, pid, budget - report.nodes_visited);
            report.processes_stepped += 1;
        }
        report.deferred = self.shared.end_round();
        trace!(
            nodes = report.nodes_visited,
            processes = report.processes_stepped,
            deferred = report.deferred,
            "round finished"
        );
        report
    }

    /// Runs rounds back to back until no process is ready.
    ///
    /// Stops after `max_drain_rounds` rounds even if work remains, and
    /// returns the number of rounds run.
    pub fn run_until_idle(&mut self) -> usize {
        let max = self.shared.config.max_drain_rounds;
        let mut rounds = 0;
        while rounds < max && !self.is_idle() {
            self.run_round();
            rounds += 1;
        }
        if !self.is_idle() {
            warn!(rounds, ready = self.ready_len(), "round cap reached with work remaining");
        }
        rounds
    }

    // === Effect managers ===

    /// Registers an effect manager for its category.
    ///
    /// Fails if the category is already registered or the managers have
    /// started.
    pub fn register<M: EffectManager>(&mut self, manager: M) -> Result<()> {
        manager::register(&self.shared, manager)
    }

    /// Starts every registered manager with `owner` receiving their results.
    pub fn start_managers(&mut self, owner: ProcessId) -> Result<()> {
        manager::start(&self.shared, owner)
    }

    /// Returns the process running the manager for `category`.
    #[must_use]
    pub fn manager_process(&self, category: &Category) -> Option<ProcessId> {
        self.shared
            .with_state(|state| state.registry.process(category))
    }

    /// Returns the number of registered managers.
    #[must_use]
    pub fn manager_count(&self) -> usize {
        self.shared.with_state(|state| state.registry.len())
    }

    /// Flattens `bag` and sends every manager its share.
    pub fn dispatch<Msg: 'static>(&mut self, bag: &Bag<Msg>) -> Result<()> {
        manager::dispatch(&self.shared, flatten(bag))
    }

    /// Runs `program` as the application process and starts the managers.
    pub fn launch<Model: 'static, Msg: 'static>(
        &mut self,
        program: Program<Model, Msg>,
    ) -> Result<Launched<Model>> {
        program::launch(&self.shared, program)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.shared.config)
            .field("processes", &self.process_count())
            .field("ready", &self.ready_len())
            .finish()
    }
}

/// A weak handle to a runtime.
///
/// Handed to resolvers and routers so that code outside the runtime's owner
/// can spawn, send and kill. Every operation is a no-op (or an error) once
/// the runtime has been dropped.
#[derive(Clone)]
pub struct RuntimeHandle {
    shared: Weak<Shared>,
}

impl RuntimeHandle {
    pub(crate) fn from_weak(shared: Weak<Shared>) -> Self {
        Self { shared }
    }

    /// Spawns `task` as an independent process whose exit is not retained.
    pub fn spawn_detached<E: 'static, A: 'static>(&self, task: Task<E, A>) -> Result<ProcessId> {
        let shared = state::upgrade(&self.shared)?;
        Ok(shared.spawn_raw(task.into_raw(), false))
    }

    /// Delivers `msg` to the mailbox of `process`.
    pub fn send<M: 'static>(&self, process: ProcessId, msg: M) -> bool {
        self.deliver(process, Message::new(msg))
    }

    /// Delivers an already wrapped message.
    pub fn deliver(&self, process: ProcessId, msg: Message) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.deliver(process, msg))
    }

    /// Kills `process`. Returns false if it had already exited.
    pub fn kill(&self, process: ProcessId) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.kill(process))
    }

    /// Returns the state of `process`.
    #[must_use]
    pub fn status(&self, process: ProcessId) -> Option<ProcessState> {
        self.shared.upgrade()?.status(process)
    }

    /// Flattens `bag` and sends every manager its share.
    pub fn dispatch<Msg: 'static>(&self, bag: &Bag<Msg>) -> Result<()> {
        let shared = state::upgrade(&self.shared)?;
        manager::dispatch(&shared, flatten(bag))
    }

    /// Returns true while the runtime is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
