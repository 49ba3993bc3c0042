//! Headless application programs.
//!
//! A [`Program`] is the init / update / subscriptions triple of an
//! application with no view. [`Runtime::launch`](crate::Runtime::launch) runs
//! it as a process that owns the registered managers:
//!
//! 1. `init` produces the first model and commands.
//! 2. The managers start with the application process as their owner.
//! 3. Every message the application receives goes through `update`; the
//!    returned commands plus the fresh `subscriptions` of the new model are
//!    dispatched to the managers, whose results come back as messages.

use core::fmt;
use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use crate::effect::Bag;
use crate::error::Result;
use crate::runtime::state::Shared;
use crate::runtime::RuntimeHandle;
use crate::task::Task;
use crate::tracing_compat::{debug, warn};
use crate::types::ProcessId;

type Init<Model, Msg> = Box<dyn FnOnce() -> (Model, Bag<Msg>)>;
type Update<Model, Msg> = Rc<dyn Fn(Msg, Model) -> (Model, Bag<Msg>)>;
type Subscriptions<Model, Msg> = Rc<dyn Fn(&Model) -> Bag<Msg>>;

/// An application without a view.
pub struct Program<Model, Msg> {
    init: Init<Model, Msg>,
    update: Update<Model, Msg>,
    subscriptions: Subscriptions<Model, Msg>,
}

impl<Model: 'static, Msg: 'static> Program<Model, Msg> {
    /// Assembles a program from its three functions.
    pub fn new<I, U, S>(init: I, update: U, subscriptions: S) -> Self
    where
        I: FnOnce() -> (Model, Bag<Msg>) + 'static,
        U: Fn(Msg, Model) -> (Model, Bag<Msg>) + 'static,
        S: Fn(&Model) -> Bag<Msg> + 'static,
    {
        Self {
            init: Box::new(init),
            update: Rc::new(update),
            subscriptions: Rc::new(subscriptions),
        }
    }
}

impl<Model, Msg> fmt::Debug for Program<Model, Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program").finish_non_exhaustive()
    }
}

/// Shared view of a running program's latest model.
///
/// Empty only while `update` is running.
pub struct ModelCell<Model>(Rc<RefCell<Option<Model>>>);

impl<Model> ModelCell<Model> {
    fn new(model: Model) -> Self {
        Self(Rc::new(RefCell::new(Some(model))))
    }

    fn take(&self) -> Option<Model> {
        self.0.borrow_mut().take()
    }

    fn put(&self, model: Model) {
        *self.0.borrow_mut() = Some(model);
    }

    /// Runs `f` on the current model.
    pub fn with<R>(&self, f: impl FnOnce(&Model) -> R) -> Option<R> {
        self.0.borrow().as_ref().map(f)
    }

    /// Returns a copy of the current model.
    #[must_use]
    pub fn get(&self) -> Option<Model>
    where
        Model: Clone,
    {
        self.0.borrow().clone()
    }
}

impl<Model> Clone for ModelCell<Model> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<Model: fmt::Debug> fmt::Debug for ModelCell<Model> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelCell").field(&self.0.borrow()).finish()
    }
}

/// A launched program.
#[derive(Debug)]
pub struct Launched<Model> {
    /// The application process; managers report to it.
    pub process: ProcessId,
    /// The latest model.
    pub model: ModelCell<Model>,
}

struct Loop<Model, Msg> {
    update: Update<Model, Msg>,
    subscriptions: Subscriptions<Model, Msg>,
    model: ModelCell<Model>,
    handle: RuntimeHandle,
}

fn serve<Model: 'static, Msg: 'static>(app: Rc<Loop<Model, Msg>>) -> Task<Infallible, ()> {
    Task::receive(move |msg| {
        match msg.downcast::<Msg>() {
            Ok(msg) => {
                if let Some(model) = app.model.take() {
                    let (model, commands) = (app.update)(msg, model);
                    let subscriptions = (app.subscriptions)(&model);
                    app.model.put(model);
                    if let Err(err) = app.handle.dispatch(&Bag::batch([commands, subscriptions])) {
                        warn!(error = %err, "dispatch after update failed");
                    }
                }
            }
            Err(other) => {
                warn!(message = ?other, "application received a message of another type");
            }
        }
        serve(app)
    })
}

pub(crate) fn launch<Model: 'static, Msg: 'static>(
    shared: &Rc<Shared>,
    program: Program<Model, Msg>,
) -> Result<Launched<Model>> {
    let Program {
        init,
        update,
        subscriptions,
    } = program;
    let handle = RuntimeHandle::from_weak(Rc::downgrade(shared));
    let (model, commands) = init();
    let initial = Bag::batch([commands, subscriptions(&model)]);
    let app = Rc::new(Loop {
        update,
        subscriptions,
        model: ModelCell::new(model),
        handle: handle.clone(),
    });
    let model = app.model.clone();
    let process = shared.spawn_raw(serve(app).into_raw(), true);
    if let Err(err) = crate::manager::start(shared, process) {
        warn!(process = %process, error = %err, "program failed to start its managers");
        shared.kill(process);
        shared.reap(process);
        return Err(err);
    }
    debug!(process = %process, "program launched");
    handle.dispatch(&initial)?;
    Ok(Launched { process, model })
}
