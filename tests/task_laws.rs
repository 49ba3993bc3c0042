//! Algebraic law property tests for the task algebra.
//!
//! # Laws Tested
//!
//! ## Monad Laws (observed through the step engine)
//! - left identity: `succeed(a).and_then(f)` behaves as `f(a)`
//! - right identity: `t.and_then(succeed)` behaves as `t`
//! - associativity of `and_then`
//!
//! ## Failure Laws
//! - `fail(e).and_then(f)` behaves as `fail(e)`
//! - `succeed(a).on_error(h)` behaves as `succeed(a)`
//! - random chains agree with a pure model of success/failure routing
//!
//! ## Depth
//! - 100 000-deep chains step and drop without growing the host stack

#[macro_use]
mod common;

use common::*;
use proptest::prelude::*;
use taskrt::{CancelHook, Task};

const DEEP: usize = 100_000;

fn run<E: 'static, A: 'static>(task: Task<E, A>) -> Option<Result<A, E>> {
    let mut runtime = headless_runtime();
    let pid = runtime.spawn(task);
    runtime.run_until_idle();
    runtime.take_exit::<E, A>(pid)
}

// ============================================================================
// Generators
// ============================================================================

/// One link of a random chain.
#[derive(Debug, Clone, Copy)]
enum Op {
    Add(i64),
    FailAbove(i64),
    Recover(i64),
    AsyncAdd(i64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-50_i64..50).prop_map(Op::Add),
        (-100_i64..100).prop_map(Op::FailAbove),
        (-50_i64..50).prop_map(Op::Recover),
        (-50_i64..50).prop_map(Op::AsyncAdd),
    ]
}

fn arb_start() -> impl Strategy<Value = Result<i64, i64>> {
    prop_oneof![
        (-100_i64..100).prop_map(Ok),
        (-100_i64..100).prop_map(Err),
    ]
}

fn start_task(start: Result<i64, i64>) -> Task<i64, i64> {
    Task::from_result(start)
}

fn apply_task(task: Task<i64, i64>, op: Op) -> Task<i64, i64> {
    match op {
        Op::Add(k) => task.map(move |x| x + k),
        Op::FailAbove(t) => {
            task.and_then(move |x| if x > t { Task::fail(x) } else { Task::succeed(x) })
        }
        Op::Recover(k) => task.on_error(move |e| Task::succeed(e + k)),
        Op::AsyncAdd(k) => task.and_then(move |x| {
            Task::bind(move |resolver| {
                resolver.succeed(x + k);
                None
            })
        }),
    }
}

fn apply_model(state: Result<i64, i64>, op: Op) -> Result<i64, i64> {
    match (state, op) {
        (Ok(x), Op::Add(k) | Op::AsyncAdd(k)) => Ok(x + k),
        (Ok(x), Op::FailAbove(t)) if x > t => Err(x),
        (Err(e), Op::Recover(k)) => Ok(e + k),
        (other, _) => other,
    }
}

fn kleisli(x: i64) -> Task<String, i64> {
    if x % 3 == 0 {
        Task::fail(format!("multiple of three: {x}"))
    } else {
        Task::succeed(x * 2)
    }
}

fn kleisli_g(x: i64) -> Task<String, i64> {
    if x < 0 {
        Task::fail("negative".to_string())
    } else {
        Task::succeed(x + 7)
    }
}

// ============================================================================
// Monad laws
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(64))]

    #[test]
    fn left_identity(a in -1_000_i64..1_000) {
        init_test_logging();
        let lhs = run(Task::<String, i64>::succeed(a).and_then(kleisli));
        let rhs = run(kleisli(a));
        prop_assert_eq!(lhs, rhs);
    }

    #[test]
    fn right_identity(start in arb_start()) {
        let start = start.map_err(|e| e.to_string());
        let lhs = run(Task::from_result(start.clone()).and_then(Task::succeed));
        let rhs = run(Task::from_result(start));
        prop_assert_eq!(lhs, rhs);
    }

    #[test]
    fn and_then_is_associative(a in -1_000_i64..1_000) {
        let lhs = run(Task::<String, i64>::succeed(a).and_then(kleisli).and_then(kleisli_g));
        let rhs = run(Task::<String, i64>::succeed(a).and_then(|x| kleisli(x).and_then(kleisli_g)));
        prop_assert_eq!(lhs, rhs);
    }

    #[test]
    fn failure_skips_and_then(e in any::<i32>()) {
        let lhs = run(Task::<i32, i64>::fail(e).and_then(|_| Task::succeed(0_i64)));
        prop_assert_eq!(lhs, Some(Err(e)));
    }

    #[test]
    fn success_skips_on_error(a in any::<i64>()) {
        let lhs = run(Task::<i32, i64>::succeed(a).on_error(|_| Task::<(), i64>::succeed(0)));
        prop_assert_eq!(lhs, Some(Ok(a)));
    }

    #[test]
    fn chains_match_pure_model(
        start in arb_start(),
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let task = ops.iter().fold(start_task(start), |task, op| apply_task(task, *op));
        let expected = ops.iter().fold(start, |state, op| apply_model(state, *op));
        prop_assert_eq!(run(task), Some(expected));
    }
}

// ============================================================================
// Depth
// ============================================================================

#[test]
fn deep_left_nested_and_then() {
    test_phase!("deep_left_nested_and_then");
    let mut task = Task::<(), u64>::succeed(0);
    for _ in 0..DEEP {
        task = task.map(|n| n + 1);
    }
    assert_eq!(run(task), Some(Ok(DEEP as u64)));
    test_complete!("deep_left_nested_and_then");
}

#[test]
fn deep_right_nested_recursion() {
    fn count_down(n: u64) -> Task<(), u64> {
        if n == 0 {
            Task::succeed(0)
        } else {
            Task::succeed(n).and_then(|n| count_down(n - 1).map(|acc| acc + 1))
        }
    }
    assert_eq!(run(count_down(DEEP as u64)), Some(Ok(DEEP as u64)));
}

#[test]
fn deep_on_error_chain() {
    let mut task = Task::<u64, ()>::fail(0);
    for _ in 0..DEEP {
        task = task.on_error(|e| Task::fail(e + 1));
    }
    assert_eq!(run(task), Some(Err(DEEP as u64)));
}

#[test]
fn success_unwinds_past_deep_on_error_frames() {
    let mut task = Task::<(), u64>::succeed(5);
    for _ in 0..DEEP {
        task = task.on_error(|()| -> Task<(), u64> { unreachable!("no failure to recover") });
    }
    assert_eq!(run(task), Some(Ok(5)));
}

#[test]
fn deep_chains_drop_unrun() {
    let mut task = Task::<(), u64>::succeed(0);
    for i in 0..DEEP {
        task = if i % 2 == 0 {
            task.map(|n| n + 1)
        } else {
            task.on_error(|()| Task::succeed(0))
        };
    }
    drop(task);
}

#[test]
fn deep_continuation_stack_drops_with_runtime() {
    let mut runtime = headless_runtime();
    let mut task = Task::<(), u64>::receive(|_| Task::succeed(0));
    for _ in 0..DEEP {
        task = task.map(|n| n + 1);
    }
    let pid = runtime.spawn(task);
    runtime.run_until_idle();
    assert!(runtime
        .status(pid)
        .is_some_and(|state| !state.is_terminal()));
    drop(runtime);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn unhandled_failure_ends_only_its_process() {
    init_test_logging();
    let mut runtime = headless_runtime();
    let failing = runtime.spawn(Task::<String, ()>::fail("boom".into()));
    let healthy = runtime.spawn(Task::<String, i32>::succeed(1).map(|n| n + 1));
    runtime.run_until_idle();
    assert_eq!(
        runtime.take_exit::<String, ()>(failing),
        Some(Err("boom".to_string()))
    );
    assert_eq!(runtime.take_exit::<String, i32>(healthy), Some(Ok(2)));
}

#[test]
fn failure_inside_bind_routes_to_on_error() {
    let task = Task::<String, i32>::bind(|resolver| {
        resolver.fail("async failure".into());
        None::<CancelHook>
    })
    .on_error(|e: String| Task::<(), i32>::succeed(i32::try_from(e.len()).unwrap_or(0)));
    assert_eq!(run(task), Some(Ok(13)));
}
