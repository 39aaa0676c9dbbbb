//! Task dispatch for batch game execution.
//!
//! Workers pull task indices from a shared atomic counter until the list
//! is exhausted; one task is one full game. With a single thread the tasks
//! run on the caller's thread in order. A panic inside a task is caught at
//! the task boundary so the remaining games still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, error};

/// Run `run` once for every task, using up to `num_threads` worker threads.
pub fn run_tasks<T, F>(tasks: &[T], num_threads: usize, run: F)
where
    T: Sync,
    F: Fn(&T) + Sync,
{
    if tasks.is_empty() {
        return;
    }

    let thread_count = num_threads.clamp(1, tasks.len());
    if thread_count == 1 {
        for task in tasks {
            run_guarded(task, &run);
        }
        return;
    }

    debug!("dispatching {} tasks across {thread_count} threads", tasks.len());
    let next = AtomicUsize::new(0);
    thread::scope(|scope| {
        for _ in 0..thread_count {
            scope.spawn(|| loop {
                let idx = next.fetch_add(1, Ordering::Relaxed);
                if idx >= tasks.len() {
                    break;
                }
                run_guarded(&tasks[idx], &run);
            });
        }
    });
}

fn run_guarded<T, F>(task: &T, run: &F)
where
    F: Fn(&T),
{
    if catch_unwind(AssertUnwindSafe(|| run(task))).is_err() {
        error!("a game task panicked; continuing with the remaining tasks");
    }
}
