//! Cooperative, single-threaded-in-spirit task scheduler (§4.2, §11).
//!
//! Every STM suspension point — `yield` itself and `retry`'s wait loop — is
//! mediated through this module. §11 explains why each task gets its own OS
//! thread: Rust has no stable, safe way to suspend an arbitrary function
//! mid-body and resume it later short of giving it its own call stack. The
//! scheduler hands a single logical "turn" (a baton) between those threads,
//! so only one of them is ever running un-parked code, which is what makes
//! the whole thing deterministic and indistinguishable from a true
//! single-threaded interleaving.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use log::trace;
use parking_lot::{Condvar, Mutex};

use crate::fresh::{FreshId, Id};

/// A single-use hand-off point: one task waits on it, another grants it.
struct Ticket {
    ready: Mutex<bool>,
    woken: Condvar,
}

impl Ticket {
    fn new() -> Arc<Ticket> {
        Arc::new(Ticket {
            ready: Mutex::new(false),
            woken: Condvar::new(),
        })
    }

    fn wait_for_turn(&self) {
        let mut ready = self.ready.lock();
        while !*ready {
            self.woken.wait(&mut ready);
        }
        *ready = false;
    }

    fn grant_turn(&self) {
        let mut ready = self.ready.lock();
        *ready = true;
        self.woken.notify_one();
    }
}

struct Shared {
    fresh: FreshId,
    ready_queue: Mutex<VecDeque<Arc<Ticket>>>,
    spawned: Mutex<Vec<thread::JoinHandle<()>>>,
}

/// Handle to a running cooperative schedule (§4.2).
///
/// Cloning a `Scheduler` does not create a new schedule; all clones refer to
/// the same ready queue and baton. Every STM-facing API (`atomic`, `retry`'s
/// wait loop) is implemented purely in terms of [`Scheduler::yield_now`].
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

/// Sentinel panic payload used to implement [`Scheduler::exit`] (§4.2, §4.8).
///
/// `exit` has to unwind out of however deep inside user code it was called;
/// panicking with this marker and catching it at the task boundary is the
/// same "abandon the current stack, do not treat it as a real failure" idiom
/// the reference crate already uses for aborted transactions (§9's note that
/// panicking inside STM never poisons a `TVar`).
struct TaskExit;

impl Scheduler {
    fn new(fresh: FreshId) -> Scheduler {
        Scheduler {
            shared: Arc::new(Shared {
                fresh,
                ready_queue: Mutex::new(VecDeque::new()),
                spawned: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn fresh_id(&self) -> Id {
        self.shared.fresh.fresh()
    }

    /// Suspend the current task and let the next ready task run (§4.2).
    ///
    /// If the ready queue is empty there is nobody to hand the baton to, so
    /// this is a no-op and the caller keeps running — matching the run
    /// loop's "terminate when the queue is empty" rule applied to a single
    /// remaining task.
    pub fn yield_now(&self) {
        trace!("scheduler: yield");
        let next = { self.shared.ready_queue.lock().pop_front() };
        let Some(next) = next else {
            return;
        };
        let me = Ticket::new();
        self.shared.ready_queue.lock().push_back(me.clone());
        next.grant_turn();
        me.wait_for_turn();
    }

    /// Split the current point into two tasks (§4.2).
    ///
    /// `child` runs first: it continues inline on the calling thread, with
    /// no scheduling round-trip at all. `parent` is started on a fresh OS
    /// thread and parked at the back of the ready queue, so it runs only
    /// once every task ahead of it (including `child`, once it yields or
    /// finishes) has had its turn.
    pub fn fork<P, C>(&self, parent: P, child: C)
    where
        P: FnOnce(&Scheduler) + Send + 'static,
        C: FnOnce(&Scheduler),
    {
        trace!("scheduler: fork");
        let scheduler = self.clone();
        let ticket = Ticket::new();
        let ticket_for_thread = ticket.clone();
        let handle = thread::spawn(move || {
            ticket_for_thread.wait_for_turn();
            run_task(&scheduler, parent);
        });
        self.shared.spawned.lock().push(handle);
        self.shared.ready_queue.lock().push_back(ticket);
        child(self);
    }

    /// Convenience form of `fork`: run `on_true` on the branch tagged `true`
    /// and `on_false` — which runs first — on the branch tagged `false`
    /// (§4.2's `fork{b1}{b2}`).
    pub fn fork_branches<P, C>(&self, on_true: P, on_false: C)
    where
        P: FnOnce(&Scheduler) + Send + 'static,
        C: FnOnce(&Scheduler),
    {
        self.fork(on_true, on_false);
    }

    /// Terminate the current task; no continuation is enqueued for it
    /// (§4.2, §4.8).
    pub fn exit(&self) -> ! {
        trace!("scheduler: exit");
        panic::panic_any(TaskExit)
    }

    fn finish_task(&self) {
        let next = self.shared.ready_queue.lock().pop_front();
        if let Some(next) = next {
            next.grant_turn();
        }
    }
}

/// Run `body` as one task: absorb the sentinel panic `exit()` raises so it
/// is indistinguishable from falling off the end of `body`, then hand the
/// baton to whichever task is next in the ready queue.
fn run_task<F: FnOnce(&Scheduler)>(scheduler: &Scheduler, body: F) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| body(scheduler)));
    scheduler.finish_task();
    if let Err(payload) = result {
        if payload.downcast_ref::<TaskExit>().is_none() {
            panic::resume_unwind(payload);
        }
    }
}

/// Run `body` as the initial task of a fresh cooperative schedule (§4.2,
/// §6), blocking until it and every task it (transitively) forks have
/// finished.
///
/// `fresh` is the id source new `TVar`s allocate from; pass the same
/// [`FreshId`] to multiple `scheduler` calls (it is cheap to clone) to keep
/// ids unique across independent runs, or a fresh one to let each run start
/// its own id space.
pub fn scheduler<F>(fresh: FreshId, body: F)
where
    F: FnOnce(&Scheduler) + Send + 'static,
{
    let sched = Scheduler::new(fresh);
    run_task(&sched, body);
    // `body` may have forked tasks that are still running or still parked
    // in the ready queue; drain-join until no new threads are left behind.
    loop {
        let batch: Vec<_> = std::mem::take(&mut *sched.shared.spawned.lock());
        if batch.is_empty() {
            break;
        }
        for handle in batch {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn single_task_runs_to_completion() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        scheduler(FreshId::new(), move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn yield_with_nobody_waiting_is_a_no_op() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        scheduler(FreshId::new(), move |sched| {
            sched.yield_now();
            sched.yield_now();
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fork_runs_child_before_parent() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_parent = order.clone();
        let order_child = order.clone();
        scheduler(FreshId::new(), move |sched| {
            sched.fork(
                move |_| order_parent.lock().push("parent"),
                move |_| order_child.lock().push("child"),
            );
        });
        assert_eq!(*order.lock(), vec!["child", "parent"]);
    }

    #[test]
    fn exit_drops_the_rest_of_the_task() {
        let reached = Arc::new(AtomicUsize::new(0));
        let reached2 = reached.clone();
        scheduler(FreshId::new(), move |sched| {
            sched.exit();
            reached2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn yield_interleaves_two_forked_tasks() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let t1 = trace.clone();
        let t2 = trace.clone();
        scheduler(FreshId::new(), move |sched| {
            sched.fork(
                move |sched| {
                    t1.lock().push("A1");
                    sched.yield_now();
                    t1.lock().push("A2");
                },
                move |sched| {
                    t2.lock().push("B1");
                    sched.yield_now();
                    t2.lock().push("B2");
                },
            );
        });
        let trace = trace.lock();
        assert_eq!(trace.len(), 4);
        assert_eq!(trace[0], "B1");
        assert_eq!(trace[trace.len() - 1], "A2");
    }
}
