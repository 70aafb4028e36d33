//! The transactional engine: `atomic`, `orElse`, and the memory primitives
//! (§4.5–§4.7).

use log::debug;

use crate::fresh::Id;
use crate::result::{StmError, StmResult};
use crate::scheduler::Scheduler;
use crate::tvar::TVar;

use super::log::{Entry, Log};

/// The running state of one transaction attempt, handed to the user's block
/// by [`atomic`].
///
/// A `Transaction` borrows the [`Scheduler`] it is running under so that
/// `retry`'s wait loop (§4.6 step 4) can call [`Scheduler::yield_now`]
/// without the caller having to thread it through separately.
pub struct Transaction<'a> {
    scheduler: &'a Scheduler,
    log: Log,
    /// Obsolete read-entries absorbed from retried `orElse` alternatives
    /// (§4.7 item 5, §9's resolution of the "wait on parent log" open
    /// question): if this attempt ultimately retries, it waits on the union
    /// of `log` and this set, not `log` alone.
    wait_set: Vec<Entry>,
}

impl<'a> Transaction<'a> {
    fn new(scheduler: &'a Scheduler) -> Transaction<'a> {
        Transaction {
            scheduler,
            log: Log::new(),
            wait_set: Vec::new(),
        }
    }

    /// `newTVar` (§4.3, §4.5): allocate a fresh `TVar` and register it in the
    /// current log as a fresh entry.
    pub fn new_tvar(&mut self, init: i64) -> TVar {
        let id: Id = self.scheduler.fresh_id();
        self.log.new_local_tvar(id, init)
    }

    /// `readTVar` (§4.3, §4.5).
    pub fn read(&mut self, tvar: &TVar) -> StmResult<i64> {
        Ok(self.log.read(tvar))
    }

    /// `writeTVar` (§4.3, §4.5).
    pub fn write(&mut self, tvar: &TVar, value: i64) -> StmResult<()> {
        self.log.write(tvar, value);
        Ok(())
    }

    /// `orElse` (§4.7): attempt `m1`; if it retries, roll back to the log as
    /// it was when `orElse` was entered and attempt `m2` instead. If `m1`
    /// does not retry, `m2` never runs at all (§8 "orElse first-wins").
    pub fn or_else<T, F1, F2>(&mut self, m1: F1, m2: F2) -> StmResult<T>
    where
        F1: Fn(&mut Transaction) -> StmResult<T>,
        F2: Fn(&mut Transaction) -> StmResult<T>,
    {
        let parent = self.log.clone();
        let first = m1(self);
        match first {
            Err(StmError::Retry) => {
                self.absorb_obsolete(&parent);
                self.log = parent.clone();
                let second = m2(self);
                if second.is_err() {
                    // Both alternatives retried: nothing from either is kept,
                    // only the parent log (plus whatever both absorbed into
                    // the wait set) survives to the enclosing `atomic`.
                    self.absorb_obsolete(&parent);
                    self.log = parent;
                }
                second
            }
            other => other,
        }
    }

    /// Fold the entries `self.log` picked up beyond `base` into the wait
    /// set, so a later `retry` can observe changes to variables a failed
    /// `orElse` alternative read even though its writes were discarded.
    fn absorb_obsolete(&mut self, base: &Log) {
        for entry in self.log.entries_added_since(base) {
            if !entry.is_fresh {
                self.wait_set.push(entry.clone());
            }
        }
    }

    fn is_valid(&self) -> bool {
        self.log.is_valid()
    }

    fn has_changed(&self) -> bool {
        self.log.has_changed() || self.wait_set.iter().any(|e| e.tvar.load() != e.old_value)
    }

    fn commit(&self) {
        self.log.commit();
    }
}

/// `retry()` (§4.5, §4.6): abandon the current attempt. Typed as producing
/// any `T` since it never actually returns a value — the enclosing `atomic`
/// or `orElse` always intercepts it first.
pub fn retry<T>() -> StmResult<T> {
    Err(StmError::Retry)
}

/// `atomic(block)` (§4.6, §6): run `block` to completion under STM
/// semantics, retrying on conflict and waiting-then-retrying on explicit
/// `retry`, until it commits.
pub fn atomic<T, F>(scheduler: &Scheduler, body: F) -> T
where
    F: Fn(&mut Transaction) -> StmResult<T>,
{
    loop {
        let mut tx = Transaction::new(scheduler);
        match body(&mut tx) {
            Ok(value) => {
                if tx.is_valid() {
                    tx.commit();
                    return value;
                }
                debug!("atomic: restarted (validation failed)");
            }
            Err(StmError::Retry) => {
                debug!("atomic: retry, waiting for a read variable to change");
                while !tx.has_changed() {
                    scheduler.yield_now();
                }
                debug!("atomic: retry woke up, restarting");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fresh::FreshId;
    use crate::scheduler::scheduler as run_scheduler;

    #[test]
    fn atomic_commits_on_first_valid_attempt() {
        run_scheduler(FreshId::new(), |sched| {
            let v = atomic(sched, |tx| {
                let t = tx.new_tvar(0);
                tx.write(&t, 42)?;
                tx.read(&t)
            });
            assert_eq!(v, 42);
        });
    }

    #[test]
    fn or_else_returns_first_alternative_when_it_succeeds() {
        run_scheduler(FreshId::new(), |sched| {
            let v = atomic(sched, |tx| tx.or_else(|_| Ok(1), |_| Ok(2)));
            assert_eq!(v, 1);
        });
    }

    #[test]
    fn or_else_second_alternative_never_runs_when_first_wins() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let second_ran = AtomicUsize::new(0);
        run_scheduler(FreshId::new(), |sched| {
            atomic(sched, |tx| {
                tx.or_else(
                    |_| Ok(()),
                    |_| {
                        second_ran.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                )
            });
        });
        assert_eq!(second_ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn or_else_falls_back_to_second_on_retry() {
        run_scheduler(FreshId::new(), |sched| {
            let v: i32 = atomic(sched, |tx| tx.or_else(|_| retry(), |_| Ok(7)));
            assert_eq!(v, 7);
        });
    }

    #[test]
    fn retry_wakes_when_an_external_commit_changes_the_observed_tvar() {
        use crate::testing::async_test;
        use std::sync::atomic::{AtomicI64, Ordering};
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let fresh = FreshId::new();
        let tv = TVar::with_id(fresh.fresh(), 0);
        let tv_waiter = tv.clone();
        let tv_writer = tv.clone();
        let observed = Arc::new(AtomicI64::new(-1));
        let observed_inner = observed.clone();

        let result = async_test(
            500,
            move || {
                run_scheduler(FreshId::new(), move |sched| {
                    let v = atomic(sched, |tx| {
                        let v = tx.read(&tv_waiter)?;
                        if v < 5 {
                            retry()
                        } else {
                            Ok(v)
                        }
                    });
                    observed_inner.store(v, Ordering::SeqCst);
                });
            },
            move || {
                thread::sleep(Duration::from_millis(30));
                tv_writer.store(5);
            },
        );

        assert_eq!(result, Ok(()));
        assert_eq!(observed.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn or_else_discards_writes_from_a_retrying_alternative() {
        run_scheduler(FreshId::new(), |sched| {
            let r = atomic(sched, |tx| Ok::<_, StmError>(tx.new_tvar(42)));
            atomic(sched, |tx| {
                tx.or_else(
                    |tx| {
                        tx.write(&r, 23)?;
                        retry()
                    },
                    |tx| tx.read(&r),
                )
            });
            assert_eq!(r.load(), 42);
        });
    }
}
