//! Test-only helpers for asserting non-termination and cross-task wakeup
//! (§13), properties a plain return value cannot express.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Run `f` on its own thread and report whether it finished within
/// `timeout_ms`.
///
/// Used to assert that an `atomic` block retries forever rather than
/// returning — there is no way to observe "never returns" except by racing
/// it against a clock. The spawned thread is leaked if `f` never finishes;
/// that is expected for the infinite-retry case this exists to test.
pub fn terminates<F>(timeout_ms: u64, f: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        f();
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_millis(timeout_ms)).is_ok()
}

/// Run `f` and `concurrent` on separate threads; return `f`'s result if it
/// finishes within `timeout_ms`, or `Err(())` on timeout.
///
/// Used to assert cross-task wakeup: `f` blocks in a `retry` wait loop until
/// `concurrent`'s commit changes the variable it is waiting on.
pub fn async_test<T, F, G>(timeout_ms: u64, f: F, concurrent: G) -> Result<T, ()>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
    G: FnOnce() + Send + 'static,
{
    thread::spawn(concurrent);
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let value = f();
        let _ = tx.send(value);
    });
    rx.recv_timeout(Duration::from_millis(timeout_ms)).map_err(|_| ())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn terminates_reports_true_for_quick_work() {
        assert!(terminates(500, || {}));
    }

    #[test]
    fn terminates_reports_false_when_work_never_finishes() {
        assert!(!terminates(50, || loop {
            thread::sleep(Duration::from_secs(1));
        }));
    }

    #[test]
    fn async_test_returns_the_value_once_it_is_ready() {
        let result = async_test(500, || 42, || {});
        assert_eq!(result, Ok(42));
    }
}
