//! This library implements
//! [software transactional memory](https://en.wikipedia.org/wiki/Software_transactional_memory),
//! modeling a cooperative scheduler of tasks that run atomic blocks over
//! shared integer variables.
//!
//! It is designed closely after Haskell's STM library: all reads and writes
//! inside an atomic block are recorded in a log rather than applied
//! directly, and are only committed if every variable the block touched is
//! still consistent with what was read. If not, the block is simply run
//! again. `retry` lets a block abandon the current attempt early and wait
//! until one of the variables it read changes; `orElse` lets a block offer
//! a fallback to run if the first alternative retries.
//!
//! Unlike a general-purpose STM, `TVar` here holds a plain `i64` rather than
//! an arbitrary type, and tasks are scheduled cooperatively: at most one
//! task's code is ever running at a time, handed off explicitly by `yield`,
//! `fork`, `exit`, and the wait loop inside `atomic`'s retry handling. See
//! [`scheduler`] for how that cooperative schedule is actually run.
//!
//! # Usage
//!
//! ```
//! use stm::{atomic, fresh_id_source, scheduler};
//!
//! scheduler(fresh_id_source(), |sched| {
//!     let x = atomic(sched, |tx| {
//!         let var = tx.new_tvar(0);
//!         tx.write(&var, 42)?;
//!         tx.read(&var)
//!     });
//!     assert_eq!(x, 42);
//! });
//! ```
//!
//! Nested calls to `atomic` are not supported; compose STM code by taking
//! `&mut Transaction` as a parameter and returning `StmResult<T>` instead,
//! then call it from inside an outer `atomic` block with `?`.
//!
//! # Transaction safety
//!
//! * Don't run code with side effects inside an atomic block. Attempts
//!   repeat on conflict, so side effects would repeat too.
//! * Don't handle `StmResult` yourself; propagate it with `?` and let
//!   `atomic`/`Transaction::or_else` interpret it.
//! * Panicking inside an atomic block is safe: the attempt is simply
//!   discarded, since nothing is committed until the whole block returns
//!   `Ok` and validates.

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod fresh;
mod result;
mod scheduler;
mod transaction;
mod tvar;

pub mod testing;

pub use fresh::FreshId;
pub use result::{StmError, StmResult};
pub use scheduler::{scheduler, Scheduler};
pub use transaction::{atomic, retry, Transaction};
pub use tvar::TVar;

/// Allocate a fresh, independent id source for a new run of [`scheduler`].
///
/// A thin wrapper over [`FreshId::new`] so callers who do not need to share
/// one source across multiple runs (§4.1, §6) don't have to import
/// [`FreshId`] just to construct one.
pub fn fresh_id_source() -> FreshId {
    FreshId::new()
}
