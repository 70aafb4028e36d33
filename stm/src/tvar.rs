// Copyright 2015-2016 rust-stm Developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::fresh::Id;

/// A transactional variable: a shared, mutable integer cell with a unique
/// identity (§3).
///
/// `TVar`s can only be created inside a transaction, via
/// [`Transaction::new_tvar`](crate::Transaction::new_tvar) — there is no
/// free-standing constructor, because `newTVar` only has meaning as a log
/// operation (§4.3).
///
/// The cell itself is a plain atomic integer rather than the reference
/// crate's `RwLock<Arc<dyn Any>>`: because the scheduler (§11) guarantees
/// that at most one task ever touches a cell at a time, no lock is needed —
/// just a location that is `Send + Sync` so it can migrate between the OS
/// threads that take turns holding the baton.
#[derive(Clone)]
pub struct TVar {
    id: Id,
    cell: Arc<AtomicI64>,
}

impl TVar {
    pub(crate) fn with_id(id: Id, value: i64) -> TVar {
        TVar {
            id,
            cell: Arc::new(AtomicI64::new(value)),
        }
    }

    pub(crate) fn id(&self) -> Id {
        self.id
    }

    /// Sample the cell's current value, bypassing any log.
    ///
    /// Used internally by log operations and validation; not transaction-safe
    /// to call from inside an `atomic` block, since it does not participate
    /// in the log at all.
    pub(crate) fn load(&self) -> i64 {
        self.cell.load(Ordering::SeqCst)
    }

    /// Read the cell's current value outside of any transaction, bypassing
    /// the log entirely (mirrors the reference crate's own
    /// `TVar::read_atomic`). Intended for inspecting final state once a
    /// `scheduler` run has finished — never call this from inside an
    /// `atomic` block, since it does not participate in validation.
    pub fn read_atomic(&self) -> i64 {
        self.load()
    }

    /// Overwrite the cell's value, bypassing any log. Only ever called from
    /// `Log::commit` (§4.4), which never interleaves with another
    /// transaction's validate/commit.
    pub(crate) fn store(&self, value: i64) {
        self.cell.store(value, Ordering::SeqCst);
    }

    /// Check if two `TVar`s refer to the same cell.
    pub fn ref_eq(this: &TVar, other: &TVar) -> bool {
        this.id == other.id
    }
}

impl PartialEq for TVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TVar {}

impl std::fmt::Debug for TVar {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TVar")
            .field("id", &self.id)
            .field("value", &self.load())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fresh::FreshId;

    #[test]
    fn ref_eq_identifies_same_cell() {
        let fresh = FreshId::new();
        let a = TVar::with_id(fresh.fresh(), 1);
        let b = a.clone();
        let c = TVar::with_id(fresh.fresh(), 1);

        assert!(TVar::ref_eq(&a, &b));
        assert!(!TVar::ref_eq(&a, &c));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn load_store_roundtrip() {
        let fresh = FreshId::new();
        let v = TVar::with_id(fresh.fresh(), 42);
        assert_eq!(v.load(), 42);
        v.store(7);
        assert_eq!(v.load(), 7);
    }
}
