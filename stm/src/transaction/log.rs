//! The per-attempt read/write log (§3 "Log", §4.3, §4.4).

use log::trace;

use crate::fresh::Id;
use crate::tvar::TVar;

cfg_if::cfg_if! {
    if #[cfg(feature = "hash-registers")] {
        use rustc_hash::FxHashMap as RegisterMap;
    } else {
        use std::collections::BTreeMap as RegisterMap;
    }
}

/// One log record for one `TVar` (§3 "Entry").
#[derive(Clone)]
pub(crate) struct Entry {
    pub(crate) tvar: TVar,
    /// The cell's value at the moment of the *first* touch this attempt;
    /// assigned once, never updated (§3, §8 "Old-value stability").
    pub(crate) old_value: i64,
    /// The tentative value this attempt wants to commit.
    pub(crate) new_value: i64,
    /// True iff `tvar` was itself created during this attempt.
    pub(crate) is_fresh: bool,
}

impl Entry {
    fn is_valid(&self) -> bool {
        self.tvar.load() == self.old_value
    }

    fn has_changed(&self) -> bool {
        self.tvar.load() != self.old_value
    }
}

/// An attempt's working log: at most one [`Entry`] per `TVar` identity (§3).
///
/// Keying entries by `Id` in a map makes that invariant structural — there is
/// no code path through `read`/`write`/`new_local_tvar` that can insert a
/// second entry for an id, so the "duplicate entry" failure mode §4.8 treats
/// as fatal can only ever arise from a bug in this module itself, not from
/// caller misuse.
#[derive(Clone, Default)]
pub(crate) struct Log {
    entries: RegisterMap<Id, Entry>,
}

impl Log {
    pub(crate) fn new() -> Log {
        Log {
            entries: RegisterMap::default(),
        }
    }

    pub(crate) fn read(&mut self, tvar: &TVar) -> i64 {
        if let Some(entry) = self.entries.get(&tvar.id()) {
            trace!("log: read (cached) id={:?}", tvar.id());
            return entry.new_value;
        }
        let value = tvar.load();
        trace!("log: read (fresh) id={:?} value={}", tvar.id(), value);
        self.entries.insert(
            tvar.id(),
            Entry {
                tvar: tvar.clone(),
                old_value: value,
                new_value: value,
                is_fresh: false,
            },
        );
        value
    }

    pub(crate) fn write(&mut self, tvar: &TVar, value: i64) {
        trace!("log: write id={:?} value={}", tvar.id(), value);
        match self.entries.get_mut(&tvar.id()) {
            Some(entry) => entry.new_value = value,
            None => {
                let current = tvar.load();
                self.entries.insert(
                    tvar.id(),
                    Entry {
                        tvar: tvar.clone(),
                        old_value: current,
                        new_value: value,
                        is_fresh: false,
                    },
                );
            }
        }
    }

    pub(crate) fn new_local_tvar(&mut self, id: Id, init: i64) -> TVar {
        let tvar = TVar::with_id(id, init);
        trace!("log: newLocalTVar id={:?} init={}", id, init);
        let previous = self.entries.insert(
            tvar.id(),
            Entry {
                tvar: tvar.clone(),
                old_value: init,
                new_value: init,
                is_fresh: true,
            },
        );
        debug_assert!(
            previous.is_none(),
            "STM: fresh id {:?} already present in log",
            id
        );
        tvar
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.entries.values().all(Entry::is_valid)
    }

    pub(crate) fn has_changed(&self) -> bool {
        self.entries.values().any(Entry::has_changed)
    }

    /// Write every entry's `new_value` back to its cell. Only ever called
    /// after `is_valid` returned `true` for the same log, and never itself
    /// yields, so it composes with §4.4's "commit does not interleave"
    /// guarantee for free.
    pub(crate) fn commit(&self) {
        for entry in self.entries.values() {
            entry.tvar.store(entry.new_value);
        }
    }

    /// Entries present in `self` but absent from `base` — the TVars this
    /// attempt touched beyond what it inherited. Used by `orElse` (§4.7) to
    /// fold a retried alternative's reads into the enclosing transaction's
    /// wait set.
    pub(crate) fn entries_added_since<'a>(&'a self, base: &Log) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .iter()
            .filter(move |(id, _)| !base.entries.contains_key(id))
            .map(|(_, entry)| entry)
    }
}
