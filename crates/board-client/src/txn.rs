//! Local transaction log for optimistic mutations.
//!
//! Every optimistic change is recorded under a [`TxnId`]. Whichever arrives
//! first, the HTTP response or the matching realtime echo, takes the entry out
//! of the log; the other one then finds nothing and is a no-op. Ids are never
//! reused, not even after [`TxnLog::clear`].

use std::collections::BTreeMap;
use std::fmt;

/// Correlation id of one optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(u64);

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// What happened when a transaction was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirmed,
    RolledBack,
    /// The entry had already been resolved (or discarded by a reload).
    AlreadyResolved,
}

#[derive(Debug)]
pub struct TxnLog<Op> {
    next: u64,
    pending: BTreeMap<TxnId, Op>,
}

impl<Op> Default for TxnLog<Op> {
    fn default() -> Self {
        Self {
            next: 1,
            pending: BTreeMap::new(),
        }
    }
}

impl<Op> TxnLog<Op> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, op: Op) -> TxnId {
        let id = TxnId(self.next);
        self.next += 1;
        self.pending.insert(id, op);
        id
    }

    /// Takes the entry out of the log if it is still pending and `accept`
    /// agrees it is the expected kind of operation.
    pub fn take_if(&mut self, id: TxnId, accept: impl FnOnce(&Op) -> bool) -> Option<Op> {
        match self.pending.get(&id) {
            Some(op) if accept(op) => self.pending.remove(&id),
            _ => None,
        }
    }

    /// Oldest pending entry matching `pred`.
    pub fn find(&self, pred: impl Fn(&Op) -> bool) -> Option<TxnId> {
        self.pending
            .iter()
            .find(|(_, op)| pred(op))
            .map(|(id, _)| *id)
    }

    pub fn get_mut(&mut self, id: TxnId) -> Option<&mut Op> {
        self.pending.get_mut(&id)
    }

    pub fn is_pending(&self, id: TxnId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending entry. Later responses for them resolve to
    /// [`Resolution::AlreadyResolved`].
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
