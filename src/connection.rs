//! Connection Record (design component B): the per-identity, per-family
//! state the index and poller operate on.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

use crate::estats::Tracker;
use crate::identity::Identity;

/// One family's tracking state for one connection. Ordered by identity;
/// the tracker is interior-mutable so the index can hand out `&ConnectionRecord`
/// while the poller still mutates tracking state through it.
pub struct ConnectionRecord {
    identity: Identity,
    tracker: RefCell<Box<dyn Tracker + Send>>,
    last_seen_tick: Cell<u64>,
}

impl ConnectionRecord {
    pub fn new(identity: Identity, tracker: Box<dyn Tracker + Send>, tick: u64) -> Self {
        Self { identity, tracker: RefCell::new(tracker), last_seen_tick: Cell::new(tick) }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn tracker(&self) -> std::cell::Ref<'_, Box<dyn Tracker + Send>> {
        self.tracker.borrow()
    }

    pub fn tracker_mut(&self) -> std::cell::RefMut<'_, Box<dyn Tracker + Send>> {
        self.tracker.borrow_mut()
    }

    pub fn last_seen_tick(&self) -> u64 {
        self.last_seen_tick.get()
    }

    pub fn mark_seen(&self, tick: u64) {
        self.last_seen_tick.set(tick);
    }
}

impl PartialEq for ConnectionRecord {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}
impl Eq for ConnectionRecord {}

impl PartialOrd for ConnectionRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ConnectionRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity.cmp(&other.identity)
    }
}

impl std::fmt::Debug for ConnectionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRecord")
            .field("identity", &self.identity)
            .field("last_seen_tick", &self.last_seen_tick.get())
            .finish()
    }
}
