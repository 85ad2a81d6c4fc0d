//! Table-level invalidation and subscribable queries.
//!
//! Writers notify the tables they touched after each successful commit.
//! Every registered watcher of an affected table re-runs its query and
//! pushes the fresh snapshot into its subscription channel. Invalidation is
//! coarse: any write to a watched table re-emits, regardless of which rows
//! changed. Dropping a [`Subscription`] unsubscribes; the dead watcher is
//! pruned on the next notification.

use crossbeam::channel::Receiver;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    UserProfile,
    Transactions,
    Categories,
}

impl Table {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::UserProfile => "user_profile",
            Self::Transactions => "transactions",
            Self::Categories => "categories",
        }
    }
}

/// A registered observer: the tables it tracks plus a closure that re-runs
/// its query and sends the snapshot. Returns `false` once the receiving
/// side is gone or the query failed, at which point it is removed.
pub(crate) struct Watcher {
    pub(crate) tables: Vec<Table>,
    pub(crate) rerun: Box<dyn Fn(&Connection) -> bool>,
}

/// Receiving end of a watched query. Each emission is a full snapshot; the
/// first one is delivered at subscription time. Dropping the subscription
/// releases the watcher.
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(rx: Receiver<T>) -> Self {
        Self { rx }
    }

    /// Drain every snapshot emitted so far, oldest first.
    pub fn poll(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Most recent snapshot, discarding older ones.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }
}
