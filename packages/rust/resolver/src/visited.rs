//! Per-resolution record of identifiers already scheduled for a fetch.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::validate::ContentId;

/// Outcome of [`VisitedSet::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// First sighting: the caller owns this node and must fetch it.
    Claimed,
    /// Another branch already claimed it.
    AlreadySeen,
    /// The set is full; the node will not be visited.
    CapReached,
}

/// Set of claimed identifiers, shared by every task of one traversal.
///
/// A node is claimed when its fetch is scheduled, so concurrent branches
/// that discover the same child never both fetch it.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: Mutex<HashSet<ContentId>>,
    cap: Option<usize>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set that refuses new identifiers once `cap` are claimed.
    pub fn with_cap(cap: Option<usize>) -> Self {
        Self {
            seen: Mutex::default(),
            cap,
        }
    }

    /// Atomically insert `id` if absent.
    pub fn claim(&self, id: &ContentId) -> Claim {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(id) {
            return Claim::AlreadySeen;
        }
        if self.cap.is_some_and(|cap| seen.len() >= cap) {
            return Claim::CapReached;
        }
        seen.insert(id.clone());
        Claim::Claimed
    }

    /// `true` if this call claimed `id`.
    pub fn try_claim(&self, id: &ContentId) -> bool {
        self.claim(id) == Claim::Claimed
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
