//! Tracks which states a holder (and, symmetrically, a projection
//! target) currently has "entered", and reports the diff when a state
//! changes so the caller can register/unregister the affectors that
//! crossed a threshold.

use crate::ids::HolderId;
use crate::static_data::HolderState;
use std::collections::{HashMap, HashSet};

const ALL_STATES: [HolderState; 4] = [
    HolderState::Offline,
    HolderState::Online,
    HolderState::Active,
    HolderState::Overload,
];

/// States `<= state` (offline ⊆ online ⊆ active ⊆ overload).
fn entered_states(state: HolderState) -> HashSet<HolderState> {
    ALL_STATES.iter().copied().filter(|&s| s <= state).collect()
}

/// The states that became newly entered/exited by a state transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub entered: Vec<HolderState>,
    pub exited: Vec<HolderState>,
}

/// Per-fit bookkeeping of entered states. `rt` mirrors `lt` in this
/// single-fit engine (no cross-fit state sharing, so a
/// "target" holder's entered states are tracked the same way as any
/// other bound holder's); the two tables are kept distinct to match
/// that description and to leave room for a future projected-fit
/// extension without reshaping this module.
#[derive(Debug, Default)]
pub struct LinkTracker {
    lt: HashMap<HolderId, HashSet<HolderState>>,
    rt: HashMap<HolderId, HashSet<HolderState>>,
}

impl LinkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A holder just joined the fit at `state`. Returns the set of
    /// states it enters immediately (all of them are "newly entered"
    /// relative to not being tracked at all).
    pub fn on_holder_bound(&mut self, holder: HolderId, state: HolderState) -> Vec<HolderState> {
        let entered = entered_states(state);
        self.lt.insert(holder, entered.clone());
        self.rt.insert(holder, entered.clone());
        let mut v: Vec<_> = entered.into_iter().collect();
        v.sort();
        v
    }

    /// A holder just left the fit. Returns the states it was in so the
    /// caller can unregister everything gated by them.
    pub fn on_holder_unbound(&mut self, holder: HolderId) -> Vec<HolderState> {
        let mut v: Vec<_> = self
            .lt
            .remove(&holder)
            .unwrap_or_default()
            .into_iter()
            .collect();
        self.rt.remove(&holder);
        v.sort();
        v
    }

    /// The holder's state changed. Returns which states were newly
    /// entered and which were exited.
    pub fn on_state_change(
        &mut self,
        holder: HolderId,
        new_state: HolderState,
    ) -> StateDiff {
        let previous = self.lt.get(&holder).cloned().unwrap_or_default();
        let next = entered_states(new_state);

        let mut entered: Vec<_> = next.difference(&previous).copied().collect();
        let mut exited: Vec<_> = previous.difference(&next).copied().collect();
        entered.sort();
        exited.sort();

        self.lt.insert(holder, next.clone());
        self.rt.insert(holder, next);

        StateDiff { entered, exited }
    }
}
