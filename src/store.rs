use parking_lot::Mutex;
use std::collections::HashMap;

use crate::models::{GenerationTicket, MessageRef, UserId, UserState};

/// In-memory conversation records, one per user.
///
/// A single lock covers the whole map. Callers only ever run short, non-blocking
/// closures under it; network calls happen after the closure returns.
#[derive(Default)]
pub struct StateStore {
    states: Mutex<HashMap<UserId, UserState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the user's state, creating a fresh one on first contact.
    /// Production code goes through `update`, which reads and writes under one lock.
    #[cfg(test)]
    pub fn get(&self, user: UserId) -> UserState {
        self.states.lock().entry(user).or_default().clone()
    }

    pub fn reset(&self, user: UserId) {
        self.states.lock().insert(user, UserState::default());
    }

    /// Runs `f` against the user's state while holding the lock.
    pub fn update<R>(&self, user: UserId, f: impl FnOnce(&mut UserState) -> R) -> R {
        let mut guard = self.states.lock();
        f(guard.entry(user).or_default())
    }

    pub fn set_pending_prompt(&self, user: UserId, prompt: MessageRef) {
        self.update(user, |state| state.pending_prompt = Some(prompt));
    }

    /// Resets the user if `ticket` still belongs to their current cycle.
    ///
    /// Returns false when the cycle was cancelled or restarted while the
    /// generation was running; the caller must then drop the result.
    pub fn finish_generation(&self, user: UserId, ticket: GenerationTicket) -> bool {
        self.update(user, |state| {
            if state.in_flight == Some(ticket) {
                *state = UserState::default();
                true
            } else {
                false
            }
        })
    }
}
