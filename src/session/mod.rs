//! Per-user conversation sessions
//!
//! A session is the rolling window of turns sent to a provider: one system
//! turn at index 0 followed by alternating user and assistant turns. The
//! store in [`store`] keeps live sessions in memory and mirrors them to disk.

pub mod store;

pub use store::SessionStore;

use crate::providers::base::Turn;

/// Rolling conversation history for one session id
///
/// Invariants: the turn at index 0 is always the system turn, and after
/// trimming the total length never exceeds `max_history + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    turns: Vec<Turn>,
}

impl Session {
    /// Creates a session seeded with the system prompt
    pub fn new(system_prompt: &str) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
        }
    }

    /// Rebuilds a session from persisted turns
    ///
    /// The index-0 invariant is enforced on the way in: a missing system
    /// turn is inserted, a stale one is rewritten to the given prompt.
    pub fn from_turns(turns: Vec<Turn>, system_prompt: &str) -> Self {
        let mut session = Self { turns };
        session.refresh_system_prompt(system_prompt);
        session
    }

    /// Ensures the turn at index 0 carries the current system prompt
    ///
    /// The system turn is rewritten in place rather than appended, so a
    /// prompt change applies retroactively without growing the history.
    pub fn refresh_system_prompt(&mut self, system_prompt: &str) {
        match self.turns.first() {
            Some(first) if first.role == crate::providers::base::Role::System => {
                if first.content != system_prompt {
                    self.turns[0] = Turn::system(system_prompt);
                }
            }
            _ => self.turns.insert(0, Turn::system(system_prompt)),
        }
    }

    /// Appends a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    /// Appends an assistant turn
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
    }

    /// Drops the oldest non-system turns until at most `max_history` remain
    pub fn trim(&mut self, max_history: usize) {
        if self.turns.len() > max_history + 1 {
            let excess = self.turns.len() - (max_history + 1);
            self.turns.drain(1..1 + excess);
        }
    }

    /// Resets the session to just the system turn
    pub fn reset(&mut self, system_prompt: &str) {
        self.turns = vec![Turn::system(system_prompt)];
    }

    /// Full turn sequence, system turn first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns including the system turn
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when only the system turn remains
    pub fn is_empty(&self) -> bool {
        self.turns.len() <= 1
    }
}
