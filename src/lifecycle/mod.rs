//! Lifecycle state machines — persisted multi-session user journeys.
//!
//! Each machine is a pure reducer over its own serialized state. Instead of
//! several watchers mutating a shared message list, every transition emits an
//! [`Emission`] into the [`Arbiter`], which picks the single highest-priority
//! pending emission per tick. Precedence: Re-Entry > Cancellation >
//! Onboarding > free-form Q&A.

pub mod cancellation;
pub mod onboarding;
pub mod reentry;

pub use cancellation::{CancellationMachine, CancellationState};
pub use onboarding::{OnboardingMachine, OnboardingState, OnboardingStep};
pub use reentry::{ReEntryMachine, ReEntryState};

use crate::policy::Choice;

/// Emission priority. Higher wins when several machines speak in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Answer = 0,
    Onboarding = 1,
    Cancellation = 2,
    ReEntry = 3,
}

/// A scripted message plus its choice set, bid into the arbiter.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub priority: Priority,
    pub message: String,
    pub choices: Vec<Choice>,
}

/// Side effect requested by a transition; executed by the agent after the
/// state write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Navigate(String),
}

/// Result of applying an action to a machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub next: S,
    pub emission: Option<Emission>,
    pub effects: Vec<Effect>,
}

/// Collects pending emissions and hands out the highest-priority one.
#[derive(Debug, Default)]
pub struct Arbiter {
    pending: Vec<Emission>,
}

impl Arbiter {
    pub fn submit(&mut self, emission: Emission) {
        self.pending.push(emission);
    }

    /// Take the highest-priority pending emission; ties keep submission
    /// order. Remaining bids are dropped — one voice per tick.
    pub fn take_winner(&mut self) -> Option<Emission> {
        if self.pending.is_empty() {
            return None;
        }
        let mut best = 0;
        for (i, emission) in self.pending.iter().enumerate() {
            if emission.priority > self.pending[best].priority {
                best = i;
            }
        }
        let winner = self.pending.swap_remove(best);
        self.pending.clear();
        Some(winner)
    }
}

/// Persisted-state keys, one disjoint key per machine.
pub mod state_keys {
    pub const ONBOARDING: &str = "onboarding_state";
    pub const CANCELLATION: &str = "cancellation_state";
    pub const REENTRY: &str = "reentry_state";
}
