//! Re-entry machine — greets a returning user after an absence.
//!
//! `Pending → Resolved`. Pending is set externally when the host detects a
//! returning user; resolution is an explicit user choice. Re-entry outranks
//! every other machine in the arbiter.

use serde::{Deserialize, Serialize};

use super::{Effect, Emission, Priority, Transition};
use crate::events::ActionTag;
use crate::policy::Choice;

/// Persisted re-entry state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReEntryState {
    #[default]
    Resolved,
    Pending,
}

/// Pure reducer over [`ReEntryState`].
#[derive(Debug, Default)]
pub struct ReEntryMachine {
    state: ReEntryState,
}

impl ReEntryMachine {
    pub fn from_state(state: ReEntryState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ReEntryState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == ReEntryState::Pending
    }

    /// External trigger: a returning user was detected. No-op if already
    /// pending.
    pub fn set_pending(&mut self, user_name: Option<&str>) -> Option<Transition<ReEntryState>> {
        if self.state == ReEntryState::Pending {
            return None;
        }
        self.state = ReEntryState::Pending;
        Some(Transition {
            next: ReEntryState::Pending,
            emission: Some(welcome_back_prompt(user_name)),
            effects: vec![],
        })
    }

    /// Re-present the welcome-back prompt for a rehydrated Pending state,
    /// so a reload mid-flow isn't stranded without its choices.
    pub fn current_emission(&self, user_name: Option<&str>) -> Option<Emission> {
        match self.state {
            ReEntryState::Pending => Some(welcome_back_prompt(user_name)),
            ReEntryState::Resolved => None,
        }
    }

    pub fn apply(&mut self, action: &ActionTag) -> Option<Transition<ReEntryState>> {
        if self.state != ReEntryState::Pending {
            return None;
        }
        let transition = match action {
            ActionTag::ResumeJourney => {
                self.state = ReEntryState::Resolved;
                Transition {
                    next: ReEntryState::Resolved,
                    emission: Some(Emission {
                        priority: Priority::ReEntry,
                        message: "Taking you right back to your lessons.".into(),
                        choices: vec![],
                    }),
                    effects: vec![Effect::Navigate("/lessons".into())],
                }
            }
            ActionTag::FreshStart => {
                self.state = ReEntryState::Resolved;
                Transition {
                    next: ReEntryState::Resolved,
                    emission: Some(Emission {
                        priority: Priority::ReEntry,
                        message: "Here's the short version of what's new: fresh lessons in the credit lab and a new rewards tier.".into(),
                        choices: vec![],
                    }),
                    effects: vec![],
                }
            }
            _ => return None,
        };
        Some(transition)
    }
}

fn welcome_back_prompt(user_name: Option<&str>) -> Emission {
    let name = user_name.unwrap_or("there");
    Emission {
        priority: Priority::ReEntry,
        message: format!(
            "Welcome back, {name}! It's been a minute. Want to pick up where you left off, or see what's new?"
        ),
        choices: vec![
            Choice::new("Pick up where I left off", ActionTag::ResumeJourney),
            Choice::new("Show me what's new", ActionTag::FreshStart),
        ],
    }
}
