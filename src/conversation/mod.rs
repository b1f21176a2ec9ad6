//! Conversation surface — transcript, dock state, personas, and the
//! flow controller that routes each turn.

pub mod controller;
pub mod transcript;

pub use controller::ConversationController;
pub use transcript::{DockState, SpeakerRole, Transcript, TranscriptEntry};

use serde::{Deserialize, Serialize};

/// Which voice is speaking. The coach shares the guide's transcript;
/// switching injects a fixed handoff greeting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    #[default]
    Guide,
    Coach,
}

impl Persona {
    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Guide => "your guide",
            Persona::Coach => "Coach Sam",
        }
    }

    /// Fixed greeting injected when this persona takes over.
    pub fn handoff_greeting(&self) -> &'static str {
        match self {
            Persona::Guide => "I'm back — where were we?",
            Persona::Coach => {
                "Coach Sam here. Let's talk goals — what are you working toward this month?"
            }
        }
    }
}
