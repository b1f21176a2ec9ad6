//! Transcript and dock visibility.
//!
//! The transcript is append-only within a session: minimize/reopen preserves
//! it, a full close clears it. Consecutive duplicate agent messages are
//! suppressed by content equality so re-renders and reopen events never
//! double-speak.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    User,
    Agent,
}

/// One turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub role: SpeakerRole,
    pub content: String,
}

/// Dock visibility, orthogonal to the lifecycle machines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockState {
    #[default]
    Closed,
    Open,
    Minimized,
}

/// Append-only message sequence owned by the conversation controller.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            id: Uuid::new_v4(),
            role: SpeakerRole::User,
            content: content.into(),
        });
    }

    /// Append an agent message. Returns `false` (and appends nothing) when
    /// the last entry is an identical agent message.
    pub fn push_agent(&mut self, content: impl Into<String>) -> bool {
        let content = content.into();
        if let Some(last) = self.entries.last() {
            if last.role == SpeakerRole::Agent && last.content == content {
                return false;
            }
        }
        self.entries.push(TranscriptEntry {
            id: Uuid::new_v4(),
            role: SpeakerRole::Agent,
            content,
        });
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
