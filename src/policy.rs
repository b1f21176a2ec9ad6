//! UI policy — emotion state to presentation directives, and the choice
//! filter that keeps option lists small when the user is overloaded.
//!
//! Policy drives visual affect and voice tone only; it never makes business
//! decisions. The choice filter can only drop or reorder entries — it never
//! invents actions.

use serde::{Deserialize, Serialize};

use crate::config::GuideConfig;
use crate::emotion::EmotionState;
use crate::events::ActionTag;

/// How forcefully the agent presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

/// Visual/voice register for the dock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiMode {
    Ambient,
    Focused,
    Celebratory,
    Simplified,
    Inviting,
}

/// Presentation policy derived from the emotion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPolicy {
    pub intensity: Intensity,
    pub ui_mode: UiMode,
}

/// One selectable option presented to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub action: ActionTag,
}

impl Choice {
    pub fn new(label: impl Into<String>, action: ActionTag) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Static lookup from emotion state to policy. Total over the enumeration.
pub fn resolve_policy(state: EmotionState) -> UiPolicy {
    match state {
        EmotionState::Calm => UiPolicy {
            intensity: Intensity::Low,
            ui_mode: UiMode::Ambient,
        },
        EmotionState::Steady => UiPolicy {
            intensity: Intensity::Medium,
            ui_mode: UiMode::Focused,
        },
        EmotionState::Energized => UiPolicy {
            intensity: Intensity::Medium,
            ui_mode: UiMode::Celebratory,
        },
        EmotionState::Overwhelmed => UiPolicy {
            intensity: Intensity::High,
            ui_mode: UiMode::Simplified,
        },
        EmotionState::Disengaged => UiPolicy {
            intensity: Intensity::High,
            ui_mode: UiMode::Inviting,
        },
    }
}

/// Filter/reorder a page's raw choice set under a policy.
///
/// Output is always a subset (possibly reordered) of the input. Under HIGH
/// intensity the list is capped to reduce cognitive load, with any "guide
/// me"-style escape hatch promoted to the front. Idempotent for an
/// unchanged policy.
pub fn apply_choice_policy(
    choices: &[Choice],
    policy: &UiPolicy,
    config: &GuideConfig,
) -> Vec<Choice> {
    if policy.intensity != Intensity::High {
        return choices.to_vec();
    }
    let mut out: Vec<Choice> = Vec::with_capacity(choices.len());
    // Escape hatches first when the user is overloaded.
    for choice in choices {
        if matches!(choice.action, ActionTag::GuideMe | ActionTag::ShowMeHow) {
            out.push(choice.clone());
        }
    }
    for choice in choices {
        if !matches!(choice.action, ActionTag::GuideMe | ActionTag::ShowMeHow) {
            out.push(choice.clone());
        }
    }
    out.truncate(config.high_intensity_choice_cap);
    out
}
