//! Emotion classification — signals plus page context to a discrete state.
//!
//! Classification is an ordered rule cascade over signal thresholds: the
//! first matching rule wins, and `Steady` is the defined default, so every
//! reachable snapshot maps to exactly one state. The function is pure and
//! deterministic; thresholds come from [`GuideConfig`].

use serde::{Deserialize, Serialize};

use crate::config::GuideConfig;
use crate::knowledge::PageId;
use crate::telemetry::SignalSnapshot;

/// Inferred engagement/emotional state. Never persisted — always derivable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionState {
    Calm,
    Steady,
    Energized,
    Overwhelmed,
    Disengaged,
}

impl std::fmt::Display for EmotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EmotionState::Calm => "calm",
            EmotionState::Steady => "steady",
            EmotionState::Energized => "energized",
            EmotionState::Overwhelmed => "overwhelmed",
            EmotionState::Disengaged => "disengaged",
        };
        write!(f, "{s}")
    }
}

/// Page context the classifier sees alongside the signals.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub page: PageId,
    pub user_name: Option<String>,
}

/// Classifier output: the state plus a greeting seed keyed to it.
#[derive(Debug, Clone)]
pub struct Classification {
    pub state: EmotionState,
    pub opening_line: String,
}

/// Classify a signal snapshot. Total and deterministic.
pub fn classify(
    signals: &SignalSnapshot,
    context: &PageContext,
    config: &GuideConfig,
) -> Classification {
    let state = classify_state(signals, config);
    Classification {
        opening_line: opening_line(state, context),
        state,
    }
}

fn classify_state(signals: &SignalSnapshot, config: &GuideConfig) -> EmotionState {
    let counters_quiet = signals.rapid_click_burst_count == 0
        && signals.back_and_forth_nav_count == 0
        && signals.pauses_before_action_count == 0
        && signals.help_requests_count == 0;

    // Ordered cascade — first match wins.
    if signals.rapid_click_burst_count >= config.overwhelmed_click_threshold
        && signals.back_and_forth_nav_count >= config.overwhelmed_nav_threshold
    {
        return EmotionState::Overwhelmed;
    }
    if signals.help_requests_count >= config.overwhelmed_help_threshold {
        return EmotionState::Overwhelmed;
    }
    if counters_quiet
        && signals.quick_decision_count == 0
        && signals.time_on_page_ms >= config.disengaged_idle_ms
    {
        return EmotionState::Disengaged;
    }
    if signals.quick_decision_count >= config.energized_decision_threshold
        && signals.rapid_click_burst_count < config.overwhelmed_click_threshold
    {
        return EmotionState::Energized;
    }
    if counters_quiet && signals.time_on_page_ms >= config.calm_settled_ms {
        return EmotionState::Calm;
    }
    EmotionState::Steady
}

/// Greeting seed for a state. Deterministic: same state and name, same line.
fn opening_line(state: EmotionState, context: &PageContext) -> String {
    let name = context.user_name.as_deref().unwrap_or("there");
    let page = context.page.label();
    match state {
        EmotionState::Calm => {
            format!("Hi {name} — you're cruising through {page}. I'm here if you want me.")
        }
        EmotionState::Steady => format!("Hey {name}! Need a hand with {page}?"),
        EmotionState::Energized => {
            format!("Nice pace, {name}! Want to keep the momentum going on {page}?")
        }
        EmotionState::Overwhelmed => format!(
            "Hey {name}, {page} can be a lot at first. Want me to slow it down and walk you through?"
        ),
        EmotionState::Disengaged => {
            format!("Still with me, {name}? I can point you to the quickest win on {page}.")
        }
    }
}
