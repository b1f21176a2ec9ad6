//! Event and action vocabulary.
//!
//! Every input to the agent — user actions, passive observations, and timer
//! ticks — is expressed as an [`AgentEvent`] and fed through one dispatch
//! path, so tests can replay any sequence (including time) without real
//! timers or a UI.
//!
//! Choice buttons carry an [`ActionTag`]: a closed enum rather than a bare
//! string, so the router match is exhaustive and the fall-back-to-free-text
//! case is an explicit variant instead of an implicit default.

use serde::{Deserialize, Serialize};

use crate::conversation::Persona;
use crate::knowledge::PageId;

/// Action carried by a choice button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "text", rename_all = "snake_case")]
pub enum ActionTag {
    // Onboarding
    TakeTour,
    SkipOnboarding,
    Continue,
    Later,
    GuideMe,
    // Pause / cancellation
    StartPause,
    ConfirmPause,
    KeepGoing,
    ResumePlan,
    DismissPause,
    // Re-entry
    ResumeJourney,
    FreshStart,
    // Playbooks and personas
    ShowMeHow,
    SwitchToCoach,
    SwitchToGuide,
    /// Free text re-submitted through the answer engine. Also the explicit
    /// fall-through for any tag no router branch claims.
    FreeText(String),
}

impl ActionTag {
    /// Stable wire tag for this action.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TakeTour => "take_tour",
            Self::SkipOnboarding => "skip_onboarding",
            Self::Continue => "continue",
            Self::Later => "later",
            Self::GuideMe => "guide_me",
            Self::StartPause => "start_pause",
            Self::ConfirmPause => "confirm_pause",
            Self::KeepGoing => "keep_going",
            Self::ResumePlan => "resume_plan",
            Self::DismissPause => "dismiss_pause",
            Self::ResumeJourney => "resume_journey",
            Self::FreshStart => "fresh_start",
            Self::ShowMeHow => "show_me_how",
            Self::SwitchToCoach => "switch_to_coach",
            Self::SwitchToGuide => "switch_to_guide",
            Self::FreeText(_) => "free_text",
        }
    }

    /// Parse a wire tag. Unknown tags return `None`; callers wrap the raw
    /// text in [`ActionTag::FreeText`] instead of dropping the action.
    pub fn from_tag(tag: &str) -> Option<ActionTag> {
        let action = match tag {
            "take_tour" => Self::TakeTour,
            "skip_onboarding" => Self::SkipOnboarding,
            "continue" => Self::Continue,
            "later" => Self::Later,
            "guide_me" => Self::GuideMe,
            "start_pause" => Self::StartPause,
            "confirm_pause" => Self::ConfirmPause,
            "keep_going" => Self::KeepGoing,
            "resume_plan" => Self::ResumePlan,
            "dismiss_pause" => Self::DismissPause,
            "resume_journey" => Self::ResumeJourney,
            "fresh_start" => Self::FreshStart,
            "show_me_how" => Self::ShowMeHow,
            "switch_to_coach" => Self::SwitchToCoach,
            "switch_to_guide" => Self::SwitchToGuide,
            _ => return None,
        };
        Some(action)
    }

    /// Text used when an unclaimed tag falls through as free text.
    pub fn fallback_text(&self) -> String {
        match self {
            Self::FreeText(text) => text.clone(),
            other => other.tag().replace('_', " "),
        }
    }
}

impl std::fmt::Display for ActionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// One input to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Route change. Resets telemetry before emotion is re-evaluated.
    Navigated(PageId),
    /// Passive click observation.
    Clicked,
    /// Passive hover observation.
    Hovered,
    /// Explicit help request from page chrome.
    HelpRequested,
    /// User attempted the page's primary call to action.
    PrimaryActionAttempted,
    /// User made a quick, confident decision.
    QuickDecision,
    /// User clicked the floating "guide me" trigger.
    GuideMeClicked,
    /// User declined a proactive summon. Starts the cooldown.
    SummonDeclined,
    /// Returning user detected after an absence (sets re-entry Pending).
    ReturningUserDetected,
    DockOpened,
    DockMinimized,
    DockClosed,
    /// User picked a choice button.
    ChoiceSelected(ActionTag),
    /// Free-text user turn.
    UserText(String),
    PersonaSwitched(Persona),
    /// Periodic timer tick; drives check-ins and cooldown expiry.
    CheckInTick,
    /// Voice capture reported unavailable by the host.
    VoiceUnavailable,
}
