//! Summon decision engine — whether to proactively surface the agent.
//!
//! `decide_summon` is pure and idempotent: recomputed on every signal
//! change, unchanged inputs produce an identical decision so the
//! presentation layer can diff-and-skip re-renders. Decline cooldown is a
//! recorded timestamp checked by scheduled events, never a blocking wait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GuideConfig;
use crate::policy::{Intensity, UiPolicy};
use crate::telemetry::SignalSnapshot;

/// Why the agent decided to summon (or not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummonReason {
    UserRequest,
    SignalThreshold,
    None,
}

/// Outcome of a summon evaluation. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonDecision {
    pub should_summon: bool,
    pub intensity: Intensity,
    pub reason: SummonReason,
    pub message: String,
}

impl SummonDecision {
    fn quiet() -> Self {
        Self {
            should_summon: false,
            intensity: Intensity::Low,
            reason: SummonReason::None,
            message: String::new(),
        }
    }
}

/// External flags the decision consumes alongside the signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummonFlags {
    pub user_clicked_guide_me: bool,
    pub user_declined_recently: bool,
}

/// Decide whether to summon. Rules in priority order:
/// 1. An explicit user request always summons, bypassing cooldown.
/// 2. A recent decline suppresses auto-summon regardless of signals.
/// 3. Otherwise a weighted signal score against the configured threshold,
///    with intensity scaled to the overshoot.
pub fn decide_summon(
    signals: &SignalSnapshot,
    policy: &UiPolicy,
    flags: &SummonFlags,
    config: &GuideConfig,
) -> SummonDecision {
    if flags.user_clicked_guide_me {
        return SummonDecision {
            should_summon: true,
            intensity: policy.intensity,
            reason: SummonReason::UserRequest,
            message: "You called? Let's sort this out together.".into(),
        };
    }
    if flags.user_declined_recently {
        return SummonDecision::quiet();
    }

    let score = summon_score(signals, config);
    if score < config.summon_threshold {
        return SummonDecision::quiet();
    }

    let ratio = score / config.summon_threshold;
    let intensity = if ratio >= 2.0 {
        Intensity::High
    } else if ratio >= 1.4 {
        Intensity::Medium
    } else {
        Intensity::Low
    };
    debug!(score, ratio, ?intensity, "Summon threshold crossed");
    SummonDecision {
        should_summon: true,
        intensity,
        reason: SummonReason::SignalThreshold,
        message: "Looks like this page is putting up a fight. Want a hand?".into(),
    }
}

fn summon_score(signals: &SignalSnapshot, config: &GuideConfig) -> f32 {
    signals.rapid_click_burst_count as f32 * config.summon_weight_clicks
        + signals.back_and_forth_nav_count as f32 * config.summon_weight_nav
        + signals.pauses_before_action_count as f32 * config.summon_weight_pauses
        + (signals.silence_after_guidance_ms as f32 / 10_000.0) * config.summon_weight_silence
}

/// Tracks the decline-cooldown window.
///
/// `note_decline` records the instant; `expire_if_elapsed` is called from
/// the periodic tick so the flag clears without any further explicit call.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    declined_at: Option<DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn note_decline(&mut self, now: DateTime<Utc>) {
        self.declined_at = Some(now);
    }

    pub fn declined_recently(&self, now: DateTime<Utc>, config: &GuideConfig) -> bool {
        match self.declined_at {
            Some(at) => {
                let elapsed = (now - at).num_milliseconds();
                elapsed >= 0 && (elapsed as u128) < config.decline_cooldown.as_millis()
            }
            None => false,
        }
    }

    /// Scheduled check: clears the flag once the window has elapsed.
    pub fn expire_if_elapsed(&mut self, now: DateTime<Utc>, config: &GuideConfig) {
        if self.declined_at.is_some() && !self.declined_recently(now, config) {
            debug!("Summon decline cooldown expired");
            self.declined_at = None;
        }
    }
}
