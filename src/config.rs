//! Configuration types.
//!
//! Every numeric threshold the decision logic relies on lives here: the
//! emotion rule cascade, the summon weighting, and the timing windows are
//! tuning constants, not contracts, so they are configurable rather than
//! hard-coded at the call sites.

use std::time::Duration;

/// Guidance agent configuration.
#[derive(Debug, Clone)]
pub struct GuideConfig {
    /// Agent display name (used in scripted messages).
    pub name: String,
    /// Clicks closer together than this count toward a rapid-click burst.
    pub rapid_click_gap_ms: i64,
    /// A gap this long before a primary action counts as a pause-before-action.
    pub pause_before_action_ms: i64,
    /// Window within which an A → B → A navigation counts as a bounce.
    pub nav_bounce_window_ms: i64,
    /// Rapid-click count at or above which the user reads as overwhelmed
    /// (combined with `overwhelmed_nav_threshold`).
    pub overwhelmed_click_threshold: u32,
    /// Back-and-forth navigation count for the overwhelmed rule.
    pub overwhelmed_nav_threshold: u32,
    /// Help requests alone at or above this read as overwhelmed.
    pub overwhelmed_help_threshold: u32,
    /// Zero signals plus this much time on page reads as disengaged.
    pub disengaged_idle_ms: i64,
    /// Quick decisions at or above this read as energized.
    pub energized_decision_threshold: u32,
    /// Zero signals plus at least this much time on page reads as calm.
    pub calm_settled_ms: i64,
    /// Weight on rapid-click bursts in the summon score.
    pub summon_weight_clicks: f32,
    /// Weight on back-and-forth navigation in the summon score.
    pub summon_weight_nav: f32,
    /// Weight on pauses before action in the summon score.
    pub summon_weight_pauses: f32,
    /// Weight per 10 seconds of silence after guidance in the summon score.
    pub summon_weight_silence: f32,
    /// Score at which the agent proactively summons.
    pub summon_threshold: f32,
    /// How long a declined summon suppresses auto-summoning.
    pub decline_cooldown: Duration,
    /// Interval between check-in ticks.
    pub checkin_interval: Duration,
    /// Silence after guidance before a check-in message may be appended.
    pub checkin_idle_ms: i64,
    /// Maximum choices shown under a HIGH-intensity policy.
    pub high_intensity_choice_cap: usize,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            name: "guide".to_string(),
            rapid_click_gap_ms: 500,
            pause_before_action_ms: 8_000,
            nav_bounce_window_ms: 30_000,
            overwhelmed_click_threshold: 5,
            overwhelmed_nav_threshold: 3,
            overwhelmed_help_threshold: 3,
            disengaged_idle_ms: 45_000,
            energized_decision_threshold: 3,
            calm_settled_ms: 10_000,
            summon_weight_clicks: 1.0,
            summon_weight_nav: 1.2,
            summon_weight_pauses: 1.5,
            summon_weight_silence: 0.5,
            summon_threshold: 6.0,
            decline_cooldown: Duration::from_secs(180), // 3 minutes
            checkin_interval: Duration::from_secs(2),
            checkin_idle_ms: 30_000,
            high_intensity_choice_cap: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cooldown_is_three_minutes() {
        let config = GuideConfig::default();
        assert_eq!(config.decline_cooldown, Duration::from_secs(180));
    }

    #[test]
    fn default_choice_cap_is_three() {
        assert_eq!(GuideConfig::default().high_intensity_choice_cap, 3);
    }
}
