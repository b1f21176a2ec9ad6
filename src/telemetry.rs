//! Telemetry aggregation — raw UI events in, derived signals out.
//!
//! The aggregator is deliberately dumb: each mark/observe call mutates
//! exactly one counter or timestamp, and `reset()` zeroes everything on
//! navigation. Every downstream component (classifier, policy, summon
//! engine) is a pure function over the [`SignalSnapshot`] this produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GuideConfig;
use crate::knowledge::PageId;

/// Derived behavioral signals accumulated since the last navigation.
///
/// Counters are monotonically non-decreasing within a page visit and zeroed
/// when the visit ends. Consumers receive copies; only the aggregator writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub rapid_click_burst_count: u32,
    pub back_and_forth_nav_count: u32,
    pub pauses_before_action_count: u32,
    pub help_requests_count: u32,
    pub quick_decision_count: u32,
    pub silence_after_guidance_ms: i64,
    pub time_on_page_ms: i64,
}

/// Accumulates raw UI events into a [`SignalSnapshot`].
#[derive(Debug)]
pub struct TelemetryAggregator {
    rapid_click_burst_count: u32,
    back_and_forth_nav_count: u32,
    pauses_before_action_count: u32,
    help_requests_count: u32,
    quick_decision_count: u32,
    page_entered_at: Option<DateTime<Utc>>,
    guidance_shown_at: Option<DateTime<Utc>>,
    last_click_at: Option<DateTime<Utc>>,
    last_activity_at: Option<DateTime<Utc>>,
    /// Recent navigation history. Survives `reset()` so bounce patterns
    /// (A → B → A) spanning a navigation are still visible.
    nav_history: Vec<(PageId, DateTime<Utc>)>,
    rapid_click_gap_ms: i64,
    pause_before_action_ms: i64,
    nav_bounce_window_ms: i64,
}

const NAV_HISTORY_CAP: usize = 16;

impl TelemetryAggregator {
    pub fn new(config: &GuideConfig) -> Self {
        Self {
            rapid_click_burst_count: 0,
            back_and_forth_nav_count: 0,
            pauses_before_action_count: 0,
            help_requests_count: 0,
            quick_decision_count: 0,
            page_entered_at: None,
            guidance_shown_at: None,
            last_click_at: None,
            last_activity_at: None,
            nav_history: Vec::new(),
            rapid_click_gap_ms: config.rapid_click_gap_ms,
            pause_before_action_ms: config.pause_before_action_ms,
            nav_bounce_window_ms: config.nav_bounce_window_ms,
        }
    }

    /// Zero all counters and timestamps for a new page visit.
    ///
    /// Invoked once per navigation event, before emotion is re-evaluated.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.rapid_click_burst_count = 0;
        self.back_and_forth_nav_count = 0;
        self.pauses_before_action_count = 0;
        self.help_requests_count = 0;
        self.quick_decision_count = 0;
        self.page_entered_at = Some(now);
        self.guidance_shown_at = None;
        self.last_click_at = None;
        self.last_activity_at = Some(now);
    }

    /// Record arrival on a page and derive the bounce count for this visit.
    pub fn observe_navigation(&mut self, page: PageId, now: DateTime<Utc>) {
        self.nav_history.push((page, now));
        if self.nav_history.len() > NAV_HISTORY_CAP {
            self.nav_history.remove(0);
        }

        // A → B → A within the bounce window counts as one back-and-forth.
        let cutoff = now - chrono::Duration::milliseconds(self.nav_bounce_window_ms);
        let recent: Vec<&(PageId, DateTime<Utc>)> = self
            .nav_history
            .iter()
            .filter(|(_, at)| *at >= cutoff)
            .collect();
        let bounces = recent
            .windows(3)
            .filter(|w| w[0].0 == w[2].0 && w[0].0 != w[1].0)
            .count() as u32;
        self.back_and_forth_nav_count = bounces;
    }

    pub fn observe_click(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.last_click_at {
            let gap = (now - last).num_milliseconds();
            if gap >= 0 && gap <= self.rapid_click_gap_ms {
                self.rapid_click_burst_count += 1;
            }
        }
        self.last_click_at = Some(now);
        self.last_activity_at = Some(now);
    }

    pub fn observe_hover(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = Some(now);
    }

    /// User hit a help affordance in the page chrome.
    pub fn mark_help_request(&mut self) {
        self.help_requests_count += 1;
    }

    /// Guidance was just rendered; restarts the silence window.
    pub fn mark_guidance_shown(&mut self, now: DateTime<Utc>) {
        self.guidance_shown_at = Some(now);
    }

    /// User made a quick, confident decision.
    pub fn mark_quick_decision(&mut self, now: DateTime<Utc>) {
        self.quick_decision_count += 1;
        self.last_activity_at = Some(now);
    }

    /// User attempted the page's primary call to action. Counts as a
    /// pause-before-action when the preceding idle gap was long.
    pub fn mark_primary_action_attempt(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.last_activity_at {
            if (now - last).num_milliseconds() >= self.pause_before_action_ms {
                self.pauses_before_action_count += 1;
            }
        }
        self.last_activity_at = Some(now);
    }

    /// Current derived signals.
    pub fn snapshot(&self, now: DateTime<Utc>) -> SignalSnapshot {
        let time_on_page_ms = self
            .page_entered_at
            .map(|at| (now - at).num_milliseconds().max(0))
            .unwrap_or(0);
        let silence_after_guidance_ms = self
            .guidance_shown_at
            .map(|at| (now - at).num_milliseconds().max(0))
            .unwrap_or(0);
        SignalSnapshot {
            rapid_click_burst_count: self.rapid_click_burst_count,
            back_and_forth_nav_count: self.back_and_forth_nav_count,
            pauses_before_action_count: self.pauses_before_action_count,
            help_requests_count: self.help_requests_count,
            quick_decision_count: self.quick_decision_count,
            silence_after_guidance_ms,
            time_on_page_ms,
        }
    }
}
