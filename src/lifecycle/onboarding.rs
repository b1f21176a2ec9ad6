//! Onboarding machine — first-session walkthrough.
//!
//! `Idle → Active(step) → Done`, steps ordered Welcome → Tour → FirstWin →
//! Reward → NextSteps. Transitions are explicit user choices only (plus the
//! automatic `start()` on first dashboard visit); "skip" at any step lands on
//! Done, and no transition ever revisits a prior step.

use serde::{Deserialize, Serialize};

use super::{Effect, Emission, Priority, Transition};
use crate::events::ActionTag;
use crate::policy::Choice;

/// The ordered onboarding steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Welcome,
    Tour,
    FirstWin,
    Reward,
    NextSteps,
}

impl OnboardingStep {
    fn index(&self) -> usize {
        match self {
            Self::Welcome => 0,
            Self::Tour => 1,
            Self::FirstWin => 2,
            Self::Reward => 3,
            Self::NextSteps => 4,
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Tour => "tour",
            Self::FirstWin => "first_win",
            Self::Reward => "reward",
            Self::NextSteps => "next_steps",
        };
        write!(f, "{s}")
    }
}

/// Persisted onboarding state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum OnboardingState {
    #[default]
    Idle,
    Active(OnboardingStep),
    Done,
}

/// Pure reducer over [`OnboardingState`].
#[derive(Debug, Default)]
pub struct OnboardingMachine {
    state: OnboardingState,
}

impl OnboardingMachine {
    pub fn from_state(state: OnboardingState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> OnboardingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, OnboardingState::Active(_))
    }

    /// Auto-start on first dashboard visit. No-op unless Idle.
    pub fn start(&mut self) -> Option<Transition<OnboardingState>> {
        if self.state != OnboardingState::Idle {
            return None;
        }
        let next = OnboardingState::Active(OnboardingStep::Welcome);
        self.state = next;
        Some(Transition {
            next,
            emission: script(OnboardingStep::Welcome),
            effects: vec![],
        })
    }

    /// Apply a user choice. Returns `None` when this machine does not claim
    /// the action in its current state, so the router can fall through.
    /// Scripted prompt for the step currently holding the floor, if any.
    /// Lets a rehydrated session re-present a mid-flow step; downstream
    /// duplicate suppression keeps this safe within a session.
    pub fn current_emission(&self) -> Option<Emission> {
        match self.state {
            OnboardingState::Active(step) => script(step),
            _ => None,
        }
    }

    pub fn apply(&mut self, action: &ActionTag) -> Option<Transition<OnboardingState>> {
        let step = match self.state {
            OnboardingState::Active(step) => step,
            _ => return None,
        };

        let transition = match (step, action) {
            (OnboardingStep::Welcome, ActionTag::TakeTour) => {
                self.advance_to(OnboardingStep::Tour, vec![])
            }
            (OnboardingStep::Tour, ActionTag::Continue) => {
                self.advance_to(OnboardingStep::FirstWin, vec![])
            }
            (OnboardingStep::FirstWin, ActionTag::GuideMe) => self.advance_to(
                OnboardingStep::Reward,
                vec![Effect::Navigate("/lessons/first-win".into())],
            ),
            (OnboardingStep::Reward, ActionTag::Continue) => {
                self.advance_to(OnboardingStep::NextSteps, vec![])
            }
            (OnboardingStep::NextSteps, ActionTag::Continue | ActionTag::Later) => self.finish(
                "You're all set. I'll be in the corner whenever you need me.",
            ),
            // "skip" lands on Done from any step.
            (_, ActionTag::SkipOnboarding) => {
                self.finish("No problem — explore at your own pace. I'm here if you need me.")
            }
            _ => return None,
        };
        Some(transition)
    }

    fn advance_to(&mut self, step: OnboardingStep, effects: Vec<Effect>) -> Transition<OnboardingState> {
        debug_assert!(
            match self.state {
                OnboardingState::Active(current) => step.index() > current.index(),
                _ => false,
            },
            "onboarding never revisits a prior step"
        );
        let next = OnboardingState::Active(step);
        self.state = next;
        Transition {
            next,
            emission: script(step),
            effects,
        }
    }

    fn finish(&mut self, message: &str) -> Transition<OnboardingState> {
        self.state = OnboardingState::Done;
        Transition {
            next: OnboardingState::Done,
            emission: Some(Emission {
                priority: Priority::Onboarding,
                message: message.into(),
                choices: vec![],
            }),
            effects: vec![],
        }
    }
}

/// Scripted agent message and choices for a step. Exactly one per step
/// change; duplicate renders are suppressed downstream by transcript
/// content equality.
fn script(step: OnboardingStep) -> Option<Emission> {
    let (message, choices) = match step {
        OnboardingStep::Welcome => (
            "Welcome! I'm your guide around here. Want the two-minute tour, or would you rather poke around yourself?",
            vec![
                Choice::new("Take the tour", ActionTag::TakeTour),
                Choice::new("I'll explore on my own", ActionTag::SkipOnboarding),
            ],
        ),
        OnboardingStep::Tour => (
            "This is your dashboard — streak on the left, next lesson front and center, rewards up top. Ready for the fun part?",
            vec![
                Choice::new("Next", ActionTag::Continue),
                Choice::new("Skip the rest", ActionTag::SkipOnboarding),
            ],
        ),
        OnboardingStep::FirstWin => (
            "Let's land your first win: one short lesson, a few points in your pocket. Want me to take you there?",
            vec![
                Choice::new("Guide me", ActionTag::GuideMe),
                Choice::new("Maybe later", ActionTag::SkipOnboarding),
            ],
        ),
        OnboardingStep::Reward => (
            "First points earned! They add up toward real rewards. Shall we line up what's next?",
            vec![Choice::new("Continue", ActionTag::Continue)],
        ),
        OnboardingStep::NextSteps => (
            "Here's the rhythm: one lesson a day keeps the streak alive. Want to keep going now, or pick it up later?",
            vec![
                Choice::new("Keep going", ActionTag::Continue),
                Choice::new("Later", ActionTag::Later),
            ],
        ),
    };
    Some(Emission {
        priority: Priority::Onboarding,
        message: message.into(),
        choices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_step_prompt_is_re_presentable() {
        let machine = OnboardingMachine::from_state(OnboardingState::Active(OnboardingStep::Tour));
        let emission = machine.current_emission().unwrap();
        assert!(emission.choices.iter().any(|c| c.action == ActionTag::Continue));
        assert!(OnboardingMachine::default().current_emission().is_none());
        assert!(
            OnboardingMachine::from_state(OnboardingState::Done)
                .current_emission()
                .is_none()
        );
    }

    #[test]
    fn start_only_from_idle() {
        let mut machine = OnboardingMachine::default();
        let t = machine.start().unwrap();
        assert_eq!(t.next, OnboardingState::Active(OnboardingStep::Welcome));
        assert!(machine.start().is_none());
    }

    #[test]
    fn full_happy_path_reaches_done() {
        let mut machine = OnboardingMachine::default();
        machine.start().unwrap();
        let steps = [
            (ActionTag::TakeTour, OnboardingState::Active(OnboardingStep::Tour)),
            (ActionTag::Continue, OnboardingState::Active(OnboardingStep::FirstWin)),
            (ActionTag::GuideMe, OnboardingState::Active(OnboardingStep::Reward)),
            (ActionTag::Continue, OnboardingState::Active(OnboardingStep::NextSteps)),
            (ActionTag::Continue, OnboardingState::Done),
        ];
        for (action, expected) in steps {
            let t = machine.apply(&action).unwrap();
            assert_eq!(t.next, expected);
        }
    }

    #[test]
    fn skip_at_welcome_goes_straight_to_done() {
        let mut machine = OnboardingMachine::default();
        machine.start().unwrap();
        let t = machine.apply(&ActionTag::SkipOnboarding).unwrap();
        assert_eq!(t.next, OnboardingState::Done);
        // Done machine claims nothing further.
        assert!(machine.apply(&ActionTag::TakeTour).is_none());
    }

    #[test]
    fn skip_reaches_done_from_every_step() {
        // Exactly one path to Done for any combination of skips.
        let advance: [&[ActionTag]; 4] = [
            &[],
            &[ActionTag::TakeTour],
            &[ActionTag::TakeTour, ActionTag::Continue],
            &[ActionTag::TakeTour, ActionTag::Continue, ActionTag::GuideMe],
        ];
        for prefix in advance {
            let mut machine = OnboardingMachine::default();
            machine.start().unwrap();
            for action in prefix {
                machine.apply(action).unwrap();
            }
            let t = machine.apply(&ActionTag::SkipOnboarding).unwrap();
            assert_eq!(t.next, OnboardingState::Done);
        }
    }

    #[test]
    fn first_win_guide_me_navigates() {
        let mut machine = OnboardingMachine::default();
        machine.start().unwrap();
        machine.apply(&ActionTag::TakeTour).unwrap();
        machine.apply(&ActionTag::Continue).unwrap();
        let t = machine.apply(&ActionTag::GuideMe).unwrap();
        assert_eq!(t.effects, vec![Effect::Navigate("/lessons/first-win".into())]);
    }

    #[test]
    fn no_transition_revisits_a_prior_step() {
        let mut machine = OnboardingMachine::default();
        machine.start().unwrap();
        let mut highest = 0;
        for action in [
            ActionTag::TakeTour,
            ActionTag::Continue,
            ActionTag::GuideMe,
            ActionTag::Continue,
        ] {
            let t = machine.apply(&action).unwrap();
            if let OnboardingState::Active(step) = t.next {
                assert!(step.index() > highest);
                highest = step.index();
            }
        }
    }

    #[test]
    fn unclaimed_actions_return_none() {
        let mut machine = OnboardingMachine::default();
        machine.start().unwrap();
        // Welcome step does not claim Continue or pause actions.
        assert!(machine.apply(&ActionTag::Continue).is_none());
        assert!(machine.apply(&ActionTag::StartPause).is_none());
        assert_eq!(
            machine.state(),
            OnboardingState::Active(OnboardingStep::Welcome)
        );
    }

    #[test]
    fn state_serde_roundtrip() {
        let state = OnboardingState::Active(OnboardingStep::FirstWin);
        let json = serde_json::to_value(state).unwrap();
        let parsed: OnboardingState = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn each_active_step_scripts_exactly_one_message() {
        let mut machine = OnboardingMachine::default();
        let t = machine.start().unwrap();
        assert!(t.emission.is_some());
        for action in [ActionTag::TakeTour, ActionTag::Continue, ActionTag::GuideMe] {
            let t = machine.apply(&action).unwrap();
            assert!(t.emission.is_some());
            assert!(!t.emission.unwrap().choices.is_empty());
        }
    }
}
