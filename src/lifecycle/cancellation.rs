//! Pause/cancellation machine.
//!
//! `Idle → Pausing → Paused → (Resumed | Idle)`. Every transition is an
//! explicit user choice; there is no silent advancement.

use serde::{Deserialize, Serialize};

use super::{Emission, Priority, Transition};
use crate::events::ActionTag;
use crate::policy::Choice;

/// Persisted pause/cancellation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationState {
    #[default]
    Idle,
    Pausing,
    Paused,
    Resumed,
}

impl std::fmt::Display for CancellationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Pausing => "pausing",
            Self::Paused => "paused",
            Self::Resumed => "resumed",
        };
        write!(f, "{s}")
    }
}

/// Pure reducer over [`CancellationState`].
#[derive(Debug, Default)]
pub struct CancellationMachine {
    state: CancellationState,
}

impl CancellationMachine {
    pub fn from_state(state: CancellationState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> CancellationState {
        self.state
    }

    /// Mid-flow: the machine should keep claiming its action namespace.
    pub fn in_flow(&self) -> bool {
        matches!(
            self.state,
            CancellationState::Pausing | CancellationState::Paused
        )
    }

    /// Prompt for a mid-flow state, so a rehydrated session can re-present
    /// it. Idle and Resumed have nothing to re-present.
    pub fn current_emission(&self) -> Option<Emission> {
        match self.state {
            CancellationState::Pausing => Some(pausing_prompt()),
            CancellationState::Paused => Some(paused_prompt()),
            _ => None,
        }
    }

    pub fn apply(&mut self, action: &ActionTag) -> Option<Transition<CancellationState>> {
        let transition = match (self.state, action) {
            (CancellationState::Idle | CancellationState::Resumed, ActionTag::StartPause) => {
                self.state = CancellationState::Pausing;
                Transition {
                    next: CancellationState::Pausing,
                    emission: Some(pausing_prompt()),
                    effects: vec![],
                }
            }
            (CancellationState::Pausing, ActionTag::ConfirmPause) => {
                self.state = CancellationState::Paused;
                Transition {
                    next: CancellationState::Paused,
                    emission: Some(paused_prompt()),
                    effects: vec![],
                }
            }
            (CancellationState::Pausing, ActionTag::KeepGoing) => self.move_to(
                CancellationState::Idle,
                "Glad you're sticking around! Back to it.",
                vec![],
            ),
            (CancellationState::Paused, ActionTag::ResumePlan) => self.move_to(
                CancellationState::Resumed,
                "Welcome back! Your streak and points are right where you left them.",
                vec![],
            ),
            (CancellationState::Paused, ActionTag::DismissPause) => self.move_to(
                CancellationState::Idle,
                "Okay. You can resume from settings whenever you're ready.",
                vec![],
            ),
            _ => return None,
        };
        Some(transition)
    }

    fn move_to(
        &mut self,
        next: CancellationState,
        message: &str,
        choices: Vec<Choice>,
    ) -> Transition<CancellationState> {
        self.state = next;
        Transition {
            next,
            emission: Some(Emission {
                priority: Priority::Cancellation,
                message: message.into(),
                choices,
            }),
            effects: vec![],
        }
    }
}

fn pausing_prompt() -> Emission {
    Emission {
        priority: Priority::Cancellation,
        message: "Thinking about stepping away? Pausing keeps your streak, points, and progress frozen until you're back.".into(),
        choices: vec![
            Choice::new("Pause my membership", ActionTag::ConfirmPause),
            Choice::new("Actually, I'll keep going", ActionTag::KeepGoing),
        ],
    }
}

fn paused_prompt() -> Emission {
    Emission {
        priority: Priority::Cancellation,
        message: "Done — your membership is paused. Everything will be exactly where you left it.".into(),
        choices: vec![
            Choice::new("Resume now", ActionTag::ResumePlan),
            Choice::new("Close", ActionTag::DismissPause),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_flow_states_re_present_their_prompt() {
        let idle = CancellationMachine::default();
        assert!(idle.current_emission().is_none());

        let pausing = CancellationMachine::from_state(CancellationState::Pausing);
        let emission = pausing.current_emission().unwrap();
        assert!(emission
            .choices
            .iter()
            .any(|c| c.action == ActionTag::ConfirmPause));

        let paused = CancellationMachine::from_state(CancellationState::Paused);
        let emission = paused.current_emission().unwrap();
        assert!(emission
            .choices
            .iter()
            .any(|c| c.action == ActionTag::ResumePlan));
    }

    #[test]
    fn pause_confirm_resume_path() {
        let mut machine = CancellationMachine::default();
        let t = machine.apply(&ActionTag::StartPause).unwrap();
        assert_eq!(t.next, CancellationState::Pausing);
        let t = machine.apply(&ActionTag::ConfirmPause).unwrap();
        assert_eq!(t.next, CancellationState::Paused);
        let t = machine.apply(&ActionTag::ResumePlan).unwrap();
        assert_eq!(t.next, CancellationState::Resumed);
    }

    #[test]
    fn keep_going_backs_out() {
        let mut machine = CancellationMachine::default();
        machine.apply(&ActionTag::StartPause).unwrap();
        let t = machine.apply(&ActionTag::KeepGoing).unwrap();
        assert_eq!(t.next, CancellationState::Idle);
    }

    #[test]
    fn paused_can_dismiss_to_idle() {
        let mut machine = CancellationMachine::default();
        machine.apply(&ActionTag::StartPause).unwrap();
        machine.apply(&ActionTag::ConfirmPause).unwrap();
        let t = machine.apply(&ActionTag::DismissPause).unwrap();
        assert_eq!(t.next, CancellationState::Idle);
    }

    #[test]
    fn confirm_without_pausing_is_unclaimed() {
        let mut machine = CancellationMachine::default();
        assert!(machine.apply(&ActionTag::ConfirmPause).is_none());
        assert!(machine.apply(&ActionTag::ResumePlan).is_none());
        assert_eq!(machine.state(), CancellationState::Idle);
    }

    #[test]
    fn resumed_can_pause_again() {
        let mut machine = CancellationMachine::from_state(CancellationState::Resumed);
        let t = machine.apply(&ActionTag::StartPause).unwrap();
        assert_eq!(t.next, CancellationState::Pausing);
    }

    #[test]
    fn every_transition_scripts_a_message() {
        let mut machine = CancellationMachine::default();
        for action in [
            ActionTag::StartPause,
            ActionTag::ConfirmPause,
            ActionTag::ResumePlan,
        ] {
            let t = machine.apply(&action).unwrap();
            assert!(t.emission.is_some());
            assert_eq!(t.emission.unwrap().priority, Priority::Cancellation);
        }
    }

    #[test]
    fn state_serde_roundtrip() {
        let json = serde_json::to_value(CancellationState::Paused).unwrap();
        let parsed: CancellationState = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, CancellationState::Paused);
    }
}
