//! Guided playbook walkthroughs.
//!
//! A playbook is an ordered list of steps, each pairing a host-UI target
//! selector with a short instruction. The engine tracks the active playbook
//! and current step; the host highlights the selector while the dock stays
//! minimized so the page remains the focus.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PlaybookError;
use crate::knowledge::PageId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybookStep {
    /// CSS-style selector for the host element to highlight.
    pub target_selector: String,
    /// One-line instruction shown next to the highlight.
    pub instruction: String,
}

impl PlaybookStep {
    fn new(target_selector: &str, instruction: &str) -> Self {
        Self {
            target_selector: target_selector.into(),
            instruction: instruction.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playbook {
    pub name: String,
    pub steps: Vec<PlaybookStep>,
}

/// Playbooks keyed by the page they walk through.
pub struct PlaybookRegistry {
    playbooks: HashMap<PageId, Playbook>,
}

impl PlaybookRegistry {
    pub fn with_defaults() -> Self {
        let mut playbooks = HashMap::new();
        playbooks.insert(
            PageId::Dashboard,
            Playbook {
                name: "Reading your dashboard".into(),
                steps: vec![
                    PlaybookStep::new(
                        "#score-ring",
                        "This ring is your credit-readiness score. It updates as you learn.",
                    ),
                    PlaybookStep::new(
                        "#streak-card",
                        "Your streak lives here. Even five minutes a day keeps it alive.",
                    ),
                    PlaybookStep::new(
                        "#next-lesson-cta",
                        "When you're ready, this button takes you straight to your next lesson.",
                    ),
                ],
            },
        );
        playbooks.insert(
            PageId::CreditLab,
            Playbook {
                name: "Your first credit simulation".into(),
                steps: vec![
                    PlaybookStep::new(
                        "#scenario-picker",
                        "Pick a scenario here. 'First credit card' is a good place to start.",
                    ),
                    PlaybookStep::new(
                        "#payment-slider",
                        "Drag this slider to see how payment size changes your balance over time.",
                    ),
                    PlaybookStep::new(
                        "#run-simulation",
                        "Hit run. Nothing here touches real money — experiment freely.",
                    ),
                ],
            },
        );
        Self { playbooks }
    }

    pub fn lookup(&self, page: PageId) -> Option<&Playbook> {
        self.playbooks.get(&page)
    }
}

/// Tracks the active walkthrough. At most one playbook runs at a time;
/// starting a new one replaces the old.
#[derive(Debug, Default)]
pub struct PlaybookEngine {
    active: Option<(Playbook, usize)>,
}

impl PlaybookEngine {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start a playbook at its first step. An empty playbook never
    /// activates.
    pub fn start(&mut self, playbook: Playbook) -> Option<&PlaybookStep> {
        if playbook.steps.is_empty() {
            return None;
        }
        info!(name = %playbook.name, steps = playbook.steps.len(), "Starting playbook");
        self.active = Some((playbook, 0));
        self.current_step()
    }

    pub fn current_step(&self) -> Option<&PlaybookStep> {
        self.active
            .as_ref()
            .and_then(|(playbook, index)| playbook.steps.get(*index))
    }

    /// Jump to an arbitrary step. Out-of-range indices are rejected and the
    /// current step is left unchanged.
    pub fn go_to_step(&mut self, index: usize) -> Result<&PlaybookStep, PlaybookError> {
        let (playbook, current) = self.active.as_mut().ok_or(PlaybookError::NotActive)?;
        if index >= playbook.steps.len() {
            return Err(PlaybookError::StepOutOfRange {
                index,
                len: playbook.steps.len(),
            });
        }
        *current = index;
        Ok(&playbook.steps[index])
    }

    /// Advance to the next step, or `None` when the walkthrough is finished
    /// (which also deactivates it).
    pub fn advance(&mut self) -> Option<&PlaybookStep> {
        let (playbook, index) = self.active.as_mut()?;
        if *index + 1 >= playbook.steps.len() {
            info!(name = %playbook.name, "Playbook complete");
            self.active = None;
            return None;
        }
        *index += 1;
        let (playbook, index) = self.active.as_ref()?;
        playbook.steps.get(*index)
    }

    /// Exit the walkthrough at any point.
    pub fn exit(&mut self) {
        if self.active.take().is_some() {
            info!("Playbook exited");
        }
    }
}
