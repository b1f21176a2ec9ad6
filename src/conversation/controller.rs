//! Conversation flow controller.
//!
//! Owns the transcript, dock visibility, persona, and the pending choice
//! override. Free-text turns are answered locally by the rules engine unless
//! a remote provider is configured, in which case the turn is forwarded with
//! a constructed instruction payload and the reply is appended verbatim.
//! Remote failure degrades to a transient notice; the turn is not retried.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use super::transcript::{DockState, Transcript, TranscriptEntry};
use super::Persona;
use crate::config::GuideConfig;
use crate::knowledge::{AnswerEngine, KnowledgeMap, PageId};
use crate::lifecycle::Emission;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, Role};
use crate::policy::{apply_choice_policy, Choice, Intensity, UiPolicy};

/// Notice shown when the remote call fails. Transient and non-fatal.
const REMOTE_FAILURE_NOTICE: &str =
    "I couldn't reach my longer-form brain just now — mind trying that again in a moment?";

const CHECK_IN_LINES: &[&str] = &[
    "Still there? No rush — I'm around if anything's unclear.",
    "Take your time. Want me to suggest a next step?",
    "Just checking in — anything I can untangle for you?",
];

/// Dependencies a free-text turn needs, borrowed from the agent.
pub struct TurnContext<'a> {
    pub llm: Option<&'a Arc<dyn LlmProvider>>,
    pub answers: &'a AnswerEngine,
    pub knowledge: &'a KnowledgeMap,
    pub page: PageId,
    pub policy: &'a UiPolicy,
    pub config: &'a GuideConfig,
    pub user_name: Option<&'a str>,
}

/// State machine over dock visibility plus the shared transcript.
pub struct ConversationController {
    transcript: Transcript,
    dock: DockState,
    persona: Persona,
    choice_override: Option<Vec<Choice>>,
}

impl Default for ConversationController {
    fn default() -> Self {
        Self {
            transcript: Transcript::default(),
            dock: DockState::Closed,
            persona: Persona::Guide,
            choice_override: None,
        }
    }
}

impl ConversationController {
    // ── Dock visibility ─────────────────────────────────────────────

    pub fn dock(&self) -> DockState {
        self.dock
    }

    /// Open the dock. Reopening from Minimized preserves the transcript;
    /// nothing is re-emitted, so the last agent message never duplicates.
    pub fn open_dock(&mut self) {
        self.dock = DockState::Open;
    }

    pub fn minimize_dock(&mut self) {
        if self.dock == DockState::Open {
            self.dock = DockState::Minimized;
        }
    }

    /// Full close clears the transcript and any pending choice override.
    pub fn close_dock(&mut self) {
        self.dock = DockState::Closed;
        self.transcript.clear();
        self.choice_override = None;
    }

    // ── Transcript ──────────────────────────────────────────────────

    pub fn transcript(&self) -> &[TranscriptEntry] {
        self.transcript.entries()
    }

    /// Append a lifecycle emission: the scripted message plus its choice
    /// set as the active override. Duplicate step renders are suppressed by
    /// content equality; a suppressed message leaves the override alone.
    pub fn render_emission(&mut self, emission: &Emission) -> bool {
        if !self.transcript.push_agent(&emission.message) {
            debug!("Duplicate emission suppressed");
            return false;
        }
        if emission.choices.is_empty() {
            self.choice_override = None;
        } else {
            self.choice_override = Some(emission.choices.clone());
        }
        true
    }

    /// Append a plain agent message (greetings, notices).
    pub fn say(&mut self, content: impl Into<String>) -> bool {
        self.transcript.push_agent(content)
    }

    // ── Personas ────────────────────────────────────────────────────

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Switch persona within the same transcript. Clears any pending choice
    /// override and injects the persona's fixed handoff greeting.
    pub fn switch_persona(&mut self, persona: Persona) {
        if persona == self.persona {
            return;
        }
        self.persona = persona;
        self.choice_override = None;
        self.transcript.push_agent(persona.handoff_greeting());
    }

    // ── Choices ─────────────────────────────────────────────────────

    /// The choice set to render: the active override wins over the page's
    /// policy-filtered defaults.
    pub fn current_choices(
        &self,
        page: PageId,
        knowledge: &KnowledgeMap,
        policy: &UiPolicy,
        config: &GuideConfig,
    ) -> Vec<Choice> {
        match &self.choice_override {
            Some(choices) => choices.clone(),
            None => apply_choice_policy(&knowledge.lookup(page).default_choices, policy, config),
        }
    }

    pub fn clear_choice_override(&mut self) {
        self.choice_override = None;
    }

    // ── Free-text turns ─────────────────────────────────────────────

    /// Handle a free-text user turn. Empty/whitespace input creates no turn.
    /// Returns `true` when an agent reply was appended (i.e. guidance was
    /// shown).
    pub async fn handle_free_text(&mut self, text: &str, ctx: TurnContext<'_>) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.transcript.push_user(text);

        match ctx.llm {
            Some(provider) => self.remote_turn(provider, &ctx).await,
            None => self.local_turn(text, &ctx),
        }
    }

    fn local_turn(&mut self, text: &str, ctx: &TurnContext<'_>) -> bool {
        let answer = ctx.answers.evaluate(text, ctx.page, ctx.knowledge);
        debug!(intent = ?answer.intent, "Local answer");
        self.transcript.push_agent(&answer.text);
        let choices = apply_choice_policy(&answer.choices, ctx.policy, ctx.config);
        self.choice_override = if choices.is_empty() {
            None
        } else {
            Some(choices)
        };
        true
    }

    async fn remote_turn(&mut self, provider: &Arc<dyn LlmProvider>, ctx: &TurnContext<'_>) -> bool {
        let mut messages = vec![ChatMessage::system(build_system_prompt(ctx, self.persona))];
        for entry in self.transcript.entries() {
            match entry.role {
                super::SpeakerRole::User => messages.push(ChatMessage::user(&entry.content)),
                super::SpeakerRole::Agent => messages.push(ChatMessage::assistant(&entry.content)),
            }
        }
        debug_assert_eq!(messages.last().map(|m| m.role), Some(Role::User));

        let request = CompletionRequest::new(messages).with_max_tokens(512);
        match provider.complete(request).await {
            Ok(response) => {
                // Appended verbatim, even if the dock was minimized while
                // the call was in flight.
                self.transcript.push_agent(&response.content);
                true
            }
            Err(e) => {
                // The user's turn stays in the transcript; no retry.
                warn!("Remote model call failed: {e}");
                self.transcript.push_agent(REMOTE_FAILURE_NOTICE);
                true
            }
        }
    }

    // ── Check-ins ───────────────────────────────────────────────────

    /// Maybe append a check-in message on a timer tick. Conditions: dock
    /// open, conversation underway, the agent spoke last, silence past the
    /// configured window, and the user isn't in a calm/low-touch state.
    pub fn maybe_check_in(
        &mut self,
        silence_after_guidance_ms: i64,
        policy: &UiPolicy,
        config: &GuideConfig,
    ) -> bool {
        if self.dock != DockState::Open
            || self.transcript.is_empty()
            || policy.intensity == Intensity::Low
            || silence_after_guidance_ms < config.checkin_idle_ms
        {
            return false;
        }
        if !matches!(
            self.transcript.last().map(|e| e.role),
            Some(super::SpeakerRole::Agent)
        ) {
            return false;
        }
        let line = CHECK_IN_LINES[rand::thread_rng().gen_range(0..CHECK_IN_LINES.len())];
        self.transcript.push_agent(line)
    }
}

/// Instruction payload for the remote model: page snapshot, knowledge
/// summary, and persona.
fn build_system_prompt(ctx: &TurnContext<'_>, persona: Persona) -> String {
    let name = ctx.user_name.unwrap_or("the user");
    let persona_line = match persona {
        Persona::Guide => {
            "You are a friendly in-app guide for a consumer financial-education app. \
             Keep answers to 2-3 sentences, plain language, no jargon."
        }
        Persona::Coach => {
            "You are Coach Sam, a motivational money coach inside a financial-education app. \
             Be encouraging and goal-oriented; keep answers to 2-3 sentences."
        }
    };
    format!(
        "{persona_line}\n\nYou are talking to {name}, currently on {page}.\n{summary}\n\
         Only answer questions about the app and personal-finance basics. \
         Never give individualized financial advice.",
        page = ctx.page.label(),
        summary = ctx.knowledge.summary(ctx.page),
    )
}
