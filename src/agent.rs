//! The guidance agent — event loop, dispatch, and wiring.
//!
//! Everything below the agent is a pure function or a self-contained state
//! machine; this module is the only place their outputs meet. Each incoming
//! [`AgentEvent`] follows the same shape: update telemetry or a machine,
//! persist any state change, let the arbiter pick one emission, render it.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::GuideConfig;
use crate::conversation::controller::TurnContext;
use crate::conversation::{ConversationController, Persona, TranscriptEntry};
use crate::emotion::{classify, Classification, EmotionState, PageContext};
use crate::error::{Result, StorageError};
use crate::events::{ActionTag, AgentEvent};
use crate::host::{Navigator, Voice};
use crate::knowledge::{AnswerEngine, KnowledgeMap, PageId};
use crate::lifecycle::{
    state_keys, Arbiter, CancellationMachine, Effect, OnboardingMachine, OnboardingState,
    ReEntryMachine, Transition,
};
use crate::llm::LlmProvider;
use crate::playbook::{PlaybookEngine, PlaybookRegistry, PlaybookStep};
use crate::policy::{resolve_policy, Choice, UiPolicy};
use crate::store::StateStore;
use crate::summon::{decide_summon, CooldownTracker, SummonDecision, SummonFlags};
use crate::telemetry::TelemetryAggregator;

const VOICE_UNAVAILABLE_NOTICE: &str =
    "Looks like I can't use voice right now — no problem, we'll keep chatting right here.";

/// Who the agent is guiding.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, user_name: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name,
        }
    }
}

pub struct GuidanceAgent {
    config: GuideConfig,
    profile: UserProfile,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StateStore>,
    navigator: Arc<dyn Navigator>,
    voice: Arc<dyn Voice>,
    llm: Option<Arc<dyn LlmProvider>>,

    knowledge: KnowledgeMap,
    answers: AnswerEngine,
    playbooks: PlaybookRegistry,

    telemetry: TelemetryAggregator,
    cooldown: CooldownTracker,
    onboarding: OnboardingMachine,
    cancellation: CancellationMachine,
    reentry: ReEntryMachine,
    conversation: ConversationController,
    playbook_engine: PlaybookEngine,

    page: PageId,
    emotion: Classification,
    policy: UiPolicy,
    summon: SummonDecision,
    voice_notice_sent: bool,
}

impl GuidanceAgent {
    pub fn new(
        config: GuideConfig,
        profile: UserProfile,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore>,
        navigator: Arc<dyn Navigator>,
        voice: Arc<dyn Voice>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let telemetry = TelemetryAggregator::new(&config);
        let page = PageId::Unknown;
        let emotion = classify(
            &telemetry.snapshot(clock.now()),
            &PageContext {
                page,
                user_name: profile.user_name.clone(),
            },
            &config,
        );
        let policy = resolve_policy(emotion.state);
        let summon = decide_summon(
            &telemetry.snapshot(clock.now()),
            &policy,
            &SummonFlags::default(),
            &config,
        );
        Self {
            config,
            profile,
            clock,
            store,
            navigator,
            voice,
            llm,
            knowledge: KnowledgeMap::with_defaults(),
            answers: AnswerEngine::with_defaults(),
            playbooks: PlaybookRegistry::with_defaults(),
            telemetry,
            cooldown: CooldownTracker::default(),
            onboarding: OnboardingMachine::default(),
            cancellation: CancellationMachine::default(),
            reentry: ReEntryMachine::default(),
            conversation: ConversationController::default(),
            playbook_engine: PlaybookEngine::default(),
            page,
            emotion,
            policy,
            summon,
            voice_notice_sent: false,
        }
    }

    /// Load persisted lifecycle state for this user. Missing keys leave the
    /// machines at their defaults; a corrupt value is logged and discarded
    /// rather than bricking the session.
    ///
    /// A machine rehydrated mid-flow re-presents its current step's prompt
    /// and choices, so a reload resumes exactly where the user left off.
    /// The transcript's content-equality check suppresses a duplicate if
    /// the prompt was already the last agent message.
    pub async fn hydrate(&mut self) -> Result<()> {
        if let Some(state) = self.load(state_keys::ONBOARDING).await? {
            self.onboarding = OnboardingMachine::from_state(state);
        }
        if let Some(state) = self.load(state_keys::CANCELLATION).await? {
            self.cancellation = CancellationMachine::from_state(state);
        }
        if let Some(state) = self.load(state_keys::REENTRY).await? {
            self.reentry = ReEntryMachine::from_state(state);
        }
        info!(
            user_id = %self.profile.user_id,
            onboarding = ?self.onboarding.state(),
            cancellation = ?self.cancellation.state(),
            reentry = ?self.reentry.state(),
            "Hydrated lifecycle state"
        );

        let mut arbiter = Arbiter::default();
        if let Some(emission) = self
            .reentry
            .current_emission(self.profile.user_name.as_deref())
        {
            arbiter.submit(emission);
        }
        if let Some(emission) = self.cancellation.current_emission() {
            arbiter.submit(emission);
        }
        if let Some(emission) = self.onboarding.current_emission() {
            arbiter.submit(emission);
        }
        self.render_winner(&mut arbiter);
        Ok(())
    }

    async fn load<S: DeserializeOwned>(&self, key: &str) -> Result<Option<S>> {
        let Some(value) = self.store.get_state(&self.profile.user_id, key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(key, "Discarding unreadable persisted state: {e}");
                Ok(None)
            }
        }
    }

    async fn persist<S: Serialize>(&self, key: &str, state: &S) -> Result<()> {
        let value = serde_json::to_value(state)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store
            .set_state(&self.profile.user_id, key, &value)
            .await?;
        Ok(())
    }

    // ── Read side ───────────────────────────────────────────────────

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn emotion(&self) -> EmotionState {
        self.emotion.state
    }

    pub fn policy(&self) -> &UiPolicy {
        &self.policy
    }

    pub fn summon(&self) -> &SummonDecision {
        &self.summon
    }

    pub fn persona(&self) -> Persona {
        self.conversation.persona()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        self.conversation.transcript()
    }

    pub fn playbook_step(&self) -> Option<&PlaybookStep> {
        self.playbook_engine.current_step()
    }

    /// Choice buttons to render right now, policy-filtered.
    pub fn choices(&self) -> Vec<Choice> {
        self.conversation
            .current_choices(self.page, &self.knowledge, &self.policy, &self.config)
    }

    // ── Event dispatch ──────────────────────────────────────────────

    pub async fn handle_event(&mut self, event: AgentEvent) -> Result<()> {
        let now = self.clock.now();
        debug!(?event, "Handling event");
        let mut arbiter = Arbiter::default();

        match event {
            AgentEvent::Navigated(page) => {
                self.page = page;
                self.telemetry.reset(now);
                self.telemetry.observe_navigation(page, now);
                self.reevaluate();

                // First landing on the dashboard kicks off onboarding,
                // unless a higher-priority flow already has the floor.
                if page == PageId::Dashboard
                    && self.onboarding.state() == OnboardingState::Idle
                    && !self.reentry.is_pending()
                    && !self.cancellation.in_flow()
                {
                    if let Some(transition) = self.onboarding.start() {
                        self.commit_onboarding(transition, &mut arbiter).await?;
                    }
                }
            }
            AgentEvent::Clicked => {
                self.telemetry.observe_click(now);
                self.reevaluate();
            }
            AgentEvent::Hovered => {
                self.telemetry.observe_hover(now);
                self.reevaluate();
            }
            AgentEvent::HelpRequested => {
                self.telemetry.mark_help_request();
                self.reevaluate();
            }
            AgentEvent::PrimaryActionAttempted => {
                self.telemetry.mark_primary_action_attempt(now);
                self.reevaluate();
            }
            AgentEvent::QuickDecision => {
                self.telemetry.mark_quick_decision(now);
                self.reevaluate();
            }
            AgentEvent::GuideMeClicked => {
                self.summon_on_request();
            }
            AgentEvent::SummonDeclined => {
                self.cooldown.note_decline(now);
                self.conversation.minimize_dock();
                self.reevaluate();
                info!("Summon declined; cooldown started");
            }
            AgentEvent::ReturningUserDetected => {
                if let Some(transition) =
                    self.reentry.set_pending(self.profile.user_name.as_deref())
                {
                    self.persist(state_keys::REENTRY, &transition.next).await?;
                    self.queue(transition, &mut arbiter);
                }
            }
            AgentEvent::DockOpened => self.conversation.open_dock(),
            AgentEvent::DockMinimized => self.conversation.minimize_dock(),
            AgentEvent::DockClosed => self.conversation.close_dock(),
            AgentEvent::ChoiceSelected(action) => {
                self.handle_choice(action, &mut arbiter).await?;
            }
            AgentEvent::UserText(text) => {
                // Typing a visible choice label is the same as tapping it.
                match self.match_choice_label(&text) {
                    Some(action) => self.handle_choice(action, &mut arbiter).await?,
                    None => self.free_text_turn(&text).await,
                }
            }
            AgentEvent::PersonaSwitched(persona) => {
                self.conversation.switch_persona(persona);
            }
            AgentEvent::CheckInTick => {
                self.cooldown.expire_if_elapsed(now, &self.config);
                self.reevaluate();
                let silence = self.telemetry.snapshot(now).silence_after_guidance_ms;
                if self
                    .conversation
                    .maybe_check_in(silence, &self.policy, &self.config)
                {
                    self.telemetry.mark_guidance_shown(now);
                }
            }
            AgentEvent::VoiceUnavailable => {
                if !self.voice_notice_sent {
                    self.conversation.say(VOICE_UNAVAILABLE_NOTICE);
                    self.voice_notice_sent = true;
                }
            }
        }

        self.render_winner(&mut arbiter);
        Ok(())
    }

    /// Route a tapped choice. Lifecycle machines get first claim in
    /// priority order; an unclaimed tag falls through to the playbook and
    /// persona actions, and finally to the free-text path so no tap is
    /// ever silently dropped.
    async fn handle_choice(&mut self, action: ActionTag, arbiter: &mut Arbiter) -> Result<()> {
        self.conversation.clear_choice_override();

        if let Some(transition) = self.reentry.apply(&action) {
            self.persist(state_keys::REENTRY, &transition.next).await?;
            self.queue(transition, arbiter);
            return Ok(());
        }
        if let Some(transition) = self.cancellation.apply(&action) {
            self.persist(state_keys::CANCELLATION, &transition.next)
                .await?;
            self.queue(transition, arbiter);
            return Ok(());
        }
        if let Some(transition) = self.onboarding.apply(&action) {
            self.commit_onboarding(transition, arbiter).await?;
            return Ok(());
        }

        match action {
            ActionTag::ShowMeHow => self.start_playbook(),
            ActionTag::GuideMe => self.summon_on_request(),
            ActionTag::SwitchToCoach => self.conversation.switch_persona(Persona::Coach),
            ActionTag::SwitchToGuide => self.conversation.switch_persona(Persona::Guide),
            other => {
                // No machine claimed it; treat the label as a question.
                let text = other.fallback_text();
                debug!(%text, "Unclaimed choice routed as free text");
                self.free_text_turn(&text).await;
            }
        }
        Ok(())
    }

    async fn commit_onboarding(
        &mut self,
        transition: Transition<OnboardingState>,
        arbiter: &mut Arbiter,
    ) -> Result<()> {
        self.persist(state_keys::ONBOARDING, &transition.next)
            .await?;
        self.queue(transition, arbiter);
        Ok(())
    }

    /// Persisted-state write has already happened; submit the emission and
    /// run side effects.
    fn queue<S>(&mut self, transition: Transition<S>, arbiter: &mut Arbiter) {
        for effect in transition.effects {
            match effect {
                Effect::Navigate(path) => self.navigator.go_to(&path),
            }
        }
        if let Some(emission) = transition.emission {
            arbiter.submit(emission);
        }
    }

    /// Render the highest-priority pending emission, if any.
    fn render_winner(&mut self, arbiter: &mut Arbiter) {
        let Some(emission) = arbiter.take_winner() else {
            return;
        };
        self.conversation.open_dock();
        if self.conversation.render_emission(&emission) {
            self.telemetry.mark_guidance_shown(self.clock.now());
            self.voice
                .speak(&emission.message, self.conversation.persona(), self.policy.ui_mode);
        }
    }

    // ── Evaluation ──────────────────────────────────────────────────

    /// Re-derive emotion, policy, and the summon decision from the current
    /// signals. Pure recomputation; a summon is surfaced only on the rising
    /// edge so unchanged inputs never re-render.
    fn reevaluate(&mut self) {
        let now = self.clock.now();
        let signals = self.telemetry.snapshot(now);
        self.emotion = classify(
            &signals,
            &PageContext {
                page: self.page,
                user_name: self.profile.user_name.clone(),
            },
            &self.config,
        );
        self.policy = resolve_policy(self.emotion.state);

        let flags = SummonFlags {
            user_clicked_guide_me: false,
            user_declined_recently: self.cooldown.declined_recently(now, &self.config),
        };
        let decision = decide_summon(&signals, &self.policy, &flags, &self.config);
        let rising = decision.should_summon && !self.summon.should_summon;
        if rising {
            info!(reason = ?decision.reason, state = ?self.emotion.state, "Proactive summon");
            self.surface_summon(&decision);
        }
        self.summon = decision;
    }

    /// Explicit "guide me": always summons, bypassing the cooldown.
    fn summon_on_request(&mut self) {
        let now = self.clock.now();
        let signals = self.telemetry.snapshot(now);
        let flags = SummonFlags {
            user_clicked_guide_me: true,
            user_declined_recently: self.cooldown.declined_recently(now, &self.config),
        };
        let decision = decide_summon(&signals, &self.policy, &flags, &self.config);
        self.surface_summon(&decision);
        self.summon = decision;
    }

    fn surface_summon(&mut self, decision: &SummonDecision) {
        self.conversation.open_dock();
        self.conversation.say(&self.emotion.opening_line);
        self.conversation.say(&decision.message);
        self.telemetry.mark_guidance_shown(self.clock.now());
        self.voice.speak(
            &self.emotion.opening_line,
            self.conversation.persona(),
            self.policy.ui_mode,
        );
    }

    // ── Conversation paths ──────────────────────────────────────────

    fn match_choice_label(&self, text: &str) -> Option<ActionTag> {
        let text = text.trim();
        self.choices()
            .into_iter()
            .find(|c| c.label.eq_ignore_ascii_case(text))
            .map(|c| c.action)
    }

    async fn free_text_turn(&mut self, text: &str) {
        let replied = self
            .conversation
            .handle_free_text(
                text,
                TurnContext {
                    llm: self.llm.as_ref(),
                    answers: &self.answers,
                    knowledge: &self.knowledge,
                    page: self.page,
                    policy: &self.policy,
                    config: &self.config,
                    user_name: self.profile.user_name.as_deref(),
                },
            )
            .await;
        if replied {
            self.telemetry.mark_guidance_shown(self.clock.now());
        }
    }

    /// Start the current page's walkthrough: dock drops to minimized so the
    /// page stays the focus while the host highlights each step's target.
    fn start_playbook(&mut self) {
        let Some(playbook) = self.playbooks.lookup(self.page) else {
            self.conversation.say(format!(
                "I don't have a walkthrough for {} yet, but ask me anything about it.",
                self.page.label()
            ));
            return;
        };
        if let Some(step) = self.playbook_engine.start(playbook.clone()) {
            let instruction = step.instruction.clone();
            self.conversation.say(&instruction);
            self.conversation.minimize_dock();
            self.telemetry.mark_guidance_shown(self.clock.now());
        }
    }

    /// Advance the active walkthrough; appends the next instruction or a
    /// completion note.
    pub fn advance_playbook(&mut self) {
        if !self.playbook_engine.is_active() {
            return;
        }
        match self.playbook_engine.advance() {
            Some(step) => {
                let instruction = step.instruction.clone();
                self.conversation.say(&instruction);
            }
            None => {
                self.conversation
                    .say("That's the whole tour — you've got this. I'm here if you need me.");
            }
        }
    }

    pub fn exit_playbook(&mut self) {
        self.playbook_engine.exit();
    }
}
