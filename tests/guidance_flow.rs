//! End-to-end guidance flows through the public agent API.
//!
//! Each test drives a [`GuidanceAgent`] with a manual clock and an in-memory
//! (or temp-file libsql) store, so timing-sensitive behavior is exercised
//! without real waits and without any remote model.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use guide_agent::agent::{GuidanceAgent, UserProfile};
use guide_agent::clock::ManualClock;
use guide_agent::config::GuideConfig;
use guide_agent::conversation::{Persona, SpeakerRole};
use guide_agent::emotion::EmotionState;
use guide_agent::error::LlmError;
use guide_agent::events::{ActionTag, AgentEvent};
use guide_agent::host::{Navigator, NoopHost};
use guide_agent::knowledge::PageId;
use guide_agent::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use guide_agent::policy::{Intensity, UiMode};
use guide_agent::store::{LibSqlBackend, MemoryStore, StateStore};
use guide_agent::summon::SummonReason;

/// Records navigation requests for assertions.
#[derive(Default)]
struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn go_to(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}

/// Stub remote provider (no real API calls).
struct StubLlm {
    reply: Option<&'static str>,
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        match self.reply {
            Some(reply) => Ok(CompletionResponse {
                content: reply.to_string(),
                model: "stub".to_string(),
            }),
            None => Err(LlmError::RequestFailed {
                provider: "stub".to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

struct Harness {
    agent: GuidanceAgent,
    clock: Arc<ManualClock>,
    navigator: Arc<RecordingNavigator>,
    store: Arc<dyn StateStore>,
}

fn harness_with_llm(llm: Option<Arc<dyn LlmProvider>>) -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let navigator = Arc::new(RecordingNavigator::default());
    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::default());
    let agent = GuidanceAgent::new(
        GuideConfig::default(),
        UserProfile::new("user-1", Some("Maya".to_string())),
        clock.clone(),
        store.clone(),
        navigator.clone(),
        Arc::new(NoopHost),
        llm,
    );
    Harness {
        agent,
        clock,
        navigator,
        store,
    }
}

fn harness() -> Harness {
    harness_with_llm(None)
}

async fn send(agent: &mut GuidanceAgent, events: &[AgentEvent]) {
    for event in events {
        agent.handle_event(event.clone()).await.unwrap();
    }
}

fn last_agent_message(agent: &GuidanceAgent) -> String {
    agent
        .transcript()
        .iter()
        .rev()
        .find(|e| e.role == SpeakerRole::Agent)
        .map(|e| e.content.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn onboarding_walkthrough_to_completion() {
    let mut h = harness();
    send(
        &mut h.agent,
        &[AgentEvent::Navigated(PageId::Dashboard)],
    )
    .await;
    assert!(last_agent_message(&h.agent).contains("two-minute tour"));
    // The welcome offers both the tour and an explicit skip.
    let labels: Vec<String> = h.agent.choices().iter().map(|c| c.label.clone()).collect();
    assert!(labels.contains(&"I'll explore on my own".to_string()));

    send(
        &mut h.agent,
        &[
            AgentEvent::ChoiceSelected(ActionTag::TakeTour),
            AgentEvent::ChoiceSelected(ActionTag::Continue),
            AgentEvent::ChoiceSelected(ActionTag::GuideMe),
        ],
    )
    .await;
    // The first-win step navigated the host.
    assert_eq!(
        h.navigator.paths.lock().unwrap().as_slice(),
        ["/lessons/first-win"]
    );

    send(
        &mut h.agent,
        &[
            AgentEvent::ChoiceSelected(ActionTag::Continue),
            AgentEvent::ChoiceSelected(ActionTag::Later),
        ],
    )
    .await;
    assert!(last_agent_message(&h.agent).contains("all set"));

    // Persisted: a fresh agent over the same store sees onboarding Done and
    // does not restart it on the next dashboard visit.
    let mut second = GuidanceAgent::new(
        GuideConfig::default(),
        UserProfile::new("user-1", Some("Maya".to_string())),
        h.clock.clone(),
        h.store.clone(),
        Arc::new(NoopHost),
        Arc::new(NoopHost),
        None,
    );
    second.hydrate().await.unwrap();
    send(&mut second, &[AgentEvent::Navigated(PageId::Dashboard)]).await;
    assert!(second.transcript().is_empty());
}

#[tokio::test]
async fn reload_mid_onboarding_re_presents_current_step() {
    let h = harness();
    let mut first = h.agent;
    send(
        &mut first,
        &[
            AgentEvent::Navigated(PageId::Dashboard),
            AgentEvent::ChoiceSelected(ActionTag::TakeTour),
        ],
    )
    .await;
    drop(first);

    // A fresh session over the same store lands back on the Tour step with
    // its prompt and actions visible, not an empty dock.
    let mut second = GuidanceAgent::new(
        GuideConfig::default(),
        UserProfile::new("user-1", Some("Maya".to_string())),
        h.clock.clone(),
        h.store.clone(),
        Arc::new(NoopHost),
        Arc::new(NoopHost),
        None,
    );
    second.hydrate().await.unwrap();
    assert!(last_agent_message(&second).contains("Ready for the fun part"));
    let actions: Vec<ActionTag> = second.choices().iter().map(|c| c.action.clone()).collect();
    assert!(actions.contains(&ActionTag::Continue));
    assert!(actions.contains(&ActionTag::SkipOnboarding));

    // The flow is resumable from here.
    send(
        &mut second,
        &[
            AgentEvent::Navigated(PageId::Dashboard),
            AgentEvent::ChoiceSelected(ActionTag::Continue),
        ],
    )
    .await;
    assert!(last_agent_message(&second).contains("first win"));
}

#[tokio::test]
async fn reload_with_pending_reentry_re_presents_and_unblocks() {
    let h = harness();
    let mut first = h.agent;
    send(&mut first, &[AgentEvent::ReturningUserDetected]).await;
    drop(first);

    let mut second = GuidanceAgent::new(
        GuideConfig::default(),
        UserProfile::new("user-1", Some("Maya".to_string())),
        h.clock.clone(),
        h.store.clone(),
        Arc::new(NoopHost),
        Arc::new(NoopHost),
        None,
    );
    second.hydrate().await.unwrap();
    assert!(last_agent_message(&second).contains("Welcome back"));
    let actions: Vec<ActionTag> = second.choices().iter().map(|c| c.action.clone()).collect();
    assert!(actions.contains(&ActionTag::ResumeJourney));

    // Resolving the prompt lifts the hold on onboarding.
    send(
        &mut second,
        &[
            AgentEvent::ChoiceSelected(ActionTag::FreshStart),
            AgentEvent::Navigated(PageId::Dashboard),
        ],
    )
    .await;
    assert!(last_agent_message(&second).contains("two-minute tour"));
}

#[tokio::test]
async fn typed_skip_label_ends_onboarding_at_welcome() {
    let mut h = harness();
    send(
        &mut h.agent,
        &[
            AgentEvent::Navigated(PageId::Dashboard),
            // Typing a visible choice label acts like tapping it.
            AgentEvent::UserText("I'll explore on my own".to_string()),
        ],
    )
    .await;
    assert!(last_agent_message(&h.agent).contains("your own pace"));
    // No further onboarding prompts on later visits.
    send(&mut h.agent, &[AgentEvent::Navigated(PageId::Lessons)]).await;
    send(&mut h.agent, &[AgentEvent::Navigated(PageId::Dashboard)]).await;
    assert!(!last_agent_message(&h.agent).contains("tour"));
}

#[tokio::test]
async fn struggle_signals_simplify_ui_and_cap_choices() {
    let mut h = harness();
    // Bouncing between two pages, no dashboard so onboarding stays idle.
    for page in [
        PageId::CreditLab,
        PageId::Lessons,
        PageId::CreditLab,
        PageId::Lessons,
        PageId::CreditLab,
    ] {
        h.clock.advance_ms(2_000);
        send(&mut h.agent, &[AgentEvent::Navigated(page)]).await;
    }
    // A rapid click burst on top.
    for _ in 0..6 {
        h.clock.advance_ms(100);
        send(&mut h.agent, &[AgentEvent::Clicked]).await;
    }

    assert_eq!(h.agent.emotion(), EmotionState::Overwhelmed);
    assert_eq!(h.agent.policy().intensity, Intensity::High);
    assert_eq!(h.agent.policy().ui_mode, UiMode::Simplified);

    // Signals crossed the summon threshold too.
    assert!(h.agent.summon().should_summon);
    assert_eq!(h.agent.summon().reason, SummonReason::SignalThreshold);

    // Choice caps apply once the summon prompt is answered away.
    send(
        &mut h.agent,
        &[AgentEvent::ChoiceSelected(ActionTag::FreeText(
            "what is utilization".to_string(),
        ))],
    )
    .await;
    let choices = h.agent.choices();
    assert!(choices.len() <= 3);
    // The walkthrough escape hatch is promoted to the front.
    assert_eq!(choices[0].action, ActionTag::ShowMeHow);
}

#[tokio::test]
async fn decline_cooldown_expires_with_time() {
    let mut h = harness();
    send(&mut h.agent, &[AgentEvent::Navigated(PageId::CreditLab)]).await;

    // Build up struggle signals, then decline the resulting summon.
    for _ in 0..8 {
        h.clock.advance_ms(100);
        send(&mut h.agent, &[AgentEvent::Clicked]).await;
    }
    assert!(h.agent.summon().should_summon);
    send(&mut h.agent, &[AgentEvent::SummonDeclined]).await;

    // More struggle inside the cooldown: still quiet.
    for _ in 0..8 {
        h.clock.advance_ms(100);
        send(&mut h.agent, &[AgentEvent::Clicked]).await;
    }
    assert!(!h.agent.summon().should_summon);

    // Past the three-minute cooldown the tick clears the flag and the same
    // signals summon again.
    h.clock.advance_ms(200_000);
    send(&mut h.agent, &[AgentEvent::CheckInTick]).await;
    for _ in 0..8 {
        h.clock.advance_ms(100);
        send(&mut h.agent, &[AgentEvent::Clicked]).await;
    }
    assert!(h.agent.summon().should_summon);
}

#[tokio::test]
async fn questions_on_unknown_pages_still_get_answers() {
    let mut h = harness();
    send(
        &mut h.agent,
        &[
            AgentEvent::Navigated(PageId::Unknown),
            AgentEvent::UserText("what is this page?".to_string()),
        ],
    )
    .await;
    let reply = last_agent_message(&h.agent);
    assert!(!reply.is_empty());
}

#[tokio::test]
async fn pause_flow_survives_agent_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("guide.db");
    let store: Arc<dyn StateStore> = Arc::new(LibSqlBackend::new_local(&db_path).await.unwrap());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let profile = UserProfile::new("user-1", None);

    let mut agent = GuidanceAgent::new(
        GuideConfig::default(),
        profile.clone(),
        clock.clone(),
        store,
        Arc::new(NoopHost),
        Arc::new(NoopHost),
        None,
    );
    send(
        &mut agent,
        &[
            AgentEvent::Navigated(PageId::Settings),
            AgentEvent::ChoiceSelected(ActionTag::StartPause),
            AgentEvent::ChoiceSelected(ActionTag::ConfirmPause),
        ],
    )
    .await;
    drop(agent);

    // Fresh process over the same database file.
    let store: Arc<dyn StateStore> = Arc::new(LibSqlBackend::new_local(&db_path).await.unwrap());
    let mut agent = GuidanceAgent::new(
        GuideConfig::default(),
        profile,
        clock,
        store,
        Arc::new(NoopHost),
        Arc::new(NoopHost),
        None,
    );
    agent.hydrate().await.unwrap();
    // The paused prompt is back on screen with its actions.
    assert!(last_agent_message(&agent).contains("paused"));
    let resume = agent
        .choices()
        .into_iter()
        .find(|c| c.action == ActionTag::ResumePlan)
        .expect("resume choice visible after reload");
    send(&mut agent, &[AgentEvent::ChoiceSelected(resume.action)]).await;
    assert!(last_agent_message(&agent).to_lowercase().contains("back"));
}

#[tokio::test]
async fn reentry_outranks_onboarding_and_resolves_once() {
    let mut h = harness();
    send(
        &mut h.agent,
        &[
            AgentEvent::ReturningUserDetected,
            AgentEvent::Navigated(PageId::Dashboard),
        ],
    )
    .await;
    // The welcome-back prompt won the floor; onboarding never spoke.
    assert!(last_agent_message(&h.agent).contains("Welcome back"));

    send(
        &mut h.agent,
        &[AgentEvent::ChoiceSelected(ActionTag::ResumeJourney)],
    )
    .await;
    assert_eq!(h.navigator.paths.lock().unwrap().as_slice(), ["/lessons"]);

    // A second detection in the same session would be a new prompt, but a
    // resolved state stays resolved for ordinary events.
    send(&mut h.agent, &[AgentEvent::Navigated(PageId::Lessons)]).await;
    assert!(!last_agent_message(&h.agent).contains("Welcome back"));
}

#[tokio::test]
async fn playbook_walkthrough_with_minimized_dock() {
    let mut h = harness();
    send(
        &mut h.agent,
        &[
            AgentEvent::Navigated(PageId::CreditLab),
            AgentEvent::DockOpened,
            AgentEvent::ChoiceSelected(ActionTag::ShowMeHow),
        ],
    )
    .await;

    let first = h.agent.playbook_step().unwrap().clone();
    assert_eq!(first.target_selector, "#scenario-picker");

    h.agent.advance_playbook();
    assert_eq!(
        h.agent.playbook_step().unwrap().target_selector,
        "#payment-slider"
    );

    h.agent.advance_playbook();
    h.agent.advance_playbook();
    // Finished: no active step, completion note in the transcript.
    assert!(h.agent.playbook_step().is_none());
    assert!(last_agent_message(&h.agent).contains("whole tour"));
}

#[tokio::test]
async fn persona_handoff_shares_the_transcript() {
    let mut h = harness();
    send(
        &mut h.agent,
        &[
            AgentEvent::Navigated(PageId::Lessons),
            AgentEvent::UserText("how do points work?".to_string()),
            AgentEvent::PersonaSwitched(Persona::Coach),
        ],
    )
    .await;
    assert_eq!(h.agent.persona(), Persona::Coach);
    assert!(last_agent_message(&h.agent).contains("Coach Sam"));
    // Earlier turns are still there.
    assert!(h
        .agent
        .transcript()
        .iter()
        .any(|e| e.role == SpeakerRole::User && e.content.contains("points")));
}

#[tokio::test]
async fn remote_reply_is_appended_verbatim() {
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm {
        reply: Some("Utilization is how much of your limit you're using."),
    });
    let mut h = harness_with_llm(Some(llm));
    send(
        &mut h.agent,
        &[
            AgentEvent::Navigated(PageId::CreditLab),
            AgentEvent::UserText("what is utilization?".to_string()),
        ],
    )
    .await;
    assert_eq!(
        last_agent_message(&h.agent),
        "Utilization is how much of your limit you're using."
    );
}

#[tokio::test]
async fn remote_failure_degrades_to_notice() {
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm { reply: None });
    let mut h = harness_with_llm(Some(llm));
    send(
        &mut h.agent,
        &[
            AgentEvent::Navigated(PageId::CreditLab),
            AgentEvent::UserText("what is utilization?".to_string()),
        ],
    )
    .await;
    // The user's turn is kept and a transient notice replaces the answer.
    assert!(h
        .agent
        .transcript()
        .iter()
        .any(|e| e.role == SpeakerRole::User));
    assert!(last_agent_message(&h.agent).contains("try"));
}
