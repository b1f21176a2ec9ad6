use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use guide_agent::agent::{GuidanceAgent, UserProfile};
use guide_agent::clock::SystemClock;
use guide_agent::config::GuideConfig;
use guide_agent::conversation::{Persona, SpeakerRole};
use guide_agent::events::AgentEvent;
use guide_agent::host::NoopHost;
use guide_agent::knowledge::PageId;
use guide_agent::llm::provider_from_env;
use guide_agent::store::{LibSqlBackend, StateStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let db_path =
        std::env::var("GUIDE_DB_PATH").unwrap_or_else(|_| "./data/guide-agent.db".to_string());
    let user_id = std::env::var("GUIDE_USER_ID").unwrap_or_else(|_| "demo-user".to_string());
    let user_name = std::env::var("GUIDE_USER_NAME").ok();

    let llm = provider_from_env();

    eprintln!("🧭 Guide Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", db_path);
    match &llm {
        Some(provider) => eprintln!("   Answers: remote ({})", provider.model_name()),
        None => eprintln!("   Answers: local rules (set ANTHROPIC_API_KEY for remote)"),
    }
    eprintln!("   Commands: /page <route>, /click, /hover, /help, /attempt, /quick,");
    eprintln!("             /guide, /decline, /return, /open, /min, /close,");
    eprintln!("             /choice <n>, /persona <guide|coach>, /next, /exit, /state, /quit");
    eprintln!("   Anything else is sent as a chat message.\n");

    let store: Arc<dyn StateStore> = Arc::new(
        LibSqlBackend::new_local(std::path::Path::new(&db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", db_path, e);
                std::process::exit(1);
            }),
    );

    let config = GuideConfig::default();
    let checkin_interval = config.checkin_interval;
    let mut agent = GuidanceAgent::new(
        config,
        UserProfile::new(user_id, user_name),
        Arc::new(SystemClock),
        store,
        Arc::new(NoopHost),
        Arc::new(NoopHost),
        llm,
    );
    agent.hydrate().await?;
    agent
        .handle_event(AgentEvent::Navigated(PageId::Dashboard))
        .await?;

    let mut printed = 0;
    let mut last_summon = false;
    print_updates(&agent, &mut printed, &mut last_summon);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(checkin_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                agent.handle_event(AgentEvent::CheckInTick).await?;
                print_updates(&agent, &mut printed, &mut last_summon);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                if line == "/next" {
                    agent.advance_playbook();
                    print_updates(&agent, &mut printed, &mut last_summon);
                    continue;
                }
                if line == "/exit" {
                    agent.exit_playbook();
                    continue;
                }
                match command_to_event(line, &agent) {
                    Some(event) => {
                        agent.handle_event(event).await?;
                        print_updates(&agent, &mut printed, &mut last_summon);
                        if let Some(step) = agent.playbook_step() {
                            eprintln!("  [highlight {} — {}]", step.target_selector, step.instruction);
                        }
                    }
                    None => {
                        if line == "/state" {
                            eprintln!(
                                "  page={:?} emotion={:?} intensity={:?} mode={:?} persona={:?}",
                                agent.page(),
                                agent.emotion(),
                                agent.policy().intensity,
                                agent.policy().ui_mode,
                                agent.persona(),
                            );
                        } else {
                            eprintln!("  (unrecognized command: {})", line);
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    eprintln!("\nBye!");
    Ok(())
}

fn command_to_event(line: &str, agent: &GuidanceAgent) -> Option<AgentEvent> {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().unwrap_or_default().trim();

    if !line.starts_with('/') {
        return Some(AgentEvent::UserText(line.to_string()));
    }
    match command {
        "/page" => Some(AgentEvent::Navigated(PageId::from_route(arg))),
        "/click" => Some(AgentEvent::Clicked),
        "/hover" => Some(AgentEvent::Hovered),
        "/help" => Some(AgentEvent::HelpRequested),
        "/attempt" => Some(AgentEvent::PrimaryActionAttempted),
        "/quick" => Some(AgentEvent::QuickDecision),
        "/guide" => Some(AgentEvent::GuideMeClicked),
        "/decline" => Some(AgentEvent::SummonDeclined),
        "/return" => Some(AgentEvent::ReturningUserDetected),
        "/open" => Some(AgentEvent::DockOpened),
        "/min" => Some(AgentEvent::DockMinimized),
        "/close" => Some(AgentEvent::DockClosed),
        "/persona" => match arg {
            "coach" => Some(AgentEvent::PersonaSwitched(Persona::Coach)),
            "guide" => Some(AgentEvent::PersonaSwitched(Persona::Guide)),
            _ => None,
        },
        "/choice" => {
            let index: usize = arg.parse().ok()?;
            let choice = agent.choices().into_iter().nth(index)?;
            Some(AgentEvent::ChoiceSelected(choice.action))
        }
        _ => None,
    }
}

fn print_updates(agent: &GuidanceAgent, printed: &mut usize, last_summon: &mut bool) {
    let transcript = agent.transcript();
    // Full dock close truncates the transcript.
    if transcript.len() < *printed {
        *printed = 0;
    }
    for entry in &transcript[*printed..] {
        match entry.role {
            SpeakerRole::Agent => println!("🧭 {}", entry.content),
            SpeakerRole::User => println!("   you: {}", entry.content),
        }
    }
    *printed = transcript.len();

    let summon = agent.summon();
    if summon.should_summon && !*last_summon {
        eprintln!("  [summon: {:?} intensity={:?}]", summon.reason, summon.intensity);
    }
    *last_summon = summon.should_summon;

    let choices = agent.choices();
    if *printed > 0 && !choices.is_empty() {
        let labels: Vec<String> = choices
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}", i, c.label))
            .collect();
        eprintln!("  choices: {}", labels.join("  "));
    }
}
