//! Per-page knowledge — page identity, guidance text, default choices, and
//! the rule-based answer engine that serves free-text questions when no
//! remote model credential is configured.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::ActionTag;
use crate::policy::Choice;

/// Closed enumeration of app surfaces the agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageId {
    Dashboard,
    CreditLab,
    Lessons,
    Rewards,
    Settings,
    Unknown,
}

impl PageId {
    /// Map a route path to a page. Anything unrecognized is `Unknown`.
    pub fn from_route(path: &str) -> PageId {
        let trimmed = path.trim_start_matches('/');
        let first = trimmed.split('/').next().unwrap_or("");
        match first {
            "" | "dashboard" | "home" => PageId::Dashboard,
            "credit-lab" | "credit_lab" => PageId::CreditLab,
            "lessons" | "learn" => PageId::Lessons,
            "rewards" | "points" => PageId::Rewards,
            "settings" | "account" => PageId::Settings,
            _ => PageId::Unknown,
        }
    }

    /// Human label used in prompts and greetings.
    pub fn label(&self) -> &'static str {
        match self {
            PageId::Dashboard => "your dashboard",
            PageId::CreditLab => "the credit lab",
            PageId::Lessons => "your lessons",
            PageId::Rewards => "your rewards",
            PageId::Settings => "settings",
            PageId::Unknown => "this page",
        }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PageId::Dashboard => "dashboard",
            PageId::CreditLab => "credit_lab",
            PageId::Lessons => "lessons",
            PageId::Rewards => "rewards",
            PageId::Settings => "settings",
            PageId::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// What the agent knows about one page.
#[derive(Debug, Clone)]
pub struct PageKnowledge {
    pub guidance: String,
    pub default_choices: Vec<Choice>,
    pub next_best_action: String,
}

/// Total map from page to knowledge; unmapped pages get the `Unknown` entry.
#[derive(Debug, Clone)]
pub struct KnowledgeMap {
    entries: Vec<(PageId, PageKnowledge)>,
    unknown: PageKnowledge,
}

impl KnowledgeMap {
    pub fn with_defaults() -> Self {
        let entries = vec![
            (
                PageId::Dashboard,
                PageKnowledge {
                    guidance: "This is your home base. Your progress, streak, and next lesson all live here.".into(),
                    default_choices: vec![
                        Choice::new("Show me around", ActionTag::ShowMeHow),
                        Choice::new("What should I do next?", ActionTag::FreeText("what should I do next".into())),
                        Choice::new("Talk to my coach", ActionTag::SwitchToCoach),
                    ],
                    next_best_action: "Open today's lesson to keep your streak going.".into(),
                },
            ),
            (
                PageId::CreditLab,
                PageKnowledge {
                    guidance: "The credit lab simulates how everyday choices move a credit score. Nothing here touches your real credit.".into(),
                    default_choices: vec![
                        Choice::new("Walk me through it", ActionTag::ShowMeHow),
                        Choice::new("Why did my score drop?", ActionTag::FreeText("why did my score drop".into())),
                        Choice::new("What's utilization?", ActionTag::FreeText("what is utilization".into())),
                    ],
                    next_best_action: "Try the utilization slider and watch the projected score.".into(),
                },
            ),
            (
                PageId::Lessons,
                PageKnowledge {
                    guidance: "Lessons are short and sequential. Finishing one earns points toward rewards.".into(),
                    default_choices: vec![
                        Choice::new("Pick a lesson for me", ActionTag::FreeText("pick a lesson for me".into())),
                        Choice::new("How do points work?", ActionTag::FreeText("how do points work".into())),
                    ],
                    next_best_action: "Resume the lesson you left off on.".into(),
                },
            ),
            (
                PageId::Rewards,
                PageKnowledge {
                    guidance: "Points from lessons redeem here. Certificates unlock when a course is complete.".into(),
                    default_choices: vec![
                        Choice::new("How do I earn more?", ActionTag::FreeText("how do I earn more points".into())),
                        Choice::new("Show my certificates", ActionTag::FreeText("show my certificates".into())),
                    ],
                    next_best_action: "Check how close you are to your next redemption.".into(),
                },
            ),
            (
                PageId::Settings,
                PageKnowledge {
                    guidance: "Account, notifications, and membership controls live here.".into(),
                    default_choices: vec![
                        Choice::new("Pause my membership", ActionTag::StartPause),
                        Choice::new("Change notifications", ActionTag::FreeText("change my notifications".into())),
                    ],
                    next_best_action: "Review your notification schedule.".into(),
                },
            ),
        ];
        let unknown = PageKnowledge {
            guidance: "I don't know this page well yet, but I can still answer general questions or take you somewhere familiar.".into(),
            default_choices: vec![
                Choice::new("Take me to my dashboard", ActionTag::FreeText("take me to my dashboard".into())),
                Choice::new("What can you help with?", ActionTag::FreeText("what can you help with".into())),
            ],
            next_best_action: "Head back to the dashboard.".into(),
        };
        Self { entries, unknown }
    }

    /// Total lookup: unmapped pages fall back to the `Unknown` entry.
    pub fn lookup(&self, page: PageId) -> &PageKnowledge {
        self.entries
            .iter()
            .find(|(p, _)| *p == page)
            .map(|(_, k)| k)
            .unwrap_or(&self.unknown)
    }

    /// One-paragraph summary for the remote-model instruction payload.
    pub fn summary(&self, page: PageId) -> String {
        let entry = self.lookup(page);
        format!(
            "Page: {}. {} Next best action: {}",
            page.label(),
            entry.guidance,
            entry.next_best_action
        )
    }
}

/// What a free-text question resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerIntent {
    CreditBasics,
    Points,
    Progress,
    PauseHelp,
    NextBestAction,
    PageGuidance,
}

/// A local answer to a free-text question.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub intent: AnswerIntent,
    pub choices: Vec<Choice>,
}

struct AnswerRule {
    regex: Regex,
    intent: AnswerIntent,
    text: &'static str,
}

/// Deterministic rules engine for free-text questions.
///
/// Ordered cascade: the first matching rule wins. An unmatched question
/// falls back to the page's guidance text, so evaluation is total.
pub struct AnswerEngine {
    rules: Vec<AnswerRule>,
}

impl AnswerEngine {
    pub fn with_defaults() -> Self {
        let rules = vec![
            AnswerRule {
                regex: Regex::new(r"(?i)\b(pause|cancel|quit|stop.*membership|unsubscribe)\b").unwrap(),
                intent: AnswerIntent::PauseHelp,
                text: "You can pause your membership any time — your progress and points stay put while you're away.",
            },
            AnswerRule {
                regex: Regex::new(r"(?i)\b(credit score|utilization|apr|interest|credit)\b").unwrap(),
                intent: AnswerIntent::CreditBasics,
                text: "Short version: paying on time and keeping utilization under about 30% are the two biggest levers on a credit score. The credit lab lets you try both safely.",
            },
            AnswerRule {
                regex: Regex::new(r"(?i)\b(points?|rewards?|redeem|earn)\b").unwrap(),
                intent: AnswerIntent::Points,
                text: "You earn points by finishing lessons — each one adds to your balance, and you redeem them on the rewards page.",
            },
            AnswerRule {
                regex: Regex::new(r"(?i)\b(progress|streak|how am i doing|certificate)\b").unwrap(),
                intent: AnswerIntent::Progress,
                text: "Your dashboard tracks your streak and completed lessons; certificates appear under rewards once a course is done.",
            },
            AnswerRule {
                regex: Regex::new(r"(?i)\b(next|what should i do|where do i start|stuck)\b").unwrap(),
                intent: AnswerIntent::NextBestAction,
                text: "", // Filled from the page's next-best-action.
            },
        ];
        Self { rules }
    }

    /// Answer a question in the context of one page. Never fails.
    pub fn evaluate(&self, question: &str, page: PageId, knowledge: &KnowledgeMap) -> Answer {
        let entry = knowledge.lookup(page);
        for rule in &self.rules {
            if rule.regex.is_match(question) {
                debug!(page = %page, intent = ?rule.intent, "Answer rule matched");
                let text = match rule.intent {
                    AnswerIntent::NextBestAction => entry.next_best_action.clone(),
                    _ => rule.text.to_string(),
                };
                return Answer {
                    text,
                    intent: rule.intent,
                    choices: entry.default_choices.clone(),
                };
            }
        }
        // No rule matched — fall back to page guidance.
        Answer {
            text: entry.guidance.clone(),
            intent: AnswerIntent::PageGuidance,
            choices: entry.default_choices.clone(),
        }
    }
}
