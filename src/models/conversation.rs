use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// One prompt/response cycle. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub index: usize,
    pub prompt: String,
    pub response: Option<String>,
    pub artifact: Option<String>,
    pub status: TurnStatus,
    pub response_path: Option<PathBuf>,
    pub artifact_path: Option<PathBuf>,
}

impl Turn {
    pub fn new(index: usize, prompt: impl Into<String>) -> Self {
        Self {
            index,
            prompt: prompt.into(),
            response: None,
            artifact: None,
            status: TurnStatus::Pending,
            response_path: None,
            artifact_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum TurnStatus {
    Pending,
    Completed,
    InputNotReady(String),
    TimedOut,
    Failed(String),
}

/// Outcome of waiting for a reply. `text` is empty unless `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub success: bool,
    pub text: String,
}

impl Completion {
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            success: false,
            text: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSource {
    Clipboard,
    Panel,
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSource::Clipboard => write!(f, "clipboard"),
            ArtifactSource::Panel => write!(f, "panel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactOutcome {
    NotPresent,
    Extracted {
        source: ArtifactSource,
        code: String,
        path: PathBuf,
    },
    Failed(String),
}

impl ArtifactOutcome {
    pub fn code(&self) -> Option<&str> {
        match self {
            ArtifactOutcome::Extracted { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ArtifactOutcome::Extracted { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum AbortReason {
    TabNotFound { target: String },
    InputNotReady { turn: usize },
    ResponseTimeout { turn: usize },
    Failed { turn: usize, message: String },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::TabNotFound { target } => write!(f, "no tab matching '{}'", target),
            AbortReason::InputNotReady { turn } => write!(f, "input not ready on turn {}", turn),
            AbortReason::ResponseTimeout { turn } => write!(f, "response timed out on turn {}", turn),
            AbortReason::Failed { turn, message } => write!(f, "turn {} failed: {}", turn, message),
        }
    }
}

/// Run driver states. Turn numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RunState {
    Idle,
    TabFound,
    Sending { turn: usize },
    AwaitingCompletion { turn: usize },
    ExtractingArtifact { turn: usize },
    Saved { turn: usize },
    Done,
    Aborted(AbortReason),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted(_))
    }

    /// Whether the driver may move from `self` to `next`.
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Idle, TabFound) => true,
            (Idle, Aborted(AbortReason::TabNotFound { .. })) => true,
            (TabFound, Sending { turn }) => *turn == 1,
            (TabFound, Done) => true,
            (TabFound, Aborted(_)) => true,
            (Sending { turn: a }, AwaitingCompletion { turn: b }) => a == b,
            (Sending { .. }, Aborted(_)) => true,
            (AwaitingCompletion { turn: a }, ExtractingArtifact { turn: b }) => a == b,
            (AwaitingCompletion { .. }, Aborted(_)) => true,
            (ExtractingArtifact { turn: a }, Saved { turn: b }) => a == b,
            (Saved { turn: a }, Sending { turn: b }) => *b == a + 1,
            (Saved { .. }, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::TabFound => write!(f, "tab found"),
            RunState::Sending { turn } => write!(f, "sending turn {}", turn),
            RunState::AwaitingCompletion { turn } => write!(f, "awaiting completion of turn {}", turn),
            RunState::ExtractingArtifact { turn } => write!(f, "extracting artifact of turn {}", turn),
            RunState::Saved { turn } => write!(f, "saved turn {}", turn),
            RunState::Done => write!(f, "done"),
            RunState::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub target: String,
    pub selector_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub final_state: RunState,
    pub turns: Vec<Turn>,
}

impl RunReport {
    pub fn new(target: impl Into<String>, selector_version: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target: target.into(),
            selector_version: selector_version.into(),
            started_at: Utc::now(),
            finished_at: None,
            final_state: RunState::Idle,
            turns: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.final_state == RunState::Done
    }

    pub fn completed_turns(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.status == TurnStatus::Completed)
            .count()
    }
}

/// First `max_chars` characters of `text`, with `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
