use thiserror::Error;

/// Message fragments CDP reports when the page's JavaScript world was torn down
/// under an in-flight call (navigation, hydration, React remount).
const TRANSIENT_MARKERS: &[&str] = &[
    "Execution context was destroyed",
    "Cannot find context with specified id",
    "Inspected target navigated or closed",
];

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No open tab matches '{0}'")]
    TabNotFound(String),

    #[error("Input not ready: {0}")]
    InputNotReady(String),

    #[error("Timed out waiting for a complete response after {0} ms")]
    ResponseTimeout(u64),

    #[error("Transient read failure: {0}")]
    TransientRead(String),

    #[error("Artifact extraction failed: {0}")]
    ArtifactExtraction(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl AppError {
    /// Classify a raw CDP / evaluation failure message.
    pub fn from_cdp_message(context: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if TRANSIENT_MARKERS.iter().any(|m| message.contains(m)) {
            AppError::TransientRead(format!("{}: {}", context, message))
        } else {
            AppError::Browser(format!("{}: {}", context, message))
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientRead(_))
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::from_cdp_message("CDP", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
