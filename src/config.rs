use crate::browser_ai::{self, SelectorSet, DEFAULT_SELECTOR_VERSION};
use crate::error::{AppError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub page: PageConfig,
    pub timing: TimingConfig,
    pub output: OutputConfig,
    pub selectors: SelectorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// `http://host:port` of a browser started with `--remote-debugging-port`,
    /// or its `ws://` debugger URL.
    pub debug_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    /// Substring identifying the chat tab among open pages.
    pub target_url: String,
    pub bring_to_front: bool,
    pub start_new_chat: bool,
    pub submit_with: SubmitMode,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    #[default]
    Click,
    Enter,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub input_ready_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Pause after scrolling the history so lazily rendered messages load.
    pub scroll_settle_ms: u64,
    pub read_retry_attempts: u32,
    pub read_retry_backoff_ms: u64,
    pub copy_button_timeout_ms: u64,
    pub clipboard_settle_ms: u64,
    pub panel_open_settle_ms: u64,
    pub code_region_timeout_ms: u64,
    pub close_panel_timeout_ms: u64,
    pub reload_timeout_ms: u64,
    pub new_chat_timeout_ms: u64,
    pub turn_pause_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub artifact_extension: String,
    pub preview_chars: usize,
    pub write_summary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectorsConfig {
    pub version: String,
    /// Extra or overriding selector sets, by version name.
    pub sets: BTreeMap<String, SelectorSet>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            debug_url: "http://localhost:9222".to_string(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            target_url: "claude.ai".to_string(),
            bring_to_front: true,
            start_new_chat: false,
            submit_with: SubmitMode::Click,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            input_ready_timeout_ms: 10_000,
            response_timeout_ms: 120_000,
            poll_interval_ms: 1_000,
            scroll_settle_ms: 1_000,
            read_retry_attempts: 3,
            read_retry_backoff_ms: 1_000,
            copy_button_timeout_ms: 3_000,
            clipboard_settle_ms: 500,
            panel_open_settle_ms: 2_000,
            code_region_timeout_ms: 10_000,
            close_panel_timeout_ms: 5_000,
            reload_timeout_ms: 15_000,
            new_chat_timeout_ms: 5_000,
            turn_pause_ms: 2_000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("FINAL WORK"),
            artifact_extension: "js".to_string(),
            preview_chars: 1000,
            write_summary: true,
        }
    }
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_SELECTOR_VERSION.to_string(),
            sets: BTreeMap::new(),
        }
    }
}

impl TimingConfig {
    pub fn input_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.input_ready_timeout_ms)
    }
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
    pub fn read_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.read_retry_backoff_ms)
    }
    pub fn copy_button_timeout(&self) -> Duration {
        Duration::from_millis(self.copy_button_timeout_ms)
    }
    pub fn clipboard_settle(&self) -> Duration {
        Duration::from_millis(self.clipboard_settle_ms)
    }
    pub fn panel_open_settle(&self) -> Duration {
        Duration::from_millis(self.panel_open_settle_ms)
    }
    pub fn code_region_timeout(&self) -> Duration {
        Duration::from_millis(self.code_region_timeout_ms)
    }
    pub fn close_panel_timeout(&self) -> Duration {
        Duration::from_millis(self.close_panel_timeout_ms)
    }
    pub fn reload_timeout(&self) -> Duration {
        Duration::from_millis(self.reload_timeout_ms)
    }
    pub fn new_chat_timeout(&self) -> Duration {
        Duration::from_millis(self.new_chat_timeout_ms)
    }
    pub fn turn_pause(&self) -> Duration {
        Duration::from_millis(self.turn_pause_ms)
    }
}

impl SelectorsConfig {
    pub fn resolve(&self) -> Result<SelectorSet> {
        browser_ai::resolve(&self.version, &self.sets).ok_or_else(|| {
            AppError::Configuration(format!(
                "Unknown selector version '{}' (known: {})",
                self.version,
                browser_ai::known_versions(&self.sets).join(", ")
            ))
        })
    }
}

impl Config {
    /// `<config dir>/chatdriver/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("chatdriver").join(CONFIG_FILE_NAME))
    }

    /// Defaults, then the config file, then environment variables.
    ///
    /// An explicit `path` must exist and parse. The default location is
    /// optional and a broken file there is reported and skipped.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default_path) if default_path.exists() => {
                    match Self::from_file(&default_path) {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!(path = %default_path.display(), error = %e, "ignoring config file");
                            Config::default()
                        }
                    }
                }
                _ => Config::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&contents)
            .map_err(|e| AppError::Configuration(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::Configuration(format!("Failed to serialize config: {}", e)))
    }

    /// Environment overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CHATDRIVER_DEBUG_URL") {
            self.connection.debug_url = v;
        }
        if let Some(v) = lookup("CHATDRIVER_TARGET_URL") {
            self.page.target_url = v;
        }
        if let Some(v) = lookup("CHATDRIVER_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CHATDRIVER_ARTIFACT_EXTENSION") {
            self.output.artifact_extension = v;
        }
        if let Some(v) = lookup("CHATDRIVER_SELECTOR_VERSION") {
            self.selectors.version = v;
        }
        if let Some(v) = lookup("CHATDRIVER_RESPONSE_TIMEOUT_MS") {
            match v.parse() {
                Ok(ms) => self.timing.response_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid CHATDRIVER_RESPONSE_TIMEOUT_MS"),
            }
        }
        if let Some(v) = lookup("CHATDRIVER_POLL_INTERVAL_MS") {
            match v.parse() {
                Ok(ms) => self.timing.poll_interval_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid CHATDRIVER_POLL_INTERVAL_MS"),
            }
        }
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match url::Url::parse(&self.connection.debug_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https" | "ws" | "wss") => {}
            Ok(parsed) => errors.push(format!(
                "Debug URL scheme must be http(s) or ws(s), got '{}'",
                parsed.scheme()
            )),
            Err(e) => errors.push(format!("Invalid debug URL '{}': {}", self.connection.debug_url, e)),
        }

        if self.page.target_url.trim().is_empty() {
            errors.push("Target URL substring must not be empty".to_string());
        }

        let timing = &self.timing;
        if timing.response_timeout_ms == 0 {
            errors.push("Response timeout must be greater than 0".to_string());
        }
        if timing.input_ready_timeout_ms == 0 {
            errors.push("Input ready timeout must be greater than 0".to_string());
        }
        if timing.poll_interval_ms == 0 {
            errors.push("Poll interval must be greater than 0".to_string());
        }
        if timing.poll_interval_ms >= timing.response_timeout_ms {
            errors.push("Poll interval must be shorter than the response timeout".to_string());
        }
        if timing.read_retry_attempts == 0 {
            errors.push("Read retry attempts must be at least 1".to_string());
        }

        let extension_ok = Regex::new(r"^[A-Za-z0-9]{1,16}$")
            .map(|re| re.is_match(&self.output.artifact_extension))
            .unwrap_or(false);
        if !extension_ok {
            errors.push(format!(
                "Artifact extension '{}' must be 1-16 alphanumeric characters",
                self.output.artifact_extension
            ));
        }

        if let Err(e) = self.selectors.resolve() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
