//! In-memory chat tab for driving the conversation code without a browser.
//!
//! Replies are scripted per submission with timings relative to the moment
//! the prompt was sent. Tests run with a paused tokio clock, so a reply that
//! "takes" two minutes costs nothing.

#![allow(dead_code)]

use async_trait::async_trait;
use chatdriver_lib::browser_ai::{ChatPage, ElementState, Locator, PageSource, SelectorSet};
use chatdriver_lib::config::Config;
use chatdriver_lib::error::{AppError, Result};
use chatdriver_lib::models::RunReport;
use chatdriver_lib::storage::TurnStore;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

pub const CHAT_URL: &str = "https://claude.ai/chat/0b9e6f1c";

const READY: ElementState = ElementState {
    found: true,
    visible: true,
    enabled: true,
};
const HIDDEN: ElementState = ElementState {
    found: false,
    visible: false,
    enabled: false,
};

/// Defaults, with files going to `dir`.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.dir = dir.to_path_buf();
    config
}

pub fn read_summary(store: &TurnStore) -> RunReport {
    let json = std::fs::read_to_string(store.summary_path()).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[derive(Debug, Clone)]
pub struct Reply {
    /// (offset from submission, trailing text from then on)
    chunks: Vec<(Duration, String)>,
    indicator_at: Option<Duration>,
    artifact: bool,
    clipboard_code: Option<String>,
    panel_code: Option<String>,
}

impl Reply {
    /// Text shows up after 500 ms, indicator after 1 s.
    pub fn new(text: &str) -> Self {
        Self {
            chunks: vec![(Duration::from_millis(500), text.to_string())],
            indicator_at: Some(Duration::from_secs(1)),
            artifact: false,
            clipboard_code: None,
            panel_code: None,
        }
    }

    pub fn text_at(mut self, at: Duration) -> Self {
        if let Some(last) = self.chunks.last_mut() {
            last.0 = at;
        }
        self
    }

    /// Show `partial` at `at`, before the final text.
    pub fn streaming(mut self, partial: &str, at: Duration) -> Self {
        self.chunks.insert(0, (at, partial.to_string()));
        self
    }

    pub fn indicator_at(mut self, at: Duration) -> Self {
        self.indicator_at = Some(at);
        self
    }

    pub fn without_indicator(mut self) -> Self {
        self.indicator_at = None;
        self
    }

    pub fn with_copyable_artifact(mut self, code: &str) -> Self {
        self.artifact = true;
        self.clipboard_code = Some(code.to_string());
        self
    }

    /// Artifact without a copy control; only the code panel has it.
    pub fn with_panel_artifact(mut self, code: &str) -> Self {
        self.artifact = true;
        self.panel_code = Some(code.to_string());
        self
    }

    /// Artifact button that leads nowhere.
    pub fn with_broken_artifact(mut self) -> Self {
        self.artifact = true;
        self
    }
}

struct PageState {
    /// Trailing text before the current reply started.
    displayed: String,
    current: Option<(Instant, Reply)>,
    queue: VecDeque<Reply>,
    input: ElementState,
    input_ready_at: Option<Instant>,
    send_button: bool,
    clipboard: Option<String>,
    panel_open: bool,
    failing_reads: u32,
    /// (submission number, reads to fail once it is sent)
    fail_reads_after: Option<(usize, u32)>,
    submissions: usize,
    events: Vec<String>,
    typed: Vec<String>,
}

impl PageState {
    fn response_text(&self, now: Instant) -> Option<String> {
        if let Some((at, reply)) = &self.current {
            let elapsed = now.duration_since(*at);
            if let Some((_, text)) = reply.chunks.iter().rev().find(|(d, _)| elapsed >= *d) {
                return Some(text.clone());
            }
        }
        if self.displayed.is_empty() {
            None
        } else {
            Some(self.displayed.clone())
        }
    }

    fn indicator_visible(&self, now: Instant) -> bool {
        match &self.current {
            Some((at, reply)) => reply
                .indicator_at
                .map_or(false, |d| now.duration_since(*at) >= d),
            // The previous message keeps its copy control.
            None => !self.displayed.is_empty(),
        }
    }

    fn input_state(&self, now: Instant) -> ElementState {
        match self.input_ready_at {
            Some(at) if now < at => ElementState {
                found: true,
                visible: true,
                enabled: false,
            },
            _ => self.input,
        }
    }

    fn reply(&self) -> Option<&Reply> {
        self.current.as_ref().map(|(_, r)| r)
    }

    fn submit(&mut self, now: Instant) {
        self.displayed = self.response_text(now).unwrap_or_default();
        self.current = self.queue.pop_front().map(|r| (now, r));
        self.panel_open = false;
        self.submissions += 1;
        if let Some((n, reads)) = self.fail_reads_after {
            if n == self.submissions {
                self.failing_reads = reads;
            }
        }
        self.events.push("submit".into());
    }
}

fn visible(yes: bool) -> ElementState {
    if yes {
        READY
    } else {
        HIDDEN
    }
}

#[derive(Clone)]
pub struct ScriptedPage {
    url: String,
    selectors: SelectorSet,
    state: Arc<Mutex<PageState>>,
}

impl ScriptedPage {
    pub fn new(url: &str, selectors: SelectorSet) -> Self {
        Self {
            url: url.to_string(),
            selectors,
            state: Arc::new(Mutex::new(PageState {
                displayed: String::new(),
                current: None,
                queue: VecDeque::new(),
                input: READY,
                input_ready_at: None,
                send_button: true,
                clipboard: None,
                panel_open: false,
                failing_reads: 0,
                fail_reads_after: None,
                submissions: 0,
                events: Vec::new(),
                typed: Vec::new(),
            })),
        }
    }

    pub fn chat(selectors: SelectorSet) -> Self {
        Self::new(CHAT_URL, selectors)
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap()
    }

    /// An earlier, finished message already on screen.
    pub fn with_history(self, text: &str) -> Self {
        self.lock().displayed = text.to_string();
        self
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.lock().queue.push_back(reply);
        self
    }

    pub fn input_disabled(self) -> Self {
        self.lock().input = ElementState {
            found: true,
            visible: true,
            enabled: false,
        };
        self
    }

    pub fn input_ready_after(self, delay: Duration) -> Self {
        self.lock().input_ready_at = Some(Instant::now() + delay);
        self
    }

    pub fn without_send_button(self) -> Self {
        self.lock().send_button = false;
        self
    }

    pub fn with_clipboard(self, text: &str) -> Self {
        self.lock().clipboard = Some(text.to_string());
        self
    }

    /// The next `n` response reads fail as if the page re-rendered.
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().failing_reads = n;
    }

    /// Once the `submission`-th prompt is sent, the next `n` reads fail.
    pub fn fail_reads_after_submission(self, submission: usize, n: u32) -> Self {
        self.lock().fail_reads_after = Some((submission, n));
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.lock().typed.clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.lock().events.iter().filter(|e| *e == event).count()
    }
}

#[async_trait]
impl ChatPage for ScriptedPage {
    async fn url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn bring_to_front(&self) -> Result<()> {
        self.lock().events.push("front".into());
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let mut state = self.lock();
        state.panel_open = false;
        state.events.push("reload".into());
        Ok(())
    }

    async fn query(&self, locator: &Locator) -> Result<ElementState> {
        let now = Instant::now();
        let state = self.lock();
        let sel = &self.selectors;
        let reply = state.reply();

        let found = if locator == &sel.input {
            return Ok(state.input_state(now));
        } else if locator == &sel.send_button {
            state.send_button
        } else if locator == &sel.completion_indicator {
            state.indicator_visible(now)
        } else if locator == &sel.artifact_button {
            reply.map_or(false, |r| r.artifact)
        } else if locator == &sel.artifact_copy_button {
            reply.map_or(false, |r| r.clipboard_code.is_some())
        } else if locator == &sel.code_region {
            state.panel_open && reply.map_or(false, |r| r.panel_code.is_some())
        } else if locator == &sel.close_panel_button {
            state.panel_open
        } else {
            sel.new_chat_button.as_ref() == Some(locator)
        };
        Ok(visible(found))
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        let now = Instant::now();
        let mut state = self.lock();
        if locator == &self.selectors.response_text {
            if state.failing_reads > 0 {
                state.failing_reads -= 1;
                return Err(AppError::from_cdp_message(
                    "read text",
                    "Execution context was destroyed.",
                ));
            }
            return Ok(state.response_text(now));
        }
        if locator == &self.selectors.code_region && state.panel_open {
            return Ok(state.reply().and_then(|r| r.panel_code.clone()));
        }
        Ok(None)
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let now = Instant::now();
        let mut state = self.lock();
        let sel = &self.selectors;

        if locator == &sel.send_button && state.send_button {
            state.submit(now);
        } else if locator == &sel.artifact_copy_button {
            let code = state
                .reply()
                .and_then(|r| r.clipboard_code.clone())
                .ok_or_else(|| AppError::ElementNotFound(locator.to_string()))?;
            state.clipboard = Some(code);
            state.events.push("copy".into());
        } else if locator == sel.open_panel_button() && state.reply().map_or(false, |r| r.artifact) {
            state.panel_open = true;
            state.events.push("open_panel".into());
        } else if locator == &sel.close_panel_button && state.panel_open {
            state.panel_open = false;
            state.events.push("close_panel".into());
        } else if sel.new_chat_button.as_ref() == Some(locator) {
            state.displayed.clear();
            state.current = None;
            state.events.push("new_chat".into());
        } else {
            return Err(AppError::ElementNotFound(locator.to_string()));
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        let mut state = self.lock();
        if locator != &self.selectors.input {
            return Err(AppError::ElementNotFound(locator.to_string()));
        }
        state.typed.push(text.to_string());
        state.events.push("fill".into());
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: &str) -> Result<()> {
        let now = Instant::now();
        let mut state = self.lock();
        if locator != &self.selectors.input {
            return Err(AppError::ElementNotFound(locator.to_string()));
        }
        state.events.push(format!("press:{}", key));
        if key == "Enter" {
            state.submit(now);
        }
        Ok(())
    }

    async fn scroll_to_top(&self, _locator: &Locator) -> Result<()> {
        self.lock().events.push("scroll_top".into());
        Ok(())
    }

    async fn read_clipboard(&self) -> Result<Option<String>> {
        Ok(self.lock().clipboard.clone())
    }

    async fn write_clipboard(&self, text: &str) -> Result<()> {
        let mut state = self.lock();
        state.clipboard = Some(text.to_string());
        state.events.push("write_clipboard".into());
        Ok(())
    }
}

/// A browser with a fixed set of tabs.
pub struct ScriptedBrowser {
    pages: Vec<ScriptedPage>,
}

impl ScriptedBrowser {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self { pages }
    }

    pub fn single(page: &ScriptedPage) -> Self {
        Self::new(vec![page.clone()])
    }
}

#[async_trait]
impl PageSource for ScriptedBrowser {
    type Page = ScriptedPage;

    async fn pages(&self) -> Result<Vec<ScriptedPage>> {
        Ok(self.pages.clone())
    }
}
