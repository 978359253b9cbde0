use super::retry::{retry_bounded, RetryPolicy};
use crate::browser_ai::{ChatPage, SelectorSet};
use crate::config::TimingConfig;
use crate::error::{AppError, Result};
use crate::models::Completion;
use tokio::time::Instant;

/// Decides when the reply to a submitted prompt has finished streaming.
///
/// A reply is complete when the trailing response text is non-empty, differs
/// from the baseline captured before submission, and the completion indicator
/// is visible. Text alone keeps changing while the reply streams; the indicator
/// is only rendered once the page considers the message finished.
pub struct CompletionDetector<'a, P: ChatPage + ?Sized> {
    page: &'a P,
    selectors: &'a SelectorSet,
    timing: &'a TimingConfig,
}

impl<'a, P: ChatPage + ?Sized> CompletionDetector<'a, P> {
    pub fn new(page: &'a P, selectors: &'a SelectorSet, timing: &'a TimingConfig) -> Self {
        Self {
            page,
            selectors,
            timing,
        }
    }

    /// Trailing response text, trimmed. Empty when there is no response yet.
    /// Reads interrupted by a render-tree teardown are retried.
    pub async fn read_response(&self) -> Result<String> {
        retry_bounded(
            RetryPolicy::for_reads(self.timing),
            "read response",
            AppError::is_transient,
            move || self.read_once(),
        )
        .await
    }

    async fn read_once(&self) -> Result<String> {
        if let Some(scroller) = &self.selectors.scroll_container {
            if let Err(e) = self.page.scroll_to_top(scroller).await {
                if e.is_transient() {
                    return Err(e);
                }
                tracing::debug!(selector = %scroller, error = %e, "scroll container not scrolled");
            } else {
                tokio::time::sleep(self.timing.scroll_settle()).await;
            }
        }
        let text = self.page.text(&self.selectors.response_text).await?;
        Ok(text.map(|t| t.trim().to_string()).unwrap_or_default())
    }

    pub async fn capture_baseline(&self) -> Result<String> {
        let baseline = self.read_response().await?;
        tracing::debug!(chars = baseline.chars().count(), "baseline captured");
        Ok(baseline)
    }

    async fn indicator_visible(&self) -> bool {
        match self.page.query(&self.selectors.completion_indicator).await {
            Ok(state) => state.found && state.visible,
            Err(e) => {
                tracing::debug!(error = %e, "completion indicator query failed");
                false
            }
        }
    }

    /// Poll every `poll_interval_ms` until complete or `response_timeout_ms`
    /// runs out. A timeout is `Completion::timed_out()`, not an error; only a
    /// read that still fails after its retries is.
    pub async fn wait_for_completion(&self, baseline: &str) -> Result<Completion> {
        let timeout = self.timing.response_timeout();
        let poll = self.timing.poll_interval();
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            let current = self.read_response().await?;
            if !current.is_empty() && current != baseline {
                if self.indicator_visible().await {
                    // The text may have grown since the read above.
                    let text = self.read_response().await?;
                    if !text.is_empty() && text != baseline {
                        tracing::info!(
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            chars = text.chars().count(),
                            "response complete"
                        );
                        return Ok(Completion::complete(text));
                    }
                } else {
                    tracing::debug!(chars = current.chars().count(), "response still streaming");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(timeout_ms = self.timing.response_timeout_ms, "no complete response before timeout");
                return Ok(Completion::timed_out());
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }
}
