use super::retry::{wait_for_element, wait_for_visible};
use crate::browser_ai::{ChatPage, SelectorSet};
use crate::config::{SubmitMode, TimingConfig};
use crate::error::{AppError, Result};

/// Types a prompt into the chat input and sends it.
pub struct MessageSubmitter<'a, P: ChatPage + ?Sized> {
    page: &'a P,
    selectors: &'a SelectorSet,
    timing: &'a TimingConfig,
    mode: SubmitMode,
}

impl<'a, P: ChatPage + ?Sized> MessageSubmitter<'a, P> {
    pub fn new(page: &'a P, selectors: &'a SelectorSet, timing: &'a TimingConfig, mode: SubmitMode) -> Self {
        Self {
            page,
            selectors,
            timing,
            mode,
        }
    }

    /// Wait until the input is visible and enabled, bounded by
    /// `input_ready_timeout_ms`.
    pub async fn wait_for_input(&self) -> Result<()> {
        let timeout = self.timing.input_ready_timeout();
        let ready = wait_for_element(self.page, &self.selectors.input, timeout, |s| s.ready()).await?;
        if ready {
            Ok(())
        } else {
            Err(AppError::InputNotReady(format!(
                "'{}' not visible and enabled within {} ms",
                self.selectors.input, self.timing.input_ready_timeout_ms
            )))
        }
    }

    pub async fn submit(&self, prompt: &str) -> Result<()> {
        self.wait_for_input().await?;

        self.page.fill(&self.selectors.input, prompt).await?;
        tracing::debug!(chars = prompt.chars().count(), "prompt typed");

        match self.mode {
            SubmitMode::Enter => self.press_enter().await,
            SubmitMode::Click => {
                let send = self.page.query(&self.selectors.send_button).await?;
                if send.found {
                    self.page.click(&self.selectors.send_button).await?;
                    tracing::debug!(selector = %self.selectors.send_button, "send clicked");
                    Ok(())
                } else {
                    tracing::info!(selector = %self.selectors.send_button, "send button not found, pressing Enter");
                    self.press_enter().await
                }
            }
        }
    }

    async fn press_enter(&self) -> Result<()> {
        self.page.press_key(&self.selectors.input, "Enter").await?;
        tracing::debug!("Enter pressed");
        Ok(())
    }

    /// Open a fresh conversation. Best-effort: returns whether it worked and
    /// leaves the current chat in place otherwise.
    pub async fn start_new_chat(&self) -> bool {
        let Some(button) = &self.selectors.new_chat_button else {
            tracing::debug!("no new-chat control configured");
            return false;
        };

        let result: Result<bool> = async {
            if !wait_for_visible(self.page, button, self.timing.new_chat_timeout()).await? {
                return Ok(false);
            }
            self.page.click(button).await?;
            wait_for_element(self.page, &self.selectors.input, self.timing.new_chat_timeout(), |s| s.found && s.visible)
                .await
        }
        .await;

        match result {
            Ok(true) => {
                tracing::info!("started a new chat");
                true
            }
            Ok(false) => {
                tracing::warn!(selector = %button, "new chat not ready in time, staying in current chat");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not start a new chat, staying in current chat");
                false
            }
        }
    }
}
