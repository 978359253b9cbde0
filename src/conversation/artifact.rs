use super::retry::wait_for_visible;
use crate::browser_ai::{ChatPage, SelectorSet};
use crate::config::TimingConfig;
use crate::error::{AppError, Result};
use crate::models::{ArtifactOutcome, ArtifactSource};
use crate::storage::TurnStore;

/// Pulls the code artifact attached to the latest response, if any.
///
/// The copy control plus clipboard is tried first. When that control is
/// missing or the clipboard comes back empty, the code panel is opened and
/// its editor text read directly, then the panel is closed and the page
/// reloaded so the next prompt starts from a clean input.
pub struct ArtifactExtractor<'a, P: ChatPage + ?Sized> {
    page: &'a P,
    selectors: &'a SelectorSet,
    timing: &'a TimingConfig,
    store: &'a TurnStore,
    extension: &'a str,
}

impl<'a, P: ChatPage + ?Sized> ArtifactExtractor<'a, P> {
    pub fn new(
        page: &'a P,
        selectors: &'a SelectorSet,
        timing: &'a TimingConfig,
        store: &'a TurnStore,
        extension: &'a str,
    ) -> Self {
        Self {
            page,
            selectors,
            timing,
            store,
            extension,
        }
    }

    /// Never fails: anything that goes wrong is logged and reported as
    /// `ArtifactOutcome::Failed`, which carries no file.
    pub async fn extract(&self, turn: usize) -> ArtifactOutcome {
        match self.try_extract(turn).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(turn, error = %e, "artifact extraction failed, continuing without it");
                ArtifactOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_extract(&self, turn: usize) -> Result<ArtifactOutcome> {
        let button = self.page.query(&self.selectors.artifact_button).await?;
        if !button.found {
            tracing::debug!(turn, "no artifact in this response");
            return Ok(ArtifactOutcome::NotPresent);
        }
        tracing::info!(turn, "artifact detected");

        match self.from_clipboard(turn).await {
            Ok(Some(outcome)) => return Ok(outcome),
            Ok(None) => tracing::debug!(turn, "copy control unavailable, opening code panel"),
            Err(e) => tracing::warn!(turn, error = %e, "copy path failed, opening code panel"),
        }

        self.from_panel(turn).await
    }

    /// `Ok(None)` when the copy control never shows up.
    async fn from_clipboard(&self, turn: usize) -> Result<Option<ArtifactOutcome>> {
        let copy = &self.selectors.artifact_copy_button;
        if !wait_for_visible(self.page, copy, self.timing.copy_button_timeout()).await? {
            return Ok(None);
        }

        if let Err(e) = self.page.write_clipboard("").await {
            tracing::debug!(error = %e, "could not clear clipboard");
        }
        self.page.click(copy).await?;
        tokio::time::sleep(self.timing.clipboard_settle()).await;

        let code = self.page.read_clipboard().await?.unwrap_or_default();
        if code.trim().is_empty() {
            return Err(AppError::ArtifactExtraction("clipboard is empty after copy".into()));
        }

        let path = self.store.save_artifact(turn, &code, self.extension)?;
        Ok(Some(ArtifactOutcome::Extracted {
            source: ArtifactSource::Clipboard,
            code,
            path,
        }))
    }

    /// Once the panel has been opened it is closed and the page reloaded,
    /// whether or not the code could be read.
    async fn from_panel(&self, turn: usize) -> Result<ArtifactOutcome> {
        self.page.click(self.selectors.open_panel_button()).await?;
        let outcome = self.read_panel(turn).await;
        self.close_panel().await;
        outcome
    }

    async fn read_panel(&self, turn: usize) -> Result<ArtifactOutcome> {
        tokio::time::sleep(self.timing.panel_open_settle()).await;

        let region = &self.selectors.code_region;
        if !wait_for_visible(self.page, region, self.timing.code_region_timeout()).await? {
            return Err(AppError::ArtifactExtraction(format!(
                "code region '{}' not visible within {} ms",
                region, self.timing.code_region_timeout_ms
            )));
        }

        let code = self
            .page
            .text(region)
            .await?
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if code.is_empty() {
            return Err(AppError::ArtifactExtraction("code region is empty".into()));
        }

        let path = self.store.save_artifact(turn, &code, self.extension)?;
        Ok(ArtifactOutcome::Extracted {
            source: ArtifactSource::Panel,
            code,
            path,
        })
    }

    async fn close_panel(&self) {
        let close = &self.selectors.close_panel_button;
        match wait_for_visible(self.page, close, self.timing.close_panel_timeout()).await {
            Ok(true) => {
                if let Err(e) = self.page.click(close).await {
                    tracing::warn!(error = %e, "could not close code panel");
                }
            }
            Ok(false) => tracing::warn!(selector = %close, "close control not found"),
            Err(e) => tracing::warn!(error = %e, "could not close code panel"),
        }

        if let Err(e) = self.page.reload().await {
            tracing::warn!(error = %e, "reload after closing code panel failed");
        }
    }
}
