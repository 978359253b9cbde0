use super::artifact::ArtifactExtractor;
use super::detector::CompletionDetector;
use super::submitter::MessageSubmitter;
use crate::browser_ai::{find_page_by_url, ChatPage, PageSource, SelectorSet};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{preview, AbortReason, RunReport, RunState, Turn, TurnStatus};
use crate::storage::TurnStore;
use chrono::Utc;

/// Sends a list of prompts one after another to the chat tab and saves what
/// comes back.
///
/// `Idle -> TabFound -> (Sending -> AwaitingCompletion -> ExtractingArtifact
/// -> Saved)* -> Done`, or `Aborted` when the tab is missing, the input never
/// becomes ready, or a reply times out. Turns saved before an abort stay on
/// disk and in the report.
pub struct RunDriver<'a> {
    config: &'a Config,
    selectors: &'a SelectorSet,
    store: &'a TurnStore,
    state: RunState,
    history: Vec<RunState>,
    report: RunReport,
}

impl<'a> RunDriver<'a> {
    pub fn new(config: &'a Config, selectors: &'a SelectorSet, store: &'a TurnStore) -> Self {
        Self {
            config,
            selectors,
            store,
            state: RunState::Idle,
            history: vec![RunState::Idle],
            report: RunReport::new(&config.page.target_url, &config.selectors.version),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    fn transition(&mut self, next: RunState) {
        if !self.state.can_transition_to(&next) {
            tracing::error!(from = %self.state, to = %next, "invalid run state transition");
        }
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid run state transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "run state");
        self.history.push(next.clone());
        self.state = next;
    }

    pub async fn run<S>(&mut self, source: &S, prompts: &[String]) -> RunReport
    where
        S: PageSource + ?Sized,
    {
        let target = self.config.page.target_url.clone();
        tracing::info!(run_id = %self.report.run_id, target = %target, prompts = prompts.len(), "starting run");

        let page = match find_page_by_url(source, &target).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                tracing::error!(target = %target, "no open tab matches the target URL");
                return self.abort(AbortReason::TabNotFound { target });
            }
            Err(e) => {
                tracing::error!(target = %target, error = %e, "could not list open tabs");
                return self.abort(AbortReason::TabNotFound { target });
            }
        };
        self.transition(RunState::TabFound);

        if self.config.page.bring_to_front {
            if let Err(e) = page.bring_to_front().await {
                tracing::warn!(error = %e, "could not bring tab to front");
            }
        }

        for (i, prompt) in prompts.iter().enumerate() {
            let turn = i + 1;
            if turn > 1 {
                tokio::time::sleep(self.config.timing.turn_pause()).await;
            }

            let mut record = Turn::new(turn, prompt.as_str());
            let outcome = self.run_turn(&page, &mut record, prompts.len()).await;
            self.report.turns.push(record);

            if let Err(reason) = outcome {
                return self.abort(reason);
            }
        }

        self.transition(RunState::Done);
        self.finish()
    }

    async fn run_turn<P>(&mut self, page: &P, record: &mut Turn, total: usize) -> std::result::Result<(), AbortReason>
    where
        P: ChatPage + ?Sized,
    {
        let (config, selectors, store) = (self.config, self.selectors, self.store);
        let turn = record.index;
        let timing = &config.timing;

        self.transition(RunState::Sending { turn });
        tracing::info!(turn, total, "sending prompt");

        let submitter = MessageSubmitter::new(page, selectors, timing, config.page.submit_with);
        let detector = CompletionDetector::new(page, selectors, timing);

        if config.page.start_new_chat {
            submitter.start_new_chat().await;
        }

        let baseline = match detector.capture_baseline().await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(turn, error = %e, "could not read the current response");
                return Err(failed(record, e));
            }
        };

        let prompt = record.prompt.clone();
        if let Err(e) = submitter.submit(&prompt).await {
            tracing::error!(turn, error = %e, "could not submit prompt");
            return Err(match e {
                AppError::InputNotReady(detail) => {
                    record.status = TurnStatus::InputNotReady(detail);
                    AbortReason::InputNotReady { turn }
                }
                other => failed(record, other),
            });
        }

        self.transition(RunState::AwaitingCompletion { turn });
        let completion = match detector.wait_for_completion(&baseline).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!(turn, error = %e, "reading the response failed");
                return Err(failed(record, e));
            }
        };
        if !completion.success {
            tracing::error!(turn, timeout_ms = timing.response_timeout_ms, "response timed out, stopping run");
            record.status = TurnStatus::TimedOut;
            return Err(AbortReason::ResponseTimeout { turn });
        }
        tracing::info!(
            turn,
            preview = %preview(&completion.text, config.output.preview_chars),
            "response received"
        );
        record.response = Some(completion.text);

        self.transition(RunState::ExtractingArtifact { turn });
        let extractor = ArtifactExtractor::new(page, selectors, timing, store, &config.output.artifact_extension);
        let artifact = extractor.extract(turn).await;
        if let (Some(code), Some(path)) = (artifact.code(), artifact.path()) {
            tracing::info!(turn, path = %path.display(), "artifact saved");
            record.artifact = Some(code.to_string());
            record.artifact_path = Some(path.clone());
        }

        let response = record.response.as_deref().unwrap_or_default();
        match store.save_response(turn, response) {
            Ok(path) => {
                record.response_path = Some(path);
                record.status = TurnStatus::Completed;
            }
            Err(e) => {
                tracing::error!(turn, error = %e, "response not saved");
                record.status = TurnStatus::Failed(e.to_string());
            }
        }
        self.transition(RunState::Saved { turn });
        Ok(())
    }

    fn abort(&mut self, reason: AbortReason) -> RunReport {
        tracing::warn!(reason = %reason, completed = self.report.completed_turns(), "run aborted");
        self.transition(RunState::Aborted(reason));
        self.finish()
    }

    fn finish(&mut self) -> RunReport {
        if !self.state.is_terminal() {
            tracing::error!(state = %self.state, "run finished outside a terminal state");
        }
        self.report.final_state = self.state.clone();
        self.report.finished_at = Some(Utc::now());

        if self.config.output.write_summary {
            match self.store.save_summary(&self.report) {
                Ok(path) => tracing::info!(path = %path.display(), "run summary written"),
                Err(e) => tracing::warn!(error = %e, "run summary not written"),
            }
        }
        tracing::info!(state = %self.state, turns = self.report.turns.len(), "run finished");
        self.report.clone()
    }
}

fn failed(record: &mut Turn, error: AppError) -> AbortReason {
    let message = error.to_string();
    record.status = TurnStatus::Failed(message.clone());
    AbortReason::Failed {
        turn: record.index,
        message,
    }
}

/// One prompt, one reply: the stdin/stdout mode. Nothing is written to disk.
pub async fn ask<S>(source: &S, config: &Config, selectors: &SelectorSet, prompt: &str) -> Result<String>
where
    S: PageSource + ?Sized,
{
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::InvalidInput("prompt is empty".into()));
    }

    let target = &config.page.target_url;
    let page = find_page_by_url(source, target)
        .await?
        .ok_or_else(|| AppError::TabNotFound(target.clone()))?;

    if config.page.bring_to_front {
        if let Err(e) = page.bring_to_front().await {
            tracing::warn!(error = %e, "could not bring tab to front");
        }
    }

    let submitter = MessageSubmitter::new(&page, selectors, &config.timing, config.page.submit_with);
    let detector = CompletionDetector::new(&page, selectors, &config.timing);

    if config.page.start_new_chat {
        submitter.start_new_chat().await;
    }

    let baseline = detector.capture_baseline().await?;
    submitter.submit(prompt).await?;

    let completion = detector.wait_for_completion(&baseline).await?;
    if completion.success {
        Ok(completion.text)
    } else {
        Err(AppError::ResponseTimeout(config.timing.response_timeout_ms))
    }
}
