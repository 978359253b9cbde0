use super::locator::Locator;
use super::page::{ChatPage, ElementState, PageSource};
use super::scripts;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Attachment to a browser that somebody else launched with
/// `--remote-debugging-port`. Never launches or closes the browser itself.
pub struct CdpClient {
    browser: Browser,
    endpoint: String,
    reload_timeout: Duration,
    handler: JoinHandle<()>,
}

impl CdpClient {
    /// `endpoint` is either `http://host:port` or a `ws://` debugger URL.
    pub async fn connect(endpoint: &str, reload_timeout: Duration) -> Result<Self> {
        let ws_url = resolve_ws_url(endpoint).await?;
        tracing::info!(endpoint, ws_url = %ws_url, "connecting to browser");

        let (mut browser, mut handler) = Browser::connect(ws_url.clone())
            .await
            .map_err(|e| AppError::Connection(format!("Failed to connect to {}: {}", ws_url, e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let error_str = format!("{:?}", e);
                    // Unknown CDP events fail to deserialize; harmless.
                    if !error_str.contains("data did not match any variant") {
                        tracing::warn!(error = %e, "browser handler error");
                    }
                }
            }
            tracing::debug!("browser handler stopped");
        });

        // Tabs opened before we attached are only visible after a target fetch.
        if let Err(e) = browser.fetch_targets().await {
            tracing::warn!(error = %e, "failed to fetch existing targets");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = Self {
            browser,
            endpoint: endpoint.to_string(),
            reload_timeout,
            handler,
        };
        client.grant_clipboard().await;
        Ok(client)
    }

    async fn grant_clipboard(&self) {
        let params = GrantPermissionsParams::new(vec![
            PermissionType::ClipboardReadWrite,
            PermissionType::ClipboardSanitizedWrite,
        ]);
        match self.browser.execute(params).await {
            Ok(_) => tracing::debug!("clipboard permissions granted"),
            Err(e) => tracing::warn!(error = %e, "could not grant clipboard permissions"),
        }
    }

    /// Stop listening to the browser. The browser process keeps running.
    pub fn disconnect(self) {
        self.handler.abort();
        tracing::info!(endpoint = %self.endpoint, "disconnected from browser");
    }
}

#[async_trait]
impl PageSource for CdpClient {
    type Page = CdpPage;

    async fn pages(&self) -> Result<Vec<CdpPage>> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| AppError::Browser(format!("Failed to get pages: {}", e)))?;
        tracing::debug!(count = pages.len(), "enumerated open pages");
        Ok(pages
            .into_iter()
            .map(|page| CdpPage::new(page, self.reload_timeout))
            .collect())
    }
}

/// Resolve `http://host:port` to the browser's websocket debugger URL.
pub async fn resolve_ws_url(endpoint: &str) -> Result<String> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|e| AppError::Configuration(format!("Invalid debug endpoint '{}': {}", endpoint, e)))?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(endpoint.to_string()),
        "http" | "https" => {
            let version_url = parsed
                .join("/json/version")
                .map_err(|e| AppError::Configuration(format!("Invalid debug endpoint: {}", e)))?;
            let response = reqwest::get(version_url.as_str())
                .await
                .map_err(|e| {
                    AppError::Connection(format!(
                        "No browser answering at {} (is it running with --remote-debugging-port?): {}",
                        endpoint, e
                    ))
                })?;
            let json: Value = response.json().await?;
            ws_url_from_version(&json)
        }
        other => Err(AppError::Configuration(format!(
            "Unsupported debug endpoint scheme '{}'",
            other
        ))),
    }
}

fn ws_url_from_version(json: &Value) -> Result<String> {
    json.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::Connection("No webSocketDebuggerUrl in /json/version response".into()))
}

pub struct CdpPage {
    page: Page,
    reload_timeout: Duration,
}

impl CdpPage {
    pub fn new(page: Page, reload_timeout: Duration) -> Self {
        Self { page, reload_timeout }
    }

    async fn eval<T: DeserializeOwned>(&self, context: &str, script: String) -> Result<T> {
        let result = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| AppError::from_cdp_message(context, e.to_string()))?;
        // `null` results come back without a value.
        let value = result.value().cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| AppError::Browser(format!("{}: unexpected result: {}", context, e)))
    }

    async fn require(&self, context: &str, locator: &Locator, script: String) -> Result<()> {
        let done: bool = self.eval(context, script).await?;
        if done {
            Ok(())
        } else {
            Err(AppError::ElementNotFound(locator.to_string()))
        }
    }
}

#[async_trait]
impl ChatPage for CdpPage {
    async fn url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| AppError::Browser(format!("Failed to get URL: {}", e)))?;
        Ok(url.unwrap_or_default())
    }

    async fn bring_to_front(&self) -> Result<()> {
        self.page.bring_to_front().await?;
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        match tokio::time::timeout(self.reload_timeout, self.page.reload()).await {
            Ok(Ok(_)) => {
                tracing::debug!("reload complete");
                Ok(())
            }
            Ok(Err(e)) => Err(AppError::from_cdp_message("reload", e.to_string())),
            Err(_) => {
                tracing::warn!(timeout = ?self.reload_timeout, "reload wait timed out (continuing anyway)");
                Ok(())
            }
        }
    }

    async fn query(&self, locator: &Locator) -> Result<ElementState> {
        self.eval("query element", scripts::element_state(locator)).await
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        self.eval("read text", scripts::element_text(locator)).await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.require("click", locator, scripts::click(locator)).await
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        self.require("clear input", locator, scripts::focus_and_clear(locator))
            .await?;
        self.page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(|e| AppError::from_cdp_message("insert text", e.to_string()))?;
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: &str) -> Result<()> {
        self.require("focus", locator, scripts::focus(locator)).await?;
        let focused = self
            .page
            .find_element(":focus")
            .await
            .map_err(|_| AppError::ElementNotFound(locator.to_string()))?;
        focused
            .press_key(key)
            .await
            .map_err(|e| AppError::from_cdp_message("press key", e.to_string()))?;
        Ok(())
    }

    async fn scroll_to_top(&self, locator: &Locator) -> Result<()> {
        self.require("scroll", locator, scripts::scroll_to_top(locator)).await
    }

    async fn read_clipboard(&self) -> Result<Option<String>> {
        self.eval("read clipboard", scripts::read_clipboard()).await
    }

    async fn write_clipboard(&self, text: &str) -> Result<()> {
        let _: bool = self.eval("write clipboard", scripts::write_clipboard(text)).await?;
        Ok(())
    }
}
