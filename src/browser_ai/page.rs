use super::locator::Locator;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub found: bool,
    pub visible: bool,
    pub enabled: bool,
}

impl ElementState {
    pub fn ready(&self) -> bool {
        self.found && self.visible && self.enabled
    }
}

/// The operations the conversation driver needs from one browser tab.
#[async_trait]
pub trait ChatPage: Send + Sync {
    async fn url(&self) -> Result<String>;

    async fn bring_to_front(&self) -> Result<()>;

    /// Reload and wait (bounded) for the navigation to settle.
    async fn reload(&self) -> Result<()>;

    async fn query(&self, locator: &Locator) -> Result<ElementState>;

    async fn text(&self, locator: &Locator) -> Result<Option<String>>;

    /// Fails with `ElementNotFound` when nothing matches.
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Clear the element, then insert `text`.
    async fn fill(&self, locator: &Locator, text: &str) -> Result<()>;

    async fn press_key(&self, locator: &Locator, key: &str) -> Result<()>;

    async fn scroll_to_top(&self, locator: &Locator) -> Result<()>;

    async fn read_clipboard(&self) -> Result<Option<String>>;

    async fn write_clipboard(&self, text: &str) -> Result<()>;
}

/// Anything that can enumerate open tabs.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Page: ChatPage;

    async fn pages(&self) -> Result<Vec<Self::Page>>;
}

/// First open page whose URL satisfies `predicate`. Pages whose URL cannot be
/// read are skipped.
pub async fn find_page<S, F>(source: &S, predicate: F) -> Result<Option<S::Page>>
where
    S: PageSource + ?Sized,
    F: Fn(&str) -> bool + Send,
{
    for page in source.pages().await? {
        match page.url().await {
            Ok(url) if predicate(&url) => return Ok(Some(page)),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "skipping page with unreadable url"),
        }
    }
    Ok(None)
}

pub async fn find_page_by_url<S>(source: &S, fragment: &str) -> Result<Option<S::Page>>
where
    S: PageSource + ?Sized,
{
    find_page(source, |url| url.contains(fragment)).await
}
