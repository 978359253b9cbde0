//! Selector sets for the chat page, keyed by page-markup version.
//!
//! The chat UI changes its markup without notice. Every selector the driver
//! touches lives in a [`SelectorSet`]; a version name picks one. When the page
//! changes, add a new set (built-in or under `[selectors.sets.<name>]` in the
//! config file) instead of patching call sites.

use super::locator::Locator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SELECTOR_VERSION: &str = "v2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorSet {
    /// Editable prompt region.
    pub input: Locator,
    pub send_button: Locator,
    /// Latest response text. Should resolve to the trailing message.
    pub response_text: Locator,
    /// Scrolled to the top before reading responses, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_container: Option<Locator>,
    /// Only rendered once the latest response has finished streaming.
    pub completion_indicator: Locator,
    /// Presence means the latest response carries a code artifact.
    pub artifact_button: Locator,
    pub artifact_copy_button: Locator,
    /// Opens the code panel. Falls back to `artifact_button`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_open_button: Option<Locator>,
    pub code_region: Locator,
    pub close_panel_button: Locator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_chat_button: Option<Locator>,
}

impl SelectorSet {
    pub fn open_panel_button(&self) -> &Locator {
        self.artifact_open_button
            .as_ref()
            .unwrap_or(&self.artifact_button)
    }

    /// Markup with `font-claude-message` responses and a "Preview contents"
    /// artifact button.
    pub fn v1() -> Self {
        Self {
            input: Locator::css("div[contenteditable='true']"),
            send_button: Locator::css("button[aria-label='Send message']"),
            response_text: Locator::css("div.font-claude-message").last(),
            scroll_container: None,
            completion_indicator: Locator::css("svg[data-testid='action-bar-copy']")
                .within(Locator::css("[data-is-streaming]").last()),
            artifact_button: Locator::css("button[aria-label='Preview contents']").last(),
            artifact_copy_button: Locator::css("button").with_text("Copy"),
            artifact_open_button: None,
            code_region: Locator::css("div.cm-scroller > div.cm-content.cm-lineWrapping"),
            close_panel_button: Locator::css("button[aria-label='Close']"),
            new_chat_button: Some(Locator::css("button:has(svg > path[d^='M10 3'])")),
        }
    }

    /// Markup with `data-scroll-anchor` responses, a lazily rendered history
    /// scroller and the "Open Code Canvas" panel.
    pub fn v2() -> Self {
        Self {
            input: Locator::css("div[contenteditable='true']"),
            send_button: Locator::css("button[aria-label='Send message']"),
            response_text: Locator::css("div[data-scroll-anchor]")
                .last()
                .within(Locator::css("div.group.flex.flex-col.items-start")),
            scroll_container: Some(Locator::css(
                ".relative.h-full.flex-1.flex.overflow-x-hidden.overflow-y-scroll.pt-6",
            )),
            completion_indicator: Locator::css("svg[data-testid='action-bar-copy']")
                .within(Locator::css("[data-is-streaming]").last()),
            artifact_button: Locator::css("button").with_text("Open Code Canvas").last(),
            artifact_copy_button: Locator::css("button").with_text("Copy"),
            artifact_open_button: None,
            code_region: Locator::css("div.cm-scroller > div.cm-content.cm-lineWrapping"),
            close_panel_button: Locator::css("button[aria-label='Close']"),
            new_chat_button: Some(Locator::css("button:has(svg > path[d^='M10 3'])")),
        }
    }
}

/// Built-in selector sets, by version name.
pub fn builtin_sets() -> BTreeMap<String, SelectorSet> {
    let mut sets = BTreeMap::new();
    sets.insert("v1".to_string(), SelectorSet::v1());
    sets.insert("v2".to_string(), SelectorSet::v2());
    sets
}

/// Resolve `version` against the built-ins overlaid with `custom` sets.
pub fn resolve(version: &str, custom: &BTreeMap<String, SelectorSet>) -> Option<SelectorSet> {
    custom
        .get(version)
        .cloned()
        .or_else(|| builtin_sets().remove(version))
}

/// Every resolvable version name, built-in and custom.
pub fn known_versions(custom: &BTreeMap<String, SelectorSet>) -> Vec<String> {
    let mut names: Vec<String> = builtin_sets().into_keys().collect();
    for name in custom.keys() {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_version_is_builtin() {
        assert!(builtin_sets().contains_key(DEFAULT_SELECTOR_VERSION));
    }

    #[test]
    fn test_custom_set_overrides_builtin() {
        let mut custom = BTreeMap::new();
        let mut set = SelectorSet::v2();
        set.input = Locator::css("textarea#prompt");
        custom.insert("v2".to_string(), set);

        let resolved = resolve("v2", &custom).unwrap();
        assert_eq!(resolved.input, Locator::css("textarea#prompt"));
        assert_eq!(resolve("v1", &custom), Some(SelectorSet::v1()));
        assert!(resolve("v9", &custom).is_none());
    }

    #[test]
    fn test_known_versions_merges_custom() {
        let mut custom = BTreeMap::new();
        custom.insert("nightly".to_string(), SelectorSet::v1());
        assert_eq!(known_versions(&custom), vec!["nightly", "v1", "v2"]);
    }

    #[test]
    fn test_open_button_falls_back_to_artifact_button() {
        let mut set = SelectorSet::v1();
        assert_eq!(set.open_panel_button(), &set.artifact_button);
        set.artifact_open_button = Some(Locator::css("button.open"));
        assert_eq!(set.open_panel_button(), &Locator::css("button.open"));
    }

    #[test]
    fn test_selector_set_toml_roundtrip() {
        let text = toml::to_string_pretty(&SelectorSet::v2()).unwrap();
        let parsed: SelectorSet = toml::from_str(&text).unwrap();
        assert_eq!(parsed, SelectorSet::v2());
    }
}
