use serde::{Deserialize, Serialize};
use std::fmt;

/// Which element to act on when a locator matches several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pick {
    #[default]
    First,
    Last,
}

/// A CSS selector plus the filters the target page forces on us: a text match
/// (for buttons that only differ by label) and an optional scope.
///
/// In TOML a locator is either a plain string or a table:
///
/// ```toml
/// input = "div[contenteditable='true']"
/// artifact_copy_button = { css = "button", has_text = "Copy" }
/// completion_indicator = { css = "svg[data-testid='action-bar-copy']", within = { css = "[data-is-streaming]", pick = "last" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocatorRepr")]
pub struct Locator {
    pub css: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_text: Option<String>,
    #[serde(default, skip_serializing_if = "is_first")]
    pub pick: Pick,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<Box<Locator>>,
}

fn is_first(pick: &Pick) -> bool {
    *pick == Pick::First
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocatorRepr {
    Css(String),
    Full {
        css: String,
        #[serde(default)]
        has_text: Option<String>,
        #[serde(default)]
        within: Option<Box<Locator>>,
        #[serde(default)]
        pick: Pick,
    },
}

impl From<LocatorRepr> for Locator {
    fn from(repr: LocatorRepr) -> Self {
        match repr {
            LocatorRepr::Css(css) => Locator::css(css),
            LocatorRepr::Full { css, has_text, within, pick } => Locator { css, has_text, within, pick },
        }
    }
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            has_text: None,
            within: None,
            pick: Pick::First,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    pub fn within(mut self, scope: Locator) -> Self {
        self.within = Some(Box::new(scope));
        self
    }

    pub fn last(mut self) -> Self {
        self.pick = Pick::Last;
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.within {
            write!(f, "{} >> ", scope)?;
        }
        write!(f, "{}", self.css)?;
        if let Some(text) = &self.has_text {
            write!(f, " [text~=\"{}\"]", text)?;
        }
        if self.pick == Pick::Last {
            write!(f, " (last)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Holder {
        loc: Locator,
    }

    #[test]
    fn test_plain_string_locator() {
        let holder: Holder = toml::from_str(r#"loc = "button[aria-label='Close']""#).unwrap();
        assert_eq!(holder.loc, Locator::css("button[aria-label='Close']"));
    }

    #[test]
    fn test_table_locator_with_scope() {
        let holder: Holder = toml::from_str(
            r#"loc = { css = "svg.copy", within = { css = "[data-is-streaming]", pick = "last" } }"#,
        )
        .unwrap();
        let expected = Locator::css("svg.copy").within(Locator::css("[data-is-streaming]").last());
        assert_eq!(holder.loc, expected);
    }

    #[test]
    fn test_serialization_omits_defaults() {
        let holder = Holder {
            loc: Locator::css("button").with_text("Copy"),
        };
        let text = toml::to_string(&holder).unwrap();
        assert!(text.contains("has_text = \"Copy\""));
        assert!(!text.contains("pick"));
        assert!(!text.contains("within"));

        let back: Holder = toml::from_str(&text).unwrap();
        assert_eq!(back.loc, holder.loc);
    }

    #[test]
    fn test_display() {
        let loc = Locator::css("svg.copy")
            .within(Locator::css("[data-is-streaming]").last())
            .with_text("Copy");
        assert_eq!(
            loc.to_string(),
            "[data-is-streaming] (last) >> svg.copy [text~=\"Copy\"]"
        );
    }
}
