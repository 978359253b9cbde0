//! JavaScript evaluated inside the chat page.
//!
//! Every script is an arrow function so chromiumoxide sends it through
//! `Runtime.callFunctionOn` (awaiting promises, returning by value). Locators
//! and strings are embedded as JSON literals, never spliced as raw text.

use super::locator::{Locator, Pick};
use serde_json::{json, Value};

/// Resolves a serialized [`Locator`] to an element or `null`.
const RESOLVE: &str = r#"
    const resolve = (query) => {
        let root = document;
        if (query.within) {
            root = resolve(query.within);
            if (!root) return null;
        }
        let nodes = Array.from(root.querySelectorAll(query.css));
        if (query.has_text) {
            nodes = nodes.filter(n => (n.innerText || n.textContent || '').includes(query.has_text));
        }
        if (nodes.length === 0) return null;
        return query.pick === 'last' ? nodes[nodes.length - 1] : nodes[0];
    };
    const isVisible = (el) => {
        if (typeof el.checkVisibility === 'function' && !el.checkVisibility()) return false;
        const rect = el.getBoundingClientRect();
        const style = getComputedStyle(el);
        return rect.width > 0 && rect.height > 0 &&
               style.display !== 'none' &&
               style.visibility !== 'hidden';
    };
"#;

pub fn locator_json(locator: &Locator) -> Value {
    let mut query = json!({ "css": locator.css });
    if let Some(text) = &locator.has_text {
        query["has_text"] = json!(text);
    }
    if locator.pick == Pick::Last {
        query["pick"] = json!("last");
    }
    if let Some(scope) = &locator.within {
        query["within"] = locator_json(scope);
    }
    query
}

fn with_element(locator: &Locator, body: &str) -> String {
    format!(
        r#"() => {{
    {resolve}
    const el = resolve({query});
    {body}
}}"#,
        resolve = RESOLVE,
        query = locator_json(locator),
        body = body,
    )
}

/// `{found, visible, enabled}` for the element.
pub fn element_state(locator: &Locator) -> String {
    with_element(
        locator,
        r#"if (!el) return { found: false, visible: false, enabled: false };
    const enabled = !el.disabled &&
        el.getAttribute('aria-disabled') !== 'true' &&
        el.getAttribute('contenteditable') !== 'false';
    return { found: true, visible: isVisible(el), enabled: enabled };"#,
    )
}

/// Rendered text (line breaks preserved), `null` when absent.
pub fn element_text(locator: &Locator) -> String {
    with_element(
        locator,
        r#"if (!el) return null;
    const text = el.innerText;
    return (text && text.length > 0) ? text : el.textContent;"#,
    )
}

pub fn click(locator: &Locator) -> String {
    with_element(
        locator,
        r#"if (!el) return false;
    el.scrollIntoView({ block: 'center' });
    el.click();
    return true;"#,
    )
}

/// Focus the element and remove whatever it currently holds.
pub fn focus_and_clear(locator: &Locator) -> String {
    with_element(
        locator,
        r#"if (!el) return false;
    el.focus();
    if ('value' in el && el.tagName !== 'DIV') {
        el.value = '';
        el.dispatchEvent(new Event('input', { bubbles: true }));
        return true;
    }
    const range = document.createRange();
    range.selectNodeContents(el);
    const selection = window.getSelection();
    selection.removeAllRanges();
    selection.addRange(range);
    document.execCommand('delete');
    return true;"#,
    )
}

pub fn focus(locator: &Locator) -> String {
    with_element(
        locator,
        r#"if (!el) return false;
    el.focus();
    return true;"#,
    )
}

pub fn scroll_to_top(locator: &Locator) -> String {
    with_element(
        locator,
        r#"if (!el) return false;
    el.scrollTop = 0;
    return true;"#,
    )
}

pub fn write_clipboard(text: &str) -> String {
    format!(
        r#"async () => {{
    await navigator.clipboard.writeText({});
    return true;
}}"#,
        Value::String(text.to_string())
    )
}

pub fn read_clipboard() -> String {
    r#"async () => {
    return await navigator.clipboard.readText();
}"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_json_nested() {
        let loc = Locator::css("svg.copy")
            .with_text("Copy")
            .within(Locator::css("[data-is-streaming]").last());
        let query = locator_json(&loc);
        assert_eq!(query["css"], "svg.copy");
        assert_eq!(query["has_text"], "Copy");
        assert!(query.get("pick").is_none());
        assert_eq!(query["within"]["css"], "[data-is-streaming]");
        assert_eq!(query["within"]["pick"], "last");
    }

    #[test]
    fn test_scripts_are_arrow_functions() {
        let loc = Locator::css("div");
        for script in [
            element_state(&loc),
            element_text(&loc),
            click(&loc),
            focus_and_clear(&loc),
            focus(&loc),
            scroll_to_top(&loc),
            write_clipboard("x"),
            read_clipboard(),
        ] {
            let trimmed = script.trim_start();
            assert!(
                trimmed.starts_with("() =>") || trimmed.starts_with("async () =>"),
                "not a function: {}",
                trimmed
            );
        }
    }

    #[test]
    fn test_selector_quotes_are_escaped() {
        let script = click(&Locator::css(r#"button[aria-label="Send message"]"#));
        assert!(script.contains(r#""css":"button[aria-label=\"Send message\"]""#));
    }

    #[test]
    fn test_clipboard_text_is_json_literal() {
        let script = write_clipboard("a'b\"c\n");
        assert!(script.contains(r#"writeText("a'b\"c\n")"#));
    }
}
