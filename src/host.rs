//! Capabilities the interaction protocol borrows from its environment.
//!
//! A [`Host`] owns the live document: it dispatches synthetic events, runs
//! selector queries, waits for text to appear and lets pending work flush.
//! The protocol in [`crate::interaction`] only ever talks to the widget
//! through these methods.

use std::fmt;

use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;
use crate::event::SyntheticEvent;

/// Elements ignored by a plain text query.
pub const DEFAULT_IGNORE: &str = "script, style";

/// Elements without a focus index. Option lists render a second,
/// screen-reader-only copy of the focused option's text in a live region;
/// that copy carries no `tabindex`, the clickable option does.
pub const INACCESSIBLE: &str = ":not([tabindex])";

#[async_trait(?Send)]
pub trait Host {
    type Node: Clone + fmt::Debug;

    /// Structural parent, `None` at the top of the tree.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Dispatch `event` on `target` and run its listeners synchronously.
    fn dispatch(&self, target: &Self::Node, event: &SyntheticEvent) -> Result<()>;

    /// Every element under `root` matching `selector`, in document order.
    fn query_all(&self, root: &Self::Node, selector: &str) -> Result<Vec<Self::Node>>;

    /// Poll until exactly one element under `root` matches `query`.
    ///
    /// Fails with [`crate::SelectError::NotFound`] once the host's timeout
    /// elapses with zero or several candidates.
    async fn find_by_text(&self, root: &Self::Node, query: &TextQuery) -> Result<Self::Node>;

    /// Suspend until the environment's scheduled work has run.
    async fn settle(&self);
}

/// Trim and collapse whitespace runs, the way rendered text reads.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// How a label is compared against an element's text.
#[derive(Debug, Clone)]
pub enum TextMatch {
    Exact(String),
    Pattern(Regex),
}

impl TextMatch {
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(TextMatch::Pattern)
            .map_err(|e| crate::SelectError::InvalidSelector { selector: pattern.to_string(), error: e.to_string() })
    }

    /// Compare against raw element text; normalization happens here.
    pub fn matches(&self, text: &str) -> bool {
        let text = normalize_text(text);
        match self {
            TextMatch::Exact(expected) => text == normalize_text(expected),
            TextMatch::Pattern(re) => re.is_match(&text),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::Exact(text) => write!(f, "{}", text),
            TextMatch::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for TextMatch {
    fn from(text: &str) -> Self {
        TextMatch::Exact(text.to_string())
    }
}

impl From<String> for TextMatch {
    fn from(text: String) -> Self {
        TextMatch::Exact(text)
    }
}

impl From<&String> for TextMatch {
    fn from(text: &String) -> Self {
        TextMatch::Exact(text.clone())
    }
}

impl From<Regex> for TextMatch {
    fn from(re: Regex) -> Self {
        TextMatch::Pattern(re)
    }
}

/// A text search: what to match and which elements to skip.
#[derive(Debug, Clone)]
pub struct TextQuery {
    pub matcher: TextMatch,
    /// Selector list; matching elements are never returned.
    pub ignore: String,
}

impl TextQuery {
    pub fn new(matcher: impl Into<TextMatch>) -> Self {
        TextQuery { matcher: matcher.into(), ignore: DEFAULT_IGNORE.to_string() }
    }

    /// Only elements that carry a tab index qualify.
    pub fn accessible(matcher: impl Into<TextMatch>) -> Self {
        TextQuery { matcher: matcher.into(), ignore: INACCESSIBLE.to_string() }
    }

    pub fn label(&self) -> String {
        self.matcher.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("  Create   \"New\n Tag\" "), "Create \"New Tag\"");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_exact_match_ignores_surrounding_whitespace() {
        let m = TextMatch::from("Banana");
        assert!(m.matches(" Banana\n"));
        assert!(!m.matches("Banana split"));
        assert!(!m.matches("banana"));
    }

    #[test]
    fn test_pattern_match() {
        let m = TextMatch::pattern(r#"^Create ""#).unwrap();
        assert!(m.matches("Create \"NewTag\""));
        assert!(!m.matches("Created \"NewTag\""));
        assert_eq!(m.to_string(), "/^Create \"/");
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        match TextMatch::pattern("(unclosed") {
            Err(crate::SelectError::InvalidSelector { selector, .. }) => assert_eq!(selector, "(unclosed"),
            other => panic!("Expected InvalidSelector, got {:?}", other),
        }
    }

    #[test]
    fn test_accessible_query_ignores_untabbable_elements() {
        let q = TextQuery::accessible("Apple");
        assert_eq!(q.ignore, INACCESSIBLE);
        assert_eq!(q.label(), "Apple");
        assert_eq!(TextQuery::new("Apple").ignore, DEFAULT_IGNORE);
    }
}
