use std::error::Error as StdError;
use std::fmt;

mod demo;
mod dom;
mod markup;
mod page;

pub use demo::{
    AttributeDemo, GRAPHIC_SLOT_NAME, MOUNT_POINT_ID, NONCE_VALUE, PART_HOST_ID, PART_VALUE,
    SLOT_VALUE, SVG_ID,
};
pub use dom::{NodeId, ShadowMode};
pub use page::{Host, Page};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    MarkupParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    MountPointMissing(String),
    Dom(String),
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkupParse(msg) => write!(f, "markup parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::MountPointMissing(id) => write!(f, "required mount point missing: #{id}"),
            Self::Dom(msg) => write!(f, "dom error: {msg}"),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_point_missing_error_names_the_id() {
        let err = Error::MountPointMissing("app".into());
        assert_eq!(err.to_string(), "required mount point missing: #app");
    }

    #[test]
    fn assertion_failed_error_carries_dom_snippet() {
        let err = Error::AssertionFailed {
            selector: "#demo-svg".into(),
            expected: "demo-part".into(),
            actual: "other".into(),
            dom_snippet: "<svg id=\"demo-svg\"></svg>".into(),
        };
        let text = err.to_string();
        assert!(text.contains("#demo-svg"));
        assert!(text.contains("snippet <svg"));
    }
}
