//! Change events.

use serde::{Deserialize, Serialize};

/// Repository root that change paths live under
pub const CONTENT_ROOT: &str = "/content";

/// Kind of content change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// Resource created
    Added,
    /// Resource modified
    Changed,
    /// Resource deleted
    Removed,
}

/// One content change, as posted to the enrichment endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Content path, e.g. `/content/wknd/en/adventures`
    pub path: String,
    /// What happened to it
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Create an event
    #[must_use]
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Whether the event should be forwarded
    #[must_use]
    pub fn is_relevant(&self) -> bool {
        is_content_path(&self.path)
    }
}

/// Paths under `/content`, excluding system and ACL nodes.
#[must_use]
pub fn is_content_path(path: &str) -> bool {
    path.starts_with(CONTENT_ROOT) && !path.contains("/jcr:system") && !path.contains("/rep:policy")
}
