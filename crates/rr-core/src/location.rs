//! Place-name normalization.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// A validated pair of free-text place names.
///
/// Both names are trimmed and HTML-escaped.  Construction fails when either
/// is empty afterwards, so holding a `LocationPair` means the request has
/// already passed input validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPair {
    start: String,
    end:   String,
}

impl LocationPair {
    pub fn new(start: &str, end: &str) -> CoreResult<Self> {
        let start = normalize(start);
        let end = normalize(end);

        if start.is_empty() {
            return Err(CoreError::InvalidInput("start location is empty".into()));
        }
        if end.is_empty() {
            return Err(CoreError::InvalidInput("end location is empty".into()));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }
}

impl std::fmt::Display for LocationPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Trim surrounding whitespace and escape HTML metacharacters.
pub fn normalize(raw: &str) -> String {
    escape_html(raw.trim())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
