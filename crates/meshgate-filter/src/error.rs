//! error types for meshgate-filter.

use std::path::PathBuf;

use thiserror::Error;

/// errors that can occur in meshgate-filter.
///
/// every variant means the rule list was not accepted; a reload that fails
/// with any of them leaves the previously active rules in place.
#[derive(Debug, Error)]
pub enum Error {
    /// failed to parse the json rule list.
    #[error("failed to parse rule list JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    /// a rule carries a malformed pattern or port range.
    #[error("invalid filter rule at index {index}: {cause}")]
    InvalidRule {
        /// the zero-based index of the invalid rule in the list.
        index: usize,
        /// the specific parse error.
        cause: ParseError,
    },

    /// the rule-list document exceeds the configured size limit.
    // intentionally generic - don't leak the actual size
    #[error("rule list exceeds maximum size")]
    TooLarge(usize),

    /// the rule-list file could not be read.
    #[error("failed to read rule list {path}: {source}")]
    Io {
        /// the file that was being read.
        path: PathBuf,
        /// the underlying io error.
        source: std::io::Error,
    },
}

/// parse errors for patterns and port ranges.
///
/// these indicate a rule list the policy compiler should never have emitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// pattern is neither `*` nor a valid `address/prefix` literal.
    #[error("invalid pattern: {0:?}")]
    InvalidPattern(String),

    /// port range has its bounds inverted.
    #[error("invalid port range: {first}-{last}")]
    InvalidPortRange {
        /// first port as received.
        first: u16,
        /// last port as received.
        last: u16,
    },
}

/// result type for meshgate-filter operations.
pub type Result<T> = std::result::Result<T, Error>;
