//! Error taxonomy for the schema-constrained decoding engine.
//!
//! `process()` and `didSample()` on [`crate::processor::LogitProcessor`] can
//! never return `Result` — the host runtime's hook contract is fixed — so
//! errors raised mid-generation are recorded on the processor and inspected
//! between steps via `last_error()`. Only `JsonValidator`, `RepairLoop`, and
//! schema/tokenizer construction return `Result<_, EngineError>` directly.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// The complete error taxonomy (spec §7).
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// No token continues the current key and no terminal has been reached.
    /// Fatal for the current decoding step.
    #[error("no valid tokens while emitting key {partial_key:?} at position {position}")]
    NoValidTokens { partial_key: String, position: usize },

    /// A sampled token did not match any outgoing trie edge. Non-fatal; the
    /// processor counts these and resets the trie path after two in a row.
    #[error("invalid token {token_id} selected while emitting key {partial_key:?} (expected one of {expected:?})")]
    InvalidTokenSelected {
        token_id: i32,
        partial_key: String,
        expected: Vec<i32>,
    },

    /// A mask hint would allow nothing. Recorded, not acted upon synchronously.
    #[error("empty constraint set produced for the current phase")]
    EmptyConstraints,

    /// The schema could not produce a node/trie for the current context.
    #[error("schema violation: {reason}")]
    SchemaViolation { reason: String },

    /// Post-generation validation failed after all repair attempts.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] crate::validator::ValidationError),

    /// The bounded streaming buffer (default 2 MiB) overflowed during retry.
    #[error("stream buffer exceeded limit of {limit_bytes} bytes")]
    StreamBufferExceeded { limit_bytes: usize },

    /// The host cancelled the outer request; never wrapped further.
    #[error("request canceled")]
    Canceled,

    /// Tokenizer or schema construction failed; fatal and propagated.
    #[error("backend failure: {0}")]
    BackendFailure(String),
}

impl EngineError {
    /// Whether this error kind halts the current generation attempt
    /// immediately (spec §7 propagation rules), as opposed to being recorded
    /// and left for the caller to notice later.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::NoValidTokens { .. }
                | EngineError::InvalidTokenSelected { .. }
                | EngineError::Canceled
                | EngineError::BackendFailure(_)
        )
    }

    /// The partial key string at the point of failure, if any — surfaced to
    /// the host alongside the message (spec §7 "user-visible behavior").
    pub fn partial_key(&self) -> Option<&str> {
        match self {
            EngineError::NoValidTokens { partial_key, .. } => Some(partial_key),
            EngineError::InvalidTokenSelected { partial_key, .. } => Some(partial_key),
            _ => None,
        }
    }

    /// A short, human-readable remediation hint where one is derivable.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            EngineError::NoValidTokens { .. } => {
                Some("schema has no matching keys reachable from this trie path")
            }
            EngineError::EmptyConstraints => {
                Some("widen the schema or disable hard masking for this context")
            }
            EngineError::StreamBufferExceeded { .. } => {
                Some("increase streamBufferLimitBytes or shorten max_new_tokens")
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::SchemaViolation {
            reason: format!("invalid JSON: {err}"),
        }
    }
}

#[cfg(feature = "hf-tokenizer")]
impl From<tokenizers::Error> for EngineError {
    fn from(err: tokenizers::Error) -> Self {
        EngineError::BackendFailure(format!("tokenizer error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds_match_spec() {
        let fatal = EngineError::NoValidTokens {
            partial_key: "nam".into(),
            position: 3,
        };
        assert!(fatal.is_fatal());

        let non_fatal = EngineError::EmptyConstraints;
        assert!(!non_fatal.is_fatal());
    }

    #[test]
    fn remediation_present_for_no_valid_tokens() {
        let err = EngineError::NoValidTokens {
            partial_key: "nam".into(),
            position: 3,
        };
        assert!(err.remediation().is_some());
    }
}
