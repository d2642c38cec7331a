use thiserror::Error;

/// Why a single upstream attempt produced nothing usable.
///
/// Every variant is handled inside the source chain that observed it; none of
/// them reaches an HTTP caller.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network failure or a non-success HTTP status.
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// The body parsed but does not have the expected shape or types.
    #[error("{source_name} returned a malformed response: {reason}")]
    MalformedResponse { source_name: String, reason: String },

    /// The series is well formed but too short to be useful.
    #[error("{source_name} returned {got} points, need at least {need}")]
    InsufficientData {
        source_name: String,
        got: usize,
        need: usize,
    },

    #[error("{source_name} timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    /// The chain validator refused an otherwise well-formed value.
    #[error("{source_name} value rejected: {reason}")]
    Rejected { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_name: &str, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(source_name: &str, reason: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}
