use http::Method;
use thiserror::Error;

/// Fatal registration errors reported by [`RouterBuilder::build`](super::RouterBuilder::build).
///
/// A router that fails to build must stop the process before it starts
/// serving; none of these are meant to be handled per request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route {method} '{pattern}' has no handler")]
    EmptyHandlers { method: Method, pattern: String },
}

impl RouterError {
    pub fn invalid_pattern<P: ToString, S: ToString>(pattern: P, reason: S) -> Self {
        Self::InvalidPattern { pattern: pattern.to_string(), reason: reason.to_string() }
    }

    pub fn empty_handlers<P: ToString>(method: Method, pattern: P) -> Self {
        Self::EmptyHandlers { method, pattern: pattern.to_string() }
    }
}
