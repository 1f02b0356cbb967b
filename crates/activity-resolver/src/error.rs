//! Resolution error types.
//!
//! Three classes must stay distinct:
//! - `NotFound`: the resource does not exist or cannot be located. Business-normal.
//! - `Transient`: the lookup failed for reasons unrelated to existence. Retry later.
//! - `ContractViolation`: upstream data broke an invariant. Stop processing the item.

use activity_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient failure looking up {resource}: {source}")]
    Transient {
        resource: String,
        #[source]
        source: GraphError,
    },

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ResolveError {
    pub fn transient(resource: impl Into<String>, source: GraphError) -> Self {
        Self::Transient {
            resource: resource.into(),
            source,
        }
    }

    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    /// A later attempt for the same identifier may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Upstream data is structurally invalid; the current item must not be skipped silently.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }
}
