//! Closed error taxonomy for the bridge core.
//!
//! The Ledger and pipelines return these structured kinds only; turning a
//! kind into an HTTP status or a log line happens at the transport edge.

use thiserror::Error;

/// Every failure the core can surface, as a closed set of kinds.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// A queried entity is absent. Never retried.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A caller-supplied write would break a ledger invariant.
    #[error("invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// The idempotency key was already processed.
    #[error("duplicate submission for key {key}")]
    DuplicateSubmission { key: String },

    /// An external collaborator failed with a retryable error. The pipeline
    /// aborted without committing; the caller may resubmit the same key.
    #[error("transient failure from {component}: {reason}")]
    ExternalTransient {
        component: &'static str,
        reason: String,
    },

    /// An external collaborator failed terminally (reverted tx, rejected
    /// signature). Operator intervention required.
    #[error("permanent failure from {component}: {reason}")]
    ExternalPermanent {
        component: &'static str,
        reason: String,
    },

    /// The commit succeeded but a post-commit handler failed. Ledger state is
    /// consistent; the pending on-chain action carries a correlation id for
    /// manual reconciliation.
    #[error("post-commit step failed ({component}, correlation {correlation_id}): {reason}")]
    PartialCommit {
        component: &'static str,
        correlation_id: String,
        reason: String,
    },
}

impl BridgeError {
    pub fn not_found(entity: &'static str) -> Self {
        BridgeError::NotFound { entity }
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        BridgeError::InvariantViolation {
            reason: reason.into(),
        }
    }

    pub fn duplicate(key: impl Into<String>) -> Self {
        BridgeError::DuplicateSubmission { key: key.into() }
    }

    pub fn transient(component: &'static str, reason: impl Into<String>) -> Self {
        BridgeError::ExternalTransient {
            component,
            reason: reason.into(),
        }
    }

    pub fn permanent(component: &'static str, reason: impl Into<String>) -> Self {
        BridgeError::ExternalPermanent {
            component,
            reason: reason.into(),
        }
    }

    /// Whether a client may resubmit the same idempotency key and expect a
    /// fresh attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::ExternalTransient { .. })
    }

    /// HTTP status the (external) transport layer maps this kind to.
    pub fn http_status(&self) -> u16 {
        match self {
            BridgeError::NotFound { .. } => 404,
            BridgeError::InvariantViolation { .. } => 422,
            BridgeError::DuplicateSubmission { .. } => 409,
            BridgeError::ExternalTransient { .. } => 503,
            BridgeError::ExternalPermanent { .. } => 502,
            BridgeError::PartialCommit { .. } => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
