//! Error taxonomy for the journey engine
//!
//! One enum per protocol boundary: gateway submits, gateway queries, the
//! append protocol, journey assembly, and the verification front. Variants
//! map one-to-one onto the outcomes a caller must distinguish; in
//! particular, "could not reach the ledger" is never collapsed into
//! "does not exist", and an append whose outcome is unknown surfaces as
//! `Undetermined` rather than a generic failure.

use thiserror::Error;
use trackit_core::ReferenceError;

/// Errors from submitting a transaction to the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The node could not be reached; the transaction was not durably accepted
    #[error("Ledger unreachable, submission not accepted: {0}")]
    NetworkUnavailable(String),

    /// The ledger refused the transaction (malformed payload, insufficient resources, ...)
    #[error("Ledger rejected the transaction: {0}")]
    Rejected(String),

    /// The request was abandoned before the ledger reported an outcome
    #[error("Submission timed out before the ledger reported an outcome: {0}")]
    Timeout(String),
}

/// Errors from querying the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The node could not be reached
    #[error("Ledger unreachable: {0}")]
    NetworkUnavailable(String),

    /// The request was abandoned after the configured timeout
    #[error("Ledger query timed out: {0}")]
    Timeout(String),

    /// The node answered with something that does not parse
    #[error("Malformed ledger response: {0}")]
    MalformedResponse(String),
}

impl QueryError {
    /// Whether a retry could plausibly succeed. Malformed responses are not
    /// retried: the node answered, it just answered garbage.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_) | Self::Timeout(_))
    }
}

/// Errors from the event append protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppendError {
    /// Caller-supplied fields failed validation before submission
    #[error("Invalid journey event: {0}")]
    Validation(String),

    /// The ledger refused the event
    #[error("Ledger rejected the event: {0}")]
    Rejected(String),

    /// The submission outcome is unknown after a network fault. The event
    /// may or may not have landed: re-query the timeline before deciding
    /// to resubmit, since a blind resubmit can duplicate the event.
    #[error("Append outcome unknown after a network fault (re-query before resubmitting): {0}")]
    Undetermined(String),
}

impl From<SubmitError> for AppendError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(reason) => AppendError::Rejected(reason),
            SubmitError::NetworkUnavailable(msg) | SubmitError::Timeout(msg) => {
                AppendError::Undetermined(msg)
            }
        }
    }
}

/// Errors from assembling a product journey
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// The registry has no record under this identifier
    #[error("No product registered under identifier {0}")]
    NotFound(String),

    /// The ledger could not be queried; the product may well exist
    #[error("Ledger temporarily unavailable: {0}")]
    Unavailable(String),
}

impl From<QueryError> for AssemblyError {
    fn from(err: QueryError) -> Self {
        AssemblyError::Unavailable(err.to_string())
    }
}

/// Errors from the verification front
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// No product is registered under the given identifier
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// The ledger could not be reached; retry later rather than treating
    /// the product as missing
    #[error("Verification temporarily unavailable, try again: {0}")]
    TemporarilyUnavailable(String),

    /// The input is neither a valid reference nor a valid identifier
    #[error("{0}")]
    MalformedReference(String),
}

impl From<AssemblyError> for VerifyError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::NotFound(id) => VerifyError::UnknownProduct(id),
            AssemblyError::Unavailable(msg) => VerifyError::TemporarilyUnavailable(msg),
        }
    }
}

impl From<ReferenceError> for VerifyError {
    fn from(err: ReferenceError) -> Self {
        VerifyError::MalformedReference(err.to_string())
    }
}

/// Result alias for append operations
pub type AppendResult<T> = Result<T, AppendError>;

/// Result alias for assembly operations
pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// Result alias for verification operations
pub type VerifyResult<T> = Result<T, VerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_to_append_mapping() {
        assert_eq!(
            AppendError::from(SubmitError::Rejected("bad payload".into())),
            AppendError::Rejected("bad payload".into())
        );
        assert!(matches!(
            AppendError::from(SubmitError::Timeout("30s".into())),
            AppendError::Undetermined(_)
        ));
        assert!(matches!(
            AppendError::from(SubmitError::NetworkUnavailable("refused".into())),
            AppendError::Undetermined(_)
        ));
    }

    #[test]
    fn test_unavailable_is_not_unknown() {
        let unavailable = VerifyError::from(AssemblyError::Unavailable("offline".into()));
        let unknown = VerifyError::from(AssemblyError::NotFound("PROD-1-a".into()));
        assert!(matches!(unavailable, VerifyError::TemporarilyUnavailable(_)));
        assert!(matches!(unknown, VerifyError::UnknownProduct(_)));
        assert_ne!(unavailable.to_string(), unknown.to_string());
    }

    #[test]
    fn test_transient_query_errors() {
        assert!(QueryError::NetworkUnavailable("x".into()).is_transient());
        assert!(QueryError::Timeout("x".into()).is_transient());
        assert!(!QueryError::MalformedResponse("x".into()).is_transient());
    }
}
