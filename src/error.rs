//! Error types for route operations
//!
//! Availability probes and fan-out checks never surface these; they degrade to
//! `false` or exclusion. Everything else propagates a [`RouteError`] untouched.

use thiserror::Error;

use crate::routes::RouteKind;

/// Result alias used by every route, dispatcher and tracker operation.
pub type RouteResult<T> = Result<T, RouteError>;

#[derive(Error, Debug)]
pub enum RouteError {
    // ========================================================================
    // Recoverable: caller should try another route or wait
    // ========================================================================
    #[error("Route unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    // ========================================================================
    // Programming errors: never retried
    // ========================================================================
    #[error("Unsupported operation: {operation} for route {route}")]
    UnsupportedOperation { operation: String, route: RouteKind },

    #[error("Invalid payload for route {route}: {reason}")]
    InvalidPayload { route: RouteKind, reason: String },

    #[error("Unknown route: {route}")]
    UnknownRoute { route: String },

    #[error("Route already registered: {route}")]
    DuplicateRoute { route: RouteKind },

    // ========================================================================
    // Amount validation
    // ========================================================================
    #[error("Invalid amount: {reason}")]
    ArithmeticInvalid { reason: String },

    // ========================================================================
    // Collaborator failures (chain client, attestation network)
    // ========================================================================
    #[error("Chain client error: {0}")]
    Chain(eyre::Report),
}

impl RouteError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        RouteError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn arithmetic(reason: impl Into<String>) -> Self {
        RouteError::ArithmeticInvalid {
            reason: reason.into(),
        }
    }

    pub fn unsupported(operation: &str, route: RouteKind) -> Self {
        RouteError::UnsupportedOperation {
            operation: operation.to_string(),
            route,
        }
    }

    /// Whether waiting or choosing another route may resolve the error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RouteError::Unavailable { .. } | RouteError::NotFound { .. } | RouteError::Timeout { .. }
        )
    }
}

impl From<eyre::Report> for RouteError {
    fn from(report: eyre::Report) -> Self {
        RouteError::Chain(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(RouteError::unavailable("no relayer").is_recoverable());
        assert!(RouteError::Timeout { attempts: 3 }.is_recoverable());
        assert!(!RouteError::unsupported("redeem", RouteKind::Relay).is_recoverable());
        assert!(!RouteError::arithmetic("negative").is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = RouteError::unsupported("redeem", RouteKind::CctpRelay);
        assert_eq!(
            err.to_string(),
            "Unsupported operation: redeem for route cctpRelay"
        );

        let err: RouteError = eyre::eyre!("rpc down").into();
        assert_eq!(err.to_string(), "Chain client error: rpc down");
    }
}
