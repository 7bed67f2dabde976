// Error taxonomy for the booking pipeline.
// Every stage wraps its cause in a stage-specific variant so callers always know
// which step of the flow failed and whether the upstream answered at all.

use std::fmt;
use thiserror::Error;

use crate::pipeline::PipelineState;

// The steps of a booking flow, used to tag errors and log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Authenticate,
    Search,
    Select,
    Price,
    Book,
    Retrieve,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Authenticate => "authenticate",
            Stage::Search => "search",
            Stage::Select => "select",
            Stage::Price => "price",
            Stage::Book => "book",
            Stage::Retrieve => "retrieve",
        };
        f.write_str(name)
    }
}

// Failures of the injected transport (network, timeout, unbuildable request)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// Input rejected locally, before anything is sent upstream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid search criteria: {0}")]
    InvalidCriteria(String),

    #[error("At least one traveler is required")]
    NoTravelers,

    #[error("Offer is priced for {required} traveler(s) but {supplied} were supplied")]
    TravelerCountMismatch { required: usize, supplied: usize },

    #[error("Traveler #{position} is invalid: {reason}")]
    InvalidTraveler { position: usize, reason: String },

    #[error("Order id must not be empty")]
    EmptyOrderId,

    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("Order is incomplete: {0}")]
    IncompleteOrder(String),

    #[error("No client credential or access token configured")]
    MissingCredential,
}

/// Why a single stage failed.
#[derive(Error, Debug)]
pub enum StageFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("upstream returned {status_code}: {message}")]
    Upstream { status_code: u16, message: String },

    #[error("could not decode upstream response: {0}")]
    Decode(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl StageFailure {
    /// Network trouble, throttling and upstream 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            StageFailure::Transport(TransportError::InvalidRequest(_)) => false,
            StageFailure::Transport(_) => true,
            StageFailure::Upstream { status_code, .. } => {
                *status_code == 429 || *status_code >= 500
            }
            StageFailure::Decode(_) | StageFailure::Invalid(_) => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            StageFailure::Upstream { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Offer index {index} is outside 1..={available}")]
    IndexOutOfRange { index: i64, available: usize },
}

// Stage-level errors surfaced to the caller. Each one aborts the rest of the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Authentication failed: {0}")]
    AuthError(StageFailure),

    #[error("Flight search failed: {0}")]
    SearchError(StageFailure),

    #[error(transparent)]
    SelectionError(#[from] SelectionError),

    #[error("Pricing failed: {0}")]
    PricingError(StageFailure),

    #[error("Booking failed: {0}")]
    BookingError(StageFailure),

    #[error("Order {order_id} not found")]
    NotFoundError { order_id: String },

    #[error("Order retrieval failed: {0}")]
    RetrievalError(StageFailure),

    #[error("Cannot {operation} while the run is {state}")]
    OutOfOrder {
        operation: Stage,
        state: PipelineState,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::AuthError(_) => Stage::Authenticate,
            PipelineError::SearchError(_) => Stage::Search,
            PipelineError::SelectionError(_) => Stage::Select,
            PipelineError::PricingError(_) => Stage::Price,
            PipelineError::BookingError(_) => Stage::Book,
            PipelineError::NotFoundError { .. } | PipelineError::RetrievalError(_) => {
                Stage::Retrieve
            }
            PipelineError::OutOfOrder { operation, .. } => *operation,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            PipelineError::AuthError(f)
            | PipelineError::SearchError(f)
            | PipelineError::PricingError(f)
            | PipelineError::BookingError(f)
            | PipelineError::RetrievalError(f) => Some(f),
            _ => None,
        }
    }

    /// Upstream HTTP status, when the upstream answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PipelineError::NotFoundError { .. } => Some(404),
            other => other.failure().and_then(StageFailure::status_code),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self.failure(),
            Some(StageFailure::Transport(TransportError::Timeout(_)))
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.failure(), Some(StageFailure::Invalid(_)))
    }
}

// The upstream booking succeeded but the document store rejected the record
#[derive(Error, Debug)]
#[error("Order {order_id} was booked but could not be persisted: {source}")]
pub struct PersistenceError {
    pub order_id: String,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tagging() {
        let err = PipelineError::PricingError(StageFailure::Upstream {
            status_code: 400,
            message: "SEGMENT SELL FAILURE".to_string(),
        });
        assert_eq!(err.stage(), Stage::Price);
        assert_eq!(err.status_code(), Some(400));
        assert!(!err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Pricing failed: upstream returned 400: SEGMENT SELL FAILURE"
        );
    }

    #[test]
    fn test_timeout_is_reported_per_stage() {
        let err = PipelineError::SearchError(TransportError::Timeout(250).into());
        assert_eq!(err.stage(), Stage::Search);
        assert!(err.is_timeout());
        assert_eq!(err.status_code(), None);
        assert_eq!(
            err.to_string(),
            "Flight search failed: Request timeout after 250ms"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(StageFailure::from(TransportError::NetworkError("reset".into())).is_transient());
        assert!(StageFailure::Upstream {
            status_code: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!StageFailure::Upstream {
            status_code: 401,
            message: String::new()
        }
        .is_transient());
        assert!(!StageFailure::from(ValidationError::NoTravelers).is_transient());
    }

    #[test]
    fn test_not_found_carries_status() {
        let err = PipelineError::NotFoundError {
            order_id: "abc".to_string(),
        };
        assert_eq!(err.stage(), Stage::Retrieve);
        assert_eq!(err.status_code(), Some(404));
    }
}
