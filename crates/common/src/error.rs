//! Error taxonomy for ShopCheck
//!
//! Only [`Error::Obstruction`] and [`Error::Timeout`] are ever retried, and
//! only inside the component that owns the remedy. Everything else surfaces
//! unmodified to the scenario outcome.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::checkout::CheckoutState;

/// Result type alias using ShopCheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// ShopCheck error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Obstruction '{signature}' still blocks {target} after {attempts} attempt(s)")]
    Obstruction {
        signature: String,
        target: String,
        attempts: u32,
    },

    #[error("{page} page: landmark '{landmark}' not visible")]
    PageState { page: String, landmark: String },

    #[error("Price inconsistency in {scope}: expected {expected}, observed {observed}")]
    PriceInconsistency {
        scope: Scope,
        expected: Decimal,
        observed: Decimal,
    },

    #[error("Invalid transition: cannot {action} from {from}")]
    InvalidTransition {
        from: CheckoutState,
        action: &'static str,
    },

    #[error("Timeout after {after_ms} ms waiting for: {what}")]
    Timeout { what: String, after_ms: u64 },

    #[error("Cart is empty, cannot proceed to checkout")]
    EmptyCart,

    #[error("Cannot normalize '{input}': {reason}")]
    Normalization { input: String, reason: String },
}

/// The part of a cart an oracle check was looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    /// A single row's `lineTotal`
    Line { product_id: u32, name: String },
    /// A single row's quantity (merge checks, expected-vs-observed)
    Quantity { product_id: u32 },
    /// A single row's unit price (expected-vs-observed)
    UnitPrice { product_id: u32 },
    /// Number of rows in the cart
    RowCount,
    /// The displayed aggregate
    GrandTotal,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Line { product_id, name } => write!(f, "line total of #{} ({})", product_id, name),
            Scope::Quantity { product_id } => write!(f, "quantity of #{}", product_id),
            Scope::UnitPrice { product_id } => write!(f, "unit price of #{}", product_id),
            Scope::RowCount => write!(f, "cart row count"),
            Scope::GrandTotal => write!(f, "grand total"),
        }
    }
}

/// Coarse classification reported alongside every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Obstruction,
    PageState,
    PriceInconsistency,
    InvalidTransition,
    Timeout,
    EmptyCart,
    Normalization,
    /// Infrastructure failures outside the taxonomy (driver, I/O, config)
    Harness,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Obstruction => "obstruction",
            ErrorKind::PageState => "page_state",
            ErrorKind::PriceInconsistency => "price_inconsistency",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Timeout => "timeout",
            ErrorKind::EmptyCart => "empty_cart",
            ErrorKind::Normalization => "normalization",
            ErrorKind::Harness => "harness",
        };
        f.write_str(s)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Obstruction { .. } => ErrorKind::Obstruction,
            Error::PageState { .. } => ErrorKind::PageState,
            Error::PriceInconsistency { .. } => ErrorKind::PriceInconsistency,
            Error::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::EmptyCart => ErrorKind::EmptyCart,
            Error::Normalization { .. } => ErrorKind::Normalization,
        }
    }

    /// Whether the owning component may retry this error locally
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Obstruction { .. } | Error::Timeout { .. })
    }

    pub fn page_state(page: impl Into<String>, landmark: impl Into<String>) -> Self {
        Error::PageState {
            page: page.into(),
            landmark: landmark.into(),
        }
    }

    /// Structured form handed to the test runner
    pub fn to_failure(&self) -> Failure {
        let (expected, observed) = match self {
            Error::PriceInconsistency {
                expected, observed, ..
            } => (Some(expected.to_string()), Some(observed.to_string())),
            Error::PageState { landmark, .. } => (Some(landmark.clone()), None),
            Error::InvalidTransition { from, .. } => (None, Some(from.to_string())),
            _ => (None, None),
        };
        Failure {
            kind: self.kind(),
            message: self.to_string(),
            expected,
            observed,
        }
    }
}

/// A scenario failure as reported to the runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            expected: None,
            observed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_obstruction_and_timeout_retry() {
        let timeout = Error::Timeout {
            what: "landmark".into(),
            after_ms: 10,
        };
        assert!(timeout.is_retryable());
        assert!(!Error::EmptyCart.is_retryable());
        assert!(!Error::InvalidTransition {
            from: CheckoutState::CartReview,
            action: "pay",
        }
        .is_retryable());
    }

    #[test]
    fn test_price_failure_carries_payload() {
        let err = Error::PriceInconsistency {
            scope: Scope::GrandTotal,
            expected: Decimal::new(100000, 2),
            observed: Decimal::new(50000, 2),
        };
        let failure = err.to_failure();
        assert_eq!(failure.kind, ErrorKind::PriceInconsistency);
        assert_eq!(failure.expected.as_deref(), Some("1000.00"));
        assert_eq!(failure.observed.as_deref(), Some("500.00"));
        assert!(failure.message.contains("grand total"));
    }
}
