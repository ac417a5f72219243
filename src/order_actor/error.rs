//! Error types for order operations.

use crate::model::{OrderId, OrderStatus};
use crate::validation::ValidationError;
use thiserror::Error;

/// Broad class of an [`OrderError`]; the HTTP status derives from this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Transition,
    Store,
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict | ErrorKind::Transition => 409,
            ErrorKind::Store => 500,
        }
    }
}

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The product key is not in the catalog.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Tracking number is required")]
    InvalidTracking,

    #[error("Unknown sort field: {0}")]
    InvalidSort(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// No credential was presented.
    #[error("Authentication required")]
    Unauthorized,

    /// A credential was presented but does not grant the operation.
    #[error("Not permitted")]
    Forbidden,

    /// The same buyer placed the same order moments ago.
    #[error("Duplicate order, already placed as {existing}")]
    Duplicate { existing: OrderId },

    #[error("Order not found: {0}")]
    NotFound(String),

    /// The order is not in a status the operation can start from.
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order store error: {0}")]
    Persistence(String),
}

impl OrderError {
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::Validation(e) => e.code(),
            OrderError::UnknownProduct(_) => "UNKNOWN_PRODUCT",
            OrderError::InvalidTracking => "INVALID_TRACKING",
            OrderError::InvalidSort(_) => "INVALID_SORT",
            OrderError::InvalidFilter(_) => "INVALID_FILTER",
            OrderError::Unauthorized => "UNAUTHORIZED",
            OrderError::Forbidden => "FORBIDDEN",
            OrderError::Duplicate { .. } => "DUPLICATE_ORDER",
            OrderError::NotFound(_) => "NOT_FOUND",
            OrderError::InvalidTransition { .. } => "INVALID_TRANSITION",
            OrderError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::Validation(_)
            | OrderError::UnknownProduct(_)
            | OrderError::InvalidTracking
            | OrderError::InvalidSort(_)
            | OrderError::InvalidFilter(_) => ErrorKind::Validation,
            OrderError::Unauthorized => ErrorKind::Unauthorized,
            OrderError::Forbidden => ErrorKind::Forbidden,
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::Duplicate { .. } => ErrorKind::Conflict,
            OrderError::InvalidTransition { .. } => ErrorKind::Transition,
            OrderError::Persistence(_) => ErrorKind::Store,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}
