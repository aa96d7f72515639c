//! Cart bridge errors.

use tailorink_core::{DesignError, StorageError};
use thiserror::Error;

/// Errors from the cart and order bridge.
#[derive(Debug, Error)]
pub enum CartError {
    /// None of the designs has printable content.
    #[error("No valid designs to submit")]
    NoValidDesigns,

    #[error("Quantity {quantity} out of range 1..={max}")]
    InvalidQuantity { quantity: u32, max: u32 },

    #[error("No cart line is being edited")]
    MissingCartId,

    #[error("Order has no line items")]
    EmptyOrder,

    /// A price or subtotal does not fit in a `u64`.
    #[error("Price overflow")]
    PriceOverflow,

    /// A newer submission started before this one finished.
    #[error("Submission superseded by a newer one")]
    Superseded,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Cart API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Design(#[from] DesignError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for cart operations.
pub type CartResult<T> = Result<T, CartError>;
