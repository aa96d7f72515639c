//! TailorInk Cart
//!
//! Hands finished designs from a [`tailorink_core::DesignEditor`] to the
//! store backend: cart lines, vendor products and orders.
//!
//! [`CartBridge`] owns the submission lifecycle. It talks to the backend
//! through the [`CartApi`] trait; [`HttpCartApi`] is the REST
//! implementation.

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod pending;

pub use api::{
    BoxFuture, CartApi, CartLine, CartLinePayload, CartLineUpdate, Customer, Order, OrderLineItem,
    OrderPayload, OrderTarget, Product, ProductPayload,
};
pub use bridge::{AddOutcome, CartBridge, NavigationIntent};
pub use config::CartConfig;
pub use error::{CartError, CartResult};
pub use http::HttpCartApi;
pub use pending::PendingSubmission;
