//! Backend contract: wire types and the [`CartApi`] trait.

use crate::error::CartResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tailorink_core::{Design, DesignState, TextProps};

/// Boxed future for backend calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The signed-in shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: String,
}

/// Body of `POST /store/cart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinePayload {
    pub designs: Vec<Design>,
    pub design_state: DesignState,
    pub props_state: TextProps,
    pub quantity: u32,
    pub price: u64,
    pub email: String,
    #[serde(rename = "customer_id")]
    pub customer_id: String,
}

/// Body of `PUT /store/cart?cartId=`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineUpdate {
    pub designs: Vec<Design>,
    pub design_state: DesignState,
    pub props_state: TextProps,
    pub price: u64,
}

/// A line in the shopper's cart as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub designs: Vec<Design>,
    #[serde(default)]
    pub design_state: Option<DesignState>,
    #[serde(default)]
    pub props_state: Option<TextProps>,
}

fn default_quantity() -> u32 {
    1
}

/// Body of `POST /store/products`: a vendor product made from a design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub title: String,
    pub price: u64,
    /// PNG renders, in design order.
    pub images: Vec<String>,
    pub designs: Vec<Design>,
    pub vendor_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub cart_id: String,
    pub quantity: u32,
    pub price: u64,
}

/// Store, region and vendor an order is placed against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTarget {
    pub region_id: String,
    pub store_id: String,
    pub vendor_id: String,
}

/// Body of `POST /store/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub line_items: Vec<OrderLineItem>,
    pub subtotal: u64,
    pub total: u64,
    #[serde(flatten)]
    pub target: OrderTarget,
    pub email: String,
    #[serde(rename = "customer_id")]
    pub customer_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: String,
}

/// The store backend's cart, product and order endpoints.
///
/// Implementations copy what they need from the arguments before returning
/// the future.
pub trait CartApi: Send + Sync {
    /// `POST /store/cart`
    fn create_line(&self, payload: &CartLinePayload) -> BoxFuture<'_, CartResult<CartLine>>;

    /// `PUT /store/cart?cartId=`
    fn update_line(
        &self,
        cart_id: &str,
        update: &CartLineUpdate,
    ) -> BoxFuture<'_, CartResult<CartLine>>;

    /// `DELETE /store/cart?cartId=`
    fn remove_line(&self, cart_id: &str) -> BoxFuture<'_, CartResult<()>>;

    /// `PATCH /store/cart?cartId=`
    fn set_quantity(&self, cart_id: &str, quantity: u32) -> BoxFuture<'_, CartResult<CartLine>>;

    /// `PUT /store/cart?customer_id=`
    fn clear_cart(&self, customer_id: &str) -> BoxFuture<'_, CartResult<()>>;

    /// `GET /store/cart?customer_id=`
    fn list_lines(&self, customer_id: &str) -> BoxFuture<'_, CartResult<Vec<CartLine>>>;

    /// `POST /store/products`
    fn create_product(&self, payload: &ProductPayload) -> BoxFuture<'_, CartResult<Product>>;

    /// `POST /store/orders`
    fn create_order(&self, payload: &OrderPayload) -> BoxFuture<'_, CartResult<Order>>;
}
