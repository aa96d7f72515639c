//! REST client for the store backend.
//!
//! Wraps the cart, product and order endpoints using [`reqwest`].

use crate::api::{
    BoxFuture, CartApi, CartLine, CartLinePayload, CartLineUpdate, Order, OrderPayload, Product,
    ProductPayload,
};
use crate::config::CartConfig;
use crate::error::{CartError, CartResult};
use serde::de::DeserializeOwned;

/// HTTP client for one store backend.
#[derive(Debug, Clone)]
pub struct HttpCartApi {
    client: reqwest::Client,
    api_url: String,
}

impl HttpCartApi {
    /// * `api_url` - Base HTTP URL, e.g. `https://shop.example.com`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    /// Build a client with the configured base URL and request timeout.
    pub fn from_config(config: &CartConfig) -> CartResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone()))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an [`CartError::Api`]
    /// carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> CartResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CartError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> CartResult<T> {
        let response = Self::ensure_success(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(request: reqwest::RequestBuilder) -> CartResult<()> {
        Self::ensure_success(request.send().await?).await?;
        Ok(())
    }
}

impl CartApi for HttpCartApi {
    fn create_line(&self, payload: &CartLinePayload) -> BoxFuture<'_, CartResult<CartLine>> {
        let request = self.client.post(self.url("/store/cart")).json(payload);
        Box::pin(Self::send_json::<CartLine>(request))
    }

    fn update_line(
        &self,
        cart_id: &str,
        update: &CartLineUpdate,
    ) -> BoxFuture<'_, CartResult<CartLine>> {
        let request = self
            .client
            .put(self.url("/store/cart"))
            .query(&[("cartId", cart_id)])
            .json(update);
        Box::pin(Self::send_json::<CartLine>(request))
    }

    fn remove_line(&self, cart_id: &str) -> BoxFuture<'_, CartResult<()>> {
        let request = self.client.delete(self.url("/store/cart")).query(&[("cartId", cart_id)]);
        Box::pin(Self::send_empty(request))
    }

    fn set_quantity(&self, cart_id: &str, quantity: u32) -> BoxFuture<'_, CartResult<CartLine>> {
        let request = self
            .client
            .patch(self.url("/store/cart"))
            .query(&[("cartId", cart_id)])
            .json(&serde_json::json!({ "quantity": quantity }));
        Box::pin(Self::send_json::<CartLine>(request))
    }

    fn clear_cart(&self, customer_id: &str) -> BoxFuture<'_, CartResult<()>> {
        let request = self
            .client
            .put(self.url("/store/cart"))
            .query(&[("customer_id", customer_id)])
            .json(&serde_json::json!({ "items": [] }));
        Box::pin(Self::send_empty(request))
    }

    fn list_lines(&self, customer_id: &str) -> BoxFuture<'_, CartResult<Vec<CartLine>>> {
        let request = self
            .client
            .get(self.url("/store/cart"))
            .query(&[("customer_id", customer_id)]);
        Box::pin(Self::send_json::<Vec<CartLine>>(request))
    }

    fn create_product(&self, payload: &ProductPayload) -> BoxFuture<'_, CartResult<Product>> {
        let request = self.client.post(self.url("/store/products")).json(payload);
        Box::pin(Self::send_json::<Product>(request))
    }

    fn create_order(&self, payload: &OrderPayload) -> BoxFuture<'_, CartResult<Order>> {
        let request = self.client.post(self.url("/store/orders")).json(payload);
        Box::pin(Self::send_json::<Order>(request))
    }
}
