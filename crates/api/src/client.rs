//! REST client for the storefront server.
//!
//! Every request carries the session cookie set by login/signup; the server
//! answers with JSON bodies and reports failures as `{error}` or `{message}`.

use async_trait::async_trait;
use log::{debug, error};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use storefront_core::models::{AuthUser, CartSnapshot, PaymentIntent, Product, Wishlist};
use storefront_core::{Resource, ResourceFetcher, ResourceKey, SyncError};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::types::*;

const MAX_LOG_BODY_CHARS: usize = 512;
/// Feed name the storefront uses for the unfiltered catalog.
pub const ALL_PRODUCTS_FEED: &str = "All";

/// Path of the product list for `feed`; `None` and `All` are unfiltered.
fn products_path(feed: Option<&str>) -> String {
    match feed.map(str::trim) {
        None | Some("") | Some(ALL_PRODUCTS_FEED) => "/api/product".to_string(),
        Some(feed) => format!("/api/product/category/{}", urlencoding::encode(feed)),
    }
}

fn product_path(slug: &str) -> Result<String> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(ApiError::invalid_request("Product slug is required"));
    }
    Ok(format!("/api/product/{}", urlencoding::encode(slug)))
}

/// Client for the storefront REST API.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    client: reqwest::Client,
    base_url: String,
}

impl StorefrontClient {
    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Create a client with a cookie store for the session token.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read the body of a response, mapping non-2xx statuses to errors.
    async fn parse_value(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .ok()
                .and_then(ApiErrorResponse::into_message)
                .unwrap_or_else(|| format!("Request failed: {}", body));
            return Err(ApiError::api(status.as_u16(), message));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body, e
            );
            ApiError::Json(e)
        })
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let value = Self::parse_value(response).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_value(&self, path: &str) -> Result<Value> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::parse_value(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::parse_response(response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        Self::parse_value(response).await
    }

    async fn post_empty(&self, path: &str) -> Result<Value> {
        let response = self.client.post(self.url(path)).send().await?;
        Self::parse_value(response).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────

    /// Raw current-user payload; `null` when signed out.
    ///
    /// GET /api/auth/me
    async fn current_user_value(&self) -> Result<Value> {
        let response = self.client.get(self.url("/api/auth/me")).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if status.is_success() && body.trim().is_empty() {
            return Ok(Value::Null);
        }

        // The server answers `{error}` for anonymous sessions, often with 401.
        match serde_json::from_str::<Value>(&body) {
            Ok(value) if value.get("error").is_some() => {
                debug!("No signed-in user ({})", status);
                Ok(Value::Null)
            }
            Ok(value) if status.is_success() => Ok(value),
            Err(e) if status.is_success() => Err(ApiError::Json(e)),
            Ok(value) => {
                let message = serde_json::from_value::<ApiErrorResponse>(value)
                    .ok()
                    .and_then(ApiErrorResponse::into_message)
                    .unwrap_or_else(|| format!("Request failed: {}", body));
                Err(ApiError::api(status.as_u16(), message))
            }
            Err(_) => Err(ApiError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            )),
        }
    }

    /// The signed-in user, or `None` for an anonymous session.
    pub async fn current_user(&self) -> Result<Option<AuthUser>> {
        let value = self.current_user_value().await?;
        Ok(serde_json::from_value(value)?)
    }

    /// POST /api/auth/login
    pub async fn login(&self, request: &LoginRequest) -> Result<Value> {
        debug!("Logging in as {}", request.username);
        self.post("/api/auth/login", request).await
    }

    /// POST /api/auth/signup
    pub async fn signup(&self, request: &SignupRequest) -> Result<Value> {
        debug!("Signing up {}", request.username);
        self.post("/api/auth/signup", request).await
    }

    /// POST /api/auth/logout
    pub async fn logout(&self) -> Result<Value> {
        self.post_empty("/api/auth/logout").await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /api/product or /api/product/category/{feed}
    pub async fn list_products(&self, feed: Option<&str>) -> Result<Vec<Product>> {
        self.get(&products_path(feed)).await
    }

    /// GET /api/product/{slug}
    pub async fn get_product(&self, slug: &str) -> Result<Product> {
        self.get(&product_path(slug)?).await
    }

    /// POST /api/product
    pub async fn create_product(&self, input: &ProductInput) -> Result<Value> {
        debug!("Creating product {}", input.slug);
        self.post("/api/product", input).await
    }

    /// Update a product; the response carries the (possibly new) slug at
    /// `product.slug`.
    ///
    /// PUT /api/product/{slug}
    pub async fn update_product(&self, slug: &str, input: &ProductInput) -> Result<Value> {
        let path = product_path(slug)?;
        debug!("Updating product {}", slug);
        let response = self.client.put(self.url(&path)).json(input).send().await?;
        Self::parse_value(response).await
    }

    /// DELETE /api/product/{slug}
    pub async fn delete_product(&self, slug: &str) -> Result<Value> {
        let path = product_path(slug)?;
        debug!("Deleting product {}", slug);
        let response = self.client.delete(self.url(&path)).send().await?;
        Self::parse_value(response).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cart
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /api/cart
    pub async fn get_cart(&self) -> Result<CartSnapshot> {
        self.get("/api/cart").await
    }

    /// POST /api/cart/add
    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> Result<Value> {
        let request = CartItemRequest {
            product_id: product_id.to_string(),
            quantity,
        };
        self.post("/api/cart/add", &request).await
    }

    /// POST /api/cart/remove
    pub async fn remove_from_cart(&self, product_id: &str) -> Result<Value> {
        let request = ProductIdRequest {
            product_id: product_id.to_string(),
        };
        self.post("/api/cart/remove", &request).await
    }

    /// POST /api/cart/update
    pub async fn update_cart_item(&self, product_id: &str, quantity: u32) -> Result<Value> {
        if quantity == 0 {
            return Err(ApiError::invalid_request("Quantity must be at least 1"));
        }
        let request = CartItemRequest {
            product_id: product_id.to_string(),
            quantity,
        };
        self.post("/api/cart/update", &request).await
    }

    /// POST /api/cart/clear
    pub async fn clear_cart(&self) -> Result<Value> {
        self.post_empty("/api/cart/clear").await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Wishlist
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /api/wishlist
    pub async fn get_wishlist(&self) -> Result<Wishlist> {
        self.get("/api/wishlist").await
    }

    /// POST /api/wishlist/add
    pub async fn add_to_wishlist(&self, product_id: &str) -> Result<Value> {
        let request = ProductIdRequest {
            product_id: product_id.to_string(),
        };
        self.post("/api/wishlist/add", &request).await
    }

    /// POST /api/wishlist/remove
    pub async fn remove_from_wishlist(&self, product_id: &str) -> Result<Value> {
        let request = ProductIdRequest {
            product_id: product_id.to_string(),
        };
        self.post("/api/wishlist/remove", &request).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payment
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a UPI payment for `quantity` units of a product.
    ///
    /// POST /api/payment/buy/{slug}
    pub async fn buy_product(&self, slug: &str, quantity: Decimal) -> Result<PaymentIntent> {
        if quantity <= Decimal::ZERO {
            return Err(ApiError::invalid_request("Quantity must be positive"));
        }
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(ApiError::invalid_request("Product slug is required"));
        }
        let path = format!("/api/payment/buy/{}", urlencoding::encode(slug));
        let response = self
            .client
            .post(self.url(&path))
            .json(&BuyRequest { quantity })
            .send()
            .await?;
        Self::parse_response(response).await
    }
}

#[async_trait]
impl ResourceFetcher for StorefrontClient {
    async fn fetch(&self, key: &ResourceKey) -> storefront_core::Result<Value> {
        let result = match key.resource() {
            Some(Resource::AuthUser) => self.current_user_value().await,
            Some(Resource::Products { feed }) => self.get_value(&products_path(feed)).await,
            Some(Resource::Product { slug }) => match product_path(slug) {
                Ok(path) => self.get_value(&path).await,
                Err(err) => Err(err),
            },
            Some(Resource::Cart) => self.get_value("/api/cart").await,
            Some(Resource::Wishlist) => self.get_value("/api/wishlist").await,
            None => Err(ApiError::invalid_request(format!(
                "No endpoint for resource key '{}'",
                key
            ))),
        };
        result.map_err(SyncError::from)
    }
}
