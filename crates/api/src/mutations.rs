//! Storefront writes as [`MutationDef`]s over the REST client.
//!
//! Each definition maps its action onto a [`StoreMutation`], which owns the
//! table of keys every write invalidates.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use storefront_core::models::PaymentIntent;
use storefront_core::{InvalidationSet, MutationDef, StoreMutation, SyncError};

use crate::client::StorefrontClient;
use crate::types::{LoginRequest, ProductInput, SignupRequest};

#[derive(Debug, Clone)]
pub enum AuthAction {
    Login(LoginRequest),
    Signup(SignupRequest),
    Logout,
}

impl AuthAction {
    pub fn store_mutation(&self) -> StoreMutation {
        match self {
            Self::Login(_) => StoreMutation::Login,
            Self::Signup(_) => StoreMutation::Signup,
            Self::Logout => StoreMutation::Logout,
        }
    }
}

/// Login, signup and logout; each refreshes `authUser`.
#[derive(Debug, Clone)]
pub struct AuthMutation {
    client: StorefrontClient,
}

impl AuthMutation {
    pub fn new(client: StorefrontClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MutationDef for AuthMutation {
    type Input = AuthAction;
    type Output = Value;

    fn name(&self) -> &'static str {
        "auth"
    }

    async fn perform(&self, input: &AuthAction) -> storefront_core::Result<Value> {
        let result = match input {
            AuthAction::Login(request) => self.client.login(request).await,
            AuthAction::Signup(request) => self.client.signup(request).await,
            AuthAction::Logout => self.client.logout().await,
        };
        result.map_err(SyncError::from)
    }

    fn invalidates(&self, input: &AuthAction, _output: &Value) -> InvalidationSet {
        input.store_mutation().invalidation_set()
    }
}

#[derive(Debug, Clone)]
pub enum ProductAction {
    Create(ProductInput),
    Update { slug: String, input: ProductInput },
    Delete { slug: String },
}

impl ProductAction {
    /// `output` is the server response; an update reports the saved slug.
    pub fn store_mutation(&self, output: &Value) -> StoreMutation {
        match self {
            Self::Create(_) => StoreMutation::AddProduct,
            Self::Update { slug, .. } => StoreMutation::UpdateProduct {
                slug: slug.clone(),
                renamed_to: updated_slug(output),
            },
            Self::Delete { .. } => StoreMutation::DeleteProduct,
        }
    }
}

fn updated_slug(output: &Value) -> Option<String> {
    output
        .pointer("/product/slug")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Admin catalog writes.
#[derive(Debug, Clone)]
pub struct ProductMutation {
    client: StorefrontClient,
}

impl ProductMutation {
    pub fn new(client: StorefrontClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MutationDef for ProductMutation {
    type Input = ProductAction;
    type Output = Value;

    fn name(&self) -> &'static str {
        "product"
    }

    async fn perform(&self, input: &ProductAction) -> storefront_core::Result<Value> {
        let result = match input {
            ProductAction::Create(product) => self.client.create_product(product).await,
            ProductAction::Update { slug, input } => self.client.update_product(slug, input).await,
            ProductAction::Delete { slug } => self.client.delete_product(slug).await,
        };
        result.map_err(SyncError::from)
    }

    fn invalidates(&self, input: &ProductAction, output: &Value) -> InvalidationSet {
        input.store_mutation(output).invalidation_set()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    Add { product_id: String, quantity: u32 },
    Remove { product_id: String },
    UpdateQuantity { product_id: String, quantity: u32 },
    Clear,
}

impl CartAction {
    pub fn store_mutation(&self) -> StoreMutation {
        match self {
            Self::Add { .. } => StoreMutation::AddToCart,
            Self::Remove { .. } => StoreMutation::RemoveFromCart,
            Self::UpdateQuantity { .. } => StoreMutation::UpdateCartItem,
            Self::Clear => StoreMutation::ClearCart,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CartMutation {
    client: StorefrontClient,
}

impl CartMutation {
    pub fn new(client: StorefrontClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MutationDef for CartMutation {
    type Input = CartAction;
    type Output = Value;

    fn name(&self) -> &'static str {
        "cart"
    }

    async fn perform(&self, input: &CartAction) -> storefront_core::Result<Value> {
        let result = match input {
            CartAction::Add {
                product_id,
                quantity,
            } => self.client.add_to_cart(product_id, *quantity).await,
            CartAction::Remove { product_id } => self.client.remove_from_cart(product_id).await,
            CartAction::UpdateQuantity {
                product_id,
                quantity,
            } => self.client.update_cart_item(product_id, *quantity).await,
            CartAction::Clear => self.client.clear_cart().await,
        };
        result.map_err(SyncError::from)
    }

    fn invalidates(&self, input: &CartAction, _output: &Value) -> InvalidationSet {
        input.store_mutation().invalidation_set()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WishlistAction {
    Add { product_id: String },
    Remove { product_id: String },
}

impl WishlistAction {
    /// The heart button: remove when already wishlisted, add otherwise.
    pub fn toggle(product_id: impl Into<String>, in_wishlist: bool) -> Self {
        let product_id = product_id.into();
        if in_wishlist {
            Self::Remove { product_id }
        } else {
            Self::Add { product_id }
        }
    }

    pub fn store_mutation(&self) -> StoreMutation {
        match self {
            Self::Add { .. } => StoreMutation::AddToWishlist,
            Self::Remove { .. } => StoreMutation::RemoveFromWishlist,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WishlistMutation {
    client: StorefrontClient,
}

impl WishlistMutation {
    pub fn new(client: StorefrontClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MutationDef for WishlistMutation {
    type Input = WishlistAction;
    type Output = Value;

    fn name(&self) -> &'static str {
        "wishlist"
    }

    async fn perform(&self, input: &WishlistAction) -> storefront_core::Result<Value> {
        let result = match input {
            WishlistAction::Add { product_id } => self.client.add_to_wishlist(product_id).await,
            WishlistAction::Remove { product_id } => {
                self.client.remove_from_wishlist(product_id).await
            }
        };
        result.map_err(SyncError::from)
    }

    fn invalidates(&self, input: &WishlistAction, _output: &Value) -> InvalidationSet {
        input.store_mutation().invalidation_set()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyNow {
    pub slug: String,
    pub quantity: Decimal,
}

/// Starts a UPI payment. Nothing cached changes until the payment settles
/// server-side, so it invalidates no keys.
#[derive(Debug, Clone)]
pub struct BuyNowMutation {
    client: StorefrontClient,
}

impl BuyNowMutation {
    pub fn new(client: StorefrontClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MutationDef for BuyNowMutation {
    type Input = BuyNow;
    type Output = PaymentIntent;

    fn name(&self) -> &'static str {
        "buy_now"
    }

    async fn perform(&self, input: &BuyNow) -> storefront_core::Result<PaymentIntent> {
        self.client
            .buy_product(&input.slug, input.quantity)
            .await
            .map_err(SyncError::from)
    }

    fn invalidates(&self, _input: &BuyNow, _output: &PaymentIntent) -> InvalidationSet {
        StoreMutation::BuyNow.invalidation_set()
    }
}
