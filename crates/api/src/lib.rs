//! HTTP collaborator for the storefront sync layer.
//!
//! [`StorefrontClient`] talks to the storefront REST API, serves as the
//! [`storefront_core::ResourceFetcher`] behind a `SyncController`, and backs
//! the mutation definitions in [`mutations`].

pub mod client;
pub mod config;
pub mod error;
pub mod mutations;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{StorefrontClient, ALL_PRODUCTS_FEED};
pub use config::{ClientConfig, API_URL_ENV, DEFAULT_API_URL};
pub use error::{ApiError, ApiRetryClass, Result};
pub use mutations::{
    AuthAction, AuthMutation, BuyNow, BuyNowMutation, CartAction, CartMutation, ProductAction,
    ProductMutation, WishlistAction, WishlistMutation,
};
pub use types::*;
