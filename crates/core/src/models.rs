//! Typed payloads for the storefront resources.
//!
//! The cache stores opaque JSON; views decode entries into these shapes,
//! which reject payloads missing required fields.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, SyncError};

/// Role string the server assigns to store administrators.
pub const ADMIN_ROLE: &str = "admin";

/// Decode a JSON payload into a typed resource shape.
pub fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| SyncError::decode(e.to_string()))
}

/// The signed-in user as returned by `GET /api/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    pub price: Decimal,
    pub stock: i64,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Image URL or data URL.
    #[serde(default)]
    pub images: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Case-insensitive substring match over title, slug, categories and
    /// description. An empty term matches every product.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [
            Some(self.title.as_str()),
            Some(self.slug.as_str()),
            self.categories.as_deref(),
            self.description.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Products matching `term`, in list order.
pub fn search_products<'a>(products: &'a [Product], term: &str) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|product| product.matches(term))
        .collect()
}

/// One cart line. `product` is absent when the product was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub quantity: u32,
}

impl CartItem {
    pub fn is_available(&self) -> bool {
        self.product.is_some()
    }

    /// Price times quantity, zero for unavailable items.
    pub fn line_total(&self) -> Decimal {
        self.product
            .as_ref()
            .map(|product| product.price * Decimal::from(self.quantity))
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of line totals, rounded to paise.
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(CartItem::line_total)
            .sum::<Decimal>()
            .round_dp(2)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.items.iter().any(|item| {
            item.product
                .as_ref()
                .is_some_and(|product| product.id == product_id)
        })
    }

    pub fn quantity_of(&self, product_id: &str) -> Option<u32> {
        self.items
            .iter()
            .find(|item| {
                item.product
                    .as_ref()
                    .is_some_and(|product| product.id == product_id)
            })
            .map(|item| item.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist(pub Vec<Product>);

impl Wishlist {
    pub fn contains(&self, product_id: &str) -> bool {
        self.0.iter().any(|product| product.id == product_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn products(&self) -> &[Product] {
        &self.0
    }
}

/// Response of the buy-now endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub upi_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn milk() -> Value {
        json!({"_id": "P1", "title": "Milk", "slug": "milk-aavin", "price": 40, "stock": 5})
    }

    #[test]
    fn product_decodes_with_required_fields() {
        let product: Product = decode(&milk()).expect("decode product");
        assert_eq!(product.title, "Milk");
        assert_eq!(product.price, dec!(40));
        assert!(product.in_stock());
        assert_eq!(product.images, None);
    }

    #[test]
    fn product_missing_price_is_rejected() {
        let err = decode::<Product>(&json!({"_id": "P1", "title": "Milk", "slug": "milk", "stock": 1}))
            .unwrap_err();
        match err {
            SyncError::Decode(message) => assert!(message.contains("price")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn price_accepts_form_encoded_strings() {
        let product: Product = decode(&json!({
            "_id": "P2", "title": "Ghee", "slug": "ghee", "price": "120.50", "stock": 2
        }))
        .expect("decode product");
        assert_eq!(product.price, dec!(120.50));
    }

    #[test]
    fn cart_total_skips_unavailable_items() {
        let cart: CartSnapshot = decode(&json!({
            "items": [
                {"_id": "c1", "product": milk(), "quantity": 2},
                {"_id": "c2", "product": {"_id": "P3", "title": "Soap", "slug": "soap", "price": 32.5, "stock": 9}, "quantity": 1},
                {"_id": "c3", "product": null, "quantity": 4}
            ]
        }))
        .expect("decode cart");

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), dec!(112.50));
        assert!(cart.contains("P1"));
        assert!(!cart.contains("P9"));
        assert_eq!(cart.quantity_of("P1"), Some(2));
        assert!(!cart.items[2].is_available());
    }

    #[test]
    fn empty_cart_body_decodes() {
        let cart: CartSnapshot = decode(&json!({})).expect("decode cart");
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn wishlist_is_a_product_array() {
        let wishlist: Wishlist = decode(&json!([milk()])).expect("decode wishlist");
        assert_eq!(wishlist.len(), 1);
        assert!(wishlist.contains("P1"));
    }

    #[test]
    fn signed_out_user_decodes_as_none() {
        let user: Option<AuthUser> = decode(&Value::Null).expect("decode user");
        assert!(user.is_none());

        let admin: Option<AuthUser> =
            decode(&json!({"_id": "u1", "username": "abdul", "role": "admin"})).expect("decode");
        assert!(admin.expect("user present").is_admin());
    }

    fn catalog() -> Vec<Product> {
        decode(&json!([
            milk(),
            {"_id": "P2", "title": "Ghee", "slug": "ghee-500", "price": 120, "stock": 2,
             "categories": "Dairy", "description": "Clarified BUTTER"},
            {"_id": "P3", "title": "Soap", "slug": "neem-soap", "price": 32, "stock": 0,
             "categories": null}
        ]))
        .expect("decode catalog")
    }

    #[test]
    fn search_matches_any_text_field_ignoring_case() {
        let products = catalog();
        let ids = |term: &str| -> Vec<String> {
            search_products(&products, term)
                .into_iter()
                .map(|p| p.id.clone())
                .collect()
        };

        assert_eq!(ids("MILK"), vec!["P1"]);
        assert_eq!(ids("neem"), vec!["P3"]);
        assert_eq!(ids("dairy"), vec!["P2"]);
        assert_eq!(ids("butter"), vec!["P2"]);
        assert!(ids("biscuit").is_empty());
    }

    #[test]
    fn empty_search_term_keeps_every_product() {
        let products = catalog();
        assert_eq!(search_products(&products, "").len(), 3);
    }

    #[test]
    fn missing_optional_fields_never_match() {
        let products = catalog();
        let soap = &products[2];
        assert_eq!(soap.categories, None);
        assert_eq!(soap.description, None);
        assert!(!soap.matches("dairy"));
        assert!(soap.matches("Soap"));
    }
}
