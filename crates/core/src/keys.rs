//! Canonical identity keys for server resources.
//!
//! Fetches and invalidations address cache entries through the same
//! [`ResourceKey`] values, so every component that names a resource goes
//! through the constructors in this module.

use std::fmt;

pub const AUTH_USER: &str = "authUser";
pub const PRODUCTS: &str = "products";
pub const PRODUCT: &str = "product";
pub const CART: &str = "cart";
pub const WISHLIST: &str = "wishlist";

/// Ordered sequence of identity components, e.g. `["product", "milk-aavin"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(Vec<String>);

/// Typed view of a key produced by the registry constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    AuthUser,
    Products { feed: Option<&'a str> },
    Product { slug: &'a str },
    Cart,
    Wishlist,
}

impl ResourceKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// The signed-in user (`null` payload when signed out).
    pub fn auth_user() -> Self {
        Self::new([AUTH_USER])
    }

    /// Every product list; also the prefix of all feed keys.
    pub fn products() -> Self {
        Self::new([PRODUCTS])
    }

    /// Product list for one feed (`All` or a category name).
    pub fn products_feed(feed: &str) -> Self {
        Self::new([PRODUCTS, feed])
    }

    pub fn product(slug: &str) -> Self {
        Self::new([PRODUCT, slug])
    }

    pub fn cart() -> Self {
        Self::new([CART])
    }

    pub fn wishlist() -> Self {
        Self::new([WISHLIST])
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the first `prefix.len()` components equal `prefix`.
    pub fn starts_with(&self, prefix: &ResourceKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Classify the key against the registry, `None` for foreign keys.
    pub fn resource(&self) -> Option<Resource<'_>> {
        let parts: Vec<&str> = self.0.iter().map(String::as_str).collect();
        match parts.as_slice() {
            [AUTH_USER] => Some(Resource::AuthUser),
            [PRODUCTS] => Some(Resource::Products { feed: None }),
            [PRODUCTS, feed] => Some(Resource::Products { feed: Some(*feed) }),
            [PRODUCT, slug] if !slug.is_empty() => Some(Resource::Product { slug: *slug }),
            [CART] => Some(Resource::Cart),
            [WISHLIST] => Some(Resource::Wishlist),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

impl<S: Into<String>> FromIterator<S> for ResourceKey {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_element_wise() {
        assert_eq!(
            ResourceKey::product("milk-aavin"),
            ResourceKey::new(["product", "milk-aavin"])
        );
        assert_ne!(ResourceKey::product("milk-aavin"), ResourceKey::product("milk"));
        assert_ne!(ResourceKey::products(), ResourceKey::products_feed("All"));
    }

    #[test]
    fn display_joins_components() {
        assert_eq!(
            ResourceKey::product("milk-aavin").to_string(),
            "product:milk-aavin"
        );
        assert_eq!(ResourceKey::auth_user().to_string(), "authUser");
    }

    #[test]
    fn prefix_matching_is_component_based() {
        let feed = ResourceKey::products_feed("Snacks");
        assert!(feed.starts_with(&ResourceKey::products()));
        assert!(feed.starts_with(&feed));
        assert!(!ResourceKey::products().starts_with(&feed));
        // "product" is not a prefix of "products" even though the strings are.
        assert!(!feed.starts_with(&ResourceKey::new(["product"])));
    }

    #[test]
    fn registry_classifies_known_keys() {
        assert_eq!(ResourceKey::cart().resource(), Some(Resource::Cart));
        assert_eq!(
            ResourceKey::products_feed("All").resource(),
            Some(Resource::Products { feed: Some("All") })
        );
        assert_eq!(
            ResourceKey::product("ghee").resource(),
            Some(Resource::Product { slug: "ghee" })
        );
        assert_eq!(ResourceKey::new(["orders"]).resource(), None);
        assert_eq!(ResourceKey::product("").resource(), None);
    }
}
