//! Storefront mutations and the keys each one invalidates.

use crate::invalidation::InvalidationSet;
use crate::keys::ResourceKey;

/// Every write the storefront performs against the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMutation {
    Login,
    Signup,
    Logout,
    AddProduct,
    UpdateProduct {
        slug: String,
        /// New slug when the update renamed the product.
        renamed_to: Option<String>,
    },
    DeleteProduct,
    AddToCart,
    RemoveFromCart,
    UpdateCartItem,
    ClearCart,
    AddToWishlist,
    RemoveFromWishlist,
    BuyNow,
}

impl StoreMutation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Logout => "logout",
            Self::AddProduct => "add_product",
            Self::UpdateProduct { .. } => "update_product",
            Self::DeleteProduct => "delete_product",
            Self::AddToCart => "add_to_cart",
            Self::RemoveFromCart => "remove_from_cart",
            Self::UpdateCartItem => "update_cart_item",
            Self::ClearCart => "clear_cart",
            Self::AddToWishlist => "add_to_wishlist",
            Self::RemoveFromWishlist => "remove_from_wishlist",
            Self::BuyNow => "buy_now",
        }
    }

    /// Product lists are invalidated by prefix so every feed refreshes.
    pub fn invalidation_set(&self) -> InvalidationSet {
        match self {
            Self::Login | Self::Signup | Self::Logout => {
                InvalidationSet::new().exact(ResourceKey::auth_user())
            }
            Self::AddProduct | Self::DeleteProduct => {
                InvalidationSet::new().prefix(ResourceKey::products())
            }
            Self::UpdateProduct { slug, renamed_to } => {
                let mut set = InvalidationSet::new().exact(ResourceKey::product(slug));
                if let Some(new_slug) = renamed_to.as_deref().filter(|s| !s.is_empty()) {
                    set = set.exact(ResourceKey::product(new_slug));
                }
                set.prefix(ResourceKey::products())
            }
            Self::AddToCart | Self::RemoveFromCart | Self::UpdateCartItem | Self::ClearCart => {
                InvalidationSet::new().exact(ResourceKey::cart())
            }
            Self::AddToWishlist | Self::RemoveFromWishlist => {
                InvalidationSet::new().exact(ResourceKey::wishlist())
            }
            Self::BuyNow => InvalidationSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::Invalidation;

    fn targets(mutation: StoreMutation) -> Vec<Invalidation> {
        mutation.invalidation_set().iter().cloned().collect()
    }

    #[test]
    fn auth_mutations_invalidate_auth_user() {
        for mutation in [StoreMutation::Login, StoreMutation::Signup, StoreMutation::Logout] {
            assert_eq!(
                targets(mutation),
                vec![Invalidation::Exact(ResourceKey::auth_user())]
            );
        }
    }

    #[test]
    fn cart_mutations_touch_only_cart() {
        for mutation in [
            StoreMutation::AddToCart,
            StoreMutation::RemoveFromCart,
            StoreMutation::UpdateCartItem,
            StoreMutation::ClearCart,
        ] {
            let set = mutation.invalidation_set();
            assert!(set.matches(&ResourceKey::cart()));
            assert!(!set.matches(&ResourceKey::wishlist()));
            assert!(!set.matches(&ResourceKey::products()));
            assert_eq!(set.len(), 1);
        }
    }

    #[test]
    fn wishlist_mutations_touch_only_wishlist() {
        let set = StoreMutation::RemoveFromWishlist.invalidation_set();
        assert_eq!(
            set.iter().cloned().collect::<Vec<_>>(),
            vec![Invalidation::Exact(ResourceKey::wishlist())]
        );
        assert!(!set.matches(&ResourceKey::cart()));
    }

    #[test]
    fn catalog_mutations_refresh_every_feed() {
        for mutation in [StoreMutation::AddProduct, StoreMutation::DeleteProduct] {
            let set = mutation.invalidation_set();
            assert!(set.matches(&ResourceKey::products_feed("All")));
            assert!(set.matches(&ResourceKey::products_feed("Snacks")));
            assert!(!set.matches(&ResourceKey::product("chips")));
        }
    }

    #[test]
    fn renamed_product_invalidates_old_and_new_slug() {
        let set = StoreMutation::UpdateProduct {
            slug: "milk".into(),
            renamed_to: Some("milk-aavin".into()),
        }
        .invalidation_set();
        assert!(set.matches(&ResourceKey::product("milk")));
        assert!(set.matches(&ResourceKey::product("milk-aavin")));
        assert!(set.matches(&ResourceKey::products_feed("All")));
        assert_eq!(set.len(), 3);

        let unchanged = StoreMutation::UpdateProduct {
            slug: "milk".into(),
            renamed_to: Some("milk".into()),
        }
        .invalidation_set();
        assert_eq!(unchanged.len(), 2);
    }

    #[test]
    fn buy_now_invalidates_nothing() {
        assert!(StoreMutation::BuyNow.invalidation_set().is_empty());
    }
}
