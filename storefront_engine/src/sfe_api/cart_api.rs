use chrono::Utc;
use spg_common::Money;

use crate::{
    db_types::{Cart, CartStatus, LineItem},
    shipping::{compute_shipping, ShippingPolicy},
    traits::{CartManagement, PersistenceError, StorefrontDatabase},
};

/// Cart persistence plus the shipping calculation. Totals are recomputed on every save; whatever totals a client
/// sends along are discarded.
pub struct CartApi<B> {
    db: B,
    policy: ShippingPolicy,
}

impl<B> CartApi<B> {
    pub fn new(db: B, policy: ShippingPolicy) -> Self {
        Self { db, policy }
    }

    fn build_cart(&self, owner_id: String, items: Vec<LineItem>, status: CartStatus) -> Cart {
        let subtotal: Money = items.iter().map(LineItem::line_total).sum();
        let shipping = compute_shipping(subtotal, &self.policy);
        Cart { owner_id, items, subtotal, shipping, total: subtotal + shipping, status, updated_at: Utc::now() }
    }
}

impl<B> CartApi<B>
where B: StorefrontDatabase
{
    /// The stored cart, or a fresh empty one for owners who have never saved anything.
    pub async fn cart_for(&self, owner_id: &str) -> Result<Cart, PersistenceError> {
        match self.db.fetch_cart(owner_id).await? {
            Some(cart) => Ok(cart),
            None => Ok(self.build_cart(owner_id.to_string(), Vec::new(), CartStatus::Active)),
        }
    }

    /// Whole-cart replace with server-side total recomputation.
    pub async fn save_items(&self, owner_id: &str, items: Vec<LineItem>) -> Result<Cart, PersistenceError> {
        let cart = self.build_cart(owner_id.to_string(), items, CartStatus::Active);
        self.db.save_cart(cart).await
    }

    /// Marks the cart as converted once checkout has succeeded, emptying it.
    pub async fn mark_converted(&self, owner_id: &str) -> Result<Cart, PersistenceError> {
        let cart = self.build_cart(owner_id.to_string(), Vec::new(), CartStatus::Converted);
        self.db.save_cart(cart).await
    }
}
