use crate::{
    db_types::{Order, OrderId, Payment},
    sfe_api::errors::ReconciliationError,
    traits::{OrderManagement, PaymentManagement, StorefrontDatabase},
};

/// Read access to the order and payment ledgers. Ownership and role checks are the HTTP layer's job; this API
/// only shapes the queries.
pub struct OrdersApi<B> {
    db: B,
}

impl<B> OrdersApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrdersApi<B>
where B: StorefrontDatabase
{
    pub async fn order_by_id(&self, id: &OrderId) -> Result<Option<Order>, ReconciliationError> {
        Ok(self.db.fetch_order_by_id(id).await?)
    }

    /// The given owner's orders, newest first.
    pub async fn orders_for_owner(&self, owner_id: &str) -> Result<Vec<Order>, ReconciliationError> {
        Ok(self.db.fetch_orders_for_owner(owner_id).await?)
    }

    /// Every order, newest first. Admin listing.
    pub async fn all_orders(&self) -> Result<Vec<Order>, ReconciliationError> {
        Ok(self.db.fetch_all_orders().await?)
    }

    pub async fn payments_for_owner(&self, owner_id: &str) -> Result<Vec<Payment>, ReconciliationError> {
        Ok(self.db.fetch_payments_for_owner(owner_id).await?)
    }

    /// Every payment attempt, newest first. Admin listing.
    pub async fn all_payments(&self) -> Result<Vec<Payment>, ReconciliationError> {
        Ok(self.db.fetch_all_payments().await?)
    }

    /// Removes an order outright. Explicit admin action.
    pub async fn delete_order(&self, id: &OrderId) -> Result<(), ReconciliationError> {
        Ok(self.db.delete_order(id).await?)
    }
}
