use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::PersistenceError,
};

/// Outcome of an idempotent order insert.
#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    Inserted(Order),
    /// An order with the same external transaction id already existed; the stored order is returned untouched.
    AlreadyExists(Order),
}

impl InsertOrderResult {
    pub fn order(&self) -> &Order {
        match self {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOrderResult::Inserted(_))
    }
}

/// The canonical record of confirmed purchases.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Stores a new order. When the order carries an external transaction id that is already present in the
    /// ledger, the insert is a no-op and the existing order is returned — this is the duplicate-notification
    /// guard, backed by a uniqueness constraint where the backend supports one.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, PersistenceError>;

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, PersistenceError>;

    /// Lookup by the gateway's own transaction id — the order-level de-duplication key.
    async fn fetch_order_by_external_txid(&self, txid: &str) -> Result<Option<Order>, PersistenceError>;

    /// All orders belonging to the given owner, newest first.
    async fn fetch_orders_for_owner(&self, owner_id: &str) -> Result<Vec<Order>, PersistenceError>;

    /// Every order in the ledger, newest first. Admin listing only.
    async fn fetch_all_orders(&self) -> Result<Vec<Order>, PersistenceError>;

    /// Overwrites the fulfilment status. Transition legality is enforced by the API layer, not here.
    async fn update_order_status(&self, id: &OrderId, status: OrderStatusType) -> Result<Order, PersistenceError>;

    /// Removes an order outright. Explicit admin action only.
    async fn delete_order(&self, id: &OrderId) -> Result<(), PersistenceError>;
}
