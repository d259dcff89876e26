use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// Emitted exactly once per order, at the moment the order record is created — whether synchronously (cash on
/// delivery) or from a verified gateway notification. The confirmation mailer subscribes to this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted on admin fulfilment transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        Self { order, old_status }
    }
}
