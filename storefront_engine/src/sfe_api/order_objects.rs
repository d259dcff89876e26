use std::fmt::Display;

use serde::{Deserialize, Serialize};
use spg_common::Money;

use crate::db_types::{CustomerInfo, LineItem, Order, OrderId, PaymentGateway};

/// A draft purchase as submitted at checkout (or reconstructed from a gateway round-trip field). Monetary totals
/// are deliberately absent: the engine always recomputes them from the line items and the shipping policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub owner_id: Option<String>,
    pub customer: CustomerInfo,
    pub items: Vec<LineItem>,
}

/// The terminal (or not) state a gateway reported for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayPaymentStatus {
    Complete,
    Failed,
    Cancelled,
    Pending,
    Other(String),
}

impl Display for GatewayPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayPaymentStatus::Complete => write!(f, "COMPLETE"),
            GatewayPaymentStatus::Failed => write!(f, "FAILED"),
            GatewayPaymentStatus::Cancelled => write!(f, "CANCELLED"),
            GatewayPaymentStatus::Pending => write!(f, "PENDING"),
            GatewayPaymentStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A gateway notification whose authenticity has already been established by the gateway adapter (signature or
/// session lookup). Only ever constructed after verification succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedNotification {
    pub gateway: PaymentGateway,
    /// The correlation key we generated at initiation and the gateway round-tripped back.
    pub merchant_payment_id: String,
    /// The gateway's own transaction id — the order-level de-duplication key.
    pub external_txid: String,
    pub status: GatewayPaymentStatus,
    pub amount: Money,
    pub currency: String,
    pub draft: CheckoutDraft,
    /// The notification payload exactly as delivered, for the audit trail.
    pub raw: serde_json::Value,
}

/// What the reconciliation engine did with a notification. Every variant is acknowledged to the gateway with a
/// success response — the typed outcome exists so callers (and tests) can see which path was taken rather than
/// having errors silently swallowed.
#[derive(Debug, Clone)]
pub enum NotificationOutcome {
    /// First delivery: the order was created and the payment marked completed.
    OrderCreated(Order),
    /// A repeat delivery; the existing order is untouched.
    Duplicate(OrderId),
    /// A non-success status: no order was created. The payment record, if present, reflects the terminal status.
    Ignored { status: String },
    /// Something went wrong locally (persistence, malformed embedded payload). Logged; the gateway still gets a
    /// success response, since re-delivery would only retry a failing code path.
    Failed { reason: String },
}

impl NotificationOutcome {
    pub fn order(&self) -> Option<&Order> {
        match self {
            NotificationOutcome::OrderCreated(order) => Some(order),
            _ => None,
        }
    }
}
