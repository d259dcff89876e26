use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub use spg_common::Money;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// Opaque, generator-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------         Role          -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------   PaymentGateway      -------------------------------------------------------
/// The processor a purchase was (or will be) settled through. `Cod` is the degenerate cash-on-delivery path that
/// skips the payment leg entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentGateway {
    PayFast,
    Stripe,
    Cod,
    JazzCash,
    EasyPaisa,
}

impl Display for PaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentGateway::PayFast => write!(f, "payfast"),
            PaymentGateway::Stripe => write!(f, "stripe"),
            PaymentGateway::Cod => write!(f, "cod"),
            PaymentGateway::JazzCash => write!(f, "jazzcash"),
            PaymentGateway::EasyPaisa => write!(f, "easypaisa"),
        }
    }
}

impl FromStr for PaymentGateway {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "payfast" => Ok(Self::PayFast),
            "stripe" => Ok(Self::Stripe),
            "cod" => Ok(Self::Cod),
            "jazzcash" => Ok(Self::JazzCash),
            "easypaisa" => Ok(Self::EasyPaisa),
            s => Err(ConversionError(format!("Invalid payment gateway: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// Fulfilment status of a confirmed order. Admin-driven transitions only; see
/// [`crate::ReconciliationApi::modify_status_for_order`] for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created and is awaiting fulfilment.
    Pending,
    /// The order has been handed to the courier.
    Shipped,
    /// The order has been delivered to the customer.
    Delivered,
    /// The order could not be fulfilled or the payment fell through post-hoc.
    Failed,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//-------------------------------------- OrderPaymentStatus    -------------------------------------------------------
/// Settlement state recorded on the order itself. `Pending` only ever appears on the cash-on-delivery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderPaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderPaymentStatus::Pending => write!(f, "Pending"),
            OrderPaymentStatus::Completed => write!(f, "Completed"),
            OrderPaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
/// Lifecycle of a gateway transaction attempt. Created as `Initiated`, updated at most once to a terminal state by
/// the notification handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Initiated,
    Completed,
    Failed,
    Cancelled,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Initiated => write!(f, "Initiated"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initiated" => Ok(Self::Initiated),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------      LineItem         -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub price: Money,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LineItem {
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

//--------------------------------------    CustomerInfo       -------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

//--------------------------------------        Order          -------------------------------------------------------
/// A confirmed purchase. Never mutated after creation except for admin fulfilment transitions; `total` is always
/// `subtotal + shipping`, recomputed server-side before the record is persisted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner_id: Option<String>,
    #[sqlx(json)]
    pub customer: CustomerInfo,
    #[sqlx(json)]
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub payment_status: OrderPaymentStatus,
    pub status: OrderStatusType,
    pub gateway: PaymentGateway,
    pub external_txid: Option<String>,
    /// Gateway name, raw notification payload and friends. `null` for cash-on-delivery orders.
    #[sqlx(json)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub id: OrderId,
    pub owner_id: Option<String>,
    pub customer: CustomerInfo,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub payment_status: OrderPaymentStatus,
    pub gateway: PaymentGateway,
    /// The gateway's transaction id. `None` on the cash-on-delivery path; the de-duplication key otherwise.
    pub external_txid: Option<String>,
    pub metadata: serde_json::Value,
}

impl NewOrder {
    pub fn new(id: OrderId, customer: CustomerInfo, items: Vec<LineItem>, gateway: PaymentGateway) -> Self {
        Self {
            id,
            owner_id: None,
            customer,
            items,
            subtotal: Money::default(),
            shipping: Money::default(),
            total: Money::default(),
            payment_status: OrderPaymentStatus::Pending,
            gateway,
            external_txid: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// The sum of the line totals. The authoritative subtotal, whatever the client claimed.
    pub fn items_subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

//--------------------------------------       Payment         -------------------------------------------------------
/// Audit record of a gateway transaction attempt, independent of whether an Order ever materialises.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    /// The correlation key generated at initiation and round-tripped through the gateway.
    pub merchant_payment_id: String,
    pub owner_id: Option<String>,
    /// Filled in once the payment has been reconciled against an order.
    pub order_id: Option<OrderId>,
    pub gateway: PaymentGateway,
    pub method: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub external_txid: Option<String>,
    /// The raw notification payload as delivered by the gateway.
    #[sqlx(json)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub merchant_payment_id: String,
    pub owner_id: Option<String>,
    pub gateway: PaymentGateway,
    pub method: String,
    pub amount: Money,
    pub currency: String,
}

impl NewPayment {
    pub fn new(merchant_payment_id: String, gateway: PaymentGateway, amount: Money, currency: String) -> Self {
        Self { merchant_payment_id, owner_id: None, gateway, method: gateway.to_string(), amount, currency }
    }
}

/// Patch applied by `upsert_payment`, matched on `merchant_payment_id` with create-if-absent semantics. Carries
/// everything needed to create the record so a notification that beats its own initiation row still lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentUpsert {
    pub merchant_payment_id: String,
    pub owner_id: Option<String>,
    pub order_id: Option<OrderId>,
    pub gateway: PaymentGateway,
    pub method: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub external_txid: Option<String>,
    pub payload: serde_json::Value,
}

//--------------------------------------        Cart           -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CartStatus {
    Active,
    Converted,
    Abandoned,
}

impl Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartStatus::Active => write!(f, "Active"),
            CartStatus::Converted => write!(f, "Converted"),
            CartStatus::Abandoned => write!(f, "Abandoned"),
        }
    }
}

/// Owner- or session-scoped staging area. Totals are recomputed server-side on every save.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub owner_id: String,
    #[sqlx(json)]
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub status: CartStatus,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Product         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    #[sqlx(json)]
    pub sizes: Vec<String>,
    #[sqlx(json)]
    pub colors: Vec<String>,
    pub image: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Review          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub product_id: String,
    pub owner_id: Option<String>,
    pub author: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub product_id: String,
    pub owner_id: Option<String>,
    pub author: String,
    pub rating: i64,
    pub comment: String,
}

//--------------------------------------        User           -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn line_totals_multiply_price_by_quantity() {
        let item = LineItem {
            product_id: "p-1".into(),
            name: "Kurta".into(),
            price: Money::from_major(1200),
            quantity: 3,
            size: Some("M".into()),
            color: None,
        };
        assert_eq!(item.line_total(), Money::from_major(3600));
    }

    #[test]
    fn items_subtotal_sums_line_totals() {
        let mut order = NewOrder::new(
            OrderId::from("o-1".to_string()),
            CustomerInfo::default(),
            vec![
                LineItem {
                    product_id: "a".into(),
                    name: "A".into(),
                    price: Money::from_major(100),
                    quantity: 2,
                    size: None,
                    color: None,
                },
                LineItem {
                    product_id: "b".into(),
                    name: "B".into(),
                    price: Money::from_cents(2550),
                    quantity: 1,
                    size: None,
                    color: None,
                },
            ],
            PaymentGateway::Cod,
        );
        assert_eq!(order.items_subtotal(), Money::from_cents(22_550));
        order.items.clear();
        assert_eq!(order.items_subtotal(), Money::default());
    }

    #[test]
    fn gateway_round_trips_through_strings() {
        for gw in
            [PaymentGateway::PayFast, PaymentGateway::Stripe, PaymentGateway::Cod, PaymentGateway::JazzCash, PaymentGateway::EasyPaisa]
        {
            assert_eq!(gw.to_string().parse::<PaymentGateway>().unwrap(), gw);
        }
        assert!("bitcoin".parse::<PaymentGateway>().is_err());
    }
}
