//! Reconciliation state-machine tests, run against both storage backends. The heart of the suite: one order per
//! external transaction id, no matter how many times (or how concurrently) the gateway reports it.

use serde_json::json;
use spg_common::Money;
use storefront_engine::{
    db_types::{CustomerInfo, LineItem, OrderPaymentStatus, OrderStatusType, PaymentGateway, PaymentStatus},
    events::EventProducers,
    order_objects::{CheckoutDraft, GatewayPaymentStatus, NotificationOutcome, VerifiedNotification},
    shipping::ShippingPolicy,
    FileStoreDatabase,
    OrderManagement,
    PaymentManagement,
    ReconciliationApi,
    ReconciliationError,
    SqliteDatabase,
    StorefrontDatabase,
};
use tempfile::TempDir;

fn line_item(id: &str, price_major: i64, quantity: i64) -> LineItem {
    LineItem {
        product_id: id.to_string(),
        name: format!("Product {id}"),
        price: Money::from_major(price_major),
        quantity,
        size: None,
        color: None,
    }
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Ayesha Khan".to_string(),
        email: "ayesha@example.com".to_string(),
        phone: "+92-300-1234567".to_string(),
        address: "14-B Gulberg III, Lahore".to_string(),
    }
}

fn draft(items: Vec<LineItem>) -> CheckoutDraft {
    CheckoutDraft { owner_id: Some("usr-1".to_string()), customer: customer(), items }
}

fn notification(txid: &str, mpid: &str, status: GatewayPaymentStatus, items: Vec<LineItem>) -> VerifiedNotification {
    VerifiedNotification {
        gateway: PaymentGateway::PayFast,
        merchant_payment_id: mpid.to_string(),
        external_txid: txid.to_string(),
        status,
        amount: Money::from_major(5000),
        currency: "PKR".to_string(),
        draft: draft(items),
        raw: json!({ "pf_payment_id": txid, "m_payment_id": mpid, "payment_status": "COMPLETE" }),
    }
}

async fn sqlite_db(dir: &TempDir) -> SqliteDatabase {
    let url = format!("sqlite://{}/test.db", dir.path().display());
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn file_db(dir: &TempDir) -> FileStoreDatabase {
    FileStoreDatabase::new(dir.path().join("data"))
}

fn api_for<B: StorefrontDatabase>(db: B) -> ReconciliationApi<B> {
    ReconciliationApi::new(db, EventProducers::default(), ShippingPolicy::default())
}

async fn repeated_notifications_create_one_order<B: StorefrontDatabase>(db: B) {
    let api = api_for(db.clone());
    let n = notification("pf-tx-100", "pf-mp-100", GatewayPaymentStatus::Complete, vec![line_item("a", 2400, 2)]);
    let mut created = 0;
    let mut duplicates = 0;
    for _ in 0..4 {
        match api.process_gateway_notification(n.clone()).await {
            NotificationOutcome::OrderCreated(_) => created += 1,
            NotificationOutcome::Duplicate(_) => duplicates += 1,
            other => panic!("Unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(duplicates, 3);
    let orders = db.fetch_all_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.external_txid.as_deref(), Some("pf-tx-100"));
    assert_eq!(order.payment_status, OrderPaymentStatus::Completed);
    // subtotal 4800 -> shipping 200 -> total 5000
    assert_eq!(order.subtotal, Money::from_major(4800));
    assert_eq!(order.shipping, Money::from_major(200));
    assert_eq!(order.total, Money::from_major(5000));
    let payment = db.fetch_payment_by_merchant_id("pf-mp-100").await.unwrap().expect("payment should exist");
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.order_id.as_ref(), Some(&order.id));
}

#[tokio::test]
async fn repeated_notifications_create_one_order_filestore() {
    let dir = TempDir::new().unwrap();
    repeated_notifications_create_one_order(file_db(&dir)).await;
}

#[tokio::test]
async fn repeated_notifications_create_one_order_sqlite() {
    let dir = TempDir::new().unwrap();
    repeated_notifications_create_one_order(sqlite_db(&dir).await).await;
}

async fn concurrent_notifications_create_one_order<B: StorefrontDatabase + Send + Sync + 'static>(db: B) {
    let n = notification("pf-tx-200", "pf-mp-200", GatewayPaymentStatus::Complete, vec![line_item("b", 2600, 2)]);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let api = api_for(db.clone());
        let n = n.clone();
        handles.push(tokio::spawn(async move { api.process_gateway_notification(n).await }));
    }
    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            NotificationOutcome::OrderCreated(_) => created += 1,
            NotificationOutcome::Duplicate(_) => {},
            other => panic!("Unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(created, 1, "exactly one delivery may win");
    let orders = db.fetch_all_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    let payment = db.fetch_payment_by_merchant_id("pf-mp-200").await.unwrap().expect("payment should exist");
    assert_eq!(payment.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn concurrent_notifications_create_one_order_filestore() {
    let dir = TempDir::new().unwrap();
    concurrent_notifications_create_one_order(file_db(&dir)).await;
}

#[tokio::test]
async fn concurrent_notifications_create_one_order_sqlite() {
    let dir = TempDir::new().unwrap();
    concurrent_notifications_create_one_order(sqlite_db(&dir).await).await;
}

async fn non_complete_status_creates_no_order<B: StorefrontDatabase>(db: B) {
    let api = api_for(db.clone());
    let n = notification("pf-tx-300", "pf-mp-300", GatewayPaymentStatus::Failed, vec![line_item("c", 1000, 1)]);
    match api.process_gateway_notification(n).await {
        NotificationOutcome::Ignored { status } => assert_eq!(status, "FAILED"),
        other => panic!("Unexpected outcome: {other:?}"),
    }
    assert!(db.fetch_all_orders().await.unwrap().is_empty());
    // The payment record reflects the terminal status for the audit trail.
    let payment = db.fetch_payment_by_merchant_id("pf-mp-300").await.unwrap().expect("payment should exist");
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.order_id.is_none());
}

#[tokio::test]
async fn non_complete_status_creates_no_order_filestore() {
    let dir = TempDir::new().unwrap();
    non_complete_status_creates_no_order(file_db(&dir)).await;
}

#[tokio::test]
async fn non_complete_status_creates_no_order_sqlite() {
    let dir = TempDir::new().unwrap();
    non_complete_status_creates_no_order(sqlite_db(&dir).await).await;
}

#[tokio::test]
async fn empty_cart_checkout_is_rejected() {
    let dir = TempDir::new().unwrap();
    let db = file_db(&dir);
    let api = api_for(db.clone());
    let result = api.checkout_cod(draft(Vec::new())).await;
    assert!(matches!(result, Err(ReconciliationError::Validation(_))));
    assert!(db.fetch_all_orders().await.unwrap().is_empty());
    assert!(db.fetch_all_payments().await.unwrap().is_empty());
}

#[tokio::test]
async fn cod_checkout_recomputes_totals_server_side() {
    let dir = TempDir::new().unwrap();
    let db = file_db(&dir);
    let api = api_for(db.clone());

    // Below the free-shipping threshold.
    let order = api.checkout_cod(draft(vec![line_item("a", 4800, 1)])).await.unwrap();
    assert_eq!(order.subtotal, Money::from_major(4800));
    assert_eq!(order.shipping, Money::from_major(200));
    assert_eq!(order.total, Money::from_major(5000));
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
    assert_eq!(order.gateway, PaymentGateway::Cod);
    assert!(order.external_txid.is_none());

    // Above the threshold: free shipping.
    let order = api.checkout_cod(draft(vec![line_item("b", 2600, 2)])).await.unwrap();
    assert_eq!(order.subtotal, Money::from_major(5200));
    assert_eq!(order.shipping, Money::default());
    assert_eq!(order.total, Money::from_major(5200));
}

#[tokio::test]
async fn fulfilment_transitions_follow_the_table() {
    let dir = TempDir::new().unwrap();
    let db = file_db(&dir);
    let api = api_for(db.clone());
    let order = api.checkout_cod(draft(vec![line_item("a", 100, 1)])).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);

    // Same-status change is a no-op error.
    let err = api.modify_status_for_order(&order.id, OrderStatusType::Pending).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::OrderModificationNoOp));

    // Pending -> Delivered skips a step and is forbidden.
    let err = api.modify_status_for_order(&order.id, OrderStatusType::Delivered).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::OrderModificationForbidden));

    let order2 = api.modify_status_for_order(&order.id, OrderStatusType::Shipped).await.unwrap();
    assert_eq!(order2.status, OrderStatusType::Shipped);
    let order3 = api.modify_status_for_order(&order.id, OrderStatusType::Delivered).await.unwrap();
    assert_eq!(order3.status, OrderStatusType::Delivered);

    // Delivered is terminal.
    let err = api.modify_status_for_order(&order.id, OrderStatusType::Failed).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::OrderModificationForbidden));
}

#[tokio::test]
async fn settle_verified_payment_rejects_unpaid_sessions() {
    let dir = TempDir::new().unwrap();
    let db = file_db(&dir);
    let api = api_for(db.clone());
    let n = notification("cs-tx-1", "st-mp-1", GatewayPaymentStatus::Pending, vec![line_item("a", 100, 1)]);
    let result = api.settle_verified_payment(n).await;
    assert!(matches!(result, Err(ReconciliationError::Validation(_))));
    assert!(db.fetch_all_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn settle_verified_payment_is_idempotent_with_the_itn_path() {
    let dir = TempDir::new().unwrap();
    let db = file_db(&dir);
    let api = api_for(db.clone());
    let n = notification("tx-shared", "mp-shared", GatewayPaymentStatus::Complete, vec![line_item("a", 900, 1)]);
    let order = api.settle_verified_payment(n.clone()).await.unwrap();
    // The asynchronous notification for the same transaction arrives afterwards.
    match api.process_gateway_notification(n).await {
        NotificationOutcome::Duplicate(id) => assert_eq!(id, order.id),
        other => panic!("Unexpected outcome: {other:?}"),
    }
    assert_eq!(db.fetch_all_orders().await.unwrap().len(), 1);
}
