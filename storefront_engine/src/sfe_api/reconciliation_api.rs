use std::fmt::Debug;

use log::*;
use serde_json::json;
use spg_common::Money;

use crate::{
    db_types::{
        NewOrder,
        NewPayment,
        Order,
        OrderId,
        OrderPaymentStatus,
        OrderStatusType,
        Payment,
        PaymentGateway,
        PaymentStatus,
        PaymentUpsert,
    },
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent},
    helpers::new_order_id,
    sfe_api::{
        errors::ReconciliationError,
        order_objects::{CheckoutDraft, GatewayPaymentStatus, NotificationOutcome, VerifiedNotification},
    },
    shipping::{compute_shipping, ShippingPolicy},
    traits::{InsertOrderResult, OrderManagement, PaymentManagement, StorefrontDatabase},
};

/// `ReconciliationApi` is the primary API for moving a purchase through `initiated → {completed, failed,
/// cancelled}` exactly once, regardless of notification retries or concurrent deliveries. It owns the Order and
/// Payment records; nothing else writes them.
pub struct ReconciliationApi<B> {
    db: B,
    producers: EventProducers,
    policy: ShippingPolicy,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, producers: EventProducers, policy: ShippingPolicy) -> Self {
        Self { db, producers, policy }
    }

    pub fn shipping_policy(&self) -> &ShippingPolicy {
        &self.policy
    }

    /// Recomputes the authoritative totals for a draft. Client-supplied totals are never trusted.
    pub fn totals_for(&self, draft: &CheckoutDraft) -> (Money, Money, Money) {
        let subtotal: Money = draft.items.iter().map(|i| i.line_total()).sum();
        let shipping = compute_shipping(subtotal, &self.policy);
        (subtotal, shipping, subtotal + shipping)
    }
}

impl<B> ReconciliationApi<B>
where B: StorefrontDatabase
{
    /// The degenerate cash-on-delivery path: no Payment record, the Order is created synchronously with its
    /// settlement still pending. Totals are recomputed server-side.
    pub async fn checkout_cod(&self, draft: CheckoutDraft) -> Result<Order, ReconciliationError> {
        validate_draft(&draft)?;
        let (subtotal, shipping, total) = self.totals_for(&draft);
        let mut order = NewOrder::new(new_order_id(), draft.customer, draft.items, PaymentGateway::Cod);
        order.owner_id = draft.owner_id;
        order.subtotal = subtotal;
        order.shipping = shipping;
        order.total = total;
        order.payment_status = OrderPaymentStatus::Pending;
        let result = self.db.insert_order(order).await?;
        let order = result.order().clone();
        info!("🔄️📦️ COD order [{}] created for a total of {}.", order.id, order.total);
        self.call_order_created_hook(&order).await;
        Ok(order)
    }

    /// Records the 1:1 Payment that pairs with a non-cash checkout submission, in the `Initiated` state. Called by
    /// the gateway adapters after they have built the redirect/session.
    pub async fn record_initiated_payment(&self, payment: NewPayment) -> Result<Payment, ReconciliationError> {
        let payment = self.db.insert_payment(payment).await?;
        debug!("🔄️💳️ Payment [{}] initiated via {}.", payment.merchant_payment_id, payment.gateway);
        Ok(payment)
    }

    /// Handles a verified asynchronous gateway notification. This is the ONLY path that creates an order for a
    /// gateway-settled purchase, and it is idempotent: N deliveries of the same transaction id produce exactly one
    /// order. Never fails — local errors are folded into the outcome, logged, and the gateway is acknowledged
    /// regardless, so it does not retry-storm a permanently failing handler.
    pub async fn process_gateway_notification(&self, notification: VerifiedNotification) -> NotificationOutcome {
        let txid = notification.external_txid.clone();
        match &notification.status {
            GatewayPaymentStatus::Complete => match self.promote(notification).await {
                Ok(InsertOrderResult::Inserted(order)) => {
                    info!("🔄️📦️ Order [{}] created from notification for txid {txid}.", order.id);
                    self.call_order_created_hook(&order).await;
                    NotificationOutcome::OrderCreated(order)
                },
                Ok(InsertOrderResult::AlreadyExists(order)) => {
                    info!("🔄️📦️ Duplicate notification for txid {txid}. Order [{}] already exists.", order.id);
                    NotificationOutcome::Duplicate(order.id)
                },
                Err(e) => {
                    error!("🔄️📦️ Could not create order for txid {txid}. {e}. Acknowledging anyway.");
                    NotificationOutcome::Failed { reason: e.to_string() }
                },
            },
            status => {
                info!("🔄️📦️ Notification for txid {txid} carries status {status}. No order will be created.");
                if let Err(e) = self.record_terminal_status(&notification).await {
                    error!("🔄️💳️ Could not record terminal payment status for txid {txid}. {e}");
                }
                NotificationOutcome::Ignored { status: status.to_string() }
            },
        }
    }

    /// The synchronous Stripe-style return path: same promotion as the notification handler, but errors surface to
    /// the caller because a user is waiting on the response.
    pub async fn settle_verified_payment(
        &self,
        notification: VerifiedNotification,
    ) -> Result<Order, ReconciliationError> {
        if notification.status != GatewayPaymentStatus::Complete {
            return Err(ReconciliationError::Validation(format!(
                "The payment has not completed (status: {}).",
                notification.status
            )));
        }
        let result = self.promote(notification).await?;
        let order = result.order().clone();
        if result.was_inserted() {
            self.call_order_created_hook(&order).await;
        }
        Ok(order)
    }

    /// Creates the order and completes the payment as one unit. The existence check inside the backend's
    /// `commit_reconciled_order` short-circuits repeats; the storage-level uniqueness guarantee catches the race
    /// between the check and the insert.
    async fn promote(&self, notification: VerifiedNotification) -> Result<InsertOrderResult, ReconciliationError> {
        validate_draft(&notification.draft)?;
        let (subtotal, shipping, total) = self.totals_for(&notification.draft);
        let draft = notification.draft;
        let mut order = NewOrder::new(new_order_id(), draft.customer, draft.items, notification.gateway);
        order.owner_id = draft.owner_id.clone();
        order.subtotal = subtotal;
        order.shipping = shipping;
        order.total = total;
        order.payment_status = OrderPaymentStatus::Completed;
        order.external_txid = Some(notification.external_txid.clone());
        order.metadata = json!({
            "gateway": notification.gateway,
            "merchant_payment_id": notification.merchant_payment_id,
            "notification": notification.raw,
        });
        let order_id = order.id.clone();
        let upsert = PaymentUpsert {
            merchant_payment_id: notification.merchant_payment_id,
            owner_id: draft.owner_id,
            order_id: Some(order_id),
            gateway: notification.gateway,
            method: notification.gateway.to_string(),
            amount: notification.amount,
            currency: notification.currency,
            status: PaymentStatus::Completed,
            external_txid: Some(notification.external_txid),
            payload: notification.raw,
        };
        let result = self.db.commit_reconciled_order(order, upsert).await?;
        Ok(result)
    }

    /// Records a failed/cancelled terminal status against the Payment record, if one can be correlated.
    async fn record_terminal_status(&self, notification: &VerifiedNotification) -> Result<(), ReconciliationError> {
        let status = match notification.status {
            GatewayPaymentStatus::Failed => PaymentStatus::Failed,
            GatewayPaymentStatus::Cancelled => PaymentStatus::Cancelled,
            // Pending or unrecognised statuses leave the payment as-is; the gateway will report again.
            _ => return Ok(()),
        };
        let upsert = PaymentUpsert {
            merchant_payment_id: notification.merchant_payment_id.clone(),
            owner_id: notification.draft.owner_id.clone(),
            order_id: None,
            gateway: notification.gateway,
            method: notification.gateway.to_string(),
            amount: notification.amount,
            currency: notification.currency.clone(),
            status,
            external_txid: Some(notification.external_txid.clone()),
            payload: notification.raw.clone(),
        };
        self.db.upsert_payment(upsert).await?;
        Ok(())
    }

    /// Changes the fulfilment status of an order. Admin-only; a simple field update, deliberately outside the
    /// idempotent-creation machinery. The legal transitions:
    ///
    /// | From \ To | Pending | Shipped | Delivered | Failed |
    /// |-----------|---------|---------|-----------|--------|
    /// | Pending   | Err     | ok      | Err       | ok     |
    /// | Shipped   | Err     | Err     | ok        | ok     |
    /// | Delivered | Err     | Err     | Err       | Err    |
    /// | Failed    | Err     | Err     | Err       | Err    |
    ///
    /// A same-status change is a no-op error. Returns the updated order.
    pub async fn modify_status_for_order(
        &self,
        oid: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, ReconciliationError> {
        let order = self
            .db
            .fetch_order_by_id(oid)
            .await?
            .ok_or_else(|| ReconciliationError::OrderNotFound(oid.clone()))?;
        let old_status = order.status;
        use OrderStatusType::*;
        match (old_status, new_status) {
            (old, new) if old == new => return Err(ReconciliationError::OrderModificationNoOp),
            (Pending, Shipped) | (Shipped, Delivered) | (Pending, Failed) | (Shipped, Failed) => {},
            (_, _) => return Err(ReconciliationError::OrderModificationForbidden),
        }
        let updated = self.db.update_order_status(oid, new_status).await?;
        info!("🔄️📦️ Order [{oid}] moved from {old_status} to {new_status}.");
        self.call_status_changed_hook(&updated, old_status).await;
        Ok(updated)
    }

    async fn call_order_created_hook(&self, order: &Order) {
        for emitter in &self.producers.order_created_producer {
            trace!("🔄️📦️ Notifying order-created subscribers for [{}]", order.id);
            let event = OrderCreatedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_status_changed_hook(&self, order: &Order, old_status: OrderStatusType) {
        for emitter in &self.producers.order_status_changed_producer {
            let event = OrderStatusChangedEvent::new(order.clone(), old_status);
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn validate_draft(draft: &CheckoutDraft) -> Result<(), ReconciliationError> {
    if draft.items.is_empty() {
        return Err(ReconciliationError::Validation("The cart is empty.".to_string()));
    }
    if draft.items.iter().any(|i| i.quantity <= 0) {
        return Err(ReconciliationError::Validation("Line item quantities must be positive.".to_string()));
    }
    if draft.items.iter().any(|i| i.price < Money::default()) {
        return Err(ReconciliationError::Validation("Line item prices cannot be negative.".to_string()));
    }
    Ok(())
}
