use crate::{
    db_types::{NewPayment, Payment, PaymentUpsert},
    traits::PersistenceError,
};

/// The audit ledger of gateway transaction attempts.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement: Clone {
    /// Records a freshly initiated payment (`status = Initiated`). Fails if the merchant payment id is already
    /// taken.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PersistenceError>;

    /// Applies the patch to the payment matching `upsert.merchant_payment_id`, creating the record if it does not
    /// exist. This is the notification handler's write path and must be safe to re-drive.
    fn upsert_payment(
        &self,
        upsert: PaymentUpsert,
    ) -> impl std::future::Future<Output = Result<Payment, PersistenceError>> + Send;

    async fn fetch_payment_by_merchant_id(&self, merchant_payment_id: &str) -> Result<Option<Payment>, PersistenceError>;

    async fn fetch_payments_for_owner(&self, owner_id: &str) -> Result<Vec<Payment>, PersistenceError>;

    /// Every payment attempt, newest first. Admin listing only.
    async fn fetch_all_payments(&self) -> Result<Vec<Payment>, PersistenceError>;
}
