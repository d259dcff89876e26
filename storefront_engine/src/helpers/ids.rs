use uuid::Uuid;

use crate::db_types::OrderId;

/// Generates a fresh opaque order id.
pub fn new_order_id() -> OrderId {
    OrderId(format!("ord-{}", Uuid::new_v4().simple()))
}

/// Generates the merchant payment id that is round-tripped through a gateway to correlate the asynchronous
/// notification back to the Payment record. UUID-backed; the storage layer additionally enforces uniqueness.
pub fn new_merchant_payment_id(gateway_prefix: &str) -> String {
    format!("{gateway_prefix}-{}", Uuid::new_v4().simple())
}

pub fn new_user_id() -> String {
    format!("usr-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn merchant_payment_ids_are_unique_and_prefixed() {
        let ids: HashSet<String> = (0..1000).map(|_| new_merchant_payment_id("pf")).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("pf-")));
    }

    #[test]
    fn order_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_order_id().0).collect();
        assert_eq!(ids.len(), 1000);
    }
}
