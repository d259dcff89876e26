//! Small stateless helpers shared across the engine.

mod ids;

pub use ids::{new_merchant_payment_id, new_order_id, new_user_id};
