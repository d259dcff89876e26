//! The shipping-fee calculation. A pure function of the cart subtotal, so it lives apart from the persistence and
//! API layers and is shared by every path that recomputes totals.

use serde::{Deserialize, Serialize};
use spg_common::Money;

/// Flat-fee-below-threshold shipping. Orders strictly above the threshold ship free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub free_shipping_threshold: Money,
    pub default_fee: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self { free_shipping_threshold: Money::from_major(5000), default_fee: Money::from_major(200) }
    }
}

/// Returns zero when the subtotal strictly exceeds the threshold, and the flat fee otherwise. A subtotal exactly on
/// the threshold still pays shipping.
pub fn compute_shipping(subtotal: Money, policy: &ShippingPolicy) -> Money {
    if subtotal > policy.free_shipping_threshold {
        Money::default()
    } else {
        policy.default_fee
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn below_threshold_pays_the_flat_fee() {
        let policy = ShippingPolicy::default();
        assert_eq!(compute_shipping(Money::from_major(4800), &policy), Money::from_major(200));
        assert_eq!(compute_shipping(Money::default(), &policy), Money::from_major(200));
    }

    #[test]
    fn exactly_on_the_threshold_still_pays() {
        let policy = ShippingPolicy::default();
        assert_eq!(compute_shipping(Money::from_major(5000), &policy), Money::from_major(200));
    }

    #[test]
    fn just_over_the_threshold_ships_free() {
        let policy = ShippingPolicy::default();
        assert_eq!(compute_shipping(Money::from_cents(500_001), &policy), Money::default());
        assert_eq!(compute_shipping(Money::from_major(5200), &policy), Money::default());
    }

    #[test]
    fn totals_for_the_canonical_scenarios() {
        let policy = ShippingPolicy::default();
        let subtotal = Money::from_major(4800);
        let shipping = compute_shipping(subtotal, &policy);
        assert_eq!(subtotal + shipping, Money::from_major(5000));

        let subtotal = Money::from_major(5200);
        let shipping = compute_shipping(subtotal, &policy);
        assert_eq!(subtotal + shipping, Money::from_major(5200));
    }
}
