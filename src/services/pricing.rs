use crate::config::PricingConfig;
use crate::entities::order::ShippingMode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Checkout totals, all exact decimals. `total` is the amount later signed
/// into the payment request, so the arithmetic here is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Derives shipping, discount, and total from a cart subtotal.
///
/// Home delivery pays the flat configured fee; pickup ships free. Staff
/// buyers get the configured percentage off the subtotal, floor-truncated to
/// a whole currency unit.
pub fn compute_totals(
    config: &PricingConfig,
    subtotal: Decimal,
    shipping_mode: ShippingMode,
    is_staff: bool,
) -> Totals {
    let shipping = match shipping_mode {
        ShippingMode::HomeDelivery => Decimal::from(config.shipping_fee),
        ShippingMode::Pickup => Decimal::ZERO,
    };

    let discount = if is_staff {
        (subtotal * Decimal::from(config.staff_discount_percent) / Decimal::from(100)).floor()
    } else {
        Decimal::ZERO
    };

    Totals {
        subtotal,
        shipping,
        discount,
        total: subtotal + shipping - discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn config() -> PricingConfig {
        PricingConfig::default()
    }

    #[rstest]
    #[case::staff_home_delivery(dec!(2000), ShippingMode::HomeDelivery, true, dec!(3990), dec!(300), dec!(5690))]
    #[case::pickup_ships_free(dec!(1500), ShippingMode::Pickup, false, dec!(0), dec!(0), dec!(1500))]
    #[case::non_staff_no_discount(dec!(2000), ShippingMode::HomeDelivery, false, dec!(3990), dec!(0), dec!(5990))]
    // 15% of 999 is 149.85; the buyer gets 149 off
    #[case::discount_floor_truncated(dec!(999), ShippingMode::Pickup, true, dec!(0), dec!(149), dec!(850))]
    fn checkout_scenarios(
        #[case] subtotal: Decimal,
        #[case] mode: ShippingMode,
        #[case] is_staff: bool,
        #[case] shipping: Decimal,
        #[case] discount: Decimal,
        #[case] total: Decimal,
    ) {
        let totals = compute_totals(&config(), subtotal, mode, is_staff);
        assert_eq!(totals.subtotal, subtotal);
        assert_eq!(totals.shipping, shipping);
        assert_eq!(totals.discount, discount);
        assert_eq!(totals.total, total);
    }

    proptest! {
        #[test]
        fn total_is_consistent(subtotal in 0i64..10_000_000, staff in any::<bool>()) {
            let subtotal = Decimal::from(subtotal);
            let totals = compute_totals(&config(), subtotal, ShippingMode::HomeDelivery, staff);
            prop_assert_eq!(
                totals.total,
                totals.subtotal + totals.shipping - totals.discount
            );
            prop_assert!(totals.discount <= totals.subtotal);
            prop_assert!(totals.discount.fract().is_zero());
        }

        #[test]
        fn pickup_never_charges_shipping(subtotal in 0i64..10_000_000) {
            let totals = compute_totals(
                &config(),
                Decimal::from(subtotal),
                ShippingMode::Pickup,
                false,
            );
            prop_assert_eq!(totals.shipping, Decimal::ZERO);
        }
    }
}
