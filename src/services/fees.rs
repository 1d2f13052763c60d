//! Checkout fee composition.
//!
//! Every amount is integer cents. The buyer pays
//! `subtotal + shipping + platform_fee + donation`; percentages are applied
//! with `Decimal` and rounded half away from zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Platform fee settings, taken from configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeePolicy {
    /// Percent of the subtotal charged on product and ticket sales
    pub platform_fee_percent: Decimal,
    /// Flat fee charged on steward claims
    pub steward_platform_fee_cents: i64,
    /// Percent of the platform fee passed on to the sponsoring chapter
    pub chapter_share_percent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeeBreakdown {
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub platform_fee_cents: i64,
    pub donation_cents: i64,
    pub total_cents: i64,
}

/// Where the money of a paid order ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PayoutSplit {
    /// Seller, promoter or steward
    pub payee_cents: i64,
    pub platform_cents: i64,
    /// Chapter share of the platform fee plus any donation
    pub chapter_cents: i64,
}

impl PayoutSplit {
    /// Amount the platform keeps back from the connected account
    pub fn application_fee_cents(&self) -> i64 {
        self.platform_cents + self.chapter_cents
    }
}

fn overflow() -> ServiceError {
    ServiceError::ValidationError("Amount is too large".to_string())
}

/// Sums the four components into a breakdown.
pub fn compose(
    subtotal_cents: i64,
    shipping_cents: i64,
    platform_fee_cents: i64,
    donation_cents: i64,
) -> Result<FeeBreakdown, ServiceError> {
    for (name, value) in [
        ("subtotal", subtotal_cents),
        ("shipping", shipping_cents),
        ("platform fee", platform_fee_cents),
        ("donation", donation_cents),
    ] {
        if value < 0 {
            return Err(ServiceError::ValidationError(format!(
                "{} cannot be negative",
                name
            )));
        }
    }

    let total_cents = subtotal_cents
        .checked_add(shipping_cents)
        .and_then(|t| t.checked_add(platform_fee_cents))
        .and_then(|t| t.checked_add(donation_cents))
        .ok_or_else(overflow)?;

    Ok(FeeBreakdown {
        subtotal_cents,
        shipping_cents,
        platform_fee_cents,
        donation_cents,
        total_cents,
    })
}

/// `amount × percent / 100`, rounded half away from zero
pub fn percent_of(amount_cents: i64, percent: Decimal) -> Result<i64, ServiceError> {
    Decimal::from(amount_cents)
        .checked_mul(percent)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|v| v.to_i64())
        .ok_or_else(overflow)
}

fn line_subtotal(unit_price_cents: i64, quantity: u32) -> Result<i64, ServiceError> {
    if quantity == 0 {
        return Err(ServiceError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }
    if unit_price_cents < 0 {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    unit_price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(overflow)
}

impl FeePolicy {
    pub fn product_checkout(
        &self,
        unit_price_cents: i64,
        quantity: u32,
        shipping_cents: i64,
    ) -> Result<FeeBreakdown, ServiceError> {
        let subtotal = line_subtotal(unit_price_cents, quantity)?;
        let platform_fee = percent_of(subtotal, self.platform_fee_percent)?;
        compose(subtotal, shipping_cents, platform_fee, 0)
    }

    /// Tickets ship nothing; free events carry no fee.
    pub fn ticket_checkout(
        &self,
        unit_price_cents: i64,
        quantity: u32,
    ) -> Result<FeeBreakdown, ServiceError> {
        let subtotal = line_subtotal(unit_price_cents, quantity)?;
        let platform_fee = percent_of(subtotal, self.platform_fee_percent)?;
        compose(subtotal, 0, platform_fee, 0)
    }

    /// Steward items are free; the claimant covers shipping, a flat fee and the donation.
    pub fn steward_claim(
        &self,
        shipping_cents: i64,
        donation_cents: i64,
    ) -> Result<FeeBreakdown, ServiceError> {
        compose(
            0,
            shipping_cents,
            self.steward_platform_fee_cents,
            donation_cents,
        )
    }

    pub fn payout_split(&self, breakdown: &FeeBreakdown) -> Result<PayoutSplit, ServiceError> {
        let chapter_share = percent_of(breakdown.platform_fee_cents, self.chapter_share_percent)?
            .min(breakdown.platform_fee_cents);
        let payee_cents = breakdown
            .subtotal_cents
            .checked_add(breakdown.shipping_cents)
            .ok_or_else(overflow)?;
        let chapter_cents = chapter_share
            .checked_add(breakdown.donation_cents)
            .ok_or_else(overflow)?;

        Ok(PayoutSplit {
            payee_cents,
            platform_cents: breakdown.platform_fee_cents - chapter_share,
            chapter_cents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn policy() -> FeePolicy {
        FeePolicy {
            platform_fee_percent: dec!(10),
            steward_platform_fee_cents: 300,
            chapter_share_percent: dec!(20),
        }
    }

    #[test]
    fn product_fee_is_percent_of_subtotal() {
        let breakdown = policy().product_checkout(2_500, 2, 899).unwrap();
        assert_eq!(breakdown.subtotal_cents, 5_000);
        assert_eq!(breakdown.shipping_cents, 899);
        assert_eq!(breakdown.platform_fee_cents, 500);
        assert_eq!(breakdown.donation_cents, 0);
        assert_eq!(breakdown.total_cents, 6_399);
    }

    #[rstest]
    #[case(dec!(10), 1_005, 101)]
    #[case(dec!(10), 1_004, 100)]
    #[case(dec!(2.5), 1_000, 25)]
    #[case(dec!(2.5), 1_020, 26)]
    #[case(dec!(0), 9_999, 0)]
    fn percent_rounds_half_away_from_zero(
        #[case] percent: Decimal,
        #[case] amount: i64,
        #[case] expected: i64,
    ) {
        assert_eq!(percent_of(amount, percent).unwrap(), expected);
    }

    #[test]
    fn free_tickets_have_no_fees() {
        let breakdown = policy().ticket_checkout(0, 4).unwrap();
        assert_eq!(breakdown.total_cents, 0);
        assert_eq!(breakdown.platform_fee_cents, 0);
    }

    #[test]
    fn ticket_checkout_never_ships() {
        let breakdown = policy().ticket_checkout(1_500, 3).unwrap();
        assert_eq!(breakdown.shipping_cents, 0);
        assert_eq!(breakdown.platform_fee_cents, 450);
        assert_eq!(breakdown.total_cents, 4_950);
    }

    #[test]
    fn steward_claim_is_shipping_fee_and_donation() {
        let breakdown = policy().steward_claim(1_250, 500).unwrap();
        assert_eq!(breakdown.subtotal_cents, 0);
        assert_eq!(breakdown.total_cents, 1_250 + 300 + 500);

        let split = policy().payout_split(&breakdown).unwrap();
        assert_eq!(split.payee_cents, 1_250);
        assert_eq!(split.chapter_cents, 60 + 500);
        assert_eq!(split.platform_cents, 240);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert_matches!(
            policy().product_checkout(1_000, 0, 0),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn negative_components_are_rejected() {
        assert_matches!(compose(100, -1, 0, 0), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            policy().steward_claim(100, -50),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn overflow_is_a_validation_error() {
        assert_matches!(
            compose(i64::MAX, 1, 0, 0),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            policy().product_checkout(i64::MAX / 2, 3, 0),
            Err(ServiceError::ValidationError(_))
        );
    }

    proptest! {
        #[test]
        fn total_is_sum_of_components(
            subtotal in 0i64..10_000_000,
            shipping in 0i64..100_000,
            fee in 0i64..1_000_000,
            donation in 0i64..100_000,
        ) {
            let b = compose(subtotal, shipping, fee, donation).unwrap();
            prop_assert_eq!(b.total_cents, subtotal + shipping + fee + donation);
        }

        #[test]
        fn payout_split_sums_to_total(
            price in 0i64..500_000,
            quantity in 1u32..50,
            shipping in 0i64..10_000,
            fee_percent in 0u32..=100,
            share_percent in 0u32..=100,
        ) {
            let policy = FeePolicy {
                platform_fee_percent: Decimal::from(fee_percent),
                steward_platform_fee_cents: 300,
                chapter_share_percent: Decimal::from(share_percent),
            };
            let b = policy.product_checkout(price, quantity, shipping).unwrap();
            let split = policy.payout_split(&b).unwrap();
            prop_assert_eq!(split.payee_cents + split.platform_cents + split.chapter_cents, b.total_cents);
            prop_assert!(split.platform_cents >= 0);
            prop_assert_eq!(split.application_fee_cents(), b.total_cents - split.payee_cents);
        }
    }
}
