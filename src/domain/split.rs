//! Revenue split: the platform's cut of a course sale after coupon discount.
//!
//! The coupon discount is spread evenly across all items by count (bundles
//! are flattened by the caller before the split), and each item's platform
//! share is rounded to 2 decimal places independently. The order-level total
//! is the sum of the already-rounded per-item shares, never a re-rounding of
//! an unrounded sum; the resulting drift of a cent or two versus aggregate
//! rounding is the accepted crate-wide policy.

use crate::domain::money::Amount;
use crate::domain::order::CourseId;
use crate::error::{CoreError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// The platform keeps 10% of every discounted sale.
pub const PLATFORM_RATE: Decimal = dec!(0.10);

/// One flattened sale item entering the split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitItem {
    pub course_id: CourseId,
    pub effective_price: Decimal,
}

/// Per-item outcome of the split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemShare {
    pub course_id: CourseId,
    pub discounted_price: Decimal,
    pub platform_share: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueSplit {
    pub items: Vec<ItemShare>,
    pub platform_total: Decimal,
}

/// Distributes `coupon_discount` evenly across `items` and computes each
/// item's platform share.
pub fn split_order(items: &[SplitItem], coupon_discount: Option<Amount>) -> Result<RevenueSplit> {
    if items.is_empty() {
        return Err(CoreError::validation("cannot split an order with no items"));
    }

    let per_item_discount = match coupon_discount {
        Some(discount) => discount.value() / Decimal::from(items.len()),
        None => Decimal::ZERO,
    };

    let mut shares = Vec::with_capacity(items.len());
    let mut platform_total = Decimal::ZERO;
    for item in items {
        // A discount larger than the item price floors at zero rather than
        // producing a negative share.
        let discounted_price = (item.effective_price - per_item_discount).max(Decimal::ZERO);
        let platform_share = (discounted_price * PLATFORM_RATE)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        platform_total += platform_share;
        shares.push(ItemShare {
            course_id: item.course_id,
            discounted_price,
            platform_share,
        });
    }

    Ok(RevenueSplit {
        items: shares,
        platform_total,
    })
}
