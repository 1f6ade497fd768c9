use crate::domain::money::Amount;
use crate::domain::split::{self, RevenueSplit, SplitItem};
use crate::domain::wallet::Owner;
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(Uuid);

impl CourseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CourseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Wallet,
    Gateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A price snapshot taken at order creation. Later catalog price changes must
/// not retroactively alter a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub course_id: CourseId,
    pub list_price: Amount,
    pub offer_price: Option<Amount>,
}

impl LineItem {
    pub fn effective_price(&self) -> Amount {
        self.offer_price.unwrap_or(self.list_price)
    }

    pub fn as_split_item(&self) -> SplitItem {
        SplitItem {
            course_id: self.course_id,
            effective_price: self.effective_price().value(),
        }
    }
}

/// A course-purchase order. Created `Pending`, transitions exactly once to a
/// terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer: Owner,
    pub line_items: Vec<LineItem>,
    pub coupon_discount: Option<Amount>,
    pub total: Amount,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub gateway_order_id: Option<String>,
    /// Set when a wallet debit was taken for this order, so cancel/fail can
    /// reverse exactly that debit.
    pub wallet_debit_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a `Pending` order, computing the total from the snapshotted
    /// prices minus the coupon discount.
    pub fn new(
        buyer: Owner,
        line_items: Vec<LineItem>,
        coupon_discount: Option<Amount>,
        payment_method: PaymentMethod,
    ) -> Result<Self> {
        if line_items.is_empty() {
            return Err(CoreError::validation("order must contain at least one course"));
        }

        let gross: Decimal = line_items
            .iter()
            .map(|item| item.effective_price().value())
            .sum();
        let discount = coupon_discount.map(|d| d.value()).unwrap_or(Decimal::ZERO);
        let total = Amount::new(gross - discount)
            .map_err(|_| CoreError::validation("coupon discount must leave a positive order total"))?;

        Ok(Self {
            id: OrderId::new(),
            buyer,
            line_items,
            coupon_discount,
            total,
            status: OrderStatus::Pending,
            payment_method,
            gateway_order_id: None,
            wallet_debit_ref: None,
            created_at: Utc::now(),
        })
    }

    /// The platform's cut of this order, computed from the snapshotted prices
    /// and the coupon discount.
    pub fn revenue_split(&self) -> Result<RevenueSplit> {
        let items: Vec<SplitItem> = self.line_items.iter().map(LineItem::as_split_item).collect();
        split::split_order(&items, self.coupon_discount)
    }
}
