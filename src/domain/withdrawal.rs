use crate::domain::money::Amount;
use crate::domain::wallet::OwnerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithdrawalId(Uuid);

impl WithdrawalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WithdrawalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Destination account details, snapshotted onto the request at creation so a
/// later profile edit cannot redirect an in-flight payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub holder_name: String,
    pub account_number: String,
    pub bank_name: String,
    pub routing_code: String,
}

/// An instructor payout request against their wallet balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub instructor: OwnerId,
    pub amount: Amount,
    pub bank_account: BankAccount,
    pub status: WithdrawalStatus,
    pub admin: Option<OwnerId>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    pub fn pending(instructor: OwnerId, amount: Amount, bank_account: BankAccount) -> Self {
        Self {
            id: WithdrawalId::new(),
            instructor,
            amount,
            bank_account,
            status: WithdrawalStatus::Pending,
            admin: None,
            remarks: None,
            created_at: Utc::now(),
        }
    }
}
