use crate::domain::money::{Amount, Balance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a wallet owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id derived from a human-readable label. Used by the
    /// replay CLI so fixture files can name owners instead of carrying uuids.
    pub fn from_label(label: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, label.as_bytes()))
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Student,
    Instructor,
    Admin,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OwnerKind::Student => "student",
            OwnerKind::Instructor => "instructor",
            OwnerKind::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// An authenticated owner reference as supplied by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub kind: OwnerKind,
}

impl Owner {
    pub fn new(id: OwnerId, kind: OwnerKind) -> Self {
        Self { id, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Credit,
    Debit,
}

/// One row of a wallet's append-only log. Never mutated or deleted.
///
/// `external_ref` is the idempotency key: a second entry with the same ref is
/// silently dropped by the wallet, so retried credits and debits cannot
/// double-apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub amount: Amount,
    pub kind: EntryKind,
    pub description: String,
    pub external_ref: String,
    pub occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn credit(amount: Amount, description: impl Into<String>, external_ref: impl Into<String>) -> Self {
        Self {
            amount,
            kind: EntryKind::Credit,
            description: description.into(),
            external_ref: external_ref.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn debit(amount: Amount, description: impl Into<String>, external_ref: impl Into<String>) -> Self {
        Self {
            amount,
            kind: EntryKind::Debit,
            description: description.into(),
            external_ref: external_ref.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Per-owner balance plus the entry log backing it.
///
/// Invariant: `balance == Σcredits − Σdebits` over `entries`, and
/// `balance ≥ 0`. Both hold because the only mutators are [`Wallet::credit`]
/// and [`Wallet::debit`], and the stores call them under a write lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub owner: OwnerId,
    pub owner_kind: OwnerKind,
    pub balance: Balance,
    pub entries: Vec<LedgerEntry>,
}

impl Wallet {
    pub fn new(owner: OwnerId, owner_kind: OwnerKind) -> Self {
        Self {
            owner,
            owner_kind,
            balance: Balance::ZERO,
            entries: Vec::new(),
        }
    }

    pub fn has_entry(&self, external_ref: &str) -> bool {
        self.entries.iter().any(|e| e.external_ref == external_ref)
    }

    /// Appends a credit entry. Returns `false` (and leaves the wallet
    /// untouched) when an entry with the same `external_ref` already exists.
    pub fn credit(&mut self, entry: LedgerEntry) -> bool {
        debug_assert_eq!(entry.kind, EntryKind::Credit);
        if self.has_entry(&entry.external_ref) {
            return false;
        }
        self.balance += entry.amount.into();
        self.entries.push(entry);
        true
    }

    /// Appends a debit entry if the balance can cover it.
    ///
    /// The guard and the mutation happen in one call so callers holding the
    /// wallet exclusively get an atomic conditional update. Returns
    /// `Ok(false)` for a duplicate `external_ref`, `Err(available)` when the
    /// balance is insufficient.
    pub fn debit(&mut self, entry: LedgerEntry) -> std::result::Result<bool, Balance> {
        debug_assert_eq!(entry.kind, EntryKind::Debit);
        if self.has_entry(&entry.external_ref) {
            return Ok(false);
        }
        if self.balance < entry.amount.into() {
            return Err(self.balance);
        }
        self.balance -= entry.amount.into();
        self.entries.push(entry);
        Ok(true)
    }

    /// Recomputes Σcredits − Σdebits from the log. Audit helper; must always
    /// equal `balance`.
    pub fn net(&self) -> Balance {
        self.entries.iter().fold(Balance::ZERO, |acc, e| match e.kind {
            EntryKind::Credit => acc + e.amount.into(),
            EntryKind::Debit => acc - e.amount.into(),
        })
    }
}
