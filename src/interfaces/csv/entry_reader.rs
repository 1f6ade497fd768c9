use crate::domain::wallet::OwnerKind;
use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Init,
    Credit,
    Debit,
}

/// One replayed ledger operation.
///
/// `owner` is a free-form label; the replay loop derives a deterministic
/// owner id from it, so fixture files never carry uuids. `kind` is required
/// for `init` and `credit` (wallets are created lazily on credit), `amount`
/// and `ref` for the two money-moving ops.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct LedgerOp {
    pub op: OpKind,
    pub owner: String,
    pub kind: Option<OwnerKind>,
    pub amount: Option<Decimal>,
    #[serde(rename = "ref")]
    pub external_ref: Option<String>,
}

/// Reads ledger operations from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding `Result<LedgerOp>` lazily so large files stream.
pub struct LedgerOpReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> LedgerOpReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<LedgerOp>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CoreError::from))
    }
}
