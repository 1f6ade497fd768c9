use crate::domain::money::Balance;
use crate::domain::wallet::OwnerKind;
use crate::error::Result;
use std::io::Write;

/// Final-state row emitted by the replay tool.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub owner: String,
    pub kind: OwnerKind,
    pub balance: Balance,
}

/// Writes final wallet balances as CSV.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header plus one row per wallet, in the order given.
    pub fn write_balances(&mut self, rows: &[BalanceRow]) -> Result<()> {
        self.writer.write_record(["owner", "kind", "balance"])?;
        for row in rows {
            let kind = row.kind.to_string();
            let balance = row.balance.to_string();
            self.writer
                .write_record([row.owner.as_str(), kind.as_str(), balance.as_str()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_rows() {
        let mut buf = Vec::new();
        {
            let mut writer = BalanceWriter::new(&mut buf);
            writer
                .write_balances(&[
                    BalanceRow {
                        owner: "alice".into(),
                        kind: OwnerKind::Student,
                        balance: Balance::new(dec!(60)),
                    },
                    BalanceRow {
                        owner: "platform".into(),
                        kind: OwnerKind::Admin,
                        balance: Balance::new(dec!(40)),
                    },
                ])
                .unwrap();
        }

        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out, "owner,kind,balance\nalice,student,60\nplatform,admin,40\n");
    }
}
