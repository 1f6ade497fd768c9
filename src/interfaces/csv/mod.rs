//! CSV interface for the ledger replay tool.

pub mod balance_writer;
pub mod entry_reader;
