//! Balance sheets.
//!
//! A balance sheet is a composite the remote creates in one call: fourteen
//! account sets (assets, liabilities and twelve schedules) tied to a journal.

pub mod assembler;
pub mod sheet;

pub use assembler::BalanceSheetAssembler;
pub use sheet::{BalanceSheet, BalanceSheetSlot};
