//! Day book: chronological voucher listing

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// One voucher in the day book, annotated with its total debit amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBookRow {
    pub voucher_id: u32,
    pub date: NaiveDate,
    pub voucher_type: VoucherType,
    pub number: String,
    pub narration: String,
    pub amount: BigDecimal,
}

/// Vouchers within `[from, to]` (inclusive calendar dates) sorted ascending
/// by date, each annotated with its total debit amount.
pub fn day_book(vouchers: &[Voucher], from: NaiveDate, to: NaiveDate) -> Vec<DayBookRow> {
    let mut rows: Vec<DayBookRow> = vouchers
        .iter()
        .filter(|v| v.date >= from && v.date <= to)
        .map(|v| DayBookRow {
            voucher_id: v.id,
            date: v.date,
            voucher_type: v.voucher_type,
            number: v.number.clone(),
            narration: v.narration.clone(),
            amount: v.total_debits(),
        })
        .collect();
    rows.sort_by_key(|r| r.date);
    rows
}
