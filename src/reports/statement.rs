//! Ledger statement with running balance

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// One row of a ledger statement.
///
/// `balance` is the absolute running balance; `balance_side` says whether
/// that balance is a debit or a credit balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub date: NaiveDate,
    pub particulars: String,
    pub voucher_type: Option<VoucherType>,
    pub voucher_number: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub balance: BigDecimal,
    pub balance_side: EntrySide,
}

/// Ledger statement for one ledger over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStatement {
    pub ledger_id: u32,
    pub ledger_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<StatementRow>,
    /// Signed closing balance: positive debit, negative credit.
    pub closing_balance: BigDecimal,
}

fn balance_side(balance: &BigDecimal) -> EntrySide {
    if *balance < BigDecimal::from(0) {
        EntrySide::Credit
    } else {
        EntrySide::Debit
    }
}

/// Replay vouchers against one ledger, emitting an opening row and then one
/// row per matching entry with a running balance.
///
/// Vouchers inside `[from, to]` are replayed in ascending date order (stable
/// for same-date vouchers), starting from the ledger's opening balance;
/// debits add to the running balance, credits subtract.
pub fn ledger_statement(
    ledger: &Ledger,
    vouchers: &[Voucher],
    from: NaiveDate,
    to: NaiveDate,
) -> LedgerStatement {
    let zero = BigDecimal::from(0);
    let mut balance = ledger.opening_balance.clone();
    let mut rows = vec![StatementRow {
        date: from,
        particulars: "Opening Balance".to_string(),
        voucher_type: None,
        voucher_number: String::new(),
        debit: if balance > zero {
            balance.clone()
        } else {
            zero.clone()
        },
        credit: if balance < zero { balance.abs() } else { zero.clone() },
        balance: balance.abs(),
        balance_side: balance_side(&balance),
    }];

    let mut in_range: Vec<&Voucher> = vouchers
        .iter()
        .filter(|v| v.date >= from && v.date <= to)
        .collect();
    in_range.sort_by_key(|v| v.date);

    for voucher in in_range {
        for entry in voucher.entries.iter().filter(|e| e.ledger_id == ledger.id) {
            match entry.side {
                EntrySide::Debit => balance += &entry.amount,
                EntrySide::Credit => balance -= &entry.amount,
            }
            rows.push(StatementRow {
                date: voucher.date,
                particulars: if voucher.narration.is_empty() {
                    "Transaction".to_string()
                } else {
                    voucher.narration.clone()
                },
                voucher_type: Some(voucher.voucher_type),
                voucher_number: voucher.number.clone(),
                debit: if entry.side == EntrySide::Debit {
                    entry.amount.clone()
                } else {
                    zero.clone()
                },
                credit: if entry.side == EntrySide::Credit {
                    entry.amount.clone()
                } else {
                    zero.clone()
                },
                balance: balance.abs(),
                balance_side: balance_side(&balance),
            });
        }
    }

    LedgerStatement {
        ledger_id: ledger.id,
        ledger_name: ledger.name.clone(),
        from,
        to,
        rows,
        closing_balance: balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn running_balance_replays_opening_then_entries() {
        let cash = Ledger::new(1, "Cash", "Current Assets")
            .with_opening_balance(BigDecimal::from(1000));

        let mut receipt = Voucher::new(1, VoucherType::Receipt, "R-1", date(2), "cash in");
        receipt.add_entry(Entry::debit(1, BigDecimal::from(500)));
        receipt.add_entry(Entry::credit(2, BigDecimal::from(500)));

        let mut payment = Voucher::new(2, VoucherType::Payment, "P-1", date(3), "cash out");
        payment.add_entry(Entry::credit(1, BigDecimal::from(300)));
        payment.add_entry(Entry::debit(3, BigDecimal::from(300)));

        let statement = ledger_statement(&cash, &[receipt, payment], date(1), date(31));
        assert_eq!(statement.rows.len(), 3);

        assert_eq!(statement.rows[0].balance, BigDecimal::from(1000));
        assert_eq!(statement.rows[0].balance_side, EntrySide::Debit);

        assert_eq!(statement.rows[1].debit, BigDecimal::from(500));
        assert_eq!(statement.rows[1].balance, BigDecimal::from(1500));

        assert_eq!(statement.rows[2].credit, BigDecimal::from(300));
        assert_eq!(statement.rows[2].balance, BigDecimal::from(1200));
        assert_eq!(statement.closing_balance, BigDecimal::from(1200));
    }

    #[test]
    fn vouchers_are_replayed_in_date_order() {
        let cash = Ledger::new(1, "Cash", "Current Assets");

        let mut later = Voucher::new(1, VoucherType::Receipt, "R-2", date(10), "second");
        later.add_entry(Entry::debit(1, BigDecimal::from(100)));
        later.add_entry(Entry::credit(2, BigDecimal::from(100)));

        let mut earlier = Voucher::new(2, VoucherType::Receipt, "R-1", date(5), "first");
        earlier.add_entry(Entry::debit(1, BigDecimal::from(50)));
        earlier.add_entry(Entry::credit(2, BigDecimal::from(50)));

        // Listed out of order on purpose.
        let statement = ledger_statement(&cash, &[later, earlier], date(1), date(31));
        assert_eq!(statement.rows[1].particulars, "first");
        assert_eq!(statement.rows[2].particulars, "second");
    }

    #[test]
    fn credit_heavy_ledger_shows_credit_balance() {
        let sales = Ledger::new(2, "Sales", "Income");
        let mut sale = Voucher::new(1, VoucherType::Sales, "S-1", date(4), "sold");
        sale.add_entry(Entry::debit(1, BigDecimal::from(750)));
        sale.add_entry(Entry::credit(2, BigDecimal::from(750)));

        let statement = ledger_statement(&sales, &[sale], date(1), date(31));
        let last = statement.rows.last().unwrap();
        assert_eq!(last.balance, BigDecimal::from(750));
        assert_eq!(last.balance_side, EntrySide::Credit);
        assert_eq!(statement.closing_balance, BigDecimal::from(-750));
    }

    #[test]
    fn out_of_range_vouchers_are_excluded() {
        let cash = Ledger::new(1, "Cash", "Current Assets");
        let mut v = Voucher::new(1, VoucherType::Receipt, "R-1", date(20), "late");
        v.add_entry(Entry::debit(1, BigDecimal::from(100)));
        v.add_entry(Entry::credit(2, BigDecimal::from(100)));

        let statement = ledger_statement(&cash, &[v], date(1), date(10));
        assert_eq!(statement.rows.len(), 1); // opening row only
    }
}
