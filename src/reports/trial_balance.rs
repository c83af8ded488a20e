//! Trial balance aggregation

use bigdecimal::BigDecimal;
use std::collections::HashMap;

use crate::types::*;

/// Derive the trial balance from the chart of accounts and the voucher list.
///
/// One row is seeded per ledger from its opening balance (positive into the
/// debit column, negative into the credit column), then every voucher entry
/// is folded in voucher-list order onto the row matching its side. Rows
/// where both columns are exactly zero are dropped. Output order is ledger
/// list order; callers needing a different order sort explicitly.
///
/// An entry referencing a ledger that is not in `ledgers` fails with
/// [`BookError::UnknownLedgerReference`] instead of being skipped, so a
/// dangling reference can never silently corrupt the totals.
pub fn trial_balance(ledgers: &[Ledger], vouchers: &[Voucher]) -> BookResult<Vec<TrialBalanceRow>> {
    let zero = BigDecimal::from(0);
    let mut rows: Vec<TrialBalanceRow> = Vec::with_capacity(ledgers.len());
    let mut index: HashMap<u32, usize> = HashMap::with_capacity(ledgers.len());

    for ledger in ledgers {
        let (debit, credit) = if ledger.opening_balance > zero {
            (ledger.opening_balance.clone(), zero.clone())
        } else if ledger.opening_balance < zero {
            (zero.clone(), ledger.opening_balance.abs())
        } else {
            (zero.clone(), zero.clone())
        };
        index.insert(ledger.id, rows.len());
        rows.push(TrialBalanceRow {
            ledger_id: ledger.id,
            name: ledger.name.clone(),
            group: ledger.group.clone(),
            debit,
            credit,
        });
    }

    for voucher in vouchers {
        for entry in &voucher.entries {
            let row = match index.get(&entry.ledger_id) {
                Some(&i) => &mut rows[i],
                None => return Err(BookError::UnknownLedgerReference(entry.ledger_id)),
            };
            match entry.side {
                EntrySide::Debit => row.debit += &entry.amount,
                EntrySide::Credit => row.credit += &entry.amount,
            }
        }
    }

    Ok(rows
        .into_iter()
        .filter(|row| row.debit != zero || row.credit != zero)
        .collect())
}

/// Sum of the debit column across all rows.
pub fn total_debits(rows: &[TrialBalanceRow]) -> BigDecimal {
    rows.iter().map(|r| &r.debit).sum()
}

/// Sum of the credit column across all rows.
pub fn total_credits(rows: &[TrialBalanceRow]) -> BigDecimal {
    rows.iter().map(|r| &r.credit).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn fixture() -> (Vec<Ledger>, Vec<Voucher>) {
        let ledgers = vec![
            Ledger::new(1, "Cash", "Current Assets")
                .with_opening_balance(BigDecimal::from(1000)),
            Ledger::new(2, "Sales", "Income"),
            Ledger::new(3, "Loan", "Current Liabilities")
                .with_opening_balance(BigDecimal::from(-500)),
            Ledger::new(4, "Dormant", "Current Assets"),
        ];
        let mut sale = Voucher::new(1, VoucherType::Sales, "S-1", date(5), "goods sold");
        sale.add_entry(Entry::debit(1, BigDecimal::from(200)));
        sale.add_entry(Entry::credit(2, BigDecimal::from(200)));
        (ledgers, vec![sale])
    }

    #[test]
    fn opening_balances_seed_the_correct_columns() {
        let (ledgers, _) = fixture();
        let rows = trial_balance(&ledgers, &[]).unwrap();
        assert_eq!(rows[0].debit, BigDecimal::from(1000));
        assert_eq!(rows[0].credit, BigDecimal::from(0));
        assert_eq!(rows[1].credit, BigDecimal::from(500));
    }

    #[test]
    fn entries_fold_onto_their_side() {
        let (ledgers, vouchers) = fixture();
        let rows = trial_balance(&ledgers, &vouchers).unwrap();
        let cash = rows.iter().find(|r| r.ledger_id == 1).unwrap();
        let sales = rows.iter().find(|r| r.ledger_id == 2).unwrap();
        assert_eq!(cash.debit, BigDecimal::from(1200));
        assert_eq!(sales.credit, BigDecimal::from(200));
    }

    #[test]
    fn all_zero_rows_are_dropped() {
        let (ledgers, vouchers) = fixture();
        let rows = trial_balance(&ledgers, &vouchers).unwrap();
        assert!(rows.iter().all(|r| r.ledger_id != 4));
    }

    #[test]
    fn totals_balance_when_every_voucher_balances() {
        let (ledgers, vouchers) = fixture();
        let rows = trial_balance(&ledgers, &vouchers).unwrap();
        // 1000 dr opening vs 500 cr opening leaves an intentional 500 gap
        // from the fixture's one-sided openings; the voucher contributes
        // equally to both columns.
        let gap = total_debits(&rows) - total_credits(&rows);
        assert_eq!(gap, BigDecimal::from(500));
    }

    #[test]
    fn unknown_ledger_reference_fails_loudly() {
        let (ledgers, _) = fixture();
        let mut v = Voucher::new(9, VoucherType::Journal, "J-9", date(2), "bad ref");
        v.add_entry(Entry::debit(99, BigDecimal::from(10)));
        v.add_entry(Entry::credit(1, BigDecimal::from(10)));
        let err = trial_balance(&ledgers, &[v]).unwrap_err();
        assert!(matches!(err, BookError::UnknownLedgerReference(99)));
    }

    #[test]
    fn aggregation_is_pure() {
        let (ledgers, vouchers) = fixture();
        let first = trial_balance(&ledgers, &vouchers).unwrap();
        let second = trial_balance(&ledgers, &vouchers).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn output_preserves_ledger_list_order() {
        let (ledgers, vouchers) = fixture();
        let rows = trial_balance(&ledgers, &vouchers).unwrap();
        let ids: Vec<u32> = rows.iter().map(|r| r.ledger_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
