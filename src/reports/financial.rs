//! Profit & loss and balance sheet derivations

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::types::*;

/// Consistency warning carried on a derived report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportWarning {
    /// Total assets and total liabilities disagree beyond the tolerance.
    BalanceSheetImbalance { difference: BigDecimal },
}

/// Profit & loss statement derived from the trial balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub income: Vec<TrialBalanceRow>,
    pub expenses: Vec<TrialBalanceRow>,
    pub total_income: BigDecimal,
    pub total_expenses: BigDecimal,
    pub net_profit: BigDecimal,
}

/// Balance sheet derived from the trial balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub assets: Vec<TrialBalanceRow>,
    pub liabilities: Vec<TrialBalanceRow>,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub is_balanced: bool,
    pub warning: Option<ReportWarning>,
}

fn nature_by_group<'a>(groups: &'a [Group]) -> HashMap<&'a str, GroupNature> {
    groups
        .iter()
        .map(|g| (g.name.as_str(), g.nature))
        .collect()
}

/// Partition trial-balance rows into income and expenses by group nature.
///
/// Income contributes `credit - debit`, expenses contribute `debit - credit`,
/// and `net_profit = total_income - total_expenses`. Rows whose group is not
/// in `groups`, or whose nature is Assets/Liabilities, do not appear.
pub fn profit_and_loss(rows: &[TrialBalanceRow], groups: &[Group]) -> ProfitAndLoss {
    let natures = nature_by_group(groups);
    let mut report = ProfitAndLoss {
        income: Vec::new(),
        expenses: Vec::new(),
        total_income: BigDecimal::from(0),
        total_expenses: BigDecimal::from(0),
        net_profit: BigDecimal::from(0),
    };

    for row in rows {
        match natures.get(row.group.as_str()) {
            Some(GroupNature::Income) => {
                report.total_income += &row.credit - &row.debit;
                report.income.push(row.clone());
            }
            Some(GroupNature::Expenses) => {
                report.total_expenses += &row.debit - &row.credit;
                report.expenses.push(row.clone());
            }
            _ => {}
        }
    }

    report.net_profit = &report.total_income - &report.total_expenses;
    report
}

/// Partition trial-balance rows into assets and liabilities by group nature.
///
/// Assets contribute `debit - credit`, liabilities (including capital
/// groups, which carry the Liabilities nature) contribute `credit - debit`.
/// When the two totals disagree beyond the balance tolerance the report
/// surfaces a [`ReportWarning::BalanceSheetImbalance`] rather than hiding
/// the discrepancy.
pub fn balance_sheet(rows: &[TrialBalanceRow], groups: &[Group]) -> BalanceSheet {
    let natures = nature_by_group(groups);
    let mut report = BalanceSheet {
        assets: Vec::new(),
        liabilities: Vec::new(),
        total_assets: BigDecimal::from(0),
        total_liabilities: BigDecimal::from(0),
        is_balanced: true,
        warning: None,
    };

    for row in rows {
        match natures.get(row.group.as_str()) {
            Some(GroupNature::Assets) => {
                report.total_assets += &row.debit - &row.credit;
                report.assets.push(row.clone());
            }
            Some(GroupNature::Liabilities) => {
                report.total_liabilities += &row.credit - &row.debit;
                report.liabilities.push(row.clone());
            }
            _ => {}
        }
    }

    let difference = (&report.total_assets - &report.total_liabilities).abs();
    if difference > balance_epsilon() {
        warn!(
            total_assets = %report.total_assets,
            total_liabilities = %report.total_liabilities,
            "balance sheet does not balance"
        );
        report.is_balanced = false;
        report.warning = Some(ReportWarning::BalanceSheetImbalance { difference });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<Group> {
        vec![
            Group::new(1, "Current Assets", GroupNature::Assets),
            Group::new(2, "Capital", GroupNature::Liabilities),
            Group::new(3, "Income", GroupNature::Income),
            Group::new(4, "Expenses", GroupNature::Expenses),
        ]
    }

    fn row(id: u32, group: &str, debit: i64, credit: i64) -> TrialBalanceRow {
        TrialBalanceRow {
            ledger_id: id,
            name: format!("L{id}"),
            group: group.to_string(),
            debit: BigDecimal::from(debit),
            credit: BigDecimal::from(credit),
        }
    }

    #[test]
    fn net_profit_is_income_minus_expenses() {
        let rows = vec![
            row(1, "Income", 0, 1500),
            row(2, "Expenses", 600, 0),
            row(3, "Current Assets", 900, 0),
        ];
        let pnl = profit_and_loss(&rows, &groups());
        assert_eq!(pnl.total_income, BigDecimal::from(1500));
        assert_eq!(pnl.total_expenses, BigDecimal::from(600));
        assert_eq!(pnl.net_profit, BigDecimal::from(900));
        assert_eq!(pnl.income.len(), 1);
        assert_eq!(pnl.expenses.len(), 1);
    }

    #[test]
    fn balanced_sheet_carries_no_warning() {
        let rows = vec![
            row(1, "Current Assets", 1000, 0),
            row(2, "Capital", 0, 1000),
        ];
        let sheet = balance_sheet(&rows, &groups());
        assert!(sheet.is_balanced);
        assert!(sheet.warning.is_none());
        assert_eq!(sheet.total_assets, sheet.total_liabilities);
    }

    #[test]
    fn imbalance_is_surfaced_not_hidden() {
        let rows = vec![
            row(1, "Current Assets", 1000, 0),
            row(2, "Capital", 0, 900),
        ];
        let sheet = balance_sheet(&rows, &groups());
        assert!(!sheet.is_balanced);
        assert_eq!(
            sheet.warning,
            Some(ReportWarning::BalanceSheetImbalance {
                difference: BigDecimal::from(100)
            })
        );
    }

    #[test]
    fn rows_with_unknown_groups_are_ignored() {
        let rows = vec![row(1, "Suspense", 100, 0)];
        let pnl = profit_and_loss(&rows, &groups());
        assert!(pnl.income.is_empty() && pnl.expenses.is_empty());
        let sheet = balance_sheet(&rows, &groups());
        assert!(sheet.assets.is_empty() && sheet.liabilities.is_empty());
    }
}
