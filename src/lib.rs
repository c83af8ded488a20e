//! # ledgerbook-core
//!
//! A double-entry bookkeeping core: chart of accounts, balanced vouchers,
//! derived reports and bank statement reconciliation.
//!
//! ## Features
//!
//! - **Ledgers and groups**: a chart of accounts where every ledger belongs
//!   to a group with an explicit nature (assets, liabilities, income,
//!   expenses)
//! - **Vouchers**: transactions validated to balance before they are
//!   accepted; an unbalanced voucher never reaches the store
//! - **Reports**: trial balance, profit & loss, balance sheet, ledger
//!   statement and day book, all computed fresh from stored vouchers
//! - **Reconciliation**: CSV/XLSX statement import and a weighted matcher
//!   that proposes voucher matches for human confirmation
//! - **Audit log**: an append-only record of every mutation
//! - **Pluggable storage**: store traits with an in-memory implementation
//!
//! ## Quick start
//!
//! ```rust
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//! use ledgerbook_core::{Books, Entry, Ledger, MemoryStore, Voucher, VoucherType};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut books = Books::new(MemoryStore::new());
//!
//! let cash = books.create_ledger(Ledger::new(0, "Cash", "Current Assets")).await?;
//! let sales = books.create_ledger(Ledger::new(0, "Sales", "Income")).await?;
//!
//! let mut voucher = Voucher::new(
//!     0,
//!     VoucherType::Sales,
//!     "INV-001",
//!     NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
//!     "Cash sale",
//! );
//! voucher.add_entry(Entry::debit(cash.id, BigDecimal::from(1000)));
//! voucher.add_entry(Entry::credit(sales.id, BigDecimal::from(1000)));
//! books.post_voucher(voucher).await?;
//!
//! let rows = books.trial_balance().await?;
//! assert_eq!(rows.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod books;
pub mod reconcile;
pub mod reports;
pub mod store;
pub mod traits;
pub mod types;
pub mod utils;

pub use books::{AnalyticsSummary, Books};
pub use reconcile::{
    parse_csv, parse_statement_file, parse_xlsx, propose_matches, MatchProposal,
    ParsedStatementLine, MATCH_THRESHOLD,
};
pub use reports::{
    balance_sheet, day_book, ledger_statement, profit_and_loss, trial_balance, BalanceSheet,
    DayBookRow, LedgerStatement, ProfitAndLoss, ReportWarning, StatementRow,
};
pub use store::MemoryStore;
pub use traits::{
    AuditStore, Backend, CurrencyStore, CustomFieldStore, DefaultLedgerValidator,
    DefaultVoucherValidator, GroupStore, LedgerStore, LedgerValidator, StatementStore,
    VoucherStore, VoucherValidator,
};
pub use types::{
    balance_epsilon, AuditEntry, AuditOperation, BankStatementLine, BookError, BookResult,
    Currency, CustomField, Entry, EntrySide, FieldRule, FieldType, Group, GroupNature, GstDetails,
    Ledger, MatchStatus, StockDetails, TrialBalanceRow, Voucher, VoucherStatus, VoucherType,
};
