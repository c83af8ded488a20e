//! Report derivations over the ledger and voucher stores
//!
//! Every report is a pure function of its inputs: the trial balance is
//! derived from ledgers plus vouchers, and the other reports are filters and
//! folds over the trial balance or the raw voucher list. Nothing in this
//! module mutates a store.

pub mod day_book;
pub mod financial;
pub mod statement;
pub mod trial_balance;

pub use day_book::*;
pub use financial::*;
pub use statement::*;
pub use trial_balance::*;
