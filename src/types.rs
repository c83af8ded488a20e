//! Core types and data structures for the bookkeeping system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Balance comparison tolerance used throughout the crate.
///
/// Debit/credit totals are considered equal when they differ by at most
/// 0.01 in the ledger currency.
pub fn balance_epsilon() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Classification of a ledger group.
///
/// The nature is an explicit field set when the group is created; reports
/// partition trial-balance rows by it. It is never inferred from the group
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupNature {
    Assets,
    Liabilities,
    Income,
    Expenses,
}

/// Classification bucket for ledgers, optionally nested under a parent group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: u32,
    pub name: String,
    pub nature: GroupNature,
    /// Parent group id, if this group nests under another.
    pub parent: Option<u32>,
}

impl Group {
    pub fn new(id: u32, name: impl Into<String>, nature: GroupNature) -> Self {
        Self {
            id,
            name: name.into(),
            nature,
            parent: None,
        }
    }
}

/// An account in the chart of accounts.
///
/// A ledger carries only its opening balance. The current balance is a pure
/// projection over posted vouchers (see `Books::ledger_balance`), so there is
/// no cached balance field to drift out of sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub id: u32,
    pub name: String,
    /// Name of the group this ledger belongs to.
    pub group: String,
    pub currency: String,
    /// Opening balance; positive is a debit balance, negative a credit balance.
    pub opening_balance: BigDecimal,
    pub gst_applicable: bool,
    pub custom_fields: HashMap<String, String>,
}

impl Ledger {
    pub fn new(id: u32, name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            group: group.into(),
            currency: "INR".to_string(),
            opening_balance: BigDecimal::from(0),
            gst_applicable: false,
            custom_fields: HashMap::new(),
        }
    }

    pub fn with_opening_balance(mut self, opening_balance: BigDecimal) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    pub fn with_gst_applicable(mut self) -> Self {
        self.gst_applicable = true;
        self
    }
}

/// GST breakdown attached to a voucher.
///
/// Intra-state tax splits evenly into CGST and SGST; inter-state tax goes
/// entirely to IGST. Either way `total_tax` is the sum of the three parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstDetails {
    pub cgst: BigDecimal,
    pub sgst: BigDecimal,
    pub igst: BigDecimal,
    pub total_tax: BigDecimal,
}

impl GstDetails {
    /// Intra-state GST: the rate splits half-and-half into CGST and SGST.
    pub fn intra_state(taxable_amount: &BigDecimal, rate: &BigDecimal) -> Self {
        let half = (taxable_amount * rate) / BigDecimal::from(200);
        Self {
            cgst: half.clone(),
            sgst: half.clone(),
            igst: BigDecimal::from(0),
            total_tax: half.clone() + half,
        }
    }

    /// Inter-state GST: the full rate lands on IGST.
    pub fn inter_state(taxable_amount: &BigDecimal, rate: &BigDecimal) -> Self {
        let igst = (taxable_amount * rate) / BigDecimal::from(100);
        Self {
            cgst: BigDecimal::from(0),
            sgst: BigDecimal::from(0),
            igst: igst.clone(),
            total_tax: igst,
        }
    }
}

/// Stock movement attached to a voucher entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDetails {
    pub item: String,
    pub quantity: BigDecimal,
    pub rate: BigDecimal,
}

/// Side of a voucher entry in double-entry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntrySide {
    Debit,
    Credit,
}

/// One debit or credit line within a voucher.
///
/// Entries are exclusively owned by their parent voucher and reference a
/// ledger only by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub ledger_id: u32,
    pub side: EntrySide,
    pub amount: BigDecimal,
    pub stock_details: Option<StockDetails>,
}

impl Entry {
    pub fn debit(ledger_id: u32, amount: BigDecimal) -> Self {
        Self {
            ledger_id,
            side: EntrySide::Debit,
            amount,
            stock_details: None,
        }
    }

    pub fn credit(ledger_id: u32, amount: BigDecimal) -> Self {
        Self {
            ledger_id,
            side: EntrySide::Credit,
            amount,
            stock_details: None,
        }
    }

    pub fn with_stock(mut self, stock_details: StockDetails) -> Self {
        self.stock_details = Some(stock_details);
        self
    }
}

/// Kind of transaction a voucher records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherType {
    Sales,
    Purchase,
    Payment,
    Receipt,
    Contra,
    Journal,
}

/// Lifecycle state of a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Draft,
    Posted,
    Cancelled,
}

/// A transaction record composed of balanced debit/credit entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: u32,
    pub voucher_type: VoucherType,
    /// Human-facing voucher number (e.g. invoice or receipt number).
    pub number: String,
    pub date: NaiveDate,
    pub narration: String,
    pub entries: Vec<Entry>,
    pub gst_details: Option<GstDetails>,
    pub status: VoucherStatus,
    pub custom_fields: HashMap<String, String>,
}

impl Voucher {
    pub fn new(
        id: u32,
        voucher_type: VoucherType,
        number: impl Into<String>,
        date: NaiveDate,
        narration: impl Into<String>,
    ) -> Self {
        Self {
            id,
            voucher_type,
            number: number.into(),
            date,
            narration: narration.into(),
            entries: Vec::new(),
            gst_details: None,
            status: VoucherStatus::Draft,
            custom_fields: HashMap::new(),
        }
    }

    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Total of all debit entries.
    pub fn total_debits(&self) -> BigDecimal {
        self.entries
            .iter()
            .filter(|e| e.side == EntrySide::Debit)
            .map(|e| &e.amount)
            .sum()
    }

    /// Total of all credit entries.
    pub fn total_credits(&self) -> BigDecimal {
        self.entries
            .iter()
            .filter(|e| e.side == EntrySide::Credit)
            .map(|e| &e.amount)
            .sum()
    }

    /// Net debit-minus-credit total across all entries.
    pub fn net_amount(&self) -> BigDecimal {
        self.entries
            .iter()
            .fold(BigDecimal::from(0), |sum, e| match e.side {
                EntrySide::Debit => sum + &e.amount,
                EntrySide::Credit => sum - &e.amount,
            })
    }

    /// Whether debit and credit totals agree within the balance tolerance.
    pub fn is_balanced(&self) -> bool {
        (self.total_debits() - self.total_credits()).abs() <= balance_epsilon()
    }

    /// Pre-commit gate applied before a voucher is accepted into a store.
    ///
    /// Requires at least two entries, a ledger reference and positive amount
    /// on every entry, and debit/credit totals equal within the tolerance.
    pub fn validate(&self) -> BookResult<()> {
        if self.entries.len() < 2 {
            return Err(BookError::InvalidEntry(
                "voucher must have at least two entries".to_string(),
            ));
        }

        for entry in &self.entries {
            if entry.ledger_id == 0 {
                return Err(BookError::InvalidEntry(
                    "every entry must reference a ledger".to_string(),
                ));
            }
            if entry.amount <= BigDecimal::from(0) {
                return Err(BookError::InvalidEntry(
                    "entry amounts must be positive".to_string(),
                ));
            }
        }

        if !self.is_balanced() {
            return Err(BookError::VoucherImbalance {
                debits: self.total_debits(),
                credits: self.total_credits(),
            });
        }

        Ok(())
    }
}

/// A currency known to the system. Codes are unique and stored uppercase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub is_base: bool,
    pub is_active: bool,
}

impl Currency {
    pub fn new(id: u32, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into().to_uppercase(),
            name: name.into(),
            symbol: String::new(),
            is_base: false,
            is_active: true,
        }
    }
}

/// Data type of a custom field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Email,
    Date,
}

/// Validation rule attached to a custom field definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldRule {
    /// Minimum numeric value, or minimum text length.
    pub min: Option<f64>,
    /// Maximum numeric value, or maximum text length.
    pub max: Option<f64>,
    /// Regular expression a text value must match.
    pub pattern: Option<String>,
}

/// User-defined field attached to an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: u32,
    pub name: String,
    pub label: String,
    /// Entity the field applies to ("ledger", "voucher", ... or "all").
    pub entity_type: String,
    pub field_type: FieldType,
    pub required: bool,
    pub validation: Option<FieldRule>,
}

/// Match state of an imported bank statement line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Unmatched,
    Potential,
    Matched,
}

/// One line of an imported bank statement.
///
/// Created in a batch on import; afterwards only the matcher or a manual
/// confirm/reject changes `match_status` and `matched_voucher_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankStatementLine {
    pub id: u32,
    /// Bank ledger the statement was imported against.
    pub ledger_id: u32,
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount: credits to the bank account positive, debits negative.
    pub amount: BigDecimal,
    pub balance: BigDecimal,
    pub match_status: MatchStatus,
    pub matched_voucher_id: Option<u32>,
    pub import_date: NaiveDate,
}

/// Per-ledger debit/credit totals derived from opening balances plus all
/// posted entries. Computed fresh per report request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub ledger_id: u32,
    pub name: String,
    pub group: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

/// Operation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    Import,
    Match,
}

/// Append-only audit record. Past entries are never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: u64,
    pub entity_type: String,
    pub entity_id: u32,
    pub operation: AuditOperation,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: NaiveDateTime,
    pub changes: Option<serde_json::Value>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
}

/// Errors raised at the store and aggregator boundaries.
///
/// The variant carries the internal error kind; `Display` provides the
/// user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("voucher is not balanced: debits = {debits}, credits = {credits}")]
    VoucherImbalance {
        debits: BigDecimal,
        credits: BigDecimal,
    },
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
    #[error("duplicate {field}: '{value}' already exists")]
    DuplicateKey { field: &'static str, value: String },
    #[error("entry references unknown ledger {0}")]
    UnknownLedgerReference(u32),
    #[error("import parse error: {0}")]
    ImportParse(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl BookError {
    pub(crate) fn not_found(entity: &'static str, id: u32) -> Self {
        BookError::NotFound {
            entity,
            key: id.to_string(),
        }
    }
}

/// Result type for bookkeeping operations.
pub type BookResult<T> = Result<T, BookError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn voucher_with(debit: i64, credit: i64) -> Voucher {
        let mut v = Voucher::new(
            1,
            VoucherType::Journal,
            "J-1",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "test",
        );
        v.add_entry(Entry::debit(1, BigDecimal::from(debit)));
        v.add_entry(Entry::credit(2, BigDecimal::from(credit)));
        v
    }

    #[test]
    fn balanced_voucher_passes_validation() {
        assert!(voucher_with(100, 100).validate().is_ok());
    }

    #[test]
    fn imbalanced_voucher_fails_with_imbalance() {
        let err = voucher_with(100, 90).validate().unwrap_err();
        assert!(matches!(err, BookError::VoucherImbalance { .. }));
    }

    #[test]
    fn imbalance_within_epsilon_is_tolerated() {
        let mut v = Voucher::new(
            1,
            VoucherType::Journal,
            "J-1",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "rounding",
        );
        v.add_entry(Entry::debit(1, "100.00".parse().unwrap()));
        v.add_entry(Entry::credit(2, "99.99".parse().unwrap()));
        assert!(v.validate().is_ok());
    }

    #[test]
    fn single_entry_voucher_is_rejected() {
        let mut v = Voucher::new(
            1,
            VoucherType::Journal,
            "J-1",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "lonely",
        );
        v.add_entry(Entry::debit(1, BigDecimal::from(100)));
        assert!(matches!(
            v.validate().unwrap_err(),
            BookError::InvalidEntry(_)
        ));
    }

    #[test]
    fn zero_amount_entry_is_rejected() {
        let mut v = voucher_with(100, 100);
        v.add_entry(Entry::debit(3, BigDecimal::from(0)));
        assert!(matches!(
            v.validate().unwrap_err(),
            BookError::InvalidEntry(_)
        ));
    }

    #[test]
    fn intra_state_gst_splits_evenly_between_cgst_and_sgst() {
        let gst = GstDetails::intra_state(&BigDecimal::from(1000), &BigDecimal::from(18));
        assert_eq!(gst.cgst, BigDecimal::from(90));
        assert_eq!(gst.sgst, BigDecimal::from(90));
        assert_eq!(gst.igst, BigDecimal::from(0));
        assert_eq!(gst.total_tax, BigDecimal::from(180));
    }

    #[test]
    fn inter_state_gst_lands_entirely_on_igst() {
        let gst = GstDetails::inter_state(&BigDecimal::from(1000), &BigDecimal::from(18));
        assert_eq!(gst.cgst, BigDecimal::from(0));
        assert_eq!(gst.sgst, BigDecimal::from(0));
        assert_eq!(gst.igst, BigDecimal::from(180));
        assert_eq!(gst.total_tax, BigDecimal::from(180));
    }

    #[test]
    fn stock_details_travel_with_their_entry() {
        let entry = Entry::debit(1, BigDecimal::from(500)).with_stock(StockDetails {
            item: "Widgets".to_string(),
            quantity: BigDecimal::from(10),
            rate: BigDecimal::from(50),
        });
        let stock = entry.stock_details.as_ref().unwrap();
        assert_eq!(stock.item, "Widgets");
        assert_eq!(stock.quantity, BigDecimal::from(10));
    }

    #[test]
    fn net_amount_is_signed_debit_minus_credit() {
        let mut v = Voucher::new(
            1,
            VoucherType::Receipt,
            "R-1",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "net",
        );
        v.add_entry(Entry::debit(1, BigDecimal::from(500)));
        v.add_entry(Entry::credit(2, BigDecimal::from(200)));
        assert_eq!(v.net_amount(), BigDecimal::from(300));
    }
}
