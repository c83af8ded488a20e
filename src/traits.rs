//! Store traits for repository abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::*;

/// Chart-of-accounts repository.
///
/// `get_ledger` on a missing id fails fast with [`BookError::NotFound`]
/// rather than returning `None`, so aggregation folds never have to deal
/// with silently absent ledgers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a new ledger; the store assigns the id.
    async fn create_ledger(&mut self, ledger: Ledger) -> BookResult<Ledger>;

    async fn get_ledger(&self, id: u32) -> BookResult<Ledger>;

    async fn get_ledgers(&self) -> BookResult<Vec<Ledger>>;

    async fn update_ledger(&mut self, id: u32, ledger: Ledger) -> BookResult<Ledger>;

    /// Remove a ledger, returning the removed record.
    async fn delete_ledger(&mut self, id: u32) -> BookResult<Ledger>;
}

/// Voucher repository.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Persist a new voucher; the store assigns the id.
    async fn create_voucher(&mut self, voucher: Voucher) -> BookResult<Voucher>;

    async fn get_voucher(&self, id: u32) -> BookResult<Voucher>;

    async fn get_vouchers(&self) -> BookResult<Vec<Voucher>>;

    async fn update_voucher(&mut self, id: u32, voucher: Voucher) -> BookResult<Voucher>;

    async fn delete_voucher(&mut self, id: u32) -> BookResult<Voucher>;

    /// Vouchers within `[from, to]` (inclusive calendar dates) that carry at
    /// least one entry against the given ledger.
    async fn vouchers_by_ledger_and_date(
        &self,
        ledger_id: u32,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BookResult<Vec<Voucher>>;

    /// Vouchers within `[from, to]`, inclusive on both ends.
    async fn vouchers_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BookResult<Vec<Voucher>>;
}

/// Group repository.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn create_group(&mut self, group: Group) -> BookResult<Group>;

    async fn get_group(&self, id: u32) -> BookResult<Group>;

    async fn get_groups(&self) -> BookResult<Vec<Group>>;

    async fn update_group(&mut self, id: u32, group: Group) -> BookResult<Group>;

    async fn delete_group(&mut self, id: u32) -> BookResult<Group>;
}

/// Currency repository. Codes are unique; inserting or renaming to an
/// existing code fails with [`BookError::DuplicateKey`].
#[async_trait]
pub trait CurrencyStore: Send + Sync {
    async fn create_currency(&mut self, currency: Currency) -> BookResult<Currency>;

    async fn get_currency(&self, id: u32) -> BookResult<Currency>;

    async fn get_currency_by_code(&self, code: &str) -> BookResult<Currency>;

    async fn get_currencies(&self) -> BookResult<Vec<Currency>>;

    async fn update_currency(&mut self, id: u32, currency: Currency) -> BookResult<Currency>;

    /// The base currency cannot be deleted.
    async fn delete_currency(&mut self, id: u32) -> BookResult<Currency>;

    /// Make the given currency the base currency, clearing the previous one.
    async fn set_base_currency(&mut self, id: u32) -> BookResult<Currency>;
}

/// Custom field definition repository.
#[async_trait]
pub trait CustomFieldStore: Send + Sync {
    async fn create_custom_field(&mut self, field: CustomField) -> BookResult<CustomField>;

    async fn get_custom_field(&self, id: u32) -> BookResult<CustomField>;

    async fn get_custom_fields(&self) -> BookResult<Vec<CustomField>>;

    /// Fields applying to the given entity type, including `"all"` fields.
    async fn custom_fields_for_entity(&self, entity_type: &str) -> BookResult<Vec<CustomField>>;

    async fn update_custom_field(&mut self, id: u32, field: CustomField) -> BookResult<CustomField>;

    async fn delete_custom_field(&mut self, id: u32) -> BookResult<CustomField>;
}

/// Bank statement line repository.
#[async_trait]
pub trait StatementStore: Send + Sync {
    async fn create_statement(&mut self, line: BankStatementLine) -> BookResult<BankStatementLine>;

    async fn get_statement(&self, id: u32) -> BookResult<BankStatementLine>;

    async fn get_statements(&self) -> BookResult<Vec<BankStatementLine>>;

    async fn update_statement(
        &mut self,
        id: u32,
        line: BankStatementLine,
    ) -> BookResult<BankStatementLine>;

    async fn delete_statement(&mut self, id: u32) -> BookResult<BankStatementLine>;

    /// Update only the match state of a statement line.
    async fn set_match_state(
        &mut self,
        id: u32,
        status: MatchStatus,
        matched_voucher_id: Option<u32>,
    ) -> BookResult<BankStatementLine>;
}

/// Append-only audit log.
///
/// The trait deliberately exposes no update or delete: past entries are
/// immutable and ids are allocated from a monotonic counter.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(
        &mut self,
        entity_type: &str,
        entity_id: u32,
        operation: AuditOperation,
        changes: Option<serde_json::Value>,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
    ) -> BookResult<AuditEntry>;

    /// All entries, newest first.
    async fn audit_entries(&self) -> BookResult<Vec<AuditEntry>>;

    /// Entries for one entity type, optionally narrowed to a single entity,
    /// newest first.
    async fn audit_for_entity(
        &self,
        entity_type: &str,
        entity_id: Option<u32>,
    ) -> BookResult<Vec<AuditEntry>>;
}

/// Combined backend used by the [`Books`](crate::books::Books) orchestrator.
pub trait Backend:
    LedgerStore
    + VoucherStore
    + GroupStore
    + CurrencyStore
    + CustomFieldStore
    + StatementStore
    + AuditStore
{
}

impl<T> Backend for T where
    T: LedgerStore
        + VoucherStore
        + GroupStore
        + CurrencyStore
        + CustomFieldStore
        + StatementStore
        + AuditStore
{
}

/// Custom ledger validation hook.
pub trait LedgerValidator: Send + Sync {
    fn validate_ledger(&self, ledger: &Ledger) -> BookResult<()>;
}

/// Custom voucher validation hook, run before a voucher is persisted.
pub trait VoucherValidator: Send + Sync {
    fn validate_voucher(&self, voucher: &Voucher) -> BookResult<()>;
}

/// Default ledger validator with basic rules.
pub struct DefaultLedgerValidator;

impl LedgerValidator for DefaultLedgerValidator {
    fn validate_ledger(&self, ledger: &Ledger) -> BookResult<()> {
        if ledger.name.trim().is_empty() {
            return Err(BookError::Validation(
                "ledger name cannot be empty".to_string(),
            ));
        }
        if ledger.group.trim().is_empty() {
            return Err(BookError::Validation(
                "ledger must belong to a group".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default voucher validator: the double-entry pre-commit gate.
pub struct DefaultVoucherValidator;

impl VoucherValidator for DefaultVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher) -> BookResult<()> {
        voucher.validate()
    }
}
