//! High-level bookkeeping orchestrator
//!
//! [`Books`] ties a storage backend to the validation, reporting and
//! reconciliation layers. All mutations go through it so that validation
//! runs before anything is persisted and every change lands in the audit
//! log.

use std::collections::{BTreeMap, HashMap};

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::reconcile::{propose_matches, MatchProposal, ParsedStatementLine};
use crate::reports::{
    balance_sheet, day_book, ledger_statement, profit_and_loss, trial_balance, BalanceSheet,
    DayBookRow, LedgerStatement, ProfitAndLoss,
};
use crate::traits::*;
use crate::types::*;
use crate::utils::validate_field_values;

/// Voucher totals and counts over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    /// Sum of total debits of sales and receipt vouchers.
    pub revenue: BigDecimal,
    /// Sum of total debits of purchase and payment vouchers.
    pub expenses: BigDecimal,
    pub net: BigDecimal,
    pub voucher_counts: HashMap<VoucherType, usize>,
    pub total_vouchers: usize,
}

/// The main entry point for bookkeeping operations.
///
/// Generic over a [`Backend`] so the same orchestration works against the
/// in-memory store or any other persistence layer.
pub struct Books<S: Backend> {
    store: S,
    ledger_validator: Box<dyn LedgerValidator>,
    voucher_validator: Box<dyn VoucherValidator>,
}

impl<S: Backend> Books<S> {
    /// Create a book set with the default validators.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ledger_validator: Box::new(DefaultLedgerValidator),
            voucher_validator: Box::new(DefaultVoucherValidator),
        }
    }

    /// Create a book set with custom validation hooks.
    pub fn with_validators(
        store: S,
        ledger_validator: Box<dyn LedgerValidator>,
        voucher_validator: Box<dyn VoucherValidator>,
    ) -> Self {
        Self {
            store,
            ledger_validator,
            voucher_validator,
        }
    }

    /// Direct access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- ledgers ----

    pub async fn create_ledger(&mut self, ledger: Ledger) -> BookResult<Ledger> {
        self.ledger_validator.validate_ledger(&ledger)?;
        self.check_custom_fields("ledger", &ledger.custom_fields)
            .await?;
        let created = self.store.create_ledger(ledger).await?;
        info!(ledger_id = created.id, name = %created.name, "ledger created");
        self.store
            .append_audit(
                "ledger",
                created.id,
                AuditOperation::Create,
                None,
                None,
                Some(to_json(&created)?),
            )
            .await?;
        Ok(created)
    }

    pub async fn get_ledger(&self, id: u32) -> BookResult<Ledger> {
        self.store.get_ledger(id).await
    }

    pub async fn get_ledgers(&self) -> BookResult<Vec<Ledger>> {
        self.store.get_ledgers().await
    }

    pub async fn update_ledger(&mut self, id: u32, ledger: Ledger) -> BookResult<Ledger> {
        self.ledger_validator.validate_ledger(&ledger)?;
        self.check_custom_fields("ledger", &ledger.custom_fields)
            .await?;
        let old = self.store.get_ledger(id).await?;
        let updated = self.store.update_ledger(id, ledger).await?;
        let old_json = to_json(&old)?;
        let new_json = to_json(&updated)?;
        self.store
            .append_audit(
                "ledger",
                id,
                AuditOperation::Update,
                diff_values(&old_json, &new_json),
                Some(old_json),
                Some(new_json),
            )
            .await?;
        Ok(updated)
    }

    /// Remove a ledger.
    ///
    /// A ledger referenced by any stored voucher cannot be deleted: every
    /// entry must keep a known ledger id, otherwise the trial balance and
    /// everything derived from it would fail on the dangling reference.
    pub async fn delete_ledger(&mut self, id: u32) -> BookResult<Ledger> {
        let referenced = self
            .store
            .get_vouchers()
            .await?
            .iter()
            .any(|v| v.entries.iter().any(|e| e.ledger_id == id));
        if referenced {
            return Err(BookError::Validation(format!(
                "ledger {id} is referenced by existing vouchers"
            )));
        }
        let removed = self.store.delete_ledger(id).await?;
        self.store
            .append_audit(
                "ledger",
                id,
                AuditOperation::Delete,
                None,
                Some(to_json(&removed)?),
                None,
            )
            .await?;
        Ok(removed)
    }

    /// Current balance of a ledger: opening balance plus the net of every
    /// posted entry against it. Computed fresh on each call, never cached.
    pub async fn ledger_balance(&self, id: u32) -> BookResult<BigDecimal> {
        let ledger = self.store.get_ledger(id).await?;
        let mut balance = ledger.opening_balance;
        for voucher in self.active_vouchers().await? {
            for entry in voucher.entries.iter().filter(|e| e.ledger_id == id) {
                match entry.side {
                    EntrySide::Debit => balance += &entry.amount,
                    EntrySide::Credit => balance -= &entry.amount,
                }
            }
        }
        Ok(balance)
    }

    // ---- groups ----

    pub async fn create_group(&mut self, group: Group) -> BookResult<Group> {
        if group.name.trim().is_empty() {
            return Err(BookError::Validation(
                "group name cannot be empty".to_string(),
            ));
        }
        let created = self.store.create_group(group).await?;
        self.store
            .append_audit(
                "group",
                created.id,
                AuditOperation::Create,
                None,
                None,
                Some(to_json(&created)?),
            )
            .await?;
        Ok(created)
    }

    pub async fn get_groups(&self) -> BookResult<Vec<Group>> {
        self.store.get_groups().await
    }

    pub async fn update_group(&mut self, id: u32, group: Group) -> BookResult<Group> {
        let old = self.store.get_group(id).await?;
        let updated = self.store.update_group(id, group).await?;
        let old_json = to_json(&old)?;
        let new_json = to_json(&updated)?;
        self.store
            .append_audit(
                "group",
                id,
                AuditOperation::Update,
                diff_values(&old_json, &new_json),
                Some(old_json),
                Some(new_json),
            )
            .await?;
        Ok(updated)
    }

    pub async fn delete_group(&mut self, id: u32) -> BookResult<Group> {
        let removed = self.store.delete_group(id).await?;
        self.store
            .append_audit(
                "group",
                id,
                AuditOperation::Delete,
                None,
                Some(to_json(&removed)?),
                None,
            )
            .await?;
        Ok(removed)
    }

    // ---- vouchers ----

    /// Validate and persist a voucher, marking it posted.
    ///
    /// Every entry must reference an existing ledger; an unknown reference
    /// rejects the whole voucher rather than silently contributing zero to
    /// later reports.
    pub async fn post_voucher(&mut self, mut voucher: Voucher) -> BookResult<Voucher> {
        self.voucher_validator.validate_voucher(&voucher)?;
        self.check_custom_fields("voucher", &voucher.custom_fields)
            .await?;
        for entry in &voucher.entries {
            if self.store.get_ledger(entry.ledger_id).await.is_err() {
                return Err(BookError::UnknownLedgerReference(entry.ledger_id));
            }
        }
        voucher.status = VoucherStatus::Posted;
        let created = self.store.create_voucher(voucher).await?;
        info!(
            voucher_id = created.id,
            number = %created.number,
            "voucher posted"
        );
        self.store
            .append_audit(
                "voucher",
                created.id,
                AuditOperation::Create,
                None,
                None,
                Some(to_json(&created)?),
            )
            .await?;
        Ok(created)
    }

    pub async fn get_voucher(&self, id: u32) -> BookResult<Voucher> {
        self.store.get_voucher(id).await
    }

    pub async fn get_vouchers(&self) -> BookResult<Vec<Voucher>> {
        self.store.get_vouchers().await
    }

    pub async fn update_voucher(&mut self, id: u32, voucher: Voucher) -> BookResult<Voucher> {
        self.voucher_validator.validate_voucher(&voucher)?;
        self.check_custom_fields("voucher", &voucher.custom_fields)
            .await?;
        for entry in &voucher.entries {
            if self.store.get_ledger(entry.ledger_id).await.is_err() {
                return Err(BookError::UnknownLedgerReference(entry.ledger_id));
            }
        }
        let old = self.store.get_voucher(id).await?;
        let updated = self.store.update_voucher(id, voucher).await?;
        let old_json = to_json(&old)?;
        let new_json = to_json(&updated)?;
        self.store
            .append_audit(
                "voucher",
                id,
                AuditOperation::Update,
                diff_values(&old_json, &new_json),
                Some(old_json),
                Some(new_json),
            )
            .await?;
        Ok(updated)
    }

    /// GST breakdown for a voucher at the given percentage rate.
    ///
    /// The taxable amount is the sum of debit entries against
    /// GST-applicable ledgers; other entries do not attract tax. Attach the
    /// result to `voucher.gst_details` before posting.
    pub async fn compute_gst(
        &self,
        voucher: &Voucher,
        rate: &BigDecimal,
        inter_state: bool,
    ) -> BookResult<GstDetails> {
        let mut taxable = BigDecimal::from(0);
        for entry in voucher.entries.iter().filter(|e| e.side == EntrySide::Debit) {
            let ledger = self.store.get_ledger(entry.ledger_id).await?;
            if ledger.gst_applicable {
                taxable += &entry.amount;
            }
        }
        Ok(if inter_state {
            GstDetails::inter_state(&taxable, rate)
        } else {
            GstDetails::intra_state(&taxable, rate)
        })
    }

    pub async fn delete_voucher(&mut self, id: u32) -> BookResult<Voucher> {
        let removed = self.store.delete_voucher(id).await?;
        self.store
            .append_audit(
                "voucher",
                id,
                AuditOperation::Delete,
                None,
                Some(to_json(&removed)?),
                None,
            )
            .await?;
        Ok(removed)
    }

    // ---- currencies ----

    pub async fn create_currency(&mut self, currency: Currency) -> BookResult<Currency> {
        let created = self.store.create_currency(currency).await?;
        self.store
            .append_audit(
                "currency",
                created.id,
                AuditOperation::Create,
                None,
                None,
                Some(to_json(&created)?),
            )
            .await?;
        Ok(created)
    }

    pub async fn get_currencies(&self) -> BookResult<Vec<Currency>> {
        self.store.get_currencies().await
    }

    pub async fn update_currency(&mut self, id: u32, currency: Currency) -> BookResult<Currency> {
        let old = self.store.get_currency(id).await?;
        let updated = self.store.update_currency(id, currency).await?;
        let old_json = to_json(&old)?;
        let new_json = to_json(&updated)?;
        self.store
            .append_audit(
                "currency",
                id,
                AuditOperation::Update,
                diff_values(&old_json, &new_json),
                Some(old_json),
                Some(new_json),
            )
            .await?;
        Ok(updated)
    }

    pub async fn delete_currency(&mut self, id: u32) -> BookResult<Currency> {
        let removed = self.store.delete_currency(id).await?;
        self.store
            .append_audit(
                "currency",
                id,
                AuditOperation::Delete,
                None,
                Some(to_json(&removed)?),
                None,
            )
            .await?;
        Ok(removed)
    }

    pub async fn set_base_currency(&mut self, id: u32) -> BookResult<Currency> {
        let updated = self.store.set_base_currency(id).await?;
        self.store
            .append_audit(
                "currency",
                id,
                AuditOperation::Update,
                Some(json!({ "is_base": { "from": false, "to": true } })),
                None,
                Some(to_json(&updated)?),
            )
            .await?;
        Ok(updated)
    }

    // ---- custom fields ----

    pub async fn create_custom_field(&mut self, field: CustomField) -> BookResult<CustomField> {
        let created = self.store.create_custom_field(field).await?;
        self.store
            .append_audit(
                "custom_field",
                created.id,
                AuditOperation::Create,
                None,
                None,
                Some(to_json(&created)?),
            )
            .await?;
        Ok(created)
    }

    pub async fn get_custom_fields(&self) -> BookResult<Vec<CustomField>> {
        self.store.get_custom_fields().await
    }

    pub async fn update_custom_field(
        &mut self,
        id: u32,
        field: CustomField,
    ) -> BookResult<CustomField> {
        let old = self.store.get_custom_field(id).await?;
        let updated = self.store.update_custom_field(id, field).await?;
        let old_json = to_json(&old)?;
        let new_json = to_json(&updated)?;
        self.store
            .append_audit(
                "custom_field",
                id,
                AuditOperation::Update,
                diff_values(&old_json, &new_json),
                Some(old_json),
                Some(new_json),
            )
            .await?;
        Ok(updated)
    }

    pub async fn delete_custom_field(&mut self, id: u32) -> BookResult<CustomField> {
        let removed = self.store.delete_custom_field(id).await?;
        self.store
            .append_audit(
                "custom_field",
                id,
                AuditOperation::Delete,
                None,
                Some(to_json(&removed)?),
                None,
            )
            .await?;
        Ok(removed)
    }

    // ---- reports ----

    pub async fn trial_balance(&self) -> BookResult<Vec<TrialBalanceRow>> {
        let ledgers = self.store.get_ledgers().await?;
        let vouchers = self.active_vouchers().await?;
        trial_balance(&ledgers, &vouchers)
    }

    pub async fn profit_and_loss(&self) -> BookResult<ProfitAndLoss> {
        let rows = self.trial_balance().await?;
        let groups = self.store.get_groups().await?;
        Ok(profit_and_loss(&rows, &groups))
    }

    pub async fn balance_sheet(&self) -> BookResult<BalanceSheet> {
        let rows = self.trial_balance().await?;
        let groups = self.store.get_groups().await?;
        Ok(balance_sheet(&rows, &groups))
    }

    pub async fn ledger_statement(
        &self,
        ledger_id: u32,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BookResult<LedgerStatement> {
        let ledger = self.store.get_ledger(ledger_id).await?;
        let vouchers: Vec<Voucher> = self
            .store
            .vouchers_by_ledger_and_date(ledger_id, from, to)
            .await?
            .into_iter()
            .filter(|v| v.status != VoucherStatus::Cancelled)
            .collect();
        Ok(ledger_statement(&ledger, &vouchers, from, to))
    }

    pub async fn day_book(&self, from: NaiveDate, to: NaiveDate) -> BookResult<Vec<DayBookRow>> {
        let vouchers: Vec<Voucher> = self
            .store
            .vouchers_by_date_range(from, to)
            .await?
            .into_iter()
            .filter(|v| v.status != VoucherStatus::Cancelled)
            .collect();
        Ok(day_book(&vouchers, from, to))
    }

    /// Revenue, expense and count totals over a date range.
    ///
    /// Each voucher is counted once at its total debit amount: sales and
    /// receipts as revenue, purchases and payments as expenses. Contra and
    /// journal vouchers appear in the counts but in neither total.
    pub async fn analytics_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BookResult<AnalyticsSummary> {
        let vouchers: Vec<Voucher> = self
            .store
            .vouchers_by_date_range(from, to)
            .await?
            .into_iter()
            .filter(|v| v.status != VoucherStatus::Cancelled)
            .collect();

        let mut summary = AnalyticsSummary {
            revenue: BigDecimal::from(0),
            expenses: BigDecimal::from(0),
            net: BigDecimal::from(0),
            voucher_counts: HashMap::new(),
            total_vouchers: vouchers.len(),
        };

        for voucher in &vouchers {
            *summary.voucher_counts.entry(voucher.voucher_type).or_insert(0) += 1;
            match voucher.voucher_type {
                VoucherType::Sales | VoucherType::Receipt => {
                    summary.revenue += voucher.total_debits();
                }
                VoucherType::Purchase | VoucherType::Payment => {
                    summary.expenses += voucher.total_debits();
                }
                VoucherType::Contra | VoucherType::Journal => {}
            }
        }

        summary.net = &summary.revenue - &summary.expenses;
        Ok(summary)
    }

    // ---- reconciliation ----

    /// Store parsed statement lines against a bank ledger, all unmatched.
    pub async fn import_statements(
        &mut self,
        ledger_id: u32,
        lines: Vec<ParsedStatementLine>,
    ) -> BookResult<Vec<BankStatementLine>> {
        // Fail before anything is written if the bank ledger is missing.
        self.store.get_ledger(ledger_id).await?;
        let import_date = chrono::Utc::now().date_naive();

        let mut created = Vec::with_capacity(lines.len());
        for line in lines {
            created.push(
                self.store
                    .create_statement(BankStatementLine {
                        id: 0,
                        ledger_id,
                        date: line.date,
                        description: line.description,
                        amount: line.amount,
                        balance: line.balance,
                        match_status: MatchStatus::Unmatched,
                        matched_voucher_id: None,
                        import_date,
                    })
                    .await?,
            );
        }

        info!(ledger_id, rows = created.len(), "bank statement imported");
        self.store
            .append_audit(
                "bank_statement",
                ledger_id,
                AuditOperation::Import,
                Some(json!({ "imported": created.len() })),
                None,
                None,
            )
            .await?;
        Ok(created)
    }

    pub async fn get_statements(&self) -> BookResult<Vec<BankStatementLine>> {
        self.store.get_statements().await
    }

    /// Run the matcher over unmatched statement lines and mark each
    /// proposal as a potential match. Returns the proposals keyed by
    /// statement id; confirming or rejecting them is a separate, explicit
    /// step.
    pub async fn find_matches(&mut self) -> BookResult<BTreeMap<u32, MatchProposal>> {
        let unmatched: Vec<BankStatementLine> = self
            .store
            .get_statements()
            .await?
            .into_iter()
            .filter(|s| s.match_status == MatchStatus::Unmatched)
            .collect();
        let vouchers = self.active_vouchers().await?;

        let proposals = propose_matches(&unmatched, &vouchers);
        for (statement_id, proposal) in &proposals {
            self.store
                .set_match_state(*statement_id, MatchStatus::Potential, Some(proposal.voucher_id))
                .await?;
        }
        debug!(proposals = proposals.len(), "match proposals recorded");
        Ok(proposals)
    }

    /// Accept a match, pinning the statement line to the voucher.
    pub async fn confirm_match(
        &mut self,
        statement_id: u32,
        voucher_id: u32,
    ) -> BookResult<BankStatementLine> {
        self.store.get_voucher(voucher_id).await?;
        let line = self
            .store
            .set_match_state(statement_id, MatchStatus::Matched, Some(voucher_id))
            .await?;
        self.store
            .append_audit(
                "bank_statement",
                statement_id,
                AuditOperation::Match,
                Some(json!({ "voucher_id": voucher_id })),
                None,
                None,
            )
            .await?;
        Ok(line)
    }

    /// Reject a proposal, returning the line to the unmatched pool.
    pub async fn reject_match(&mut self, statement_id: u32) -> BookResult<BankStatementLine> {
        self.store
            .set_match_state(statement_id, MatchStatus::Unmatched, None)
            .await
    }

    // ---- audit ----

    pub async fn audit_log(&self) -> BookResult<Vec<AuditEntry>> {
        self.store.audit_entries().await
    }

    pub async fn audit_for_entity(
        &self,
        entity_type: &str,
        entity_id: Option<u32>,
    ) -> BookResult<Vec<AuditEntry>> {
        self.store.audit_for_entity(entity_type, entity_id).await
    }

    // ---- internals ----

    async fn active_vouchers(&self) -> BookResult<Vec<Voucher>> {
        Ok(self
            .store
            .get_vouchers()
            .await?
            .into_iter()
            .filter(|v| v.status != VoucherStatus::Cancelled)
            .collect())
    }

    async fn check_custom_fields(
        &self,
        entity_type: &str,
        values: &HashMap<String, String>,
    ) -> BookResult<()> {
        let fields = self.store.custom_fields_for_entity(entity_type).await?;
        let errors = validate_field_values(&fields, values);
        if errors.is_empty() {
            return Ok(());
        }
        let mut messages: Vec<String> = errors.into_values().collect();
        messages.sort();
        Err(BookError::Validation(messages.join("; ")))
    }
}

fn to_json<T: Serialize>(value: &T) -> BookResult<Value> {
    serde_json::to_value(value).map_err(|e| BookError::Storage(e.to_string()))
}

/// Field-level diff of two serialized records, as `{field: {from, to}}`.
/// `None` when nothing changed or either side is not an object.
fn diff_values(old: &Value, new: &Value) -> Option<Value> {
    let (Value::Object(old), Value::Object(new)) = (old, new) else {
        return None;
    };
    let mut changes = serde_json::Map::new();
    for (key, new_value) in new {
        if old.get(key) != Some(new_value) {
            changes.insert(
                key.clone(),
                json!({
                    "from": old.get(key).cloned().unwrap_or(Value::Null),
                    "to": new_value.clone(),
                }),
            );
        }
    }
    if changes.is_empty() {
        None
    } else {
        Some(Value::Object(changes))
    }
}
