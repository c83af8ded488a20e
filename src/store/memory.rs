//! In-memory store backend for testing and single-process use

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory implementation of every store trait.
///
/// Collections are `BTreeMap`s keyed by id, so iteration order is creation
/// order (ids are allocated monotonically). Writes serialize through the
/// `RwLock` write guard; reads clone a snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ledgers: Arc<RwLock<BTreeMap<u32, Ledger>>>,
    vouchers: Arc<RwLock<BTreeMap<u32, Voucher>>>,
    groups: Arc<RwLock<BTreeMap<u32, Group>>>,
    currencies: Arc<RwLock<BTreeMap<u32, Currency>>>,
    custom_fields: Arc<RwLock<BTreeMap<u32, CustomField>>>,
    statements: Arc<RwLock<BTreeMap<u32, BankStatementLine>>>,
    audit_log: Arc<RwLock<Vec<AuditEntry>>>,
}

fn next_id<T>(map: &BTreeMap<u32, T>) -> u32 {
    map.keys().next_back().map_or(1, |max| max + 1)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing).
    pub fn clear(&self) {
        self.ledgers.write().unwrap().clear();
        self.vouchers.write().unwrap().clear();
        self.groups.write().unwrap().clear();
        self.currencies.write().unwrap().clear();
        self.custom_fields.write().unwrap().clear();
        self.statements.write().unwrap().clear();
        self.audit_log.write().unwrap().clear();
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_ledger(&mut self, mut ledger: Ledger) -> BookResult<Ledger> {
        let mut ledgers = self.ledgers.write().unwrap();
        ledger.id = next_id(&ledgers);
        ledgers.insert(ledger.id, ledger.clone());
        Ok(ledger)
    }

    async fn get_ledger(&self, id: u32) -> BookResult<Ledger> {
        self.ledgers
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| BookError::not_found("ledger", id))
    }

    async fn get_ledgers(&self) -> BookResult<Vec<Ledger>> {
        Ok(self.ledgers.read().unwrap().values().cloned().collect())
    }

    async fn update_ledger(&mut self, id: u32, mut ledger: Ledger) -> BookResult<Ledger> {
        let mut ledgers = self.ledgers.write().unwrap();
        if !ledgers.contains_key(&id) {
            return Err(BookError::not_found("ledger", id));
        }
        ledger.id = id;
        ledgers.insert(id, ledger.clone());
        Ok(ledger)
    }

    async fn delete_ledger(&mut self, id: u32) -> BookResult<Ledger> {
        self.ledgers
            .write()
            .unwrap()
            .remove(&id)
            .ok_or_else(|| BookError::not_found("ledger", id))
    }
}

#[async_trait]
impl VoucherStore for MemoryStore {
    async fn create_voucher(&mut self, mut voucher: Voucher) -> BookResult<Voucher> {
        let mut vouchers = self.vouchers.write().unwrap();
        voucher.id = next_id(&vouchers);
        vouchers.insert(voucher.id, voucher.clone());
        Ok(voucher)
    }

    async fn get_voucher(&self, id: u32) -> BookResult<Voucher> {
        self.vouchers
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| BookError::not_found("voucher", id))
    }

    async fn get_vouchers(&self) -> BookResult<Vec<Voucher>> {
        Ok(self.vouchers.read().unwrap().values().cloned().collect())
    }

    async fn update_voucher(&mut self, id: u32, mut voucher: Voucher) -> BookResult<Voucher> {
        let mut vouchers = self.vouchers.write().unwrap();
        if !vouchers.contains_key(&id) {
            return Err(BookError::not_found("voucher", id));
        }
        voucher.id = id;
        vouchers.insert(id, voucher.clone());
        Ok(voucher)
    }

    async fn delete_voucher(&mut self, id: u32) -> BookResult<Voucher> {
        self.vouchers
            .write()
            .unwrap()
            .remove(&id)
            .ok_or_else(|| BookError::not_found("voucher", id))
    }

    async fn vouchers_by_ledger_and_date(
        &self,
        ledger_id: u32,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> BookResult<Vec<Voucher>> {
        Ok(self
            .vouchers
            .read()
            .unwrap()
            .values()
            .filter(|v| {
                v.date >= from
                    && v.date <= to
                    && v.entries.iter().any(|e| e.ledger_id == ledger_id)
            })
            .cloned()
            .collect())
    }

    async fn vouchers_by_date_range(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> BookResult<Vec<Voucher>> {
        Ok(self
            .vouchers
            .read()
            .unwrap()
            .values()
            .filter(|v| v.date >= from && v.date <= to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn create_group(&mut self, mut group: Group) -> BookResult<Group> {
        let mut groups = self.groups.write().unwrap();
        group.id = next_id(&groups);
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, id: u32) -> BookResult<Group> {
        self.groups
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| BookError::not_found("group", id))
    }

    async fn get_groups(&self) -> BookResult<Vec<Group>> {
        Ok(self.groups.read().unwrap().values().cloned().collect())
    }

    async fn update_group(&mut self, id: u32, mut group: Group) -> BookResult<Group> {
        let mut groups = self.groups.write().unwrap();
        if !groups.contains_key(&id) {
            return Err(BookError::not_found("group", id));
        }
        group.id = id;
        groups.insert(id, group.clone());
        Ok(group)
    }

    async fn delete_group(&mut self, id: u32) -> BookResult<Group> {
        self.groups
            .write()
            .unwrap()
            .remove(&id)
            .ok_or_else(|| BookError::not_found("group", id))
    }
}

#[async_trait]
impl CurrencyStore for MemoryStore {
    async fn create_currency(&mut self, mut currency: Currency) -> BookResult<Currency> {
        let mut currencies = self.currencies.write().unwrap();
        let code = currency.code.to_uppercase();
        if currencies.values().any(|c| c.code == code) {
            return Err(BookError::DuplicateKey {
                field: "currency code",
                value: code,
            });
        }
        currency.id = next_id(&currencies);
        currency.code = code;
        currencies.insert(currency.id, currency.clone());
        Ok(currency)
    }

    async fn get_currency(&self, id: u32) -> BookResult<Currency> {
        self.currencies
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| BookError::not_found("currency", id))
    }

    async fn get_currency_by_code(&self, code: &str) -> BookResult<Currency> {
        let code = code.to_uppercase();
        self.currencies
            .read()
            .unwrap()
            .values()
            .find(|c| c.code == code)
            .cloned()
            .ok_or(BookError::NotFound {
                entity: "currency",
                key: code,
            })
    }

    async fn get_currencies(&self) -> BookResult<Vec<Currency>> {
        Ok(self.currencies.read().unwrap().values().cloned().collect())
    }

    async fn update_currency(&mut self, id: u32, mut currency: Currency) -> BookResult<Currency> {
        let mut currencies = self.currencies.write().unwrap();
        let existing = currencies
            .get(&id)
            .cloned()
            .ok_or_else(|| BookError::not_found("currency", id))?;
        let code = currency.code.to_uppercase();
        if currencies.values().any(|c| c.code == code && c.id != id) {
            return Err(BookError::DuplicateKey {
                field: "currency code",
                value: code,
            });
        }
        currency.id = id;
        currency.code = code;
        // Base-currency status only changes through set_base_currency.
        currency.is_base = existing.is_base;
        currencies.insert(id, currency.clone());
        Ok(currency)
    }

    async fn delete_currency(&mut self, id: u32) -> BookResult<Currency> {
        let mut currencies = self.currencies.write().unwrap();
        let currency = currencies
            .get(&id)
            .cloned()
            .ok_or_else(|| BookError::not_found("currency", id))?;
        if currency.is_base {
            return Err(BookError::Validation(
                "cannot delete the base currency".to_string(),
            ));
        }
        currencies.remove(&id);
        Ok(currency)
    }

    async fn set_base_currency(&mut self, id: u32) -> BookResult<Currency> {
        let mut currencies = self.currencies.write().unwrap();
        if !currencies.contains_key(&id) {
            return Err(BookError::not_found("currency", id));
        }
        for currency in currencies.values_mut() {
            currency.is_base = currency.id == id;
        }
        Ok(currencies[&id].clone())
    }
}

#[async_trait]
impl CustomFieldStore for MemoryStore {
    async fn create_custom_field(&mut self, mut field: CustomField) -> BookResult<CustomField> {
        let mut fields = self.custom_fields.write().unwrap();
        if fields.values().any(|f| f.name == field.name) {
            return Err(BookError::DuplicateKey {
                field: "custom field name",
                value: field.name,
            });
        }
        field.id = next_id(&fields);
        fields.insert(field.id, field.clone());
        Ok(field)
    }

    async fn get_custom_field(&self, id: u32) -> BookResult<CustomField> {
        self.custom_fields
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| BookError::not_found("custom field", id))
    }

    async fn get_custom_fields(&self) -> BookResult<Vec<CustomField>> {
        Ok(self
            .custom_fields
            .read()
            .unwrap()
            .values()
            .cloned()
            .collect())
    }

    async fn custom_fields_for_entity(&self, entity_type: &str) -> BookResult<Vec<CustomField>> {
        Ok(self
            .custom_fields
            .read()
            .unwrap()
            .values()
            .filter(|f| f.entity_type == entity_type || f.entity_type == "all")
            .cloned()
            .collect())
    }

    async fn update_custom_field(
        &mut self,
        id: u32,
        mut field: CustomField,
    ) -> BookResult<CustomField> {
        let mut fields = self.custom_fields.write().unwrap();
        if !fields.contains_key(&id) {
            return Err(BookError::not_found("custom field", id));
        }
        if fields.values().any(|f| f.name == field.name && f.id != id) {
            return Err(BookError::DuplicateKey {
                field: "custom field name",
                value: field.name,
            });
        }
        field.id = id;
        fields.insert(id, field.clone());
        Ok(field)
    }

    async fn delete_custom_field(&mut self, id: u32) -> BookResult<CustomField> {
        self.custom_fields
            .write()
            .unwrap()
            .remove(&id)
            .ok_or_else(|| BookError::not_found("custom field", id))
    }
}

#[async_trait]
impl StatementStore for MemoryStore {
    async fn create_statement(
        &mut self,
        mut line: BankStatementLine,
    ) -> BookResult<BankStatementLine> {
        let mut statements = self.statements.write().unwrap();
        line.id = next_id(&statements);
        statements.insert(line.id, line.clone());
        Ok(line)
    }

    async fn get_statement(&self, id: u32) -> BookResult<BankStatementLine> {
        self.statements
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| BookError::not_found("bank statement", id))
    }

    async fn get_statements(&self) -> BookResult<Vec<BankStatementLine>> {
        Ok(self.statements.read().unwrap().values().cloned().collect())
    }

    async fn update_statement(
        &mut self,
        id: u32,
        mut line: BankStatementLine,
    ) -> BookResult<BankStatementLine> {
        let mut statements = self.statements.write().unwrap();
        if !statements.contains_key(&id) {
            return Err(BookError::not_found("bank statement", id));
        }
        line.id = id;
        statements.insert(id, line.clone());
        Ok(line)
    }

    async fn delete_statement(&mut self, id: u32) -> BookResult<BankStatementLine> {
        self.statements
            .write()
            .unwrap()
            .remove(&id)
            .ok_or_else(|| BookError::not_found("bank statement", id))
    }

    async fn set_match_state(
        &mut self,
        id: u32,
        status: MatchStatus,
        matched_voucher_id: Option<u32>,
    ) -> BookResult<BankStatementLine> {
        let mut statements = self.statements.write().unwrap();
        let line = statements
            .get_mut(&id)
            .ok_or_else(|| BookError::not_found("bank statement", id))?;
        line.match_status = status;
        line.matched_voucher_id = matched_voucher_id;
        Ok(line.clone())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(
        &mut self,
        entity_type: &str,
        entity_id: u32,
        operation: AuditOperation,
        changes: Option<serde_json::Value>,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
    ) -> BookResult<AuditEntry> {
        let mut log = self.audit_log.write().unwrap();
        let entry = AuditEntry {
            id: log.last().map_or(1, |e| e.id + 1),
            entity_type: entity_type.to_string(),
            entity_id,
            operation,
            user_id: "user1".to_string(),
            user_name: "Admin User".to_string(),
            timestamp: chrono::Utc::now().naive_utc(),
            changes,
            old_values,
            new_values,
        };
        log.push(entry.clone());
        Ok(entry)
    }

    async fn audit_entries(&self) -> BookResult<Vec<AuditEntry>> {
        let log = self.audit_log.read().unwrap();
        Ok(log.iter().rev().cloned().collect())
    }

    async fn audit_for_entity(
        &self,
        entity_type: &str,
        entity_id: Option<u32>,
    ) -> BookResult<Vec<AuditEntry>> {
        let log = self.audit_log.read().unwrap();
        Ok(log
            .iter()
            .rev()
            .filter(|e| {
                e.entity_type == entity_type
                    && entity_id.is_none_or(|id| e.entity_id == id)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn ledger_ids_are_monotonic() {
        let mut store = MemoryStore::new();
        let a = store
            .create_ledger(Ledger::new(0, "Cash", "Current Assets"))
            .await
            .unwrap();
        let b = store
            .create_ledger(Ledger::new(0, "Bank", "Current Assets"))
            .await
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn missing_ledger_fails_fast() {
        let store = MemoryStore::new();
        let err = store.get_ledger(42).await.unwrap_err();
        assert!(matches!(err, BookError::NotFound { .. }));
    }

    #[tokio::test]
    async fn duplicate_currency_code_is_rejected() {
        let mut store = MemoryStore::new();
        store
            .create_currency(Currency::new(0, "INR", "Indian Rupee"))
            .await
            .unwrap();
        let err = store
            .create_currency(Currency::new(0, "inr", "Rupee again"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn base_currency_cannot_be_deleted() {
        let mut store = MemoryStore::new();
        let inr = store
            .create_currency(Currency::new(0, "INR", "Indian Rupee"))
            .await
            .unwrap();
        store.set_base_currency(inr.id).await.unwrap();
        assert!(store.delete_currency(inr.id).await.is_err());
    }

    #[tokio::test]
    async fn set_base_currency_clears_previous_base() {
        let mut store = MemoryStore::new();
        let inr = store
            .create_currency(Currency::new(0, "INR", "Indian Rupee"))
            .await
            .unwrap();
        let usd = store
            .create_currency(Currency::new(0, "USD", "US Dollar"))
            .await
            .unwrap();
        store.set_base_currency(inr.id).await.unwrap();
        store.set_base_currency(usd.id).await.unwrap();
        assert!(!store.get_currency(inr.id).await.unwrap().is_base);
        assert!(store.get_currency(usd.id).await.unwrap().is_base);
    }

    #[tokio::test]
    async fn audit_log_is_append_only_with_increasing_ids() {
        let mut store = MemoryStore::new();
        for i in 0..3 {
            store
                .append_audit("ledger", i, AuditOperation::Create, None, None, None)
                .await
                .unwrap();
        }
        let entries = store.audit_entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        // Newest first.
        assert_eq!(entries[0].id, 3);
        assert_eq!(entries[2].id, 1);
    }

    #[tokio::test]
    async fn vouchers_by_ledger_and_date_filters_both_axes() {
        let mut store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut v = Voucher::new(0, VoucherType::Receipt, "R-1", date, "in range");
        v.add_entry(Entry::debit(1, BigDecimal::from(100)));
        v.add_entry(Entry::credit(2, BigDecimal::from(100)));
        store.create_voucher(v).await.unwrap();

        let hits = store
            .vouchers_by_ledger_and_date(
                1,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .vouchers_by_ledger_and_date(
                3,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .await
            .unwrap();
        assert!(misses.is_empty());
    }
}
