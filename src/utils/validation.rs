//! Custom field value validation

use regex::Regex;
use std::collections::HashMap;

use crate::types::{CustomField, FieldType};

// Same shape most form validators use: something, an @, something, a dot,
// something. Deliverability is the mail server's problem.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Validate one value against a field definition.
///
/// Returns `None` when the value is acceptable, otherwise a human-readable
/// message naming the field label. An empty value on a non-required field
/// is always acceptable.
pub fn validate_field_value(field: &CustomField, value: &str) -> Option<String> {
    let value = value.trim();

    if value.is_empty() {
        if field.required {
            return Some(format!("{} is required", field.label));
        }
        return None;
    }

    match field.field_type {
        FieldType::Number => {
            let number: f64 = match value.parse() {
                Ok(n) => n,
                Err(_) => return Some(format!("{} must be a number", field.label)),
            };
            if let Some(rule) = &field.validation {
                if rule.min.is_some_and(|min| number < min) {
                    return Some(format!("{} must be at least {}", field.label, rule.min?));
                }
                if rule.max.is_some_and(|max| number > max) {
                    return Some(format!("{} must be at most {}", field.label, rule.max?));
                }
            }
        }
        FieldType::Text => {
            if let Some(rule) = &field.validation {
                let length = value.chars().count() as f64;
                if rule.min.is_some_and(|min| length < min) {
                    return Some(format!(
                        "{} must be at least {} characters",
                        field.label,
                        rule.min?
                    ));
                }
                if rule.max.is_some_and(|max| length > max) {
                    return Some(format!(
                        "{} must be at most {} characters",
                        field.label,
                        rule.max?
                    ));
                }
                if let Some(pattern) = &rule.pattern {
                    match Regex::new(pattern) {
                        Ok(re) if !re.is_match(value) => {
                            return Some(format!("{} format is invalid", field.label));
                        }
                        // An unparseable pattern on the definition never
                        // blocks data entry.
                        _ => {}
                    }
                }
            }
        }
        FieldType::Email => {
            let re = Regex::new(EMAIL_PATTERN).ok()?;
            if !re.is_match(value) {
                return Some(format!("{} must be a valid email", field.label));
            }
        }
        FieldType::Date => {
            if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                return Some(format!("{} must be a date (YYYY-MM-DD)", field.label));
            }
        }
    }

    None
}

/// Validate a whole map of values against the field definitions for an
/// entity. Fields absent from `values` are treated as empty, so required
/// fields still report. Returns every failure, keyed by field name.
pub fn validate_field_values(
    fields: &[CustomField],
    values: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut errors = HashMap::new();
    for field in fields {
        let value = values.get(&field.name).map(String::as_str).unwrap_or("");
        if let Some(message) = validate_field_value(field, value) {
            errors.insert(field.name.clone(), message);
        }
    }
    errors
}
