//! Weighted statement/voucher match scoring

use bigdecimal::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::*;

/// Minimum combined score for a candidate to be proposed.
pub const MATCH_THRESHOLD: f64 = 40.0;

/// A proposed match for one statement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProposal {
    pub voucher_id: u32,
    /// Combined score in [0, 100], rounded to the nearest integer.
    pub accuracy: f64,
}

/// Score every voucher against every statement line and pick the single
/// best candidate per line.
///
/// Candidates scoring below [`MATCH_THRESHOLD`] are discarded. Ties on the
/// best score resolve to the lowest voucher id, so the result is
/// deterministic regardless of input order.
pub fn propose_matches(
    statements: &[BankStatementLine],
    vouchers: &[Voucher],
) -> BTreeMap<u32, MatchProposal> {
    let mut by_id: Vec<&Voucher> = vouchers.iter().collect();
    by_id.sort_by_key(|v| v.id);

    let mut proposals = BTreeMap::new();
    for statement in statements {
        let mut best: Option<(f64, u32)> = None;
        for voucher in &by_id {
            let score = match_accuracy(statement, voucher);
            if score < MATCH_THRESHOLD {
                continue;
            }
            // Strict comparison keeps the lowest-id voucher on a tie.
            if best.is_none_or(|(b, _)| score > b) {
                best = Some((score, voucher.id));
            }
        }
        if let Some((score, voucher_id)) = best {
            debug!(
                statement_id = statement.id,
                voucher_id,
                accuracy = score,
                "match proposed"
            );
            proposals.insert(
                statement.id,
                MatchProposal {
                    voucher_id,
                    accuracy: score.round(),
                },
            );
        }
    }
    proposals
}

/// Combined weighted accuracy of one statement line against one voucher:
/// amount 40%, date proximity 30%, description similarity 30%.
pub fn match_accuracy(statement: &BankStatementLine, voucher: &Voucher) -> f64 {
    let amount = amount_score(statement, voucher);
    let date = date_score(statement, voucher);
    let description = text_similarity(
        &statement.description.to_lowercase(),
        &voucher.narration.to_lowercase(),
    );
    (amount * 0.4 + date * 0.3 + description * 0.3).min(100.0)
}

/// `max(0, 100 - |stmt - voucher| / stmt * 100)`, comparing absolute values.
/// The voucher amount is the net debit-minus-credit total of its entries.
fn amount_score(statement: &BankStatementLine, voucher: &Voucher) -> f64 {
    let stmt_amount = statement.amount.abs().to_f64().unwrap_or(0.0);
    let voucher_amount = voucher.net_amount().abs().to_f64().unwrap_or(0.0);
    if stmt_amount == 0.0 {
        return if voucher_amount == 0.0 { 100.0 } else { 0.0 };
    }
    let diff = (stmt_amount - voucher_amount).abs();
    (100.0 - diff / stmt_amount * 100.0).max(0.0)
}

/// `max(0, 100 - daysDiff * 33.33)`: zero once the dates are 3+ days apart.
fn date_score(statement: &BankStatementLine, voucher: &Voucher) -> f64 {
    let days = (statement.date - voucher.date).num_days().abs() as f64;
    (100.0 - days * 33.33).max(0.0)
}

/// Token-overlap ratio between two descriptions.
///
/// An empty string on either side scores 0 outright. Otherwise both
/// strings are split on whitespace, tokens of 3+ characters kept; a token
/// matches when it contains or is contained in a token of the other
/// string. Score is `matches / max(n1, n2) * 100`, with 100 when neither
/// non-empty string yields any usable tokens.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let tokens_a: Vec<&str> = a.split_whitespace().filter(|w| w.len() > 2).collect();
    let tokens_b: Vec<&str> = b.split_whitespace().filter(|w| w.len() > 2).collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 100.0;
    }
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let matches = tokens_a
        .iter()
        .filter(|wa| tokens_b.iter().any(|wb| wa.contains(wb) || wb.contains(*wa)))
        .count();

    matches as f64 / tokens_a.len().max(tokens_b.len()) as f64 * 100.0
}
