//! Bank statement file import
//!
//! Banks disagree on everything: header names, date formats, whether money
//! movement is one signed column or a debit/credit pair. This module
//! normalizes all of that into [`ParsedStatementLine`] rows.

use std::io::Read;
use std::path::Path;

use bigdecimal::BigDecimal;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use tracing::debug;

use crate::types::{BookError, BookResult};

/// A statement row after header normalization and value cleaning.
///
/// `amount` is signed: positive for money in, negative for money out.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatementLine {
    pub date: NaiveDate,
    pub description: String,
    pub amount: BigDecimal,
    pub balance: BigDecimal,
}

/// Canonical meaning of a statement column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    Description,
    Amount,
    Debit,
    Credit,
    Balance,
    Ignored,
}

/// Map a raw header cell to its canonical column. Headers are lowercased
/// and stripped of everything non-alphanumeric first, so "Transaction Date",
/// "transaction_date" and "TransactionDate" all normalize the same way.
fn normalize_header(header: &str) -> Column {
    let key: String = header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase();
    match key.as_str() {
        "date" | "transactiondate" | "txndate" | "valuedate" => Column::Date,
        "description" | "narration" | "particulars" | "details" | "transactiondetails" => {
            Column::Description
        }
        "amount" => Column::Amount,
        "debit" | "withdrawal" | "withdrawalamt" | "dr" => Column::Debit,
        "credit" | "deposit" | "depositamt" | "cr" => Column::Credit,
        "balance" | "runningbalance" | "closingbalance" => Column::Balance,
        _ => Column::Ignored,
    }
}

/// Strip currency symbols, thousands separators and other junk, keeping
/// digits, the decimal point and a leading minus. Empty after cleaning
/// means "no value in this cell".
fn clean_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Accepts ISO dates first, then the day-first formats banks export.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

/// Assemble one parsed line from a normalized row. Returns `None` when the
/// row has no usable date or no money movement at all; such rows are
/// skipped rather than failing the whole import.
fn assemble_line(columns: &[Column], cells: &[String]) -> Option<ParsedStatementLine> {
    let mut date = None;
    let mut description = String::new();
    let mut amount = None;
    let mut debit = None;
    let mut credit = None;
    let mut balance = None;

    for (column, cell) in columns.iter().zip(cells) {
        match column {
            Column::Date => date = parse_date(cell),
            Column::Description => description = cell.trim().to_string(),
            Column::Amount => amount = clean_amount(cell),
            Column::Debit => debit = clean_amount(cell),
            Column::Credit => credit = clean_amount(cell),
            Column::Balance => balance = clean_amount(cell),
            Column::Ignored => {}
        }
    }

    // A single signed amount column wins; otherwise money in minus money out.
    let amount = match (amount, debit, credit) {
        (Some(amount), _, _) => amount,
        (None, None, None) => return None,
        (None, debit, credit) => {
            credit.unwrap_or_else(|| BigDecimal::from(0))
                - debit.unwrap_or_else(|| BigDecimal::from(0))
        }
    };

    Some(ParsedStatementLine {
        date: date?,
        description,
        amount,
        balance: balance.unwrap_or_else(|| BigDecimal::from(0)),
    })
}

fn sort_by_date(mut lines: Vec<ParsedStatementLine>) -> Vec<ParsedStatementLine> {
    lines.sort_by_key(|l| l.date);
    lines
}

/// Parse a CSV bank statement. The first record is treated as the header
/// row; unrecognized columns are ignored.
pub fn parse_csv<R: Read>(reader: R) -> BookResult<Vec<ParsedStatementLine>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<Column> = csv_reader
        .headers()
        .map_err(|e| BookError::ImportParse(e.to_string()))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut lines = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| BookError::ImportParse(e.to_string()))?;
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        if let Some(line) = assemble_line(&columns, &cells) {
            lines.push(line);
        }
    }
    debug!(rows = lines.len(), "parsed csv statement");
    Ok(sort_by_date(lines))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Parse a spreadsheet bank statement (xlsx or legacy xls). Reads the
/// first worksheet; the first row is the header row.
pub fn parse_xlsx(path: &Path) -> BookResult<Vec<ParsedStatementLine>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| BookError::ImportParse(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| BookError::ImportParse("workbook has no sheets".to_string()))?
        .map_err(|e| BookError::ImportParse(e.to_string()))?;

    let mut row_iter = range.rows();
    let columns: Vec<Column> = match row_iter.next() {
        Some(header) => header
            .iter()
            .map(|cell| normalize_header(&cell_to_string(cell)))
            .collect(),
        None => return Ok(Vec::new()),
    };

    let mut lines = Vec::new();
    for row in row_iter {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if let Some(line) = assemble_line(&columns, &cells) {
            lines.push(line);
        }
    }
    debug!(rows = lines.len(), "parsed xlsx statement");
    Ok(sort_by_date(lines))
}

/// Dispatch on file extension. Only `.csv`, `.xlsx` and `.xls` are
/// supported.
pub fn parse_statement_file(path: &Path) -> BookResult<Vec<ParsedStatementLine>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => {
            let file =
                std::fs::File::open(path).map_err(|e| BookError::ImportParse(e.to_string()))?;
            parse_csv(file)
        }
        "xlsx" | "xls" => parse_xlsx(path),
        other => Err(BookError::ImportParse(format!(
            "unsupported statement format: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_variants_normalize_to_the_same_columns() {
        assert_eq!(normalize_header("Transaction Date"), Column::Date);
        assert_eq!(normalize_header("PARTICULARS"), Column::Description);
        assert_eq!(normalize_header("Withdrawal"), Column::Debit);
        assert_eq!(normalize_header("Deposit"), Column::Credit);
        assert_eq!(normalize_header("Running Balance"), Column::Balance);
        assert_eq!(normalize_header("Cheque No"), Column::Ignored);
    }

    #[test]
    fn debit_credit_pair_becomes_one_signed_amount() {
        let csv = "\
Transaction Date,Particulars,Debit,Credit,Running Balance
01/02/2024,ATM,500,,1000
";
        let lines = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(lines[0].description, "ATM");
        assert_eq!(lines[0].amount, BigDecimal::from(-500));
        assert_eq!(lines[0].balance, BigDecimal::from(1000));
    }

    #[test]
    fn signed_amount_column_takes_precedence() {
        let csv = "\
Date,Description,Amount,Balance
2024-03-05,Refund,250.50,1250.50
2024-03-06,Rent,-800,450.50
";
        let lines = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(lines[0].amount, "250.50".parse::<BigDecimal>().unwrap());
        assert_eq!(lines[1].amount, BigDecimal::from(-800));
    }

    #[test]
    fn currency_junk_is_stripped_from_amounts() {
        let csv = "\
Date,Narration,Credit,Balance
2024-04-01,Invoice paid,\"$1,234.56\",\"$5,000.00\"
";
        let lines = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(lines[0].amount, "1234.56".parse::<BigDecimal>().unwrap());
        assert_eq!(lines[0].balance, "5000.00".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn rows_without_a_date_or_movement_are_skipped() {
        let csv = "\
Date,Description,Debit,Credit,Balance
not-a-date,Header repeat,10,,100
2024-05-01,No movement,,,100
2024-05-02,Real,25,,75
";
        let lines = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].description, "Real");
    }

    #[test]
    fn output_is_sorted_by_date() {
        let csv = "\
Date,Description,Credit,Balance
2024-06-10,second,20,120
2024-06-01,first,100,100
";
        let lines = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(lines[0].description, "first");
        assert_eq!(lines[1].description, "second");
    }

    #[test]
    fn unsupported_extensions_are_rejected() {
        let err = parse_statement_file(Path::new("statement.pdf")).unwrap_err();
        assert!(matches!(err, BookError::ImportParse(_)));
    }

    #[test]
    fn day_first_and_iso_dates_both_parse() {
        assert_eq!(
            parse_date("15/08/2024"),
            NaiveDate::from_ymd_opt(2024, 8, 15)
        );
        assert_eq!(
            parse_date("15-08-2024"),
            NaiveDate::from_ymd_opt(2024, 8, 15)
        );
        assert_eq!(
            parse_date("2024-08-15"),
            NaiveDate::from_ymd_opt(2024, 8, 15)
        );
        assert_eq!(parse_date("August 15"), None);
    }
}
