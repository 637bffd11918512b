//! Bulk import service
//!
//! Imports already-parsed rows as unassigned transactions. The sign of each
//! amount decides the type: negative rows become EXPENSE, positive rows
//! INCOME, zero rows are rejected individually. Imported rows are never
//! linked to an envelope, so envelope `spent` values are left as they are;
//! assign the rows afterwards, or run
//! [`EnvelopeService::recompute_spent`](super::EnvelopeService::recompute_spent).
//!
//! A small CSV reader for `date,description,amount` files feeds the CLI.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use crate::audit::{AuditEntry, EntityType};
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{Money, ProfileId, Transaction, TransactionType};
use crate::storage::Storage;

use super::access::{AccessControl, MEMBERS};
use super::session::Session;

/// A validated row ready for import
#[derive(Debug, Clone)]
pub struct ImportRow {
    pub description: String,
    /// Signed: negative for money out, positive for money in
    pub amount: Money,
    pub date: NaiveDate,
}

/// A row that was not imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// Zero-based position in the input
    pub index: usize,
    pub reason: String,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
}

/// Outcome of reading a CSV file
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub rows: Vec<ImportRow>,
    pub rejected: Vec<RejectedRow>,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .ok_or_else(|| format!("Could not parse date: '{}'", s))
}

fn parse_record(record: &StringRecord) -> Result<ImportRow, String> {
    let field = |idx: usize, name: &str| {
        record
            .get(idx)
            .map(str::trim)
            .ok_or_else(|| format!("Missing {} column", name))
    };

    let date = parse_date(field(0, "date")?)?;
    let description = field(1, "description")?.to_string();
    let amount = Money::parse(field(2, "amount")?).map_err(|e| e.to_string())?;

    Ok(ImportRow {
        description,
        amount,
        date,
    })
}

/// Read a `date,description,amount` CSV with a header row
///
/// Unreadable rows are reported with their zero-based data-row index and do
/// not stop the rest of the file from parsing.
pub fn parse_csv<R: Read>(reader: R) -> EnvelopeResult<ParsedCsv> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let expected = ["date", "description", "amount"];
    let matches = headers.len() >= expected.len()
        && headers
            .iter()
            .zip(expected)
            .all(|(h, e)| h.eq_ignore_ascii_case(e));
    if !matches {
        return Err(EnvelopeError::Import(format!(
            "Expected header 'date,description,amount', found '{}'",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut parsed = ParsedCsv::default();
    for (index, record) in csv_reader.records().enumerate() {
        let outcome = record
            .map_err(|e| format!("Error reading CSV record: {}", e))
            .and_then(|r| parse_record(&r));
        match outcome {
            Ok(row) => parsed.rows.push(row),
            Err(reason) => parsed.rejected.push(RejectedRow { index, reason }),
        }
    }

    Ok(parsed)
}

/// Service for bulk transaction import
pub struct ImportService<'a> {
    storage: &'a Storage,
}

impl<'a> ImportService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Turn a signed row into an unassigned transaction
    fn to_transaction(profile_id: ProfileId, row: ImportRow) -> Result<Transaction, String> {
        let transaction_type = if row.amount.is_negative() {
            TransactionType::Expense
        } else if row.amount.is_positive() {
            TransactionType::Income
        } else {
            return Err("Amount cannot be zero".into());
        };

        let txn = Transaction::new(
            profile_id,
            row.description,
            row.amount.abs(),
            row.date,
            transaction_type,
        );
        txn.validate().map_err(|e| e.to_string())?;
        Ok(txn)
    }

    /// Import rows as unassigned transactions in one unit
    ///
    /// Invalid rows are skipped and reported; the rest commit together.
    pub fn bulk_import(
        &self,
        session: &Session,
        profile_id: ProfileId,
        rows: Vec<ImportRow>,
    ) -> EnvelopeResult<ImportResult> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;

        let mut result = ImportResult::default();
        for (index, row) in rows.into_iter().enumerate() {
            match Self::to_transaction(profile_id, row) {
                Ok(txn) => result.imported.push(txn),
                Err(reason) => {
                    warn!(index, reason = %reason, "rejected import row");
                    result.rejected.push(RejectedRow { index, reason });
                }
            }
        }

        self.storage.ledger.atomic(|tx| {
            for txn in &result.imported {
                tx.insert_transaction(txn.clone())?;
            }
            Ok(())
        })?;

        let entries: Vec<_> = result
            .imported
            .iter()
            .map(|t| {
                AuditEntry::create(EntityType::Transaction, t.id.to_string(), t)
                    .named(t.description.clone())
                    .by(Some(actor.user_id))
            })
            .collect();
        self.storage.log_batch(&entries)?;

        info!(
            profile = %profile_id,
            imported = result.imported.len(),
            rejected = result.rejected.len(),
            "bulk import finished"
        );
        Ok(result)
    }
}
