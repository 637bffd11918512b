//! Transaction CLI commands

use std::collections::HashMap;
use std::fs::File;

use chrono::Local;
use clap::Subcommand;

use crate::display::{format_transaction_details, format_transaction_register};
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{EnvelopeId, ProfileId, TransactionType};
use crate::services::{
    parse_csv, CreateTransactionInput, EnvelopeService, ImportService, RejectedRow, Session,
    TransactionService, UpdateTransactionInput,
};

use super::{parse_amount, parse_date, CliContext};

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Record a transaction
    Add {
        description: String,
        /// Amount, always positive (e.g. "42.50")
        amount: String,
        /// expense or income
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,
        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        /// Envelope name or ID
        #[arg(short, long)]
        envelope: Option<String>,
    },
    /// List transactions
    List {
        /// Only transactions in this envelope
        #[arg(short, long)]
        envelope: Option<String>,
        /// Maximum number to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show transaction details
    Show {
        /// Transaction ID (full or short)
        id: String,
    },
    /// Edit a transaction
    Edit {
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// Move to this envelope
        #[arg(short, long, conflicts_with = "unassign")]
        envelope: Option<String>,
        /// Detach from its envelope
        #[arg(long)]
        unassign: bool,
    },
    /// Delete a transaction
    Delete { id: String },
    /// Import transactions from a date,description,amount CSV file
    Import { file: String },
}

fn parse_kind(input: &str) -> EnvelopeResult<TransactionType> {
    TransactionType::parse(input).ok_or_else(|| {
        EnvelopeError::Validation(format!(
            "Unknown transaction type: '{}'. Expected expense or income",
            input
        ))
    })
}

fn resolve_envelope(
    ctx: &CliContext<'_>,
    session: &Session,
    profile_id: ProfileId,
    identifier: &str,
) -> EnvelopeResult<EnvelopeId> {
    Ok(EnvelopeService::new(ctx.storage)
        .find(session, profile_id, identifier)?
        .id)
}

/// Data-row positions of the rows that survived parsing
fn surviving_rows(total: usize, rejected: &[RejectedRow]) -> Vec<usize> {
    (0..total)
        .filter(|i| !rejected.iter().any(|r| r.index == *i))
        .collect()
}

pub fn handle_transaction_command(
    ctx: &CliContext<'_>,
    cmd: TransactionCommands,
) -> EnvelopeResult<()> {
    let service = TransactionService::new(ctx.storage);
    let (session, profile_id) = ctx.scope()?;

    match cmd {
        TransactionCommands::Add {
            description,
            amount,
            kind,
            date,
            envelope,
        } => {
            let envelope_id = envelope
                .as_deref()
                .map(|e| resolve_envelope(ctx, &session, profile_id, e))
                .transpose()?;
            let input = CreateTransactionInput {
                description,
                amount: parse_amount(&amount)?,
                date: match date {
                    Some(d) => parse_date(&d)?,
                    None => Local::now().date_naive(),
                },
                transaction_type: parse_kind(&kind)?,
                envelope_id,
            };
            let txn = service.create(&session, profile_id, input)?;
            println!("Recorded transaction: {}", txn);
            println!("  ID: {}", txn.id);
        }

        TransactionCommands::List { envelope, limit } => {
            let envelope_id = envelope
                .as_deref()
                .map(|e| resolve_envelope(ctx, &session, profile_id, e))
                .transpose()?;
            let transactions = service.list(&session, profile_id, envelope_id)?;
            let names: HashMap<EnvelopeId, String> = EnvelopeService::new(ctx.storage)
                .list(&session, profile_id, true)?
                .into_iter()
                .map(|e| (e.id, e.name))
                .collect();
            let shown: Vec<_> = transactions.into_iter().take(limit).collect();
            print!("{}", format_transaction_register(&shown, &names));
        }

        TransactionCommands::Show { id } => {
            let txn = service.find(&session, profile_id, &id)?;
            let envelope_name = match txn.envelope_id {
                Some(envelope_id) => Some(
                    EnvelopeService::new(ctx.storage)
                        .get(&session, profile_id, envelope_id)?
                        .name,
                ),
                None => None,
            };
            print!(
                "{}",
                format_transaction_details(&txn, envelope_name.as_deref())
            );
        }

        TransactionCommands::Edit {
            id,
            description,
            amount,
            date,
            kind,
            envelope,
            unassign,
        } => {
            let txn = service.find(&session, profile_id, &id)?;
            let envelope_id = if unassign {
                Some(None)
            } else {
                envelope
                    .as_deref()
                    .map(|e| resolve_envelope(ctx, &session, profile_id, e).map(Some))
                    .transpose()?
            };
            let input = UpdateTransactionInput {
                description,
                amount: amount.as_deref().map(parse_amount).transpose()?,
                date: date.as_deref().map(parse_date).transpose()?,
                transaction_type: kind.as_deref().map(parse_kind).transpose()?,
                envelope_id,
            };
            let updated = service.update(&session, profile_id, txn.id, input)?;
            println!("Updated transaction: {}", updated);
        }

        TransactionCommands::Delete { id } => {
            let txn = service.find(&session, profile_id, &id)?;
            let deleted = service.delete(&session, profile_id, txn.id)?;
            println!("Deleted transaction: {}", deleted);
        }

        TransactionCommands::Import { file } => {
            let reader = File::open(&file)
                .map_err(|e| EnvelopeError::Import(format!("Failed to open {}: {}", file, e)))?;
            let parsed = parse_csv(reader)?;
            let total = parsed.rows.len() + parsed.rejected.len();
            let positions = surviving_rows(total, &parsed.rejected);

            let mut rejected = parsed.rejected;
            let result = ImportService::new(ctx.storage).bulk_import(&session, profile_id, parsed.rows)?;
            rejected.extend(result.rejected.into_iter().map(|r| RejectedRow {
                index: positions.get(r.index).copied().unwrap_or(r.index),
                reason: r.reason,
            }));
            rejected.sort_by_key(|r| r.index);

            println!("Imported {} transaction(s)", result.imported.len());
            if !rejected.is_empty() {
                println!("Skipped {} row(s):", rejected.len());
                for row in &rejected {
                    println!("  row {}: {}", row.index + 1, row.reason);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surviving_rows_skip_rejected() {
        let rejected = vec![RejectedRow {
            index: 1,
            reason: "bad".into(),
        }];
        assert_eq!(surviving_rows(4, &rejected), vec![0, 2, 3]);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("Income").unwrap(), TransactionType::Income);
        assert!(parse_kind("refund").is_err());
    }
}
