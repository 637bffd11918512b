//! Envelope CLI commands

use clap::Subcommand;

use crate::display::{format_corrections, format_envelope_details, format_envelope_list};
use crate::error::EnvelopeResult;
use crate::services::{EnvelopeService, ProfileService, UpdateEnvelopeInput};

use super::{parse_amount, CliContext};

/// Envelope subcommands
#[derive(Subcommand)]
pub enum EnvelopeCommands {
    /// Create a new envelope
    Create {
        name: String,
        /// Category label
        #[arg(short, long, default_value = "General")]
        category: String,
        /// Spending target (e.g. "250.00")
        #[arg(short, long, default_value = "0")]
        target: String,
    },
    /// List envelopes
    List {
        /// Include archived envelopes
        #[arg(short, long)]
        all: bool,
    },
    /// Show envelope details
    Show {
        /// Envelope name or ID
        envelope: String,
    },
    /// Edit an envelope
    Edit {
        /// Envelope name or ID
        envelope: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        target: Option<String>,
    },
    /// Archive an envelope
    Archive {
        envelope: String,
    },
    /// Restore an archived envelope
    Unarchive {
        envelope: String,
    },
    /// Delete an envelope with no transactions
    Delete {
        envelope: String,
    },
    /// Rebuild spent totals from the transaction history
    Recompute,
}

pub fn handle_envelope_command(ctx: &CliContext<'_>, cmd: EnvelopeCommands) -> EnvelopeResult<()> {
    let service = EnvelopeService::new(ctx.storage);
    let (session, profile_id) = ctx.scope()?;

    match cmd {
        EnvelopeCommands::Create {
            name,
            category,
            target,
        } => {
            let target = parse_amount(&target)?;
            let envelope = service.create(&session, profile_id, &name, &category, target)?;
            println!("Created envelope: {}", envelope.name);
            println!("  ID:     {}", envelope.id);
            println!("  Target: {}", envelope.target_amount);
        }

        EnvelopeCommands::List { all } => {
            let envelopes = service.list(&session, profile_id, all)?;
            print!("{}", format_envelope_list(&envelopes));
        }

        EnvelopeCommands::Show { envelope } => {
            let envelope = service.find(&session, profile_id, &envelope)?;
            let profile = ProfileService::new(ctx.storage).get(&session, profile_id)?;
            print!("{}", format_envelope_details(&envelope, &profile.currency));
        }

        EnvelopeCommands::Edit {
            envelope,
            name,
            category,
            target,
        } => {
            if name.is_none() && category.is_none() && target.is_none() {
                println!("No changes specified. Use --name, --category, or --target.");
                return Ok(());
            }
            let existing = service.find(&session, profile_id, &envelope)?;
            let input = UpdateEnvelopeInput {
                name,
                category,
                target_amount: target.as_deref().map(parse_amount).transpose()?,
            };
            let updated = service.update(&session, profile_id, existing.id, input)?;
            println!("Updated envelope: {}", updated.name);
        }

        EnvelopeCommands::Archive { envelope } => {
            let existing = service.find(&session, profile_id, &envelope)?;
            let archived = service.archive(&session, profile_id, existing.id)?;
            println!("Archived envelope: {}", archived.name);
        }

        EnvelopeCommands::Unarchive { envelope } => {
            let existing = service.find(&session, profile_id, &envelope)?;
            let restored = service.unarchive(&session, profile_id, existing.id)?;
            println!("Restored envelope: {}", restored.name);
        }

        EnvelopeCommands::Delete { envelope } => {
            let existing = service.find(&session, profile_id, &envelope)?;
            let deleted = service.delete(&session, profile_id, existing.id)?;
            println!("Deleted envelope: {}", deleted.name);
        }

        EnvelopeCommands::Recompute => {
            let corrections = service.recompute_spent(&session, profile_id)?;
            print!("{}", format_corrections(&corrections));
        }
    }

    Ok(())
}
