//! User CLI commands

use clap::Subcommand;

use crate::error::EnvelopeResult;
use crate::services::UserService;

use super::CliContext;

/// User subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user record for an e-mail address
    Register {
        email: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Show the acting user
    Whoami,
    /// Edit the acting user's display fields
    Edit {
        /// New display name (empty to clear)
        #[arg(short, long)]
        name: Option<String>,
        /// New avatar URL (empty to clear)
        #[arg(short, long)]
        avatar: Option<String>,
    },
    /// List all users
    List,
}

/// Empty input clears an optional field
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| Some(v).filter(|v| !v.trim().is_empty()))
}

pub fn handle_user_command(ctx: &CliContext<'_>, cmd: UserCommands) -> EnvelopeResult<()> {
    let service = UserService::new(ctx.storage);

    match cmd {
        UserCommands::Register { email, name } => {
            let user = service.register(&email, name)?;
            println!("Registered user: {}", user);
            println!("  ID: {}", user.id);
        }

        UserCommands::Whoami => {
            let user = service.current(&ctx.session()?)?;
            println!("{}", user);
            println!("  ID: {}", user.id);
            if let Some(avatar) = &user.avatar_url {
                println!("  Avatar: {}", avatar);
            }
        }

        UserCommands::Edit { name, avatar } => {
            let user =
                service.update_profile(&ctx.session()?, clearable(name), clearable(avatar))?;
            println!("Updated user: {}", user);
        }

        UserCommands::List => {
            let users = service.list()?;
            if users.is_empty() {
                println!("No users registered.");
            }
            for user in users {
                println!("{}  {}", user.id.short(), user);
            }
        }
    }

    Ok(())
}
