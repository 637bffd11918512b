//! Profile, member and invitation CLI commands

use chrono::Utc;
use clap::Subcommand;

use crate::display::{
    format_invitation_list, format_member_list, format_profile_details, format_profile_list,
};
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{Role, UserId};
use crate::services::{InvitationService, MembershipService, ProfileService, UserService};

use super::CliContext;

/// Budget profile subcommands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Create a new budget profile owned by you
    Create {
        name: String,
        /// ISO currency code
        #[arg(short, long)]
        currency: Option<String>,
        /// Seed the profile with starter envelopes
        #[arg(long)]
        seed: bool,
    },
    /// List profiles you belong to
    List,
    /// Show the current profile
    Show,
    /// Rename the profile or change its currency
    Edit {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        currency: Option<String>,
    },
    /// Delete the profile and everything in it
    Delete {
        /// Skip the confirmation check
        #[arg(short, long)]
        force: bool,
    },
}

/// Membership subcommands
#[derive(Subcommand)]
pub enum MemberCommands {
    /// List members of the current profile
    List,
    /// Change a member's role
    Role {
        /// Member e-mail
        email: String,
        /// New role (member, admin)
        role: String,
    },
    /// Remove a member from the profile
    Remove {
        /// Member e-mail
        email: String,
    },
}

/// Invitation subcommands
#[derive(Subcommand)]
pub enum InviteCommands {
    /// Invite an e-mail address to the current profile
    Send {
        email: String,
        /// Role granted on acceptance
        #[arg(short, long, default_value = "member")]
        role: String,
    },
    /// List the current profile's invitations
    List,
    /// Accept an invitation addressed to you
    Accept { token: String },
    /// Decline an invitation addressed to you
    Decline { token: String },
    /// Mark overdue pending invitations as expired
    Expire,
}

fn parse_role(input: &str) -> EnvelopeResult<Role> {
    Role::parse(input).ok_or_else(|| {
        EnvelopeError::Validation(format!(
            "Unknown role: '{}'. Expected member, admin or owner",
            input
        ))
    })
}

fn user_id_for(ctx: &CliContext<'_>, email: &str) -> EnvelopeResult<UserId> {
    UserService::new(ctx.storage)
        .find_by_email(email)?
        .map(|u| u.id)
        .ok_or_else(|| EnvelopeError::user_not_found(email))
}

pub fn handle_profile_command(ctx: &CliContext<'_>, cmd: ProfileCommands) -> EnvelopeResult<()> {
    let service = ProfileService::new(ctx.storage);

    match cmd {
        ProfileCommands::Create {
            name,
            currency,
            seed,
        } => {
            let session = ctx.session()?;
            let currency = currency.unwrap_or_else(|| ctx.settings.default_currency.clone());
            let profile = service.create(&session, &name, &currency, seed)?;
            println!("Created profile: {}", profile.name);
            println!("  ID:       {}", profile.id);
            println!("  Currency: {}", profile.currency);
            if seed {
                println!("  Seeded with starter envelopes");
            }
        }

        ProfileCommands::List => {
            let profiles = service.list_for_user(&ctx.session()?)?;
            print!("{}", format_profile_list(&profiles));
        }

        ProfileCommands::Show => {
            let (session, profile_id) = ctx.scope()?;
            let profile = service.get(&session, profile_id)?;
            let members = MembershipService::new(ctx.storage).list_members(&session, profile_id)?;
            print!("{}", format_profile_details(&profile, members.len()));
        }

        ProfileCommands::Edit { name, currency } => {
            if name.is_none() && currency.is_none() {
                println!("No changes specified. Use --name or --currency.");
                return Ok(());
            }
            let (session, profile_id) = ctx.scope()?;
            let profile = service.update(&session, profile_id, name, currency)?;
            println!("Updated profile: {} ({})", profile.name, profile.currency);
        }

        ProfileCommands::Delete { force } => {
            let (session, profile_id) = ctx.scope()?;
            if !force {
                let profile = service.get(&session, profile_id)?;
                println!(
                    "This permanently deletes '{}' with all envelopes and transactions.",
                    profile.name
                );
                println!("Use --force to confirm.");
                return Ok(());
            }
            let deletion = service.delete(&session, profile_id)?;
            println!("Deleted profile: {}", deletion.profile.name);
            println!(
                "  Removed {} envelopes, {} transactions, {} invitations",
                deletion.envelopes, deletion.transactions, deletion.invitations
            );
        }
    }

    Ok(())
}

pub fn handle_member_command(ctx: &CliContext<'_>, cmd: MemberCommands) -> EnvelopeResult<()> {
    let service = MembershipService::new(ctx.storage);
    let (session, profile_id) = ctx.scope()?;

    match cmd {
        MemberCommands::List => {
            let members = service.list_members(&session, profile_id)?;
            print!("{}", format_member_list(&members));
        }

        MemberCommands::Role { email, role } => {
            let role = parse_role(&role)?;
            let target = user_id_for(ctx, &email)?;
            let membership = service.update_role(&session, profile_id, target, role)?;
            println!("{} is now {}", email, membership.role);
        }

        MemberCommands::Remove { email } => {
            let target = user_id_for(ctx, &email)?;
            service.remove_member(&session, profile_id, target)?;
            println!("Removed {} from the profile", email);
        }
    }

    Ok(())
}

pub fn handle_invite_command(ctx: &CliContext<'_>, cmd: InviteCommands) -> EnvelopeResult<()> {
    let service =
        InvitationService::new(ctx.storage).with_ttl_days(ctx.settings.invitation_ttl_days);

    match cmd {
        InviteCommands::Send { email, role } => {
            let role = parse_role(&role)?;
            let (session, profile_id) = ctx.scope()?;
            let invitation = service.invite(&session, profile_id, &email, role)?;
            println!("Invited {} as {}", invitation.email, invitation.role);
            println!("  Token:   {}", invitation.token);
            println!(
                "  Expires: {}",
                invitation.expires_at.format("%Y-%m-%d %H:%M")
            );
        }

        InviteCommands::List => {
            let (session, profile_id) = ctx.scope()?;
            let invitations = service.list(&session, profile_id)?;
            print!("{}", format_invitation_list(&invitations));
        }

        InviteCommands::Accept { token } => {
            let membership = service.accept(&ctx.session()?, &token)?;
            println!("Joined profile {} as {}", membership.profile_id, membership.role);
        }

        InviteCommands::Decline { token } => {
            let invitation = service.decline(&ctx.session()?, &token)?;
            println!("Declined invitation to {}", invitation.profile_id);
        }

        InviteCommands::Expire => {
            let count = service.expire_stale(Utc::now())?;
            println!("Expired {} invitation(s)", count);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("ADMIN").unwrap(), Role::Admin);
        assert!(parse_role("boss").unwrap_err().is_user_error());
    }
}
