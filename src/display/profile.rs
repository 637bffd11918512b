//! Profile, member and invitation display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{BudgetProfile, Invitation, Role};
use crate::services::Member;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Currency")]
    currency: String,
    #[tabled(rename = "Your role")]
    role: String,
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "E-mail")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Since")]
    since: String,
}

#[derive(Tabled)]
struct InvitationRow {
    #[tabled(rename = "E-mail")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

pub fn format_profile_list(profiles: &[(BudgetProfile, Role)]) -> String {
    if profiles.is_empty() {
        return "You are not a member of any budget profile.\n".to_string();
    }

    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|(profile, role)| ProfileRow {
            id: profile.id.to_string(),
            name: profile.name.clone(),
            currency: profile.currency.clone(),
            role: role.to_string(),
        })
        .collect();
    format!("{}\n", Table::new(rows).with(Style::sharp()))
}

pub fn format_profile_details(profile: &BudgetProfile, member_count: usize) -> String {
    let mut output = String::new();
    output.push_str(&format!("Profile:  {}\n", profile.name));
    output.push_str(&format!("ID:       {}\n", profile.id));
    output.push_str(&format!("Currency: {}\n", profile.currency));
    output.push_str(&format!("Members:  {}\n", member_count));
    output
}

pub fn format_member_list(members: &[Member]) -> String {
    if members.is_empty() {
        return "No members.\n".to_string();
    }

    let rows: Vec<MemberRow> = members
        .iter()
        .map(|m| MemberRow {
            user: m.user.name.clone().unwrap_or_default(),
            email: m.user.email.clone(),
            role: m.membership.role.to_string(),
            since: m.membership.created_at.format("%Y-%m-%d").to_string(),
        })
        .collect();
    format!("{}\n", Table::new(rows).with(Style::sharp()))
}

pub fn format_invitation_list(invitations: &[Invitation]) -> String {
    if invitations.is_empty() {
        return "No invitations.\n".to_string();
    }

    let rows: Vec<InvitationRow> = invitations
        .iter()
        .map(|i| InvitationRow {
            email: i.email.clone(),
            role: i.role.to_string(),
            status: i.status.to_string(),
            expires: i.expires_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    format!("{}\n", Table::new(rows).with(Style::sharp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Membership, User, UserId};

    #[test]
    fn test_member_list() {
        let user = User::new("ana@example.com", Some("Ana".into()));
        let profile = BudgetProfile::new(UserId::new(), "Home", "USD");
        let membership = Membership::new(user.id, profile.id, Role::Admin);

        let output = format_member_list(&[Member { membership, user }]);
        assert!(output.contains("ana@example.com"));
        assert!(output.contains("ADMIN"));
    }

    #[test]
    fn test_empty_profile_list() {
        assert!(format_profile_list(&[]).contains("not a member"));
    }
}
