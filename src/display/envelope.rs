//! Envelope display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::Envelope;
use crate::services::SpentCorrection;

#[derive(Tabled)]
struct EnvelopeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Spent")]
    spent: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
}

impl From<&Envelope> for EnvelopeRow {
    fn from(envelope: &Envelope) -> Self {
        let mut name = envelope.name.clone();
        if envelope.archived {
            name.push_str(" (archived)");
        }
        let remaining = if envelope.is_overspent() {
            format!("{} !", envelope.remaining())
        } else {
            envelope.remaining().to_string()
        };

        Self {
            id: envelope.id.short(),
            name,
            category: envelope.category.clone(),
            target: envelope.target_amount.to_string(),
            spent: envelope.spent.to_string(),
            remaining,
        }
    }
}

pub fn format_envelope_list(envelopes: &[Envelope]) -> String {
    if envelopes.is_empty() {
        return "No envelopes found.\n".to_string();
    }

    let rows: Vec<EnvelopeRow> = envelopes.iter().map(EnvelopeRow::from).collect();
    format!("{}\n", Table::new(rows).with(Style::sharp()))
}

pub fn format_envelope_details(envelope: &Envelope, currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Envelope:  {}\n", envelope.name));
    output.push_str(&format!("ID:        {}\n", envelope.id));
    if !envelope.category.is_empty() {
        output.push_str(&format!("Category:  {}\n", envelope.category));
    }
    output.push_str(&format!(
        "Target:    {}\n",
        envelope.target_amount.format_with_currency(currency)
    ));
    output.push_str(&format!(
        "Spent:     {}\n",
        envelope.spent.format_with_currency(currency)
    ));
    output.push_str(&format!(
        "Remaining: {}\n",
        envelope.remaining().format_with_currency(currency)
    ));
    if envelope.archived {
        output.push_str("Status:    Archived\n");
    }

    output
}

pub fn format_corrections(corrections: &[SpentCorrection]) -> String {
    if corrections.is_empty() {
        return "All envelope balances match their transactions.\n".to_string();
    }

    let mut output = format!("Corrected {} envelope(s):\n", corrections.len());
    for c in corrections {
        output.push_str(&format!("  {}: {} -> {}\n", c.name, c.stored, c.recomputed));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, ProfileId};

    #[test]
    fn test_empty_list() {
        assert_eq!(format_envelope_list(&[]), "No envelopes found.\n");
    }

    #[test]
    fn test_list_contains_values() {
        let mut envelope = Envelope::new(ProfileId::new(), "Groceries", "Needs", Money::from_cents(10_000));
        envelope.spent = Money::from_cents(12_500);

        let output = format_envelope_list(&[envelope]);
        assert!(output.contains("Groceries"));
        assert!(output.contains("125.00"));
        assert!(output.contains("-25.00 !"));
    }

    #[test]
    fn test_details() {
        let envelope = Envelope::new(ProfileId::new(), "Rent", "Bills", Money::from_cents(150_000));
        let output = format_envelope_details(&envelope, "EUR");
        assert!(output.contains("Target:    1500.00 EUR"));
        assert!(!output.contains("Archived"));
    }
}
