//! Transaction display formatting

use std::collections::HashMap;

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{EnvelopeId, Transaction, TransactionType};

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Envelope")]
    envelope: String,
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Signed view of the amount: money out is shown negative
fn signed_amount(txn: &Transaction) -> String {
    match txn.transaction_type {
        TransactionType::Expense => format!("{}", -txn.amount),
        TransactionType::Income | TransactionType::Transfer => txn.amount.to_string(),
    }
}

/// Transactions as a table, resolving envelope names from `envelope_names`
pub fn format_transaction_register(
    transactions: &[Transaction],
    envelope_names: &HashMap<EnvelopeId, String>,
) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let rows: Vec<TransactionRow> = transactions
        .iter()
        .map(|txn| TransactionRow {
            id: txn.id.short(),
            date: txn.date.format("%Y-%m-%d").to_string(),
            description: truncate(&txn.description, 30),
            kind: txn.transaction_type.to_string(),
            amount: signed_amount(txn),
            envelope: match txn.envelope_id {
                Some(id) => envelope_names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| id.short()),
                None => "(unassigned)".to_string(),
            },
        })
        .collect();

    format!("{}\n", Table::new(rows).with(Style::sharp()))
}

pub fn format_transaction_details(txn: &Transaction, envelope_name: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str(&format!("Transaction: {}\n", txn.id));
    output.push_str(&format!("Date:        {}\n", txn.date.format("%Y-%m-%d")));
    output.push_str(&format!("Description: {}\n", txn.description));
    output.push_str(&format!("Type:        {}\n", txn.transaction_type));
    output.push_str(&format!("Amount:      {}\n", txn.amount));
    match envelope_name {
        Some(name) => output.push_str(&format!("Envelope:    {}\n", name)),
        None => output.push_str("Envelope:    (unassigned)\n"),
    }
    output.push_str(&format!(
        "Created:     {}\n",
        txn.created_at.format("%Y-%m-%d %H:%M")
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, ProfileId};
    use chrono::NaiveDate;

    fn txn(kind: TransactionType) -> Transaction {
        Transaction::new(
            ProfileId::new(),
            "Weekly groceries at the market",
            Money::from_cents(4_250),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            kind,
        )
    }

    #[test]
    fn test_empty_register() {
        assert_eq!(
            format_transaction_register(&[], &HashMap::new()),
            "No transactions found.\n"
        );
    }

    #[test]
    fn test_register_signs_and_envelopes() {
        let mut expense = txn(TransactionType::Expense);
        let envelope_id = EnvelopeId::new();
        expense.envelope_id = Some(envelope_id);
        let income = txn(TransactionType::Income);

        let names = HashMap::from([(envelope_id, "Groceries".to_string())]);
        let output = format_transaction_register(&[expense, income], &names);

        assert!(output.contains("-42.50"));
        assert!(output.contains("Groceries"));
        assert!(output.contains("(unassigned)"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long description", 10), "a very ...");
    }

    #[test]
    fn test_details() {
        let output = format_transaction_details(&txn(TransactionType::Income), None);
        assert!(output.contains("Type:        INCOME"));
        assert!(output.contains("(unassigned)"));
    }
}
