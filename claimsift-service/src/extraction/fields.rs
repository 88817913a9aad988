//! Free-text field scanning for the dispute-claim form.
//!
//! The form has a fixed line layout: each prompt is printed on its own line
//! with the answer on the line below it. Card and account numbers are matched
//! by pattern anywhere in the text, and the dispute table rows are recognized
//! by their dollar amounts.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::report::{ClaimReport, FieldValue, NOT_AVAILABLE, TransactionEvent};

/// Spaced card-number groups, e.g. "1234 5678 9012 3456"
static CARD_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\s\d+\s\d+\s\d+)").expect("card number pattern"));

/// Account numbers may be partially masked with X or *
static ACCOUNT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Account Number:\s*([\dX*]+)").expect("account number pattern"));

/// Scan extracted form text and fill the matching report fields.
///
/// Lines that match nothing are ignored; fields with no matching line keep
/// their "N/A" placeholder.
pub fn apply_claim_text(report: &mut ClaimReport, text: &str) {
    let lines: Vec<&str> = text.split('\n').collect();

    for (idx, line) in lines.iter().enumerate() {
        let following = lines.get(idx + 1).map(|next| next.trim());

        if line.contains("Transaction was not authorized")
            && let Some(answer) = following
        {
            report.custom_data.not_authorized = answer.to_string();
        }

        if line.contains("Have you always had possession of your ATM/Debit card?")
            && let Some(answer) = following
        {
            report.custom_data.always_had_possession = answer.to_string();
        }

        if line.contains("Are you aware of the transaction?")
            && let Some(answer) = following
        {
            report.custom_data.aware_of_transaction = answer.to_string();
        }

        if line.contains("Where do you normally store your card?")
            && let Some(answer) = following
        {
            report.custom_data.card_storage = answer.to_string();
        }

        if line.contains("Where do you normally store your PIN?")
            && let Some(answer) = following
        {
            report.custom_data.pin_storage = answer.to_string();
        }

        if line.contains("Why are you disputing the transaction(s)?")
            && let Some(answer) = following
        {
            report.custom_data.dispute_reason = answer.to_string();
        }

        if line.contains("Date the error was first noticed")
            && let Some(raw) = following
        {
            report.custom_data.noticed_date = normalize_noticed_date(raw);
        }

        if let Some(card) = CARD_NUMBER.captures(line)
            && let Some(last_four) = last_four_digits(&card[1])
        {
            report.custom_data.last_four_digits = FieldValue::Number(last_four);
        }

        if let Some(account) = ACCOUNT_NUMBER.captures(line) {
            report.instruments.push(account[1].to_string());
        }

        if line.contains('$')
            && let Some(event) = parse_transaction_line(line)
        {
            report.events.push(event);
        }
    }
}

/// Convert the form's MM.DD.YY date to MM/DD/YYYY; keep the raw value when it
/// does not parse.
fn normalize_noticed_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, "%m.%d.%y") {
        Ok(date) => date.format("%m/%d/%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Last four digits of a spaced card-number match
fn last_four_digits(card: &str) -> Option<i64> {
    let tail = &card[card.len().saturating_sub(4)..];
    tail.trim().parse().ok()
}

/// Dispute table rows read as: date, dollar amount, merchant description
fn parse_transaction_line(line: &str) -> Option<TransactionEvent> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }

    let amount = parts[1].replace(['$', ','], "").parse::<f64>().ok();

    Some(TransactionEvent {
        event_type: NOT_AVAILABLE.to_string(),
        event_id: NOT_AVAILABLE.to_string(),
        date: parts[0].to_string(),
        amount,
        merchant_description: parts[2..].join(" "),
    })
}
