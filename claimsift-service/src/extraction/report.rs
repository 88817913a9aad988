//! Claim report wire model.
//!
//! Field names mirror the wording printed on the dispute-claim form, quirks
//! included, because downstream consumers key on the exact strings.

use serde::Serialize;

/// Placeholder for answers the form did not provide
pub const NOT_AVAILABLE: &str = "N/A";

/// The assembled claim report returned by the extract endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReport {
    pub alert_type: String,
    pub status: String,
    pub custom_data: CustomData,
    pub instruments: Vec<String>,
    pub entities: Vec<Entity>,
    pub events: Vec<TransactionEvent>,
    pub title: String,
    pub created_at: String,
    pub alert_id: String,
}

impl Default for ClaimReport {
    fn default() -> Self {
        Self {
            alert_type: na(),
            status: na(),
            custom_data: CustomData::default(),
            instruments: Vec::new(),
            entities: vec![Entity::default()],
            events: Vec::new(),
            title: na(),
            created_at: na(),
            alert_id: na(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub entity_id: String,
}

impl Default for Entity {
    fn default() -> Self {
        Self { entity_id: na() }
    }
}

/// One transaction line scraped from the form's dispute table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionEvent {
    pub event_type: String,
    pub event_id: String,
    pub date: String,
    /// Parsed dollar amount; null when the token was not numeric
    pub amount: Option<f64>,
    pub merchant_description: String,
}

/// A form answer that is either free text or a parsed number
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(i64),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(na())
    }
}

/// The form's answers, keyed by the exact wording printed on the form
#[derive(Debug, Clone, Serialize)]
pub struct CustomData {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Last four digits of card")]
    pub last_four_digits: FieldValue,

    #[serde(rename = "Amount")]
    pub amount: String,

    #[serde(rename = "Transaction date")]
    pub transaction_date: String,

    #[serde(rename = "Merchant name")]
    pub merchant_name: String,

    #[serde(rename = "Transaction was not authorized")]
    pub not_authorized: String,

    #[serde(rename = "At the time of the transaction the card was:")]
    pub card_disposition: String,

    #[serde(rename = "Have you always had possession of your ATM/Debit card?")]
    pub always_had_possession: String,

    #[serde(rename = "Are you aware of the transaction?")]
    pub aware_of_transaction: String,

    #[serde(rename = "date you lost your card")]
    pub date_lost: String,

    #[serde(rename = "Time you lost your card")]
    pub time_lost: String,

    #[serde(rename = "Date you realised card was stolen")]
    pub date_stolen: String,

    #[serde(rename = "Time you realised card was stolen")]
    pub time_stolen: String,

    #[serde(rename = "Do you know who made the transaction")]
    pub known_transactor: String,

    #[serde(rename = "When was the last time you used your card")]
    pub last_card_use: String,

    #[serde(rename = "Last transaction amount")]
    pub last_transaction_amount: String,

    #[serde(rename = "Where do you normally store your card")]
    pub card_storage: String,

    #[serde(rename = "where do you normally store your PIN")]
    pub pin_storage: String,

    #[serde(rename = "Other items that were stolen")]
    pub other_stolen_items: String,

    #[serde(rename = "Have you filed police report")]
    pub police_report_filed: String,

    #[serde(rename = "Officer name")]
    pub officer_name: String,

    #[serde(rename = "Report number")]
    pub report_number: String,

    #[serde(rename = "Suspect name")]
    pub suspect_name: String,

    #[serde(rename = "Date")]
    pub noticed_date: String,

    #[serde(rename = "contact number")]
    pub contact_number: String,

    #[serde(rename = "Reason for dispute")]
    pub dispute_reason: String,
}

impl Default for CustomData {
    fn default() -> Self {
        Self {
            name: na(),
            last_four_digits: FieldValue::default(),
            amount: na(),
            transaction_date: na(),
            merchant_name: na(),
            not_authorized: na(),
            card_disposition: na(),
            always_had_possession: na(),
            aware_of_transaction: na(),
            date_lost: na(),
            time_lost: na(),
            date_stolen: na(),
            time_stolen: na(),
            known_transactor: na(),
            last_card_use: na(),
            last_transaction_amount: na(),
            card_storage: na(),
            pin_storage: na(),
            other_stolen_items: na(),
            police_report_filed: na(),
            officer_name: na(),
            report_number: na(),
            suspect_name: na(),
            noticed_date: na(),
            contact_number: na(),
            dispute_reason: na(),
        }
    }
}

fn na() -> String {
    NOT_AVAILABLE.to_string()
}
