//! Visit reservation request form (demo only: nothing is booked).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WidgetError};

pub const TIME_SLOTS: [&str; 6] = ["11:00", "12:00", "13:00", "18:00", "19:00", "20:00"];
pub const PARTY_SIZES: [&str; 4] = ["1名", "2名", "3名", "4名"];

pub const FORM_INTRO_MESSAGE: &str = "ご来店予約ですね。以下のフォームに入力をお願いします。";
pub const MISSING_FIELDS_ALERT: &str = "日付とお名前を入力してください";

/// Values typed into the form. Empty strings stand for untouched inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationForm {
    pub date: String,
    pub time: String,
    pub party_size: String,
    pub name: String,
}

impl Default for ReservationForm {
    /// Selects start on their first option, text inputs start empty
    fn default() -> Self {
        Self {
            date: String::new(),
            time: TIME_SLOTS[0].to_string(),
            party_size: PARTY_SIZES[0].to_string(),
            name: String::new(),
        }
    }
}

/// A form that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationRequest {
    pub date: NaiveDate,
    pub time: String,
    pub party_size: String,
    pub name: String,
}

impl ReservationForm {
    /// Date and name are required; time and party size must be one of the
    /// offered options.
    pub fn validate(&self) -> Result<ReservationRequest> {
        let name = self.name.trim();
        if self.date.trim().is_empty() || name.is_empty() {
            return Err(WidgetError::Reservation(MISSING_FIELDS_ALERT.to_string()));
        }

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|e| WidgetError::Reservation(format!("Invalid date {:?}: {}", self.date, e)))?;

        if !TIME_SLOTS.contains(&self.time.as_str()) {
            return Err(WidgetError::Reservation(format!("Unknown time slot {:?}", self.time)));
        }
        if !PARTY_SIZES.contains(&self.party_size.as_str()) {
            return Err(WidgetError::Reservation(format!("Unknown party size {:?}", self.party_size)));
        }

        Ok(ReservationRequest {
            date,
            time: self.time.clone(),
            party_size: self.party_size.clone(),
            name: name.to_string(),
        })
    }
}

/// Accepts `2`, `2名` or `2人` for a party size option
pub fn normalize_party_size(input: &str) -> String {
    let digits = input.trim().trim_end_matches(['名', '人']);
    format!("{}名", digits)
}
