//! Form payloads and their validation.

use serde::{Deserialize, Serialize};

use mediconnect_core::{DoctorRecord, NewDoctor, SearchFilter};

/// Field-level validation messages, in form order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors(pub Vec<(&'static str, String)>);

impl FormErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message for one field, if it failed validation.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, msg)| msg.as_str())
    }
}

/// Raw create/update form. Everything arrives as text so that bad numbers
/// can be reported back instead of rejected by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorForm {
    pub full_name: String,
    pub specialty: String,
    pub city: String,
    pub address: String,
    pub rating: String,
    pub fees: String,
    pub phone: String,
}

impl DoctorForm {
    /// Prefill from a stored record.
    pub fn from_record(record: &DoctorRecord) -> Self {
        Self {
            full_name: record.full_name.clone(),
            specialty: record.specialty.clone(),
            city: record.city.clone(),
            address: record.address.clone(),
            rating: record.rating.to_string(),
            fees: record.fees.to_string(),
            phone: record.phone.clone(),
        }
    }

    pub fn validate(&self) -> Result<NewDoctor, FormErrors> {
        let mut errors = FormErrors::default();

        for (field, label, value) in [
            ("full_name", "Full name", &self.full_name),
            ("specialty", "Specialty", &self.specialty),
            ("city", "City", &self.city),
        ] {
            if value.trim().is_empty() {
                errors.push(field, format!("{} is required.", label));
            }
        }

        let rating = match parse_number(&self.rating) {
            Some(Ok(r)) if (0.0..=5.0).contains(&r) => r,
            Some(Ok(_)) => {
                errors.push("rating", "Rating must be between 0 and 5.");
                0.0
            }
            Some(Err(())) => {
                errors.push("rating", "Rating must be a number.");
                0.0
            }
            None => {
                errors.push("rating", "Rating is required.");
                0.0
            }
        };

        let fees = match parse_number(&self.fees) {
            Some(Ok(f)) if f >= 0.0 => f,
            Some(Ok(_)) => {
                errors.push("fees", "Fees cannot be negative.");
                0.0
            }
            Some(Err(())) => {
                errors.push("fees", "Fees must be a number.");
                0.0
            }
            None => {
                errors.push("fees", "Fees are required.");
                0.0
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewDoctor {
            full_name: self.full_name.trim().to_string(),
            specialty: self.specialty.trim().to_string(),
            city: self.city.trim().to_string(),
            address: self.address.trim().to_string(),
            rating,
            fees,
            phone: self.phone.trim().to_string(),
        })
    }
}

/// Raw recommendation form; blank fields impose no constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendForm {
    pub specialty: String,
    pub city: String,
    pub max_fees: String,
    pub min_rating: String,
}

impl RecommendForm {
    pub fn to_filter(&self) -> Result<SearchFilter, FormErrors> {
        let mut errors = FormErrors::default();
        let mut number = |field: &'static str, label: &str, raw: &str| match parse_number(raw) {
            None => None,
            Some(Ok(n)) => Some(n),
            Some(Err(())) => {
                errors.push(field, format!("{} must be a number.", label));
                None
            }
        };
        let max_fees = number("max_fees", "Maximum fees", &self.max_fees);
        let min_rating = number("min_rating", "Minimum rating", &self.min_rating);

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(SearchFilter {
            specialty: Some(self.specialty.clone()),
            city: Some(self.city.clone()),
            max_fees,
            min_rating,
        }
        .normalized())
    }
}

/// Chat turn submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatForm {
    pub message: String,
}

/// JSON body of the avatar endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AvatarApiRequest {
    pub description: Option<String>,
    pub name: Option<String>,
    pub use_imagen: bool,
}

/// `None` for blank input, otherwise the parsed value.
fn parse_number(raw: &str) -> Option<Result<f64, ()>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or(()),
    )
}
