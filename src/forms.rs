//! Request bodies for the create/edit forms and their validation.
//!
//! Each form is deserialized as submitted, validated, and turned into the
//! matching write payload from `db::models`. Nothing here touches the database.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::models::{
    AnimalInput, AnimalSize, AnimalStatus, AnimalType, ApplicationStatus, DonationType, Gender,
    NewDonation, ProjectCategory, ProjectInput, ShelterInput,
};

pub const MIN_DONATION_AMOUNT: i64 = 100;
pub const PRESET_DONATION_AMOUNTS: [i64; 4] = [500, 1000, 2500, 5000];

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0}")]
pub struct ValidationError(pub String);

fn invalid<T>(message: &str) -> Result<T, ValidationError> {
    Err(ValidationError(message.to_string()))
}

fn required(value: &str, field: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return invalid(&format!("{} is required", field));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Integer prefix of `value`, so "150.5" reads as 150.
fn leading_integer(value: &str) -> Option<i64> {
    let digits_start = usize::from(value.starts_with(['-', '+']));
    let end = value[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value.len(), |i| i + digits_start);
    if end == digits_start {
        return None;
    }
    value[..end].parse().ok()
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShelterForm {
    pub name: String,
    pub address: String,
    pub contact_number: String,
    pub email: String,
    pub description: String,
}

impl ShelterForm {
    pub fn validate(&self) -> Result<ShelterInput, ValidationError> {
        let name = required(&self.name, "Name")?;
        let address = required(&self.address, "Address")?;
        let contact_number = required(&self.contact_number, "Contact number")?;
        let email = required(&self.email, "Email")?;
        if !looks_like_email(&email) {
            return invalid("Email must be a valid address");
        }
        let description = required(&self.description, "Description")?;

        Ok(ShelterInput {
            name,
            address,
            contact_number,
            email,
            description: Some(description),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnimalForm {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AnimalType,
    pub breed: Option<String>,
    pub age_years: Option<i64>,
    pub age_months: Option<i64>,
    pub is_age_unknown: bool,
    pub gender: Option<Gender>,
    pub size: Option<AnimalSize>,
    pub weight_kg: Option<f64>,
    pub description: Option<String>,
    pub medical_history: Option<String>,
    pub behavior_notes: Option<String>,
    pub special_needs: Option<String>,
    pub status: AnimalStatus,
    pub treatment_details: Option<String>,
    pub primary_image_url: Option<String>,
    pub is_featured: bool,
}

impl AnimalForm {
    pub fn validate(&self) -> Result<AnimalInput, ValidationError> {
        let name = required(&self.name, "Name")?;

        let (age_years, age_months) = if self.is_age_unknown {
            (None, None)
        } else {
            (Some(self.age_years.unwrap_or(0)), Some(self.age_months.unwrap_or(0)))
        };
        if age_years.is_some_and(|y| y < 0) {
            return invalid("Age in years cannot be negative");
        }
        if age_months.is_some_and(|m| !(0..=11).contains(&m)) {
            return invalid("Age in months must be between 0 and 11");
        }

        if let Some(weight) = self.weight_kg {
            if !weight.is_finite() || weight < 0.0 {
                return invalid("Weight cannot be negative");
            }
        }

        let treatment_details = if self.status == AnimalStatus::UnderTreatment {
            optional_text(&self.treatment_details)
        } else {
            None
        };

        Ok(AnimalInput {
            id: optional_text(&self.id),
            name,
            kind: self.kind,
            breed: optional_text(&self.breed),
            age_years,
            age_months,
            gender: self.gender,
            size: self.size,
            weight_kg: self.weight_kg,
            description: optional_text(&self.description),
            medical_history: optional_text(&self.medical_history),
            behavior_notes: optional_text(&self.behavior_notes),
            special_needs: optional_text(&self.special_needs),
            status: self.status,
            treatment_details,
            primary_image_url: optional_text(&self.primary_image_url),
            is_featured: self.is_featured,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: ProjectCategory,
    pub target_amount: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub image_url: Option<String>,
}

impl ProjectForm {
    pub fn validate(&self) -> Result<ProjectInput, ValidationError> {
        let title = required(&self.title, "Title")?;
        let description = required(&self.description, "Description")?;
        if !self.target_amount.is_finite() || self.target_amount < 0.0 {
            return invalid("Target amount cannot be negative");
        }
        let Some(start_date) = self.start_date else {
            return invalid("Start date is required");
        };
        let Some(end_date) = self.end_date else {
            return invalid("End date is required");
        };
        if end_date < start_date {
            return invalid("End date cannot be before start date");
        }

        Ok(ProjectInput {
            id: optional_text(&self.id),
            title,
            description,
            category: self.category,
            target_amount: self.target_amount,
            start_date,
            end_date,
            image_url: optional_text(&self.image_url),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DonationForm {
    /// One of the preset buttons; ignored when a custom amount is typed.
    pub selected_amount: Option<i64>,
    pub custom_amount: Option<String>,
    pub donation_type: DonationType,
    pub shelter_id: Option<String>,
    pub project_id: Option<String>,
    pub email: Option<String>,
}

impl DonationForm {
    /// Custom amount wins over the selected preset; the preset defaults to
    /// the first button.
    pub fn resolve_amount(&self) -> Result<i64, ValidationError> {
        let amount = match optional_text(&self.custom_amount) {
            Some(custom) => match leading_integer(&custom) {
                Some(value) => value,
                None => return invalid("Please enter a valid amount"),
            },
            None => self.selected_amount.unwrap_or(PRESET_DONATION_AMOUNTS[0]),
        };
        if amount < MIN_DONATION_AMOUNT {
            return invalid(&format!("Minimum donation amount is {}", MIN_DONATION_AMOUNT));
        }
        Ok(amount)
    }

    pub fn validate_for_donor(
        &self,
        donor_id: &str,
        donor_email: &str,
    ) -> Result<NewDonation, ValidationError> {
        let amount = self.resolve_amount()?;
        Ok(NewDonation {
            shelter_id: optional_text(&self.shelter_id),
            project_id: optional_text(&self.project_id),
            donor_id: Some(donor_id.to_string()),
            email: Some(donor_email.to_string()),
            amount,
            is_anonymous: false,
            donation_type: self.donation_type,
        })
    }

    /// Anonymous checkout: no account, an email for the receipt and impact report.
    pub fn validate_anonymous(&self) -> Result<NewDonation, ValidationError> {
        let amount = self.resolve_amount()?;
        let Some(email) = optional_text(&self.email) else {
            return invalid("Email is required");
        };
        if !looks_like_email(&email) {
            return invalid("Email must be a valid address");
        }
        Ok(NewDonation {
            shelter_id: optional_text(&self.shelter_id),
            project_id: optional_text(&self.project_id),
            donor_id: None,
            email: Some(email),
            amount,
            is_anonymous: true,
            donation_type: self.donation_type,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub review_notes: String,
}

impl ReviewForm {
    pub fn decision(&self) -> Result<ApplicationStatus, ValidationError> {
        match self.status {
            ApplicationStatus::Approved | ApplicationStatus::Rejected => Ok(self.status),
            _ => invalid("Review decision must be approved or rejected"),
        }
    }
}
