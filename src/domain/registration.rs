use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{phone_number::PhoneNumberDomain, user_email::UserEmail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep{
    BasicInfo,
    OwnerInfo,
    Documents
}

impl WizardStep {
    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "basic_info" => Some(WizardStep::BasicInfo),
            "owner_info" => Some(WizardStep::OwnerInfo),
            "documents" => Some(WizardStep::Documents),
            _ => None
        }
    }

    // Session key the validated step is stored under
    pub fn session_key(&self) -> &'static str{
        match self {
            WizardStep::BasicInfo => "registration_basic_info",
            WizardStep::OwnerInfo => "registration_owner_info",
            WizardStep::Documents => "registration_documents"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus{
    Pending,
    Approved,
    Rejected
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str{
        match self {
            DraftStatus::Pending => "pending",
            DraftStatus::Approved => "approved",
            DraftStatus::Rejected => "rejected"
        }
    }
}

// (field, message) pairs, reported back to the client as a map
pub type FieldErrors = Vec<(&'static str, String)>;

fn required(errors: &mut FieldErrors, field: &'static str, value: &str){
    if value.trim().is_empty() {
        errors.push((field, "This field is required".to_string()));
    }
}

fn finish(errors: FieldErrors) -> Result<(), FieldErrors>{
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicInfo{
    pub name: String,
    pub city_id: Uuid,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_capacity")]
    pub capacity: i32
}

fn default_capacity() -> i32{
    super::reservation::DEFAULT_CAPACITY
}

impl BasicInfo {
    pub fn validate(&self) -> Result<(), FieldErrors>{
        let mut errors = Vec::new();
        required(&mut errors, "name", &self.name);
        required(&mut errors, "address", &self.address);

        if let Err(e) = PhoneNumberDomain::parse(self.phone.clone()) {
            errors.push(("phone", e));
        }
        if let Err(e) = UserEmail::parse(self.email.clone()) {
            errors.push(("email", e));
        }
        if self.capacity < 0 {
            errors.push(("capacity", "Capacity cannot be negative".to_string()));
        }

        finish(errors)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerInfo{
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_email: String,
    pub owner_phone: String
}

impl OwnerInfo {
    pub fn validate(&self) -> Result<(), FieldErrors>{
        let mut errors = Vec::new();
        required(&mut errors, "owner_first_name", &self.owner_first_name);
        required(&mut errors, "owner_last_name", &self.owner_last_name);

        if let Err(e) = UserEmail::parse(self.owner_email.clone()) {
            errors.push(("owner_email", e));
        }
        if let Err(e) = PhoneNumberDomain::parse(self.owner_phone.clone()) {
            errors.push(("owner_phone", e));
        }

        finish(errors)
    }
}

/// Storage paths of the uploaded documents and photos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Documents{
    pub owner_id_card: String,
    pub business_registration: String,
    pub food_safety_certificate: String,
    #[serde(default)]
    pub tax_document: Option<String>,
    pub main_image: String,
    pub interior_image: String,
    pub menu_sample: String
}

impl Documents {
    pub fn validate(&self) -> Result<(), FieldErrors>{
        let mut errors = Vec::new();
        required(&mut errors, "owner_id_card", &self.owner_id_card);
        required(&mut errors, "business_registration", &self.business_registration);
        required(&mut errors, "food_safety_certificate", &self.food_safety_certificate);
        required(&mut errors, "main_image", &self.main_image);
        required(&mut errors, "interior_image", &self.interior_image);
        required(&mut errors, "menu_sample", &self.menu_sample);

        finish(errors)
    }
}

// Username for an approved owner, derived from the owner email
pub fn username_from_email(email: &str, suffix: &str) -> String{
    let local: String = email.split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
        .collect();

    let local = if local.is_empty() { "restaurant".to_string() } else { local.to_lowercase() };
    format!("{}_{}", local, suffix.to_lowercase())
}
