use std::fmt::Debug;

use phonenumber::country;

// Phone numbers are interpreted as Moroccan when no country prefix is given
#[derive(Debug, Clone)]
pub struct PhoneNumberDomain(pub String);

impl PhoneNumberDomain{
    pub fn parse(number: String) -> Result<PhoneNumberDomain, String>{
        let trimmed = number.trim();
        if trimmed.is_empty() {
            return Err("phone number is required".to_string())
        }

        if phonenumber::parse(Some(country::MA), trimmed).is_ok(){
            Ok(Self(trimmed.to_string()))
        } else {
            Err(format!("{} is not a valid phone number", number))
        }
    }

    pub fn inner(&self) -> String {
        self.0.clone()
    }
}

impl std::fmt::Display for PhoneNumberDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
