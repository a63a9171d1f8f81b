use validator::ValidateEmail;

#[derive(Debug, Clone)]
pub struct UserEmail(pub String);

impl UserEmail {
    pub fn parse(email: String) -> Result<UserEmail, String>{
        if email.validate_email() {
            Ok(Self(email))
        } else {
            Err(format!("{} is not a valid email", email))
        }
    }

    pub fn inner(&self) -> String {
        self.0.clone()
    }
}

impl AsRef<str> for UserEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
