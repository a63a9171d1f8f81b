use anyhow::Context;
use argon2::{password_hash::{rand_core::OsRng, SaltString}, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::{distributions::Alphanumeric, Rng};
use secrecy::{ExposeSecret, SecretString};

use crate::telemetry::spawn_blocking_with_tracing;

pub const MIN_PASSWORD_LENGTH: usize = 8;

// Function to compute password hash
pub fn compute_password_hash(password: SecretString) -> Result<SecretString, anyhow::Error>{
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
                            .hash_password(password.expose_secret().as_bytes(), &salt)
                            .map_err(|_| anyhow::anyhow!("Failed to compute password hash"))?
                            .to_string();

    Ok(SecretString::from(password_hash))
}

// Hashing is cpu bound, keep it off the async workers
pub async fn hash_password(password: SecretString) -> Result<String, anyhow::Error>{
    let hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed due to threadpool error")??;

    Ok(hash.expose_secret().to_string())
}

// Function to verify if password matches hash
pub async fn verify_password(password: SecretString, hashed_password: String) -> Result<bool, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<bool, anyhow::Error> {
        let hashed_password = PasswordHash::new(hashed_password.as_str())
                    .map_err(|_| anyhow::anyhow!("Failed to parse PasswordHash \
                            from stored hashed password"))?;

        Ok(Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &hashed_password)
            .is_ok())
    })
    .await
    .context("Failed due to threadpool error")?
}

// Initial password handed to owners of approved restaurants
pub fn generate_password() -> SecretString{
    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();

    SecretString::from(password)
}

#[cfg(test)]
mod tests {
    use claim::assert_ok;
    use secrecy::{ExposeSecret, SecretString};

    use super::*;

    #[actix_web::test]
    async fn hashed_password_verifies(){
        let hash = assert_ok!(hash_password(SecretString::from("couscous-friday")).await);

        assert!(verify_password(SecretString::from("couscous-friday"), hash.clone()).await.unwrap());
        assert!(!verify_password(SecretString::from("tagine-sunday"), hash).await.unwrap());
    }

    #[actix_web::test]
    async fn garbage_hash_is_an_error(){
        assert!(verify_password(SecretString::from("x"), "not a phc string".to_string()).await.is_err());
    }

    #[test]
    fn generated_passwords_are_long_enough(){
        let password = generate_password();
        assert_eq!(password.expose_secret().len(), 12);
        assert!(password.expose_secret().len() >= MIN_PASSWORD_LENGTH);
    }
}
