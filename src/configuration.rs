use chrono::FixedOffset;
use config::{Config, Environment as EnvSource, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::user_email::UserEmail;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings{
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email: EmailSettings,
    pub jwt: JWTSettings,
    pub cache: CacheSettings
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApplicationSettings{
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub hmac_secret: SecretString,
    #[serde(default)]
    pub utc_offset_minutes: i32
}

impl ApplicationSettings {
    // Offset of the local business clock used for reservation windows
    pub fn clock_offset(&self) -> Result<FixedOffset, anyhow::Error>{
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or_else(|| anyhow::anyhow!("utc_offset_minutes {} is out of range", self.utc_offset_minutes))
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseSettings{
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub name: String
}

impl DatabaseSettings {
    // Url of the postgres server, without a database
    pub fn get_database_url(&self) -> String{
        format!(
            "postgres://{}:{}@{}:{}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port
        )
    }

    pub fn get_database_table_url(&self) -> String{
        format!("{}/{}", self.get_database_url(), self.name)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct EmailSettings{
    pub api_uri: String,
    pub sender: String,
    pub authorization_token: SecretString,
    pub timeout_seconds: u64
}

impl EmailSettings {
    pub fn sender(&self) -> Result<UserEmail, String>{
        UserEmail::parse(self.sender.clone())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct JWTSettings{
    pub secret: String,
    pub expiry_hours: u64
}

#[derive(Deserialize, Debug, Clone)]
pub struct CacheSettings{
    pub ttl_seconds: u64
}

pub enum Environment{
    Local,
    Production
}

impl Environment {
    pub fn as_str(&self) -> &'static str{
        match self {
            Environment::Local => "local",
            Environment::Production => "production"
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment, use either `local` or `production`",
                other
            ))
        }
    }
}

impl Settings{
    pub fn get() -> Result<Self, config::ConfigError>{
        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()
            .map_err(config::ConfigError::Message)?;

        Config::builder()
            .add_source(File::with_name("configuration/base.yaml"))
            .add_source(
                File::with_name(&format!("configuration/{}.yaml", environment.as_str()))
                    .required(false)
            )
            .add_source(
                EnvSource::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
            )
            .build()?
            .try_deserialize::<Settings>()
    }
}
