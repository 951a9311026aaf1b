use std::{env, time::Duration};

use secrecy::SecretString;
use validator::Validate;

use crate::errors::AppResult;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, Validate)]
pub struct Config {
    #[validate(url(message = "GRADEBOOK_API_BASE_URL must be a valid URL"))]
    pub api_base_url: String,
    pub api_token: SecretString,
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
    pub class_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("GRADEBOOK_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000/api".to_string()),
            api_token: SecretString::from(
                env::var("GRADEBOOK_API_TOKEN")
                    .unwrap_or_else(|_| "dev_token_change_me".to_string()),
            ),
            request_timeout_secs: env::var("GRADEBOOK_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            class_id: env::var("GRADEBOOK_CLASS_ID").ok().filter(|c| !c.trim().is_empty()),
        }
    }

    /// Checks the values read from the environment before anything connects.
    pub fn validate_settings(&self) -> AppResult<()> {
        self.validate()?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// True while the token is still the development placeholder.
    pub fn uses_default_token(&self) -> bool {
        use secrecy::ExposeSecret;
        self.api_token.expose_secret() == "dev_token_change_me"
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000/api".to_string(),
            api_token: SecretString::from("test_token".to_string()),
            request_timeout_secs: 1,
            class_id: Some("class-test".to_string()),
        }
    }
}
