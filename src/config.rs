// Client configuration, passed in explicitly at construction time

use rand::Rng;
use reqwest::Url;
use std::env;
use std::time::Duration;

use crate::auth::Credential;
use crate::error::ClientError;
use crate::order::TicketingAgreement;

pub const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub credential: Option<Credential>,
    // Pre-obtained bearer token; when set, no token request is made
    pub access_token: Option<String>,
    pub timeout_ms: u64,
    pub retry_config: RetryConfig,
    pub ticketing_agreement: Option<TicketingAgreement>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credential: None,
            access_token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_config: RetryConfig::default(),
            ticketing_agreement: None,
        }
    }
}

// Backoff for the token request; no other stage retries
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Exponential backoff with jitter for the given retry attempt (0-based).
    pub fn backoff(&self, retry_attempt: u32) -> Duration {
        let base_backoff_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powf(retry_attempt as f64))
        .min(self.max_backoff_ms as f64);

        let jitter = rand::thread_rng().gen::<f64>() * self.jitter_factor * base_backoff_ms;
        let backoff_ms = base_backoff_ms * (1.0 - self.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }
}

impl ClientConfig {
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
            ..Self::default()
        }
    }

    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    // Reads FLIGHT_API_BASE_URL, CLIENT_ID, SECRET_ID, FLIGHT_API_TOKEN, FLIGHT_API_TIMEOUT_MS
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = Self::default();
        if let Some(base_url) = var("FLIGHT_API_BASE_URL") {
            config.base_url = base_url;
        }
        config.credential = match (var("CLIENT_ID"), var("SECRET_ID")) {
            (Some(id), Some(secret)) => Some(Credential::new(id, secret)),
            (None, None) => None,
            _ => {
                return Err(ClientError::ConfigError(
                    "CLIENT_ID and SECRET_ID must be set together".to_string(),
                ))
            }
        };
        config.access_token = var("FLIGHT_API_TOKEN");
        if let Some(timeout) = var("FLIGHT_API_TIMEOUT_MS") {
            config.timeout_ms = timeout.parse().map_err(|_| {
                ClientError::ConfigError(format!(
                    "FLIGHT_API_TIMEOUT_MS={timeout:?} is not a number"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        Url::parse(&self.base_url).map_err(|e| {
            ClientError::ConfigError(format!("invalid base url {:?}: {e}", self.base_url))
        })?;
        if self.timeout_ms == 0 {
            return Err(ClientError::ConfigError("timeout must be positive".to_string()));
        }
        if self.credential.is_none() && self.access_token.is_none() {
            return Err(ClientError::ConfigError(
                "either a client credential or an access token is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
