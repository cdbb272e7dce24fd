use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_DOCUMENTS: usize = 100;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// How each collaborator call is bounded
#[derive(Debug, Clone, PartialEq)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Extra attempts after a transient failure. Zero means a single attempt.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl CallPolicy {
    /// Delay before retry number `attempt` (zero based), doubling each time.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 0,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

/// Settings for a trial analysis deployment, read from the environment
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub openrouter_api_key: String,
    pub model: String,
    pub temperature: f64,
    pub call_policy: CallPolicy,
    pub max_documents: usize,
    pub port: u16,
}

impl AnalysisConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let openrouter_api_key = lookup("OPENROUTER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;

        let defaults = CallPolicy::default();
        let call_policy = CallPolicy {
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "TRIAL_ANALYSIS_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            max_retries: parse_or(&lookup, "TRIAL_ANALYSIS_MAX_RETRIES", defaults.max_retries)?,
            retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "TRIAL_ANALYSIS_RETRY_BACKOFF_MS",
                DEFAULT_RETRY_BACKOFF_MS,
            )?),
        };
        if call_policy.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "TRIAL_ANALYSIS_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        Ok(Self {
            openrouter_api_key,
            model: lookup("TRIAL_ANALYSIS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or(&lookup, "TRIAL_ANALYSIS_TEMPERATURE", 0.0)?,
            call_policy,
            max_documents: parse_or(&lookup, "TRIAL_ANALYSIS_MAX_DOCUMENTS", DEFAULT_MAX_DOCUMENTS)?,
            port: parse_or(&lookup, "PORT", 3000)?,
        })
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
    }
}
