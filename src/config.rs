//! Start-up configuration read once from the environment.

use std::time::Duration;

use crate::clock::DayNightRule;
use crate::error::ConfigError;
use crate::session::DEFAULT_SUBMISSION_LIMIT;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "XLR_ANALYSIS_ENDPOINT";
pub const ENV_MODEL: &str = "XLR_ANALYSIS_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "XLR_ANALYSIS_TIMEOUT_SECS";
pub const ENV_DAY_NIGHT_RULE: &str = "XLR_DAY_NIGHT_RULE";
pub const ENV_SESSION_LIMIT: &str = "XLR_SESSION_LIMIT";

#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    /// Credential for the text-generation service; `None` disables analysis.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub day_night_rule: DayNightRule,
    pub submission_limit: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            day_night_rule: DayNightRule::default(),
            submission_limit: DEFAULT_SUBMISSION_LIMIT,
        }
    }
}

impl OracleConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.api_key = get(ENV_API_KEY);
        if let Some(endpoint) = get(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(model) = get(ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            let secs = parse_positive(ENV_TIMEOUT_SECS, &raw)?;
            config.timeout = Duration::from_secs(secs as u64);
        }
        if let Some(raw) = get(ENV_DAY_NIGHT_RULE) {
            config.day_night_rule = raw.parse().map_err(|reason| ConfigError::Invalid {
                var: ENV_DAY_NIGHT_RULE,
                value: raw.clone(),
                reason,
            })?;
        }
        if let Some(raw) = get(ENV_SESSION_LIMIT) {
            config.submission_limit = parse_positive(ENV_SESSION_LIMIT, &raw)?;
        }

        log::debug!(
            "config: analysis={}, model={}, timeout={:?}, rule={:?}, limit={}",
            config.analysis_enabled(),
            config.model,
            config.timeout,
            config.day_night_rule,
            config.submission_limit
        );
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_day_night_rule(mut self, rule: DayNightRule) -> Self {
        self.day_night_rule = rule;
        self
    }

    pub fn with_submission_limit(mut self, limit: u32) -> Self {
        self.submission_limit = limit;
        self
    }

    pub fn analysis_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let n: u32 = raw.trim().parse().map_err(|_| invalid("not an integer"))?;
    if n == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(n)
}
