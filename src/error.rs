//! Error taxonomy for the oracle.
//!
//! Every variant is recoverable at the request boundary; none is fatal to
//! the process.

use thiserror::Error;

/// Message shown for a field that is not a number.
pub const INVALID_INPUT_MESSAGE: &str = "請輸入有效的數字";

/// Message shown once the session has used up its submissions.
pub const LIMIT_EXCEEDED_MESSAGE: &str = "今日使用次數已達上限，請明天再試。";

/// Message shown next to a reading whose analysis could not be produced.
pub const ANALYSIS_UNAVAILABLE_MESSAGE: &str = "目前無法取得分析，請稍後再試。";

/// Errors surfaced by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// A number field could not be parsed.
    #[error("invalid numeric input for `{field}`: {value:?}")]
    InvalidInput { field: String, value: String },

    /// The session already used all of its submissions.
    #[error("submission limit of {limit} reached for this session")]
    LimitExceeded { limit: u32 },

    /// The text-generation service failed.
    #[error("analysis unavailable: {0}")]
    AnalysisUnavailable(String),
}

impl OracleError {
    pub fn invalid_input(field: &str, value: &str) -> Self {
        OracleError::InvalidInput {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Plain-language text for the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            OracleError::InvalidInput { .. } => INVALID_INPUT_MESSAGE,
            OracleError::LimitExceeded { .. } => LIMIT_EXCEEDED_MESSAGE,
            OracleError::AnalysisUnavailable(_) => ANALYSIS_UNAVAILABLE_MESSAGE,
        }
    }
}

/// Errors raised by a text-generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("client error: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(String),

    /// Non-success HTTP status (auth, quota, server error).
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors raised while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}
