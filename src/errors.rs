// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML catalog: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("API returned an error: {0}")]
    ApiResponse(String),

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Received empty text response from model")]
    EmptyResponse,

    #[error("Rate limit exceeded. Please wait a moment and try selecting another problem.")]
    RateLimited,

    #[error("Failed to parse test cases from model response")]
    NoTestCases,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Function name '{0}' is not a valid identifier")]
    InvalidFunctionName(String),

    #[error("Language '{0}' is not supported")]
    UnsupportedLanguage(String),

    #[error("No katas listed for role '{role}' at difficulty '{difficulty}'")]
    UnknownRole { role: String, difficulty: String },

    #[error("Failed to fetch kata '{slug}': {reason}")]
    KataFetch { slug: String, reason: String },
}

impl RunnerError {
    /// True when the upstream service answered 429.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, RunnerError::ApiError { status: 429, .. })
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
