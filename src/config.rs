// src/config.rs
use crate::errors::{Result, RunnerError};

pub const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston/execute";
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_KATA_BASE: &str = "https://www.codewars.com/api/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Configuration for the primary (Judge0-compatible) execution service.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub api_base: String,
    pub access_key: Option<String>,
    pub host_override: Option<String>,
}

/// Configuration for the Piston fallback service.
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    pub execute_url: String,
}

/// Configuration for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

/// Configuration for the kata-description service.
#[derive(Debug, Clone)]
pub struct KataConfig {
    pub api_base: String,
    pub catalog_path: Option<String>,
}

/// High-level application configuration loaded from environment variables.
///
/// The execution service and Gemini are required-if-used: a missing URL or
/// key is only reported when an operation needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub execution: Option<ExecutionConfig>,
    pub fallback: FallbackConfig,
    pub gemini: Option<GeminiConfig>,
    pub kata: KataConfig,
    pub bind_addr: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let execution = get("JUDGE0_URL").map(|api_base| ExecutionConfig {
            api_base,
            access_key: get("JUDGE0_KEY"),
            host_override: get("JUDGE0_HOST"),
        });

        let fallback = FallbackConfig {
            execute_url: get("PISTON_URL").unwrap_or_else(|| DEFAULT_PISTON_URL.to_string()),
        };

        let gemini = get("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_base: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string()),
            api_key,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        });

        let kata = KataConfig {
            api_base: get("KATA_API_BASE").unwrap_or_else(|| DEFAULT_KATA_BASE.to_string()),
            catalog_path: get("KATA_CATALOG"),
        };

        AppConfig {
            execution,
            fallback,
            gemini,
            kata,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        }
    }

    pub fn require_execution(&self) -> Result<&ExecutionConfig> {
        self.execution.as_ref().ok_or_else(|| {
            RunnerError::Config("Judge0 URL not configured. Set JUDGE0_URL in .env".to_string())
        })
    }

    pub fn require_gemini(&self) -> Result<&GeminiConfig> {
        self.gemini.as_ref().ok_or_else(|| {
            RunnerError::Config("Gemini API key not configured. Set GEMINI_API_KEY in .env".to_string())
        })
    }
}
