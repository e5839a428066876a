// src/fallback.rs
//! Piston fallback, used once every primary attempt has failed.

use log::{info, warn};
use serde::Serialize;
use serde_json::{Value, json};

use crate::classifier::ExecutionPayload;
use crate::models::Language;
use crate::submission::AttemptOutcome;
use crate::transport::{Headers, HttpTransport, RUNTIMES_TIMEOUT, SUBMISSION_TIMEOUT};

/// Known-good versions used when the runtime listing can't be used.
const DEFAULT_VERSIONS: [(&str, &str); 3] = [
    ("python3", "3.10.6"),
    ("javascript", "16.13.0"),
    ("java", "17.0.1"),
];

/// Static version for a Piston language name. Unknown names get the
/// JavaScript version.
pub fn default_version(piston_name: &str) -> &'static str {
    DEFAULT_VERSIONS
        .iter()
        .find(|(name, _)| *name == piston_name)
        .or_else(|| DEFAULT_VERSIONS.iter().find(|(name, _)| *name == "javascript"))
        .map(|(_, version)| *version)
        .unwrap_or("16.13.0")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEndpoints {
    pub base: String,
    pub runtimes_url: String,
    pub execute_url: String,
}

impl FallbackEndpoints {
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim().trim_end_matches('/');
        let cut = trimmed.len().saturating_sub("/execute".len());
        let base = match trimmed.get(cut..) {
            Some(tail) if tail.eq_ignore_ascii_case("/execute") => &trimmed[..cut],
            _ => trimmed,
        };
        let execute_url = if url.contains("/execute") {
            url.trim().to_string()
        } else {
            format!("{}/execute", base)
        };

        Self {
            base: base.to_string(),
            runtimes_url: format!("{}/runtimes", base),
            execute_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    Listing,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVersion {
    pub version: String,
    pub source: VersionSource,
}

fn version_of(runtime: &Value) -> Option<String> {
    if let Some(version) = runtime.get("version").and_then(Value::as_str) {
        return Some(version.to_string());
    }
    let first = runtime.get("versions")?.as_array()?.first()?;
    first
        .as_str()
        .or_else(|| first.get("version").and_then(Value::as_str))
        .map(str::to_string)
}

/// Looks `piston_name` up in a runtime listing, either a bare array or
/// `{ "runtimes": [...] }`.
pub fn find_version(listing: &Value, piston_name: &str) -> Option<String> {
    let runtimes = listing
        .as_array()
        .or_else(|| listing.get("runtimes").and_then(Value::as_array))?;

    runtimes
        .iter()
        .find(|rt| {
            let name = ["language", "name", "lang"]
                .iter()
                .find_map(|key| rt.get(*key).and_then(Value::as_str));
            let aliased = rt
                .get("aliases")
                .or_else(|| rt.get("alias"))
                .and_then(Value::as_array)
                .is_some_and(|aliases| aliases.iter().any(|a| a.as_str() == Some(piston_name)));
            name == Some(piston_name) || aliased
        })
        .and_then(version_of)
}

/// Picks a runtime version, from the live listing when possible.
pub async fn resolve_version<T: HttpTransport>(
    transport: &T,
    endpoints: &FallbackEndpoints,
    language: Language,
) -> ResolvedVersion {
    let name = language.piston_name();
    let listed = match transport.get_json(&endpoints.runtimes_url, RUNTIMES_TIMEOUT).await {
        Ok(reply) if reply.is_success() => find_version(&reply.body, name),
        Ok(reply) => {
            warn!("Runtime listing returned status {}", reply.status);
            None
        }
        Err(failure) => {
            warn!("Runtime listing failed: {}", failure);
            None
        }
    };

    match listed {
        Some(version) => ResolvedVersion {
            version,
            source: VersionSource::Listing,
        },
        None => ResolvedVersion {
            version: default_version(name).to_string(),
            source: VersionSource::Default,
        },
    }
}

/// Request body shapes Piston deployments accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    Source,
    Files,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackAttempt {
    pub url: String,
    pub shape: PayloadShape,
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum FallbackOutcome {
    Executed {
        payload: ExecutionPayload,
        version: ResolvedVersion,
        failed_attempts: Vec<FallbackAttempt>,
    },
    Failed {
        version: ResolvedVersion,
        attempts: Vec<FallbackAttempt>,
    },
}

fn request_body(language: Language, version: &str, source: &str, shape: PayloadShape) -> Value {
    match shape {
        PayloadShape::Source => json!({
            "language": language.piston_name(),
            "version": version,
            "source": source,
        }),
        PayloadShape::Files => json!({
            "language": language.piston_name(),
            "version": version,
            "files": [{ "name": language.file_name(), "content": source }],
        }),
    }
}

/// Resolves a version and executes `source`. A payload-shape rejection of
/// the `source` form is retried once with `files`; nothing else is retried.
pub async fn execute<T: HttpTransport>(
    transport: &T,
    endpoints: &FallbackEndpoints,
    language: Language,
    source: &str,
) -> FallbackOutcome {
    let version = resolve_version(transport, endpoints, language).await;
    info!(
        "Falling back to {} with {} {}",
        endpoints.execute_url,
        language.piston_name(),
        version.version
    );

    let headers = Headers::new();
    let mut failed_attempts = Vec::new();

    for shape in [PayloadShape::Source, PayloadShape::Files] {
        let body = request_body(language, &version.version, source, shape);
        let reply = transport
            .post_json(&endpoints.execute_url, &headers, &body, SUBMISSION_TIMEOUT)
            .await;

        match AttemptOutcome::from_reply(reply) {
            AttemptOutcome::Success(body) => {
                return FallbackOutcome::Executed {
                    payload: ExecutionPayload::from_piston(&body),
                    version,
                    failed_attempts,
                };
            }
            AttemptOutcome::RejectedPayloadShape(detail) if shape == PayloadShape::Source => {
                warn!("Fallback rejected source payload, retrying with files: {}", detail);
                failed_attempts.push(FallbackAttempt {
                    url: endpoints.execute_url.clone(),
                    shape,
                    error: detail,
                });
            }
            outcome => {
                failed_attempts.push(FallbackAttempt {
                    url: endpoints.execute_url.clone(),
                    shape,
                    error: outcome.detail(),
                });
                break;
            }
        }
    }

    FallbackOutcome::Failed {
        version,
        attempts: failed_attempts,
    }
}
