// src/submission.rs
//! Sequential submission against the primary execution service.

use base64::{Engine as _, engine::general_purpose};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Value, json};

use crate::classifier::ExecutionPayload;
use crate::endpoints::{Candidate, PathVariant};
use crate::models::Language;
use crate::transport::{HttpReply, HttpTransport, SUBMISSION_TIMEOUT, TransportFailure};

/// One HTTP try against one candidate URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionAttempt {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionAttempt {
    pub fn record(url: &str, reply: &Result<HttpReply, TransportFailure>) -> Self {
        match reply {
            Ok(reply) => Self {
                url: url.to_string(),
                status: Some(reply.status),
                body: Some(reply.body.clone()),
                error: if reply.is_success() {
                    None
                } else {
                    Some(format!("Request failed with status code {}", reply.status))
                },
            },
            Err(failure) => Self {
                url: url.to_string(),
                status: None,
                body: None,
                error: Some(failure.0.clone()),
            },
        }
    }
}

/// What a single attempt amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Value),
    TransportError(String),
    /// The service wants a different request body shape.
    RejectedPayloadShape(String),
    OtherError { status: u16, detail: String },
}

/// Pulls the most useful error text out of a response body.
pub fn error_detail(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

/// Piston deployments that want `files` say so only in their error message,
/// so this depends on third-party wording and may need updating if it
/// changes.
fn rejects_payload_shape(detail: &str) -> bool {
    detail.to_lowercase().contains("files")
}

impl AttemptOutcome {
    pub fn from_reply(reply: Result<HttpReply, TransportFailure>) -> Self {
        match reply {
            Ok(reply) if reply.is_success() => AttemptOutcome::Success(reply.body),
            Ok(reply) => {
                let detail = error_detail(&reply.body);
                if rejects_payload_shape(&detail) {
                    AttemptOutcome::RejectedPayloadShape(detail)
                } else {
                    AttemptOutcome::OtherError {
                        status: reply.status,
                        detail,
                    }
                }
            }
            Err(failure) => AttemptOutcome::TransportError(failure.0),
        }
    }

    pub fn detail(&self) -> String {
        match self {
            AttemptOutcome::Success(body) => body.to_string(),
            AttemptOutcome::TransportError(detail) | AttemptOutcome::RejectedPayloadShape(detail) => {
                detail.clone()
            }
            AttemptOutcome::OtherError { status, detail } => format!("status {}: {}", status, detail),
        }
    }
}

/// Result of the primary attempt loop.
#[derive(Debug, Clone)]
pub enum PrimaryOutcome {
    Accepted {
        payload: ExecutionPayload,
        variant: PathVariant,
        attempts: Vec<SubmissionAttempt>,
    },
    Exhausted {
        attempts: Vec<SubmissionAttempt>,
    },
}

impl PrimaryOutcome {
    pub fn attempts(&self) -> &[SubmissionAttempt] {
        match self {
            PrimaryOutcome::Accepted { attempts, .. } | PrimaryOutcome::Exhausted { attempts } => attempts,
        }
    }
}

fn submission_body(source: &str, language: Language, variant: PathVariant) -> Value {
    let source_code = if variant.is_base64() {
        general_purpose::STANDARD.encode(source)
    } else {
        source.to_string()
    };
    json!({
        "source_code": source_code,
        "language_id": language.judge0_id(),
    })
}

/// Tries every candidate in order and stops at the first 2xx, whatever the
/// execution verdict inside the body. `on_attempt` is told the 1-based
/// number of each attempt before it is sent.
pub async fn submit_primary<T, F>(
    transport: &T,
    candidates: &[Candidate],
    source: &str,
    language: Language,
    mut on_attempt: F,
) -> PrimaryOutcome
where
    T: HttpTransport,
    F: FnMut(usize),
{
    let mut attempts = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        on_attempt(index + 1);
        debug!("Submitting attempt {} to {}", index + 1, candidate.url);

        let body = submission_body(source, language, candidate.variant);
        let reply = transport
            .post_json(&candidate.url, &candidate.headers, &body, SUBMISSION_TIMEOUT)
            .await;
        attempts.push(SubmissionAttempt::record(&candidate.url, &reply));

        match AttemptOutcome::from_reply(reply) {
            AttemptOutcome::Success(body) => {
                info!("Execution service accepted submission at {}", candidate.url);
                return PrimaryOutcome::Accepted {
                    payload: ExecutionPayload::from_judge0(&body, candidate.variant.is_base64()),
                    variant: candidate.variant,
                    attempts,
                };
            }
            outcome => warn!("Attempt {} at {} failed: {}", index + 1, candidate.url, outcome.detail()),
        }
    }

    PrimaryOutcome::Exhausted { attempts }
}

/// Human-readable trail of every attempt, in order.
pub fn summarize(attempts: &[SubmissionAttempt]) -> String {
    attempts
        .iter()
        .map(|a| {
            let mut lines = vec![format!("URL: {}", a.url)];
            if let Some(status) = a.status {
                lines.push(format!("  status: {}", status));
            }
            if let Some(error) = &a.error {
                lines.push(format!("  error: {}", error));
            }
            if let Some(body) = &a.body {
                let data = match body {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.push(format!("  data: {}", data));
            }
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionConfig;
    use crate::endpoints::plan;
    use crate::transport::fake::ScriptedTransport;

    fn candidates() -> Vec<Candidate> {
        plan(&ExecutionConfig {
            api_base: "https://judge.local".to_string(),
            access_key: Some("k".to_string()),
            host_override: None,
        })
    }

    #[tokio::test]
    async fn test_stops_at_third_attempt() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::reply(404, json!({"message": "not found"})),
            ScriptedTransport::fail("timeout"),
            ScriptedTransport::reply(201, json!({"stdout": "hi\n", "status": {"id": 3}})),
            ScriptedTransport::reply(200, json!({})),
        ]);
        let mut seen = Vec::new();

        let outcome = submit_primary(&transport, &candidates(), "x", Language::Python, |n| seen.push(n)).await;

        assert_eq!(transport.calls().len(), 3);
        assert_eq!(seen, vec![1, 2, 3]);
        match outcome {
            PrimaryOutcome::Accepted { payload, variant, attempts } => {
                assert_eq!(attempts.len(), 3);
                assert_eq!(variant, PathVariant::Base64Wait);
                assert_eq!(payload.stdout.as_deref(), Some("hi\n"));
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exhaustion_keeps_full_history() {
        let cands = candidates();
        let transport = ScriptedTransport::new(
            (0..cands.len())
                .map(|_| ScriptedTransport::reply(500, json!("boom")))
                .collect(),
        );

        let outcome = submit_primary(&transport, &cands, "x", Language::Java, |_| {}).await;

        let PrimaryOutcome::Exhausted { attempts } = outcome else {
            panic!("expected exhaustion");
        };
        assert_eq!(attempts.len(), 12);
        assert_eq!(attempts[0].url, cands[0].url);
        assert_eq!(attempts[11].url, cands[11].url);
        assert!(attempts.iter().all(|a| a.status == Some(500)));
    }

    #[tokio::test]
    async fn test_runtime_error_inside_2xx_still_counts_as_success() {
        let transport = ScriptedTransport::new(vec![ScriptedTransport::reply(
            200,
            json!({"stderr": "ReferenceError", "status": {"id": 11}}),
        )]);

        let outcome = submit_primary(&transport, &candidates(), "x", Language::JavaScript, |_| {}).await;

        assert!(matches!(outcome, PrimaryOutcome::Accepted { .. }));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_request_body_and_base64_variant() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::fail("refused"),
            ScriptedTransport::fail("refused"),
            ScriptedTransport::reply(200, json!({"stdout": "aGk="})),
        ]);

        let outcome = submit_primary(&transport, &candidates(), "hi", Language::Python, |_| {}).await;
        let calls = transport.calls();

        assert_eq!(calls[0].body, Some(json!({"source_code": "hi", "language_id": 71})));
        assert_eq!(calls[2].body, Some(json!({"source_code": "aGk=", "language_id": 71})));
        let PrimaryOutcome::Accepted { payload, .. } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(payload.stdout.as_deref(), Some("hi"));
    }

    #[test]
    fn test_attempt_outcome_tags() {
        assert_eq!(
            AttemptOutcome::from_reply(ScriptedTransport::reply(200, json!({"a": 1}))),
            AttemptOutcome::Success(json!({"a": 1}))
        );
        assert_eq!(
            AttemptOutcome::from_reply(ScriptedTransport::fail("timed out")),
            AttemptOutcome::TransportError("timed out".to_string())
        );
        assert!(matches!(
            AttemptOutcome::from_reply(ScriptedTransport::reply(400, json!({"message": "files is required"}))),
            AttemptOutcome::RejectedPayloadShape(_)
        ));
        assert_eq!(
            AttemptOutcome::from_reply(ScriptedTransport::reply(401, json!({"message": "bad key"}))),
            AttemptOutcome::OtherError {
                status: 401,
                detail: "bad key".to_string()
            }
        );
    }

    #[test]
    fn test_summary_format() {
        let attempts = vec![
            SubmissionAttempt {
                url: "https://a/submissions".to_string(),
                status: Some(403),
                body: Some(json!({"message": "nope"})),
                error: Some("Request failed with status code 403".to_string()),
            },
            SubmissionAttempt {
                url: "https://b/submissions".to_string(),
                status: None,
                body: None,
                error: Some("timeout".to_string()),
            },
        ];

        assert_eq!(
            summarize(&attempts),
            "URL: https://a/submissions\n  status: 403\n  error: Request failed with status code 403\n  data: {\"message\":\"nope\"}\n\nURL: https://b/submissions\n  error: timeout"
        );
    }
}
