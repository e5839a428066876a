// src/pipeline.rs
//! One code run: compose, submit, fall back, classify.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::classifier::classify;
use crate::config::{AppConfig, ExecutionConfig};
use crate::endpoints::plan;
use crate::errors::Result;
use crate::fallback::{self, FallbackAttempt, FallbackEndpoints, FallbackOutcome, ResolvedVersion};
use crate::harness;
use crate::models::{ExecutionResult, Language, Provider, TestCase};
use crate::submission::{PrimaryOutcome, SubmissionAttempt, submit_primary, summarize};
use crate::transport::HttpTransport;

/// Where a run is. `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Composing,
    Submitting { attempt: usize },
    FallbackSubmitting,
    Classifying,
    Done,
    Error,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Error)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub source: String,
    pub language: Language,
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub tests: Vec<TestCase>,
    /// Groups runs from one editor. A new run cancels the previous run of
    /// the same session only.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Everything the user sees about one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub state: RunState,
    pub provider: Option<Provider>,
    pub result: Option<ExecutionResult>,
    /// Text for the output pane.
    pub output: String,
    pub attempts: Vec<SubmissionAttempt>,
    pub fallback_attempts: Vec<FallbackAttempt>,
    pub fallback_version: Option<ResolvedVersion>,
    pub diagnostics: Option<String>,
    pub finished_at: String,
    pub total_latency_ms: u64,
}

pub struct Pipeline<T> {
    transport: T,
    execution: ExecutionConfig,
    fallback: FallbackEndpoints,
}

impl<T: HttpTransport> Pipeline<T> {
    /// Fails with a configuration error when no execution service is set.
    pub fn new(transport: T, config: &AppConfig) -> Result<Self> {
        Ok(Self {
            transport,
            execution: config.require_execution()?.clone(),
            fallback: FallbackEndpoints::from_url(&config.fallback.execute_url),
        })
    }

    /// Runs `request` to completion. Every state change is passed to
    /// `observer`, ending with `Done` or `Error`. Only an invalid harness
    /// target is returned as `Err`, before anything is sent.
    pub async fn run<O>(&self, run_id: &str, request: &RunRequest, mut observer: O) -> Result<RunReport>
    where
        O: FnMut(RunState) + Send,
    {
        let started = Instant::now();
        observer(RunState::Composing);

        let source = harness::compose(
            &request.source,
            request.language,
            request.function_name.as_deref(),
            &request.tests,
        )?;

        let candidates = plan(&self.execution);
        info!("Run {}: {} candidate endpoints", run_id, candidates.len());

        let primary = submit_primary(&self.transport, &candidates, &source, request.language, |attempt| {
            observer(RunState::Submitting { attempt })
        })
        .await;

        let mut report = RunReport {
            run_id: run_id.to_string(),
            state: RunState::Done,
            provider: None,
            result: None,
            output: String::new(),
            attempts: primary.attempts().to_vec(),
            fallback_attempts: Vec::new(),
            fallback_version: None,
            diagnostics: None,
            finished_at: String::new(),
            total_latency_ms: 0,
        };

        match primary {
            PrimaryOutcome::Accepted { payload, .. } => {
                observer(RunState::Classifying);
                let result = classify(&payload);
                report.provider = Some(Provider::Primary);
                report.output = result.render();
                report.result = Some(result);
            }
            PrimaryOutcome::Exhausted { attempts } => {
                let summary = summarize(&attempts);
                observer(RunState::FallbackSubmitting);

                match fallback::execute(&self.transport, &self.fallback, request.language, &source).await {
                    FallbackOutcome::Executed {
                        payload,
                        version,
                        failed_attempts,
                    } => {
                        observer(RunState::Classifying);
                        let result = classify(&payload);
                        report.provider = Some(Provider::Fallback);
                        report.output = format!(
                            "Judge0 failed:\n\n{}\n\nPiston fallback result:\n{}",
                            summary,
                            result.render()
                        );
                        report.result = Some(result);
                        report.fallback_attempts = failed_attempts;
                        report.fallback_version = Some(version);
                        report.diagnostics = Some(summary);
                    }
                    FallbackOutcome::Failed { version, attempts } => {
                        let text = failure_text(&summary, &attempts);
                        error!("Run {} failed on every provider", run_id);
                        report.state = RunState::Error;
                        report.output = text.clone();
                        report.fallback_attempts = attempts;
                        report.fallback_version = Some(version);
                        report.diagnostics = Some(text);
                    }
                }
            }
        }

        report.finished_at = chrono::Utc::now().to_rfc3339();
        report.total_latency_ms = started.elapsed().as_millis() as u64;
        observer(report.state);
        Ok(report)
    }
}

fn failure_text(summary: &str, fallback_attempts: &[FallbackAttempt]) -> String {
    let mut text = format!("Error: All Judge0 submission attempts failed:\n\n{}", summary);
    match fallback_attempts {
        [only] => text.push_str(&format!("\n\nPiston fallback error:\n{}", only.error)),
        many => {
            for (index, attempt) in many.iter().enumerate() {
                text.push_str(&format!(
                    "\n\nPiston fallback attempt {} error:\n{}",
                    index + 1,
                    attempt.error
                ));
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RunnerError;
    use crate::transport::fake::ScriptedTransport;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn config(key: Option<&str>) -> AppConfig {
        let key = key.map(str::to_string);
        AppConfig::from_lookup(move |name| match name {
            "JUDGE0_URL" => Some("https://judge.local".to_string()),
            "JUDGE0_KEY" => key.clone(),
            _ => None,
        })
    }

    fn request(tests: Vec<TestCase>) -> RunRequest {
        RunRequest {
            source: "function unique_in_order(x) { return x; }".to_string(),
            language: Language::JavaScript,
            function_name: Some("unique_in_order".to_string()),
            tests,
            session_id: None,
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<RunState>>>, impl FnMut(RunState) + Send) {
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        (states, move |s| sink.lock().unwrap().push(s))
    }

    #[test]
    fn test_missing_url_fails_before_network() {
        let config = AppConfig::from_lookup(|_| None);
        let err = Pipeline::new(ScriptedTransport::default(), &config).err().unwrap();
        assert!(matches!(err, RunnerError::Config(_)));
    }

    #[tokio::test]
    async fn test_primary_success_classifies_report() {
        let stdout = "TEST_RESULTS_START\n[{\"input\":\"[1,2,2,3,3]\",\"expected\":\"[1,2,3]\",\"result\":[1,2,3],\"pass\":true}]\nTEST_RESULTS_END\n";
        let transport = ScriptedTransport::new(vec![ScriptedTransport::reply(
            200,
            json!({"stdout": stdout, "status": {"id": 3}}),
        )]);
        let pipeline = Pipeline::new(transport, &config(None)).unwrap();
        let (states, observer) = recorder();

        let report = pipeline
            .run("r1", &request(vec![TestCase::new("[1,2,2,3,3]", "[1,2,3]")]), observer)
            .await
            .unwrap();

        assert_eq!(report.state, RunState::Done);
        assert_eq!(report.provider, Some(Provider::Primary));
        assert!(report.output.contains("Summary: 1/1 tests passed"));
        assert_eq!(
            *states.lock().unwrap(),
            vec![
                RunState::Composing,
                RunState::Submitting { attempt: 1 },
                RunState::Classifying,
                RunState::Done
            ]
        );
        let calls = pipeline.transport.calls();
        let sent = calls[0].body.as_ref().unwrap()["source_code"].as_str().unwrap();
        assert!(sent.contains("TEST_RESULTS_START"));
    }

    #[tokio::test]
    async fn test_fallback_runs_once_after_exhaustion() {
        let mut replies: Vec<_> = (0..4).map(|_| ScriptedTransport::reply(503, json!("down"))).collect();
        replies.push(ScriptedTransport::fail("listing timeout"));
        replies.push(ScriptedTransport::reply(200, json!({"run": {"stdout": "hello\n", "code": 0}})));
        let pipeline = Pipeline::new(ScriptedTransport::new(replies), &config(None)).unwrap();
        let (states, observer) = recorder();

        let report = pipeline.run("r2", &request(vec![]), observer).await.unwrap();

        assert_eq!(report.state, RunState::Done);
        assert_eq!(report.provider, Some(Provider::Fallback));
        assert_eq!(report.attempts.len(), 4);
        assert_eq!(report.fallback_version.as_ref().unwrap().version, "16.13.0");
        assert!(report.output.starts_with("Judge0 failed:\n\nURL: https://judge.local/submissions"));
        assert!(report.output.ends_with("Piston fallback result:\nhello\n"));
        assert!(states.lock().unwrap().contains(&RunState::FallbackSubmitting));
        let posts = pipeline
            .transport
            .calls()
            .iter()
            .filter(|c| c.url.ends_with("/execute"))
            .count();
        assert_eq!(posts, 1);
    }

    #[tokio::test]
    async fn test_everything_failing_ends_in_error_with_full_trail() {
        let mut replies: Vec<_> = (0..12).map(|_| ScriptedTransport::fail("refused")).collect();
        replies.push(ScriptedTransport::reply(200, json!([])));
        replies.push(ScriptedTransport::reply(400, json!({"message": "files is required"})));
        replies.push(ScriptedTransport::reply(400, json!({"message": "bad version"})));
        let pipeline = Pipeline::new(ScriptedTransport::new(replies), &config(Some("k"))).unwrap();
        let (states, observer) = recorder();

        let report = pipeline.run("r3", &request(vec![]), observer).await.unwrap();

        assert_eq!(report.state, RunState::Error);
        assert!(report.result.is_none());
        assert_eq!(report.attempts.len(), 12);
        assert_eq!(report.fallback_attempts.len(), 2);
        let text = report.diagnostics.unwrap();
        assert!(text.starts_with("Error: All Judge0 submission attempts failed:"));
        assert!(text.contains("judge0-extra.p.rapidapi.com"));
        assert!(text.contains("Piston fallback attempt 1 error:\nfiles is required"));
        assert!(text.contains("Piston fallback attempt 2 error:\nstatus 400: bad version"));
        assert_eq!(states.lock().unwrap().last(), Some(&RunState::Error));
    }

    #[tokio::test]
    async fn test_invalid_function_name_sends_nothing() {
        let pipeline = Pipeline::new(ScriptedTransport::default(), &config(None)).unwrap();
        let mut req = request(vec![TestCase::new("1", "1")]);
        req.function_name = Some("a;b".to_string());

        let err = pipeline.run("r4", &req, |_| {}).await.unwrap_err();

        assert!(matches!(err, RunnerError::InvalidFunctionName(_)));
        assert!(pipeline.transport.calls().is_empty());
    }
}
