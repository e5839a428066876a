// src/classifier.rs
//! Turns an execution service response into an [`ExecutionResult`].

use base64::{Engine as _, engine::general_purpose};
use log::debug;
use serde_json::Value;

use crate::harness::{RESULTS_END, RESULTS_START};
use crate::models::{ExecutionResult, TestOutcome, TestReport};

/// Judge0 status id for an accepted run.
pub const STATUS_ACCEPTED: u64 = 3;

pub const NO_OUTPUT_MESSAGE: &str = "Code executed successfully but produced no output.";
pub const NO_VISIBLE_OUTPUT_MESSAGE: &str = "Code executed successfully but produced no visible output. Make sure your function returns a value and is being called.";

/// The parts of a provider response the classifier cares about.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionPayload {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    /// The provider reported a clean run.
    pub accepted: bool,
    pub raw: Value,
}

fn text_field(body: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| body.get(*name).and_then(Value::as_str))
        .map(str::to_string)
}

fn decode_base64(text: String) -> String {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or(text)
}

impl ExecutionPayload {
    /// Reads a Judge0 submission. Text fields are decoded when the request
    /// asked for base64.
    pub fn from_judge0(body: &Value, base64_encoded: bool) -> Self {
        let field = |names: &[&str]| {
            let text = text_field(body, names);
            if base64_encoded { text.map(decode_base64) } else { text }
        };
        let status_id = body
            .get("status")
            .and_then(|s| s.get("id"))
            .and_then(Value::as_u64);

        Self {
            stdout: field(&["stdout", "stdout_text"]),
            stderr: field(&["stderr", "stderr_text"]),
            compile_output: field(&["compile_output", "compile_output_text"]),
            accepted: status_id == Some(STATUS_ACCEPTED),
            raw: body.clone(),
        }
    }

    /// Reads a Piston `/execute` response.
    pub fn from_piston(body: &Value) -> Self {
        let run = body.get("run").cloned().unwrap_or(Value::Null);
        let compile = body.get("compile").cloned().unwrap_or(Value::Null);

        let stdout = text_field(body, &["output"])
            .filter(|s| !s.is_empty())
            .or_else(|| text_field(&run, &["stdout"]).filter(|s| !s.is_empty()))
            .or_else(|| text_field(&run, &["output"]));
        let exit_code = run.get("code").and_then(Value::as_i64);

        Self {
            stdout,
            stderr: text_field(&run, &["stderr"]),
            compile_output: text_field(&compile, &["output", "stderr"]),
            accepted: exit_code == Some(0),
            raw: body.clone(),
        }
    }

    fn first_text(&self) -> Option<&str> {
        [&self.stdout, &self.stderr, &self.compile_output]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .find(|s| !s.is_empty())
    }
}

/// Parses the JSON between the result markers, if both are present.
pub fn extract_report(text: &str) -> Option<TestReport> {
    let start = text.find(RESULTS_START)? + RESULTS_START.len();
    let end = start + text[start..].find(RESULTS_END)?;
    match serde_json::from_str::<Vec<TestOutcome>>(text[start..end].trim()) {
        Ok(outcomes) => Some(TestReport::from_outcomes(outcomes)),
        Err(e) => {
            debug!("Result block did not parse: {}", e);
            None
        }
    }
}

pub fn classify(payload: &ExecutionPayload) -> ExecutionResult {
    let Some(text) = payload.first_text() else {
        return if payload.accepted {
            ExecutionResult::NoOutput(NO_OUTPUT_MESSAGE.to_string())
        } else {
            ExecutionResult::Text(
                serde_json::to_string_pretty(&payload.raw).unwrap_or_else(|_| payload.raw.to_string()),
            )
        };
    };

    if text.contains(RESULTS_START) && text.contains(RESULTS_END) {
        return match extract_report(text) {
            Some(report) => ExecutionResult::Tests(report),
            None => ExecutionResult::Text(text.to_string()),
        };
    }

    if payload.accepted && text.trim().is_empty() {
        ExecutionResult::NoOutput(NO_VISIBLE_OUTPUT_MESSAGE.to_string())
    } else {
        ExecutionResult::Text(text.to_string())
    }
}
