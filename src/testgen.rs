// src/testgen.rs
//! Example test cases generated by a language model.

use log::{info, warn};
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

use crate::errors::{Result, RunnerError};
use crate::models::{Problem, TestCase};
use crate::providers::LlmProvider;

const PROMPT_TEMPLATE: &str = r#"Based on this coding problem, generate exactly 3 test cases with input and expected output:

Problem: {{title}}
Description: {{description}}
Function name: {{function_name}}

Please respond with ONLY a JSON array in this exact format:
[
  {"input": "test_input_1", "output": "expected_output_1"},
  {"input": "test_input_2", "output": "expected_output_2"},
  {"input": "test_input_3", "output": "expected_output_3"}
]

Make sure inputs are appropriate for the problem and outputs are correct. For array inputs, use proper array notation."#;

/// Exponential backoff for rate-limited generation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): base, 2x base, 4x base...
    /// Saturates instead of overflowing for large retry counts.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Simple template renderer using regex. Unknown keys keep their placeholder.
fn render_template(template: &str, values: &[(&str, &str)]) -> Result<String> {
    let re = Regex::new(r"\{\{\s*(\w+)\s*\}\}")
        .map_err(|e| RunnerError::Config(format!("bad template pattern: {}", e)))?;
    Ok(re
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string())
}

pub fn build_prompt(problem: &Problem, function_name: &str) -> Result<String> {
    render_template(
        PROMPT_TEMPLATE,
        &[
            ("title", problem.title.as_str()),
            ("description", problem.description.as_str()),
            ("function_name", function_name),
        ],
    )
}

/// End index (exclusive) of the balanced array starting at `start`.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds the first array of objects in free text by scanning for balanced
/// brackets. Prose and code fences around it are ignored.
pub fn extract_json_array(text: &str) -> Option<&str> {
    text.match_indices('[').find_map(|(start, _)| {
        let opens_object = text[start + 1..].trim_start().starts_with('{');
        if !opens_object {
            return None;
        }
        let end = balanced_end(text, start)?;
        let candidate = &text[start..end];
        serde_json::from_str::<Vec<Value>>(candidate).ok().map(|_| candidate)
    })
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses model output into test cases. Entries without both fields are dropped.
pub fn parse_test_cases(text: &str) -> Result<Vec<TestCase>> {
    let array = extract_json_array(text).ok_or(RunnerError::NoTestCases)?;
    let entries: Vec<Value> = serde_json::from_str(array)?;

    let cases: Vec<TestCase> = entries
        .iter()
        .filter_map(|entry| {
            let input = entry.get("input")?;
            let output = entry.get("output").or_else(|| entry.get("expected"))?;
            Some(TestCase::new(as_text(input), as_text(output)))
        })
        .collect();

    if cases.is_empty() {
        return Err(RunnerError::NoTestCases);
    }
    Ok(cases)
}

pub struct TestCaseGenerator<P> {
    provider: P,
    model: String,
    policy: RetryPolicy,
}

impl<P: LlmProvider> TestCaseGenerator<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Generates test cases for `problem`. The function name defaults to the
    /// one derived from the problem's slug.
    pub async fn generate(&self, problem: &Problem, function_name: Option<&str>) -> Result<Vec<TestCase>> {
        let function_name = function_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| problem.function_name())
            .ok_or_else(|| RunnerError::InvalidFunctionName(String::new()))?;
        let prompt = build_prompt(problem, &function_name)?;

        let mut retry = 0;
        loop {
            match self.provider.generate(&self.model, &prompt).await {
                Ok((text, latency_ms)) => {
                    let cases = parse_test_cases(&text)?;
                    info!(
                        "Generated {} test cases for '{}' in {}ms",
                        cases.len(),
                        problem.title,
                        latency_ms
                    );
                    return Ok(cases);
                }
                Err(e) if e.is_rate_limit() => {
                    if retry >= self.policy.max_retries {
                        return Err(RunnerError::RateLimited);
                    }
                    let delay = self.policy.delay_for(retry);
                    warn!("Rate limited, retrying in {}ms...", delay.as_millis());
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
