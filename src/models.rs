// src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::RunnerError;

/// Languages the practice editor can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    Java,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::JavaScript, Language::Python, Language::Java];

    pub fn id(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Java => "Java",
        }
    }

    /// Language id in the Judge0 catalog.
    pub fn judge0_id(&self) -> u32 {
        match self {
            Language::JavaScript => 63,
            Language::Python => 71,
            Language::Java => 62,
        }
    }

    /// Language identifier used by Piston.
    pub fn piston_name(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python3",
            Language::Java => "java",
        }
    }

    /// File name used when a provider wants `files` instead of `source`.
    pub fn file_name(&self) -> &'static str {
        match self {
            Language::JavaScript => "index.js",
            Language::Python => "main.py",
            Language::Java => "Main.java",
        }
    }

    /// Only JavaScript submissions get a test harness appended.
    pub fn supports_harness(&self) -> bool {
        matches!(self, Language::JavaScript)
    }

    pub fn starter_template(&self) -> &'static str {
        match self {
            Language::JavaScript => {
                "// Write your JavaScript solution here\n// Example: print to verify runner\nconsole.log(\"Hello, world!\");\n"
            }
            Language::Python => {
                "# Write your Python solution here\n# Example: print to verify runner\nprint(\"Hello, world!\")\n"
            }
            Language::Java => {
                "// Write your Java solution here\n// Example: simple main that prints to verify runner\npublic class Main {\n  public static void main(String[] args) {\n    System.out.println(\"Hello, world!\");\n  }\n}\n"
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Language {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RunnerError::UnsupportedLanguage(s.to_string()))
    }
}

/// One input/expected-output pair. Inputs may hold JSON-encoded values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// One coding exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<TestCase>,
    #[serde(default)]
    pub starter_code: BTreeMap<Language, String>,
}

impl Problem {
    /// Default target function, derived from the slug.
    pub fn function_name(&self) -> Option<String> {
        self.slug
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.replace('-', "_"))
    }

    pub fn starter_templates() -> BTreeMap<Language, String> {
        Language::ALL
            .into_iter()
            .map(|lang| (lang, lang.starter_template().to_string()))
            .collect()
    }
}

/// Outcome of one harness test, as printed between the result markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub input: Value,
    pub expected: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub pass: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub passed: usize,
    pub total: usize,
    pub outcomes: Vec<TestOutcome>,
}

impl TestReport {
    pub fn from_outcomes(outcomes: Vec<TestOutcome>) -> Self {
        Self {
            passed: outcomes.iter().filter(|o| o.pass).count(),
            total: outcomes.len(),
            outcomes,
        }
    }
}

/// Classified outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExecutionResult {
    Tests(TestReport),
    Text(String),
    NoOutput(String),
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ExecutionResult {
    /// Human-readable text shown in the output pane.
    pub fn render(&self) -> String {
        match self {
            ExecutionResult::Text(text) | ExecutionResult::NoOutput(text) => text.clone(),
            ExecutionResult::Tests(report) => {
                let mut out = String::from("=== TEST RESULTS ===\n\n");
                for (index, test) in report.outcomes.iter().enumerate() {
                    let verdict = if test.pass { "✅ PASS" } else { "❌ FAIL" };
                    out.push_str(&format!("Test {}: {}\n", index + 1, verdict));
                    out.push_str(&format!("  Input: {}\n", display_value(&test.input)));
                    out.push_str(&format!("  Expected: {}\n", display_value(&test.expected)));
                    match (&test.error, &test.result) {
                        (Some(error), _) => out.push_str(&format!("  Error: {}\n", error)),
                        (None, Some(result)) => out.push_str(&format!("  Got: {}\n", result)),
                        (None, None) => out.push_str("  Got: undefined\n"),
                    }
                    out.push('\n');
                }
                out.push_str(&format!(
                    "Summary: {}/{} tests passed",
                    report.passed, report.total
                ));
                out
            }
        }
    }
}

/// Which execution service produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Primary,
    Fallback,
}
