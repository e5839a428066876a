// src/harness.rs
//! Test harness composition.
//!
//! A harness invokes a named function against each example test case and
//! prints the outcomes as a JSON array between [`RESULTS_START`] and
//! [`RESULTS_END`] on standard output. JavaScript sources get the harness
//! appended as code; [`ExportTable`] produces the same block for native
//! callbacks.

use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{Result, RunnerError};
use crate::models::{Language, TestCase, TestOutcome};

pub const RESULTS_START: &str = "TEST_RESULTS_START";
pub const RESULTS_END: &str = "TEST_RESULTS_END";

/// Interprets a test value as JSON when it looks like an array, object or
/// quoted string. Anything else, or anything that fails to parse, stays a
/// raw string.
pub fn sniff(raw: &str) -> Value {
    if raw.starts_with('[') || raw.starts_with('{') || raw.starts_with('"') {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

/// A function name is spliced into source code, so it must be a plain
/// identifier.
pub fn validate_function_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

    if valid_head && valid_tail {
        Ok(())
    } else {
        Err(RunnerError::InvalidFunctionName(name.to_string()))
    }
}

/// Returns `source` with a test harness appended when the language supports
/// one and there is both a function name and at least one test case.
/// Otherwise `source` comes back unchanged.
pub fn compose(
    source: &str,
    language: Language,
    function_name: Option<&str>,
    tests: &[TestCase],
) -> Result<String> {
    let name = match function_name.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(source.to_string()),
    };
    if !language.supports_harness() || tests.is_empty() {
        return Ok(source.to_string());
    }
    validate_function_name(name)?;

    let tests_json = serde_json::to_string(
        &tests
            .iter()
            .map(|t| serde_json::json!({ "input": t.input, "expected": t.output }))
            .collect::<Vec<_>>(),
    )?;

    Ok(format!("{}\n{}", source, javascript_harness(name, &tests_json)))
}

fn javascript_harness(name: &str, tests_json: &str) -> String {
    format!(
        r#"
// Test harness
function __sniff(value) {{
  if (typeof value === 'string' && (value.startsWith('[') || value.startsWith('{{') || value.startsWith('"'))) {{
    try {{
      return JSON.parse(value);
    }} catch (e) {{
      return value;
    }}
  }}
  return value;
}}

function __runTests(fn, tests) {{
  const results = [];
  for (const test of tests) {{
    try {{
      const result = fn(__sniff(test.input));
      const pass = JSON.stringify(result) === JSON.stringify(__sniff(test.expected));
      results.push({{
        input: test.input,
        expected: test.expected,
        result: result === undefined ? null : result,
        pass: pass
      }});
    }} catch (error) {{
      results.push({{
        input: test.input,
        expected: test.expected,
        error: error && error.message ? error.message : String(error),
        pass: false
      }});
    }}
  }}
  console.log('{start}');
  console.log(JSON.stringify(results, null, 2));
  console.log('{end}');
}}

try {{
  if (typeof {name} === 'function') {{
    __runTests({name}, {tests_json});
  }} else {{
    console.log('ERROR: Function {name} not found');
  }}
}} catch (e) {{
  console.log('ERROR: ' + e.message);
}}
"#,
        start = RESULTS_START,
        end = RESULTS_END,
        name = name,
        tests_json = tests_json,
    )
}

/// A native function under test. Errors are reported as that test's failure.
pub type TargetFn = Box<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Explicit table of callable targets, looked up by name.
#[derive(Default)]
pub struct ExportTable {
    entries: HashMap<String, TargetFn>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, target: F)
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(target));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Runs the named target against `tests` and returns what the harness
    /// would print on standard output.
    pub fn run(&self, name: &str, tests: &[TestCase]) -> String {
        match self.entries.get(name) {
            Some(target) => render_block(&evaluate(target.as_ref(), tests)),
            None => format!("ERROR: Function {} not found\n", name),
        }
    }
}

/// Invokes `target` once per test case. A failing test never stops the rest.
pub fn evaluate(
    target: &(dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync),
    tests: &[TestCase],
) -> Vec<TestOutcome> {
    tests
        .iter()
        .map(|test| {
            let input = Value::String(test.input.clone());
            let expected = Value::String(test.output.clone());
            match target(&sniff(&test.input)) {
                Ok(result) => TestOutcome {
                    pass: result == sniff(&test.output),
                    input,
                    expected,
                    result: Some(result),
                    error: None,
                },
                Err(error) => TestOutcome {
                    input,
                    expected,
                    result: None,
                    error: Some(error),
                    pass: false,
                },
            }
        })
        .collect()
}

/// Formats outcomes as the delimited block the classifier looks for.
pub fn render_block(outcomes: &[TestOutcome]) -> String {
    let body = serde_json::to_string_pretty(outcomes).unwrap_or_else(|_| "[]".to_string());
    format!("{}\n{}\n{}\n", RESULTS_START, body, RESULTS_END)
}
