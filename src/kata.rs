// src/kata.rs
//! Practice problems built from kata descriptions.

use futures::future;
use log::{info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::catalog::{Catalog, Difficulty};
use crate::errors::{Result, RunnerError};
use crate::models::{Problem, TestCase};
use crate::transport::RUNTIMES_TIMEOUT;

/// How many problems one request produces at most.
pub const PROBLEMS_PER_REQUEST: usize = 2;

/// A kata as returned by the description service.
#[derive(Debug, Clone, Deserialize)]
pub struct Kata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Read-only access to kata descriptions by slug.
pub trait KataSource: Send + Sync {
    fn fetch(&self, slug: &str) -> impl std::future::Future<Output = Result<Kata>> + Send;
}

/// Codewars `code-challenges` API.
pub struct CodewarsClient {
    client: Client,
    api_base: String,
    timeout: Duration,
}

impl CodewarsClient {
    pub fn new(client: Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            timeout: RUNTIMES_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl KataSource for CodewarsClient {
    async fn fetch(&self, slug: &str) -> Result<Kata> {
        let url = format!(
            "{}/code-challenges/{}",
            self.api_base.trim_end_matches('/'),
            slug
        );
        let resp = self.client.get(&url).timeout(self.timeout).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(RunnerError::KataFetch {
                slug: slug.to_string(),
                reason: format!("status {}", status.as_u16()),
            });
        }
        Ok(resp.json().await?)
    }
}

fn unique_in_order_examples() -> Vec<TestCase> {
    vec![
        TestCase::new("AAAABBBCCDAABBB", r#"["A","B","C","D","A","B"]"#),
        TestCase::new("ABBCcAD", r#"["A","B","C","c","A","D"]"#),
        TestCase::new("[1,2,2,3,3]", "[1,2,3]"),
    ]
}

fn is_unique_in_order(slug: &str, name: &str) -> bool {
    slug == "unique-in-order"
        || Regex::new(r"(?i)unique\s*in\s*order")
            .map(|re| re.is_match(name))
            .unwrap_or(false)
}

/// Builds a problem with starter templates. Only the "unique in order"
/// kata comes with curated examples.
pub fn problem_from_kata(slug: &str, kata: Kata) -> Problem {
    let examples = if is_unique_in_order(slug, &kata.name) {
        unique_in_order_examples()
    } else {
        Vec::new()
    };
    let description = kata
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| kata.name.clone());

    Problem {
        id: kata.id,
        slug: Some(slug.to_string()),
        title: kata.name,
        description,
        examples,
        starter_code: Problem::starter_templates(),
    }
}

/// Shuffles `slugs` and keeps up to [`PROBLEMS_PER_REQUEST`] of them.
pub fn pick_slugs<R: Rng>(mut slugs: Vec<String>, rng: &mut R) -> Vec<String> {
    slugs.shuffle(rng);
    slugs.truncate(PROBLEMS_PER_REQUEST);
    slugs
}

/// Fetches `slugs` concurrently. Failed fetches are skipped and problems
/// sharing an id are kept once.
pub async fn fetch_problems<S: KataSource>(source: &S, slugs: &[String]) -> Vec<Problem> {
    let fetched = future::join_all(slugs.iter().map(|slug| source.fetch(slug))).await;

    let mut seen = std::collections::HashSet::new();
    slugs
        .iter()
        .zip(fetched)
        .filter_map(|(slug, result)| match result {
            Ok(kata) => Some(problem_from_kata(slug, kata)),
            Err(e) => {
                warn!("Skipping kata '{}': {}", slug, e);
                None
            }
        })
        .filter(|problem| seen.insert(problem.id.clone()))
        .collect()
}

/// Picks problems for a role at the difficulty matching `experience` years.
pub async fn generate_problems<S: KataSource>(
    source: &S,
    catalog: &Catalog,
    role: &str,
    experience: u32,
) -> Result<Vec<Problem>> {
    let difficulty = Difficulty::from_experience(experience);
    let slugs = pick_slugs(catalog.slugs(role, difficulty)?, &mut rand::thread_rng());
    info!("Fetching {:?} for {} ({})", slugs, role, difficulty);

    Ok(fetch_problems(source, &slugs).await)
}
