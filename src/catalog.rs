// src/catalog.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{Result, RunnerError};

const DEFAULT_CATALOG: &str = include_str!("../catalog.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Up to 2 years is easy, up to 5 medium, anything above hard.
    pub fn from_experience(years: u32) -> Self {
        match years {
            0..=2 => Difficulty::Easy,
            3..=5 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Kata slugs keyed by job role, then difficulty.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    roles: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl Catalog {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The catalog shipped with the crate.
    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_CATALOG)
    }

    /// Reads `path` when given, otherwise the embedded catalog.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::parse(&std::fs::read_to_string(path)?),
            None => Self::embedded(),
        }
    }

    pub fn roles(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }

    /// Slugs for a role and difficulty, duplicates removed, order kept.
    pub fn slugs(&self, role: &str, difficulty: Difficulty) -> Result<Vec<String>> {
        let listed = self
            .roles
            .get(role)
            .and_then(|levels| levels.get(difficulty.key()))
            .filter(|slugs| !slugs.is_empty())
            .ok_or_else(|| RunnerError::UnknownRole {
                role: role.to_string(),
                difficulty: difficulty.to_string(),
            })?;

        let mut seen = std::collections::HashSet::new();
        Ok(listed
            .iter()
            .filter(|slug| seen.insert(slug.as_str()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_experience() {
        assert_eq!(Difficulty::from_experience(0), Difficulty::Easy);
        assert_eq!(Difficulty::from_experience(2), Difficulty::Easy);
        assert_eq!(Difficulty::from_experience(3), Difficulty::Medium);
        assert_eq!(Difficulty::from_experience(5), Difficulty::Medium);
        assert_eq!(Difficulty::from_experience(6), Difficulty::Hard);
    }

    #[test]
    fn test_embedded_catalog_has_both_roles() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.roles(), vec!["Data Scientist", "Software Developer"]);
        let easy = catalog.slugs("Software Developer", Difficulty::Easy).unwrap();
        assert_eq!(easy[0], "unique-in-order");
    }

    #[test]
    fn test_slugs_are_deduplicated() {
        let catalog = Catalog::parse("[Dev]\neasy = [\"a\", \"b\", \"a\"]\n").unwrap();
        assert_eq!(catalog.slugs("Dev", Difficulty::Easy).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_role_or_level() {
        let catalog = Catalog::parse("[Dev]\neasy = []\n").unwrap();
        assert!(matches!(
            catalog.slugs("Dev", Difficulty::Easy),
            Err(RunnerError::UnknownRole { .. })
        ));
        assert!(matches!(
            catalog.slugs("Chef", Difficulty::Hard),
            Err(RunnerError::UnknownRole { .. })
        ));
    }

    #[test]
    fn test_bad_toml_is_reported() {
        assert!(matches!(Catalog::parse("[[["), Err(RunnerError::TomlParse(_))));
    }
}
