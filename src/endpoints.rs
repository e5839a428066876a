// src/endpoints.rs
//! Candidate URLs and headers for the primary execution service.

use reqwest::Url;
use serde::Serialize;

use crate::config::ExecutionConfig;
use crate::transport::Headers;

/// Public Judge0 mirrors tried after the configured base when a key is set.
pub const MIRROR_BASES: [&str; 2] = [
    "https://judge0-ce.p.rapidapi.com",
    "https://judge0-extra.p.rapidapi.com",
];

pub const KEY_HEADER: &str = "X-RapidAPI-Key";
pub const HOST_HEADER: &str = "X-RapidAPI-Host";

/// Submission path variants, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathVariant {
    NoEncodingWait,
    WaitOnly,
    Base64Wait,
    Bare,
}

impl PathVariant {
    pub const ORDER: [PathVariant; 4] = [
        PathVariant::NoEncodingWait,
        PathVariant::WaitOnly,
        PathVariant::Base64Wait,
        PathVariant::Bare,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            PathVariant::NoEncodingWait => "/submissions?base64_encoded=false&wait=true",
            PathVariant::WaitOnly => "/submissions?wait=true",
            PathVariant::Base64Wait => "/submissions?base64_encoded=true&wait=true",
            PathVariant::Bare => "/submissions",
        }
    }

    pub fn is_base64(&self) -> bool {
        matches!(self, PathVariant::Base64Wait)
    }
}

/// One (base, path) combination with the headers to send to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub url: String,
    pub variant: PathVariant,
    pub headers: Headers,
}

fn trim_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

/// Configured base first, then the mirrors when an access key is present.
/// Duplicates are dropped, first occurrence wins.
pub fn resolve_bases(primary: &str, access_key: Option<&str>) -> Vec<String> {
    let mut bases = vec![trim_base(primary)];
    if access_key.is_some() {
        bases.extend(MIRROR_BASES.iter().map(|b| trim_base(b)));
    }

    let mut seen = std::collections::HashSet::new();
    bases.retain(|b| seen.insert(b.clone()));
    bases
}

/// Headers for attempts against `base`. The host header names the host of
/// this base, falling back to `host_override` only if the URL won't parse.
pub fn attempt_headers(base: &str, access_key: Option<&str>, host_override: Option<&str>) -> Headers {
    let mut headers = Headers::new();

    if let Some(key) = access_key {
        let host = Url::parse(base)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .or_else(|| host_override.map(str::to_string));
        if let Some(host) = host {
            headers.push((HOST_HEADER.to_string(), host));
        }
        headers.push((KEY_HEADER.to_string(), key.to_string()));
    }

    headers
}

/// Every candidate for a run, bases outer, path variants inner.
pub fn plan(config: &ExecutionConfig) -> Vec<Candidate> {
    let key = config.access_key.as_deref();
    resolve_bases(&config.api_base, key)
        .into_iter()
        .flat_map(|base| {
            let headers = attempt_headers(&base, key, config.host_override.as_deref());
            PathVariant::ORDER.into_iter().map(move |variant| Candidate {
                url: format!("{}{}", base, variant.path()),
                variant,
                headers: headers.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_bases_without_key() {
        assert_eq!(
            resolve_bases("https://judge.local///", None),
            vec!["https://judge.local".to_string()]
        );
    }

    #[test]
    fn test_bases_with_key_are_deduplicated() {
        let bases = resolve_bases("https://judge0-ce.p.rapidapi.com/", Some("k"));
        assert_eq!(
            bases,
            vec![
                "https://judge0-ce.p.rapidapi.com".to_string(),
                "https://judge0-extra.p.rapidapi.com".to_string(),
            ]
        );
    }

    #[test]
    fn test_host_header_follows_the_base_being_tried() {
        let headers = attempt_headers(
            "https://judge0-extra.p.rapidapi.com",
            Some("secret"),
            Some("configured.example.com"),
        );
        assert_eq!(header(&headers, HOST_HEADER), Some("judge0-extra.p.rapidapi.com"));
        assert_eq!(header(&headers, KEY_HEADER), Some("secret"));
    }

    #[test]
    fn test_host_override_used_when_base_does_not_parse() {
        let headers = attempt_headers("not a url", Some("secret"), Some("configured.example.com"));
        assert_eq!(header(&headers, HOST_HEADER), Some("configured.example.com"));
    }

    #[test]
    fn test_no_key_means_no_keyed_headers() {
        let headers = attempt_headers("https://judge.local", None, Some("h"));
        assert!(headers.is_empty());
        assert!(header(&headers, KEY_HEADER).is_none());
    }

    #[test]
    fn test_plan_orders_bases_then_variants() {
        let config = ExecutionConfig {
            api_base: "https://judge.local".to_string(),
            access_key: Some("k".to_string()),
            host_override: None,
        };
        let candidates = plan(&config);

        assert_eq!(candidates.len(), 12);
        assert_eq!(
            candidates[0].url,
            "https://judge.local/submissions?base64_encoded=false&wait=true"
        );
        assert_eq!(candidates[1].url, "https://judge.local/submissions?wait=true");
        assert_eq!(candidates[3].url, "https://judge.local/submissions");
        assert_eq!(
            candidates[4].url,
            "https://judge0-ce.p.rapidapi.com/submissions?base64_encoded=false&wait=true"
        );
        assert_eq!(header(&candidates[0].headers, HOST_HEADER), Some("judge.local"));
        assert_eq!(
            header(&candidates[11].headers, HOST_HEADER),
            Some("judge0-extra.p.rapidapi.com")
        );
    }
}
