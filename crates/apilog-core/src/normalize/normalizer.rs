use super::classifier::{
    Classification, EncodedClassifier, IdClassifier, SegmentClassifier, UuidClassifier,
};
use crate::{Error, Result};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub const DEFAULT_API_MARKER: &str = "api";
pub const DEFAULT_BASE_PREFIX: &str = "/api";
pub const ROOT_ENDPOINT: &str = "/";

lazy_static! {
    static ref IP_HOST: Regex =
        RegexBuilder::new(r"^[a-z][a-z0-9+.-]*://\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}(:\d+)?/")
            .case_insensitive(true)
            .build()
            .unwrap();
}

/// Settings that decide which URLs are API traffic and how they are keyed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Substring that marks a request URL as API traffic
    pub api_marker: String,
    /// Path prefix removed before building the endpoint key
    pub base_prefix: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            api_marker: DEFAULT_API_MARKER.to_string(),
            base_prefix: DEFAULT_BASE_PREFIX.to_string(),
        }
    }
}

/// Canonical endpoint key, always starting with `/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedEndpoint(String);

impl NormalizedEndpoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedEndpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NormalizedEndpoint {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NormalizedEndpoint {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Maps raw request URLs to endpoint keys.
///
/// Segments run through the classifier pipeline in order (ID, UUID, then
/// percent-encoded); the first classifier that asks for a replacement wins.
pub struct PathNormalizer {
    config: NormalizerConfig,
    base_prefix: String,
    classifiers: Vec<Box<dyn SegmentClassifier>>,
}

impl PathNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let base_prefix = canonical_prefix(&config.base_prefix);

        Self {
            config,
            base_prefix,
            classifiers: vec![
                Box::new(IdClassifier),
                Box::new(UuidClassifier),
                Box::new(EncodedClassifier),
            ],
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Canonical form of the configured base prefix (`/api`, never `api/`)
    pub fn base_prefix(&self) -> &str {
        &self.base_prefix
    }

    /// Whether the raw URL is API traffic (case-sensitive marker match)
    pub fn is_api(&self, raw_url: &str) -> bool {
        raw_url.contains(&self.config.api_marker)
    }

    /// Normalize a full URL or a path-only string into an endpoint key.
    ///
    /// Only meaningful for URLs accepted by [`PathNormalizer::is_api`].
    pub fn normalize(&self, raw_url: &str) -> Result<NormalizedEndpoint> {
        let path = request_path(raw_url)?;
        Ok(self.normalize_path(path))
    }

    /// Normalize a path that has already been separated from its query
    pub fn normalize_path(&self, path: &str) -> NormalizedEndpoint {
        let rest = strip_base_prefix(path, &self.base_prefix);

        let segments: Vec<String> = rest
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| self.collapse(segment))
            .collect();

        if segments.is_empty() {
            return NormalizedEndpoint(ROOT_ENDPOINT.to_string());
        }

        NormalizedEndpoint(format!("/{}", segments.join("/")))
    }

    fn collapse(&self, segment: &str) -> String {
        for classifier in &self.classifiers {
            if let Classification::Replace(placeholder) = classifier.classify(segment) {
                tracing::trace!(
                    "Segment '{}' collapsed by {} classifier",
                    segment,
                    classifier.name()
                );
                return placeholder;
            }
        }
        segment.to_string()
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

/// Normalize `raw_url` with the default API marker and the given base prefix
pub fn normalize(raw_url: &str, base_prefix: &str) -> Result<NormalizedEndpoint> {
    PathNormalizer::new(NormalizerConfig {
        base_prefix: base_prefix.to_string(),
        ..NormalizerConfig::default()
    })
    .normalize(raw_url)
}

/// Whether the URL addresses a bare IPv4 host, e.g. `https://10.0.0.1:8443/`
pub fn is_ip_host(raw_url: &str) -> bool {
    IP_HOST.is_match(raw_url)
}

/// Path component of a request target, without query or fragment.
///
/// Path-only targets must be absolute; anything else has to parse as a URL.
fn request_path(raw_url: &str) -> Result<&str> {
    if raw_url.starts_with('/') {
        let path = raw_url.split(['?', '#']).next().unwrap_or(raw_url);
        return Ok(path);
    }

    Url::parse(raw_url)
        .map_err(|e| Error::RecordParse(format!("Invalid URL '{}': {}", raw_url, e)))?;

    // Slice the path out of the raw input so the original escapes survive;
    // Url re-serializes it.
    let Some((_, rest)) = raw_url.split_once("://") else {
        return Err(Error::RecordParse(format!(
            "URL '{}' has no authority component",
            raw_url
        )));
    };

    match rest.find(['/', '?', '#']) {
        Some(start) if rest[start..].starts_with('/') => {
            let path = &rest[start..];
            Ok(path.split(['?', '#']).next().unwrap_or(path))
        }
        _ => Ok(ROOT_ENDPOINT),
    }
}

/// Remove everything up to and including the first occurrence of `prefix`
/// that ends on a segment boundary. Paths without the prefix are returned
/// unchanged.
fn strip_base_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return path;
    }

    let mut from = 0;
    while let Some(pos) = path[from..].find(prefix) {
        let end = from + pos + prefix.len();
        let rest = &path[end..];
        if rest.is_empty() || rest.starts_with('/') {
            return rest;
        }
        from = end;
    }

    path
}

fn canonical_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
