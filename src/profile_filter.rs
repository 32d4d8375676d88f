//! Persona visibility filter.
//!
//! The merged endpoint table serves every persona at once; this filter decides
//! which request paths the active persona is allowed to "see". A path is
//! visible when any of the persona's keywords is a substring of it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::config::ProfileConfig;
use crate::error::{HoneypotError, Result};

/// Profile name that makes every endpoint visible
pub const ALL_PROFILES: &str = "all";

/// Persona name -> path keywords
pub type KeywordMap = HashMap<String, Vec<String>>;

/// What to do when the keyword map cannot be loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingConfigPolicy {
    /// Treat every path as visible
    #[default]
    #[serde(rename = "open")]
    FailOpen,
    /// Treat every path as invisible
    #[serde(rename = "closed")]
    FailClosed,
}

const BUILTIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "generic",
        &["/admin", "/login", "/auth", "/robots.txt", "/favicon.ico", "/sitemap.xml", "/humans.txt", "/.well-known/"],
    ),
    (
        "wordpress",
        &["/wp-", "/xmlrpc.php", "/robots.txt", "/favicon.ico", "/sitemap.xml", "/humans.txt", "/.well-known/"],
    ),
    (
        "api",
        &["/api/", "/actuator", "/swagger", "/robots.txt", "/favicon.ico", "/sitemap.xml", "/humans.txt", "/.well-known/"],
    ),
    ("database", &["/phpmyadmin", "/pgadmin"]),
    (
        "iot",
        &["/userRpm/", "/help", "/cgi", "/goform/", "/camera/", "/css/", "/js/", "/img/", "/robots.txt", "/favicon.ico", "/humans.txt"],
    ),
    ("iot_tapo", &["/admin", "/login", "/config", "/favicon.ico"]),
    ("devops", &["/.env", "/docker-compose", "/.git", "/config"]),
];

static BUILTIN_MAP: Lazy<KeywordMap> = Lazy::new(|| {
    BUILTIN_KEYWORDS
        .iter()
        .map(|(name, keywords)| {
            (
                name.to_string(),
                keywords.iter().map(|k| k.to_string()).collect(),
            )
        })
        .collect()
});

/// Keyword map compiled into the binary
pub fn builtin_keyword_map() -> &'static KeywordMap {
    &BUILTIN_MAP
}

/// Load a `profiles.json`-style keyword map
pub fn load_keyword_map<P: AsRef<Path>>(path: P) -> Result<KeywordMap> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| HoneypotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

#[derive(Debug, Clone)]
pub struct ProfileFilter {
    active: String,
    /// `None` when the keyword source was unavailable
    keywords: Option<KeywordMap>,
    on_missing: MissingConfigPolicy,
}

impl ProfileFilter {
    /// Filter backed by the built-in keyword map
    pub fn builtin(active: &str) -> Self {
        Self {
            active: active.to_string(),
            keywords: Some(builtin_keyword_map().clone()),
            on_missing: MissingConfigPolicy::default(),
        }
    }

    pub fn with_keywords(active: &str, keywords: KeywordMap) -> Self {
        Self {
            active: active.to_string(),
            keywords: Some(keywords),
            on_missing: MissingConfigPolicy::default(),
        }
    }

    /// Filter whose keyword source could not be loaded
    pub fn unavailable(active: &str, on_missing: MissingConfigPolicy) -> Self {
        Self {
            active: active.to_string(),
            keywords: None,
            on_missing,
        }
    }

    pub fn from_config(config: &ProfileConfig) -> Self {
        let Some(path) = &config.keywords_path else {
            let mut filter = Self::builtin(&config.active);
            filter.on_missing = config.on_missing;
            return filter;
        };

        match load_keyword_map(path) {
            Ok(keywords) => {
                info!("Loaded {} persona keyword sets from {}", keywords.len(), path.display());
                Self {
                    active: config.active.clone(),
                    keywords: Some(keywords),
                    on_missing: config.on_missing,
                }
            }
            Err(e) => {
                warn!(
                    "Persona keyword map unavailable ({}), policy: {:?}",
                    e, config.on_missing
                );
                Self::unavailable(&config.active, config.on_missing)
            }
        }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    /// Whether `path` is visible under the active persona
    pub fn is_allowed(&self, path: &str) -> bool {
        if self.active == ALL_PROFILES {
            return true;
        }

        match &self.keywords {
            None => self.on_missing == MissingConfigPolicy::FailOpen,
            Some(map) => map
                .get(&self.active)
                .map(|keywords| keywords.iter().any(|k| path.contains(k.as_str())))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_profile_allows_everything() {
        let filter = ProfileFilter::builtin("all");
        assert!(filter.is_allowed("/"));
        assert!(filter.is_allowed("/actuator/health"));
        assert!(filter.is_allowed("/definitely/not/registered"));
    }

    #[test]
    fn test_keyword_substring_matching() {
        let filter = ProfileFilter::builtin("wordpress");
        assert!(filter.is_allowed("/wp-login.php"));
        assert!(filter.is_allowed("/blog/wp-content/uploads"));
        assert!(filter.is_allowed("/xmlrpc.php"));
        assert!(!filter.is_allowed("/actuator/health"));
        assert!(!filter.is_allowed("/.env"));
    }

    #[test]
    fn test_devops_profile() {
        let filter = ProfileFilter::builtin("devops");
        assert!(filter.is_allowed("/.env"));
        assert!(filter.is_allowed("/docker-compose.yml"));
        assert!(!filter.is_allowed("/wp-admin"));
    }

    #[test]
    fn test_unknown_profile_sees_nothing() {
        let filter = ProfileFilter::builtin("mainframe");
        assert!(!filter.is_allowed("/admin"));
    }

    #[test]
    fn test_missing_source_fail_open() {
        let filter = ProfileFilter::unavailable("wordpress", MissingConfigPolicy::FailOpen);
        assert!(filter.is_allowed("/actuator/health"));
        assert!(filter.is_allowed("/wp-admin"));
    }

    #[test]
    fn test_missing_source_fail_closed() {
        let filter = ProfileFilter::unavailable("wordpress", MissingConfigPolicy::FailClosed);
        assert!(!filter.is_allowed("/actuator/health"));
        assert!(!filter.is_allowed("/wp-admin"));
    }

    #[test]
    fn test_missing_source_ignored_for_all_profile() {
        let filter = ProfileFilter::unavailable("all", MissingConfigPolicy::FailClosed);
        assert!(filter.is_allowed("/wp-admin"));
    }

    #[test]
    fn test_from_config_missing_file_uses_policy() {
        let config = ProfileConfig {
            active: "api".to_string(),
            keywords_path: Some("/nonexistent/profiles.json".into()),
            on_missing: MissingConfigPolicy::FailClosed,
        };
        let filter = ProfileFilter::from_config(&config);
        assert!(!filter.is_allowed("/api/v1/users"));
    }

    #[test]
    fn test_from_config_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        fs::write(&path, r#"{"camera": ["/onvif/"]}"#).unwrap();

        let config = ProfileConfig {
            active: "camera".to_string(),
            keywords_path: Some(path),
            on_missing: MissingConfigPolicy::FailOpen,
        };
        let filter = ProfileFilter::from_config(&config);
        assert!(filter.is_allowed("/onvif/device_service"));
        assert!(!filter.is_allowed("/admin"));
    }

    #[test]
    fn test_shipped_profiles_json_matches_builtin() {
        let shipped: KeywordMap = serde_json::from_str(include_str!("../profiles.json")).unwrap();
        assert_eq!(&shipped, builtin_keyword_map());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(load_keyword_map(&path), Err(HoneypotError::ProfileMap(_))));
    }
}
