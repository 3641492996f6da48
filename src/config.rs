// src/config.rs
//! Process settings: optional TOML file for non-secret defaults, then
//! environment variables on top. Credentials only come from the environment.
//!
//! Lookup order for the file:
//! 1) $FEED_CONFIG_PATH (must exist)
//! 2) config/feed.toml
//! 3) none (built-in defaults)

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::source::mangadex::{DEFAULT_API_URL, DEFAULT_SITE_URL};
use crate::source::session::Credentials;

pub const ENV_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/feed.toml";

pub const ENV_USERNAME: &str = "MANGADEX_USERNAME";
pub const ENV_PASSWORD: &str = "MANGADEX_PASSWORD";
pub const ENV_LANGUAGES: &str = "FEED_LANGUAGES";
pub const ENV_FETCH_LIMIT: &str = "FEED_FETCH_LIMIT";
pub const ENV_FEED_FILE: &str = "FEED_FILE";
pub const ENV_CACHE_PATH: &str = "FEED_CACHE_PATH";
pub const ENV_TOKEN_PATH: &str = "FEED_TOKEN_PATH";
pub const ENV_ANNOTATE_OLD: &str = "FEED_ANNOTATE_OLD";
pub const ENV_API_URL: &str = "MANGADEX_API_URL";
pub const ENV_SITE_URL: &str = "MANGADEX_SITE_URL";

const DEFAULT_FETCH_LIMIT: u32 = 10;
const MAX_FETCH_LIMIT: u32 = 100;

/// Optional file layer; every field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSettings {
    pub languages: Option<Vec<String>>,
    pub fetch_limit: Option<u32>,
    pub feed_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
    pub annotate_old: Option<bool>,
    pub api_url: Option<String>,
    pub site_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub languages: Vec<String>,
    pub fetch_limit: u32,
    pub feed_path: PathBuf,
    pub cache_path: PathBuf,
    pub token_path: PathBuf,
    pub annotate_old: bool,
    pub api_url: String,
    pub site_url: String,
}

impl FileSettings {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// File layer via env var + fallback; empty when nothing is configured.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }
}

fn parse_languages(raw: &str) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut seen = BTreeSet::new();
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{name}: expected a boolean, got {other:?}"),
    }
}

impl Settings {
    /// Merge the file layer with values from `lookup` (usually the process env).
    pub fn from_lookup<F>(file: FileSettings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let username = get(ENV_USERNAME).ok_or_else(|| anyhow!("{ENV_USERNAME} is not set"))?;
        let password = get(ENV_PASSWORD).ok_or_else(|| anyhow!("{ENV_PASSWORD} is not set"))?;

        let languages = match get(ENV_LANGUAGES) {
            Some(raw) => parse_languages(&raw),
            None => file
                .languages
                .map(|v| parse_languages(&v.join(",")))
                .unwrap_or_default(),
        };
        let languages = if languages.is_empty() {
            vec!["en".to_string()]
        } else {
            languages
        };

        let fetch_limit = match get(ENV_FETCH_LIMIT) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("{ENV_FETCH_LIMIT}: not a number: {raw:?}"))?,
            None => file.fetch_limit.unwrap_or(DEFAULT_FETCH_LIMIT),
        }
        .clamp(1, MAX_FETCH_LIMIT);

        let annotate_old = match get(ENV_ANNOTATE_OLD) {
            Some(raw) => parse_bool(ENV_ANNOTATE_OLD, &raw)?,
            None => file.annotate_old.unwrap_or(true),
        };

        let path = |env: &str, from_file: Option<PathBuf>, default: &str| {
            get(env)
                .map(PathBuf::from)
                .or(from_file)
                .unwrap_or_else(|| PathBuf::from(default))
        };
        let url = |env: &str, from_file: Option<String>, default: &str| {
            get(env)
                .or(from_file)
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };

        Ok(Self {
            credentials: Credentials { username, password },
            languages,
            fetch_limit,
            feed_path: path(ENV_FEED_FILE, file.feed_path, "rss.xml"),
            cache_path: path(ENV_CACHE_PATH, file.cache_path, "cache.json"),
            token_path: path(ENV_TOKEN_PATH, file.token_path, "token.txt"),
            annotate_old,
            api_url: url(ENV_API_URL, file.api_url, DEFAULT_API_URL),
            site_url: url(ENV_SITE_URL, file.site_url, DEFAULT_SITE_URL),
        })
    }

    /// File layer + process environment.
    pub fn load() -> Result<Self> {
        let file = FileSettings::load_default()?;
        Self::from_lookup(file, |name| std::env::var(name).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const CREDS: [(&str, &str); 2] = [(ENV_USERNAME, "reader"), (ENV_PASSWORD, "secret")];

    #[test]
    fn defaults_apply_with_only_credentials() {
        let s = Settings::from_lookup(FileSettings::default(), env(&CREDS)).unwrap();
        assert_eq!(s.credentials.username, "reader");
        assert_eq!(s.languages, vec!["en".to_string()]);
        assert_eq!(s.fetch_limit, 10);
        assert_eq!(s.feed_path, PathBuf::from("rss.xml"));
        assert_eq!(s.cache_path, PathBuf::from("cache.json"));
        assert_eq!(s.token_path, PathBuf::from("token.txt"));
        assert!(s.annotate_old);
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.site_url, DEFAULT_SITE_URL);
    }

    #[test]
    fn missing_credentials_is_an_error() {
        let err = Settings::from_lookup(FileSettings::default(), env(&[(ENV_USERNAME, "u")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PASSWORD));
    }

    #[test]
    fn env_overrides_file_layer() {
        let file: FileSettings = toml::from_str(
            r#"
languages = ["ja", "en"]
fetch_limit = 50
feed_path = "out/feed.xml"
annotate_old = false
site_url = "https://mirror.example/"
"#,
        )
        .unwrap();

        let mut pairs = CREDS.to_vec();
        pairs.push((ENV_LANGUAGES, " PT-BR, en ,,pt-br"));
        pairs.push((ENV_FETCH_LIMIT, "500"));
        let s = Settings::from_lookup(file, env(&pairs)).unwrap();

        assert_eq!(s.languages, vec!["pt-br".to_string(), "en".to_string()]);
        assert_eq!(s.fetch_limit, 100);
        assert_eq!(s.feed_path, PathBuf::from("out/feed.xml"));
        assert!(!s.annotate_old);
        assert_eq!(s.site_url, "https://mirror.example");
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut pairs = CREDS.to_vec();
        pairs.push((ENV_ANNOTATE_OLD, "maybe"));
        assert!(Settings::from_lookup(FileSettings::default(), env(&pairs)).is_err());

        let mut pairs = CREDS.to_vec();
        pairs.push((ENV_FETCH_LIMIT, "ten"));
        assert!(Settings::from_lookup(FileSettings::default(), env(&pairs)).is_err());
    }
}
