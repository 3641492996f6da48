//! # Version Cache
//! Durable state carried between runs:
//! - per-series "latest known chapter" pointers,
//! - the set of chapter ids already emitted into the feed,
//! - the fingerprint of the program version that wrote it.
//!
//! Whole-file load/replace, pretty JSON with sorted keys so an unchanged
//! cache serialises to identical bytes. One writer at a time: concurrent
//! runs against the same file are not supported.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::chapter::ChapterKey;

/// Bump when the on-disk layout or its interpretation changes.
const CACHE_SCHEMA: &str = "chapter-cache/v2";

/// Short hex fingerprint of crate name + version + cache schema.
pub fn current_fingerprint() -> String {
    let mut hasher = Sha256::new();
    hasher.update(env!("CARGO_PKG_NAME").as_bytes());
    hasher.update(b"@");
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update(b"/");
    hasher.update(CACHE_SCHEMA.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Greatest chapter observed (or looked up) for a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestKnown {
    pub key: ChapterKey,
    /// Chapter id the key belongs to; `None` for the "no chapter" sentinel.
    pub locator: Option<String>,
}

impl LatestKnown {
    pub fn new(key: ChapterKey, locator: impl Into<String>) -> Self {
        Self {
            key,
            locator: Some(locator.into()),
        }
    }

    /// Placeholder for a series with no chapters at all.
    pub fn none() -> Self {
        Self {
            key: ChapterKey::none(),
            locator: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub latest: Option<LatestKnown>,
}

impl SeriesRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            latest: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub series: BTreeMap<String, SeriesRecord>,
    #[serde(default)]
    pub seen: BTreeSet<String>,
}

impl Cache {
    /// Empty cache stamped with the current fingerprint.
    pub fn fresh() -> Self {
        Self {
            fingerprint: Some(current_fingerprint()),
            ..Self::default()
        }
    }

    pub fn get_series(&self, id: &str) -> Option<&SeriesRecord> {
        self.series.get(id)
    }

    pub fn get_series_mut(&mut self, id: &str) -> Option<&mut SeriesRecord> {
        self.series.get_mut(id)
    }

    pub fn upsert_series(&mut self, id: impl Into<String>, record: SeriesRecord) {
        self.series.insert(id.into(), record);
    }

    pub fn has_seen_chapter(&self, chapter_id: &str) -> bool {
        self.seen.contains(chapter_id)
    }

    /// Returns `false` if the id was already present.
    pub fn mark_seen_chapter(&mut self, chapter_id: impl Into<String>) -> bool {
        self.seen.insert(chapter_id.into())
    }
}

/// True if the cache was written by another program version (or by none).
pub fn is_stale(cache: &Cache, current: &str) -> bool {
    cache.fingerprint.as_deref() != Some(current)
}

/// Move `record.latest` forward to the candidate if it is unset or the
/// candidate key is strictly greater. Returns whether it moved.
pub fn advance_latest(record: &mut SeriesRecord, key: &ChapterKey, locator: &str) -> bool {
    let replace = match &record.latest {
        None => true,
        Some(cur) => key > &cur.key,
    };
    if replace {
        debug!(
            target: "cache",
            series = %record.id,
            from = ?record.latest.as_ref().map(|l| l.key.to_string()),
            to = %key,
            "advancing latest known chapter"
        );
        record.latest = Some(LatestKnown::new(key.clone(), locator));
    }
    replace
}

/// Read the cache file. Missing file → empty default; unreadable layout →
/// empty default with a warning (it will be treated as stale).
pub fn load(path: &Path) -> Result<Cache> {
    let data = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(target: "cache", path = %path.display(), "no cache file yet");
            return Ok(Cache::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("reading cache from {}", path.display()))
        }
    };
    match serde_json::from_str(&data) {
        Ok(cache) => Ok(cache),
        Err(e) => {
            warn!(target: "cache", path = %path.display(), error = %e, "cache file not understood; starting over");
            Ok(Cache::default())
        }
    }
}

/// Load and drop the result wholesale if it belongs to another version.
/// The flag is `true` when the returned cache is a reset.
pub fn load_current(path: &Path) -> Result<(Cache, bool)> {
    let cache = load(path)?;
    let current = current_fingerprint();
    if is_stale(&cache, &current) {
        if cache.fingerprint.is_some() || !cache.series.is_empty() || !cache.seen.is_empty() {
            info!(
                target: "cache",
                found = ?cache.fingerprint,
                expected = %current,
                "cache fingerprint mismatch; discarding"
            );
        }
        return Ok((Cache::fresh(), true));
    }
    Ok((cache, false))
}

/// Replace the cache file (temp file + rename).
pub fn save(path: &Path, cache: &Cache) -> Result<()> {
    let json = serde_json::to_string_pretty(cache).context("serializing cache")?;
    crate::write_atomic(path, json.as_bytes())
        .with_context(|| format!("writing cache to {}", path.display()))
}
