// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod app;
pub mod cache;
pub mod chapter;
pub mod config;
pub mod detector;
pub mod feed;
pub mod source;

// ---- Re-exports for stable public API ----
pub use crate::app::{process_batch, run_once, RunSummary};
pub use crate::cache::{Cache, LatestKnown, SeriesRecord};
pub use crate::chapter::ChapterKey;
pub use crate::config::Settings;
pub use crate::detector::{UpdateDetector, UpdateEvent};
pub use crate::feed::FeedMerger;
pub use crate::source::{SourceError, UpdateSource};

use std::fs;
use std::io::Write;
use std::path::Path;

/// Write `bytes` to a sibling temp file and rename it over `path`.
/// Parent directories are created as needed.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let written = fs::File::create(&tmp).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()
    });
    let result = written.and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
