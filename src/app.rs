// src/app.rs
//! One run: load cache → session → followed feed → detect → persist.
//!
//! Persistence order is cache first, then the feed document. They are two
//! independent writes; a crash in between leaves a chapter marked seen but
//! absent from the document, which is never retried.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache;
use crate::config::Settings;
use crate::detector::UpdateDetector;
use crate::feed::{ChannelMeta, EntryStyle, FeedMerger};
use crate::source::mangadex::{build_http_client, MangaDexClient};
use crate::source::session::SessionManager;
use crate::source::{RawUpdate, SourceError, UpdateSource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub emitted: usize,
    pub old: usize,
    pub cache_written: bool,
    pub document_written: bool,
}

pub fn feed_merger(settings: &Settings) -> FeedMerger {
    FeedMerger::new(
        ChannelMeta::mangadex(&settings.site_url, settings.languages.first().cloned()),
        EntryStyle {
            site_url: settings.site_url.clone(),
            annotate_old: settings.annotate_old,
        },
    )
}

/// Detect against the persisted cache and persist the outcome.
/// On any source error nothing is written.
pub async fn process_batch<S>(
    settings: &Settings,
    source: &S,
    batch: &[RawUpdate],
) -> Result<RunSummary>
where
    S: UpdateSource + ?Sized,
{
    let (mut cache, reset) = cache::load_current(&settings.cache_path)?;

    let detector = UpdateDetector::new(source, &settings.languages);
    let events = detector
        .detect(batch, &mut cache)
        .await
        .context("detecting new chapters")?;

    let cache_written = !events.is_empty() || reset;
    if cache_written {
        cache::save(&settings.cache_path, &cache)?;
    }
    let document_written = feed_merger(settings).write(&settings.feed_path, &events)?;

    Ok(RunSummary {
        fetched: batch.len(),
        emitted: events.len(),
        old: events.iter().filter(|e| e.is_old()).count(),
        cache_written,
        document_written,
    })
}

/// Full run against MangaDex. Auth failures anywhere invalidate the stored
/// session before the error is returned.
pub async fn run_once(settings: &Settings) -> Result<RunSummary> {
    let http = build_http_client().context("building http client")?;
    let sessions = SessionManager::new(&http, &settings.api_url, &settings.token_path);
    let session = sessions
        .establish(&settings.credentials)
        .await
        .context("establishing session")?;

    let client = MangaDexClient::new(
        http.clone(),
        settings.api_url.clone(),
        session,
        settings.languages.clone(),
        settings.fetch_limit,
    );

    let result = async {
        let batch = client
            .followed_updates()
            .await
            .context("fetching followed feed")?;
        process_batch(settings, &client, &batch).await
    }
    .await;

    match result {
        Ok(summary) => {
            info!(
                target: "app",
                fetched = summary.fetched,
                emitted = summary.emitted,
                old = summary.old,
                cache_written = summary.cache_written,
                document_written = summary.document_written,
                "run finished"
            );
            Ok(summary)
        }
        Err(e) => {
            if is_auth_error(&e) {
                sessions.invalidate();
            }
            warn!(target: "app", error = %format!("{e:#}"), "run aborted");
            Err(e)
        }
    }
}

pub fn is_auth_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<SourceError>().is_some_and(SourceError::is_auth)
}
