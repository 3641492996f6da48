// src/detector.rs
//! Update detection: raw followed-feed batch + cache → genuinely new events.
//!
//! Per update, in batch order (newest first):
//! 1. parse the chapter label,
//! 2. skip ids already in the seen set,
//! 3. resolve the series (fetch metadata on first sight),
//! 4. resolve `latest` once from the series aggregate if unset,
//! 5. fetch chapter metadata, then mark the id seen,
//! 6. advance `latest`,
//! 7. emit an event carrying the `latest` snapshot.
//!
//! Any fetch error aborts the whole batch. The cache may have been partially
//! mutated by then, so callers must not persist it on error.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{advance_latest, Cache, LatestKnown, SeriesRecord};
use crate::chapter::ChapterKey;
use crate::source::{RawUpdate, SeriesAggregate, SourceError, UpdateSource};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_updates_total", "Raw updates received from the source.");
        describe_counter!(
            "feed_updates_seen_total",
            "Updates skipped because the chapter was already emitted."
        );
        describe_counter!(
            "feed_updates_language_total",
            "Updates skipped by the language filter."
        );
        describe_counter!("feed_events_emitted_total", "New events emitted.");
        describe_counter!(
            "feed_events_old_total",
            "Emitted events older than the series' latest chapter."
        );
        describe_counter!("feed_source_errors_total", "Source fetch errors.");
    });
}

/// A chapter turned into a feed entry during this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateEvent {
    pub series_id: String,
    pub series_title: String,
    pub chapter_id: String,
    pub key: ChapterKey,
    pub volume: Option<String>,
    pub chapter_title: Option<String>,
    pub published_at: DateTime<Utc>,
    pub external_link: Option<String>,
    pub latest: LatestKnown,
}

impl UpdateEvent {
    /// Republished or out-of-order chapter: below the series' latest.
    pub fn is_old(&self) -> bool {
        self.key < self.latest.key
    }
}

/// Greatest key among all chapters of the aggregate, or the sentinel.
pub fn latest_from_aggregate(agg: &SeriesAggregate) -> LatestKnown {
    agg.chapters()
        .map(|(label, id)| (ChapterKey::parse(label), id))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(key, id)| LatestKnown::new(key, id))
        .unwrap_or_else(LatestKnown::none)
}

pub struct UpdateDetector<'a, S: UpdateSource + ?Sized> {
    source: &'a S,
    languages: &'a [String],
}

impl<'a, S: UpdateSource + ?Sized> UpdateDetector<'a, S> {
    /// `languages` empty = accept every translated language.
    pub fn new(source: &'a S, languages: &'a [String]) -> Self {
        Self { source, languages }
    }

    fn language_allowed(&self, lang: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l.eq_ignore_ascii_case(lang))
    }

    /// Turn `batch` into new events, mutating `cache` in place.
    pub async fn detect(
        &self,
        batch: &[RawUpdate],
        cache: &mut Cache,
    ) -> Result<Vec<UpdateEvent>, SourceError> {
        ensure_metrics_described();
        counter!("feed_updates_total").increment(batch.len() as u64);

        let result = self.detect_inner(batch, cache).await;
        if result.is_err() {
            counter!("feed_source_errors_total").increment(1);
        }
        result
    }

    async fn detect_inner(
        &self,
        batch: &[RawUpdate],
        cache: &mut Cache,
    ) -> Result<Vec<UpdateEvent>, SourceError> {
        let mut events = Vec::new();

        for raw in batch {
            if !self.language_allowed(&raw.translated_language) {
                debug!(target: "detect", chapter = %raw.id, lang = %raw.translated_language, "language filtered");
                counter!("feed_updates_language_total").increment(1);
                continue;
            }

            let key = ChapterKey::parse(&raw.chapter_label);

            if cache.has_seen_chapter(&raw.id) {
                debug!(target: "detect", chapter = %raw.id, "already emitted");
                counter!("feed_updates_seen_total").increment(1);
                continue;
            }

            if cache.get_series(&raw.series_id).is_none() {
                let meta = self.source.series_meta(&raw.series_id).await?;
                let title = meta
                    .display_title(self.languages)
                    .unwrap_or(raw.series_id.as_str())
                    .to_string();
                info!(target: "detect", series = %raw.series_id, %title, "new series");
                cache.upsert_series(raw.series_id.clone(), SeriesRecord::new(&raw.series_id, title));
            }

            let needs_latest = cache
                .get_series(&raw.series_id)
                .is_some_and(|r| r.latest.is_none());
            if needs_latest {
                let agg = self.source.series_aggregate(&raw.series_id).await?;
                let latest = latest_from_aggregate(&agg);
                debug!(target: "detect", series = %raw.series_id, latest = %latest.key, "latest resolved from aggregate");
                if let Some(rec) = cache.get_series_mut(&raw.series_id) {
                    rec.latest = Some(latest);
                }
            }

            let meta = self.source.chapter_meta(&raw.id).await?;
            if !meta.translated_language.eq_ignore_ascii_case(&raw.translated_language) {
                debug!(
                    target: "detect",
                    chapter = %raw.id,
                    feed_lang = %raw.translated_language,
                    chapter_lang = %meta.translated_language,
                    "translated language differs between feed and chapter"
                );
            }
            cache.mark_seen_chapter(raw.id.clone());

            let Some(record) = cache.get_series_mut(&raw.series_id) else {
                continue;
            };
            advance_latest(record, &key, &raw.id);
            let latest = record.latest.clone().unwrap_or_else(LatestKnown::none);

            let event = UpdateEvent {
                series_id: raw.series_id.clone(),
                series_title: record.title.clone(),
                chapter_id: raw.id.clone(),
                key,
                volume: raw.volume_label.clone(),
                chapter_title: meta.title,
                published_at: meta.published_at,
                external_link: raw.external_link.clone(),
                latest,
            };
            if event.is_old() {
                counter!("feed_events_old_total").increment(1);
                info!(
                    target: "detect",
                    series = %event.series_title,
                    chapter = %event.key,
                    latest = %event.latest.key,
                    "old chapter republished"
                );
            }
            events.push(event);
        }

        counter!("feed_events_emitted_total").increment(events.len() as u64);
        info!(
            target: "detect",
            source = self.source.name(),
            batch = batch.len(),
            emitted = events.len(),
            "detection finished"
        );
        Ok(events)
    }
}
