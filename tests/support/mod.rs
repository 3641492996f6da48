// tests/support/mod.rs
// In-memory UpdateSource with call counters and injectable failures.
#![allow(dead_code)]

use chapter_feed::source::{
    ChapterMeta, RawUpdate, SeriesAggregate, SeriesMeta, SourceError, UpdateSource,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Default)]
pub struct Calls {
    pub series: Vec<String>,
    pub aggregate: Vec<String>,
    pub chapter: Vec<String>,
}

#[derive(Default)]
pub struct MockSource {
    pub titles: HashMap<String, String>,
    /// series → (chapter label, chapter id)
    pub aggregates: HashMap<String, Vec<(String, String)>>,
    pub chapter_titles: HashMap<String, String>,
    pub failing_chapters: Mutex<HashSet<String>>,
    pub calls: Mutex<Calls>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, id: &str, title: &str, chapters: &[(&str, &str)]) -> Self {
        self.titles.insert(id.to_string(), title.to_string());
        self.aggregates.insert(
            id.to_string(),
            chapters
                .iter()
                .map(|(l, c)| (l.to_string(), c.to_string()))
                .collect(),
        );
        self
    }

    pub fn fail_chapter(&self, id: &str) {
        self.failing_chapters.lock().insert(id.to_string());
    }

    pub fn heal(&self) {
        self.failing_chapters.lock().clear();
    }

    pub fn series_calls(&self) -> usize {
        self.calls.lock().series.len()
    }

    pub fn aggregate_calls(&self) -> usize {
        self.calls.lock().aggregate.len()
    }

    pub fn chapter_calls(&self) -> usize {
        self.calls.lock().chapter.len()
    }
}

#[async_trait::async_trait]
impl UpdateSource for MockSource {
    async fn followed_updates(&self) -> Result<Vec<RawUpdate>, SourceError> {
        Ok(Vec::new())
    }

    async fn series_meta(&self, series_id: &str) -> Result<SeriesMeta, SourceError> {
        self.calls.lock().series.push(series_id.to_string());
        let mut titles = BTreeMap::new();
        if let Some(t) = self.titles.get(series_id) {
            titles.insert("en".to_string(), t.clone());
        }
        Ok(SeriesMeta { titles })
    }

    async fn chapter_meta(&self, chapter_id: &str) -> Result<ChapterMeta, SourceError> {
        self.calls.lock().chapter.push(chapter_id.to_string());
        if self.failing_chapters.lock().contains(chapter_id) {
            return Err(SourceError::Status {
                what: format!("chapter {chapter_id}"),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        Ok(ChapterMeta {
            title: self.chapter_titles.get(chapter_id).cloned(),
            published_at: Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap(),
            translated_language: "en".to_string(),
        })
    }

    async fn series_aggregate(&self, series_id: &str) -> Result<SeriesAggregate, SourceError> {
        self.calls.lock().aggregate.push(series_id.to_string());
        let mut agg = SeriesAggregate::default();
        for (label, id) in self.aggregates.get(series_id).into_iter().flatten() {
            agg.volumes
                .entry("none".to_string())
                .or_default()
                .insert(label.clone(), id.clone());
        }
        Ok(agg)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub fn update(id: &str, series: &str, label: &str) -> RawUpdate {
    RawUpdate {
        id: id.to_string(),
        chapter_label: label.to_string(),
        volume_label: None,
        series_id: series.to_string(),
        external_link: None,
        translated_language: "en".to_string(),
    }
}
