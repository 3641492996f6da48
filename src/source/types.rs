// src/source/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::SourceError;

/// One entry of the followed-updates batch, as delivered (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUpdate {
    pub id: String,
    pub chapter_label: String,
    pub volume_label: Option<String>,
    pub series_id: String,
    pub external_link: Option<String>,
    pub translated_language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesMeta {
    /// Language code → title.
    pub titles: BTreeMap<String, String>,
}

impl SeriesMeta {
    /// First title in one of `languages`, then English, then any.
    pub fn display_title(&self, languages: &[String]) -> Option<&str> {
        languages
            .iter()
            .map(String::as_str)
            .chain(std::iter::once("en"))
            .find_map(|lang| self.titles.get(lang))
            .or_else(|| self.titles.values().next())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMeta {
    pub title: Option<String>,
    pub published_at: DateTime<Utc>,
    pub translated_language: String,
}

/// Every chapter of a series: volume label → chapter label → chapter id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesAggregate {
    pub volumes: BTreeMap<String, BTreeMap<String, String>>,
}

impl SeriesAggregate {
    pub fn chapters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.volumes
            .values()
            .flat_map(|chapters| chapters.iter().map(|(l, id)| (l.as_str(), id.as_str())))
    }
}

/// The remote data source. Implementations may narrow `followed_updates`
/// to the configured languages; the detector filters each update by
/// language again regardless.
#[async_trait::async_trait]
pub trait UpdateSource: Send + Sync {
    async fn followed_updates(&self) -> Result<Vec<RawUpdate>, SourceError>;
    async fn series_meta(&self, series_id: &str) -> Result<SeriesMeta, SourceError>;
    async fn chapter_meta(&self, chapter_id: &str) -> Result<ChapterMeta, SourceError>;
    async fn series_aggregate(&self, series_id: &str) -> Result<SeriesAggregate, SourceError>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> SeriesMeta {
        SeriesMeta {
            titles: pairs
                .iter()
                .map(|(l, t)| (l.to_string(), t.to_string()))
                .collect(),
        }
    }

    #[test]
    fn title_prefers_configured_language_then_english() {
        let m = meta(&[("en", "Frieren"), ("ja-ro", "Sousou no Frieren")]);
        assert_eq!(m.display_title(&["ja-ro".into()]), Some("Sousou no Frieren"));
        assert_eq!(m.display_title(&["de".into()]), Some("Frieren"));

        let no_en = meta(&[("ko", "K"), ("ja", "J")]);
        assert_eq!(no_en.display_title(&["fr".into()]), Some("J"));
        assert_eq!(SeriesMeta::default().display_title(&[]), None);
    }

    #[test]
    fn aggregate_flattens_all_volumes() {
        let mut agg = SeriesAggregate::default();
        agg.volumes
            .entry("1".into())
            .or_default()
            .insert("1".into(), "c1".into());
        agg.volumes
            .entry("none".into())
            .or_default()
            .insert("2".into(), "c2".into());
        let mut ids: Vec<_> = agg.chapters().map(|(_, id)| id).collect();
        ids.sort();
        assert_eq!(ids, vec!["c1", "c2"]);
    }
}
