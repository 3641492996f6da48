//! MangaDex REST client implementing [`UpdateSource`].
//!
//! All calls are sequential and single-attempt. 401 from a data call is
//! reported as an auth failure so the caller can invalidate the session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::SourceError;
use super::session::Session;
use super::types::{ChapterMeta, RawUpdate, SeriesAggregate, SeriesMeta, UpdateSource};
use crate::chapter::NO_CHAPTER_LABEL;

pub const DEFAULT_API_URL: &str = "https://api.mangadex.org";
pub const DEFAULT_SITE_URL: &str = "https://mangadex.org";

/// Shared HTTP client with a descriptive user agent and bounded timeouts.
pub fn build_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
}

// ------------------------------------------------------------
// Wire types
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListResp<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct EntityResp<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChapterData {
    id: String,
    attributes: ChapterAttrs,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterAttrs {
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    chapter: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    translated_language: Option<String>,
    #[serde(default)]
    external_url: Option<String>,
    #[serde(default)]
    publish_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct MangaData {
    attributes: MangaAttrs,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MangaAttrs {
    #[serde(default)]
    title: BTreeMap<String, String>,
    #[serde(default)]
    alt_titles: Vec<BTreeMap<String, String>>,
}

/// The aggregate endpoint encodes empty (or 0-indexed) maps as JSON arrays.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MapOrList<T> {
    Map(BTreeMap<String, T>),
    List(Vec<T>),
}

impl<T> Default for MapOrList<T> {
    fn default() -> Self {
        MapOrList::List(Vec::new())
    }
}

impl<T> MapOrList<T> {
    fn into_values(self) -> Vec<T> {
        match self {
            MapOrList::Map(m) => m.into_values().collect(),
            MapOrList::List(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AggregateResp {
    #[serde(default)]
    volumes: MapOrList<AggVolume>,
}

#[derive(Debug, Deserialize)]
struct AggVolume {
    volume: String,
    #[serde(default)]
    chapters: MapOrList<AggChapter>,
}

#[derive(Debug, Deserialize)]
struct AggChapter {
    chapter: String,
    id: String,
}

// ------------------------------------------------------------
// Wire → domain
// ------------------------------------------------------------

fn into_update(ch: ChapterData) -> Option<RawUpdate> {
    let series_id = ch
        .relationships
        .iter()
        .find(|r| r.kind == "manga")
        .map(|r| r.id.clone());
    let Some(series_id) = series_id else {
        warn!(target: "mangadex", chapter = %ch.id, "chapter without manga relationship; skipping");
        return None;
    };
    Some(RawUpdate {
        id: ch.id,
        chapter_label: ch
            .attributes
            .chapter
            .unwrap_or_else(|| NO_CHAPTER_LABEL.to_string()),
        volume_label: ch.attributes.volume.filter(|v| !v.is_empty()),
        series_id,
        external_link: ch.attributes.external_url.filter(|u| !u.is_empty()),
        translated_language: ch.attributes.translated_language.unwrap_or_default(),
    })
}

fn into_series_meta(m: MangaData) -> SeriesMeta {
    let mut titles = m.attributes.title;
    for alt in m.attributes.alt_titles {
        for (lang, title) in alt {
            titles.entry(lang).or_insert(title);
        }
    }
    SeriesMeta { titles }
}

fn into_chapter_meta(ch: ChapterData) -> ChapterMeta {
    let published_at = ch
        .attributes
        .publish_at
        .or(ch.attributes.created_at)
        .unwrap_or_else(|| {
            debug!(target: "mangadex", chapter = %ch.id, "chapter without timestamps; using now");
            Utc::now()
        });
    ChapterMeta {
        title: ch.attributes.title.filter(|t| !t.trim().is_empty()),
        published_at,
        translated_language: ch.attributes.translated_language.unwrap_or_default(),
    }
}

fn into_aggregate(resp: AggregateResp) -> SeriesAggregate {
    let mut volumes: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for vol in resp.volumes.into_values() {
        let chapters = volumes.entry(vol.volume).or_default();
        for ch in vol.chapters.into_values() {
            chapters.insert(ch.chapter, ch.id);
        }
    }
    SeriesAggregate { volumes }
}

// ------------------------------------------------------------
// Client
// ------------------------------------------------------------

pub struct MangaDexClient {
    http: Client,
    api_url: String,
    session: Session,
    languages: Vec<String>,
    fetch_limit: u32,
}

impl MangaDexClient {
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        session: Session,
        languages: Vec<String>,
        fetch_limit: u32,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            session,
            languages,
            fetch_limit,
        }
    }

    fn language_query(&self) -> Vec<(&'static str, String)> {
        self.languages
            .iter()
            .map(|l| ("translatedLanguage[]", l.clone()))
            .collect()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.api_url, path);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.session.bearer())
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::http(what, e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::Auth(format!("{what} rejected with {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                what: what.to_string(),
                status,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| SourceError::http(what, e))
    }
}

#[async_trait]
impl UpdateSource for MangaDexClient {
    async fn followed_updates(&self) -> Result<Vec<RawUpdate>, SourceError> {
        let mut query = self.language_query();
        query.push(("limit", self.fetch_limit.to_string()));
        query.push(("order[publishAt]", "desc".to_string()));

        let resp: ListResp<ChapterData> = self
            .get_json("/user/follows/manga/feed", &query, "followed feed")
            .await?;
        let updates: Vec<RawUpdate> = resp.data.into_iter().filter_map(into_update).collect();
        debug!(target: "mangadex", count = updates.len(), "followed feed fetched");
        Ok(updates)
    }

    async fn series_meta(&self, series_id: &str) -> Result<SeriesMeta, SourceError> {
        let resp: EntityResp<MangaData> = self
            .get_json(&format!("/manga/{series_id}"), &[], &format!("manga {series_id}"))
            .await?;
        Ok(into_series_meta(resp.data))
    }

    async fn chapter_meta(&self, chapter_id: &str) -> Result<ChapterMeta, SourceError> {
        let resp: EntityResp<ChapterData> = self
            .get_json(
                &format!("/chapter/{chapter_id}"),
                &[],
                &format!("chapter {chapter_id}"),
            )
            .await?;
        Ok(into_chapter_meta(resp.data))
    }

    async fn series_aggregate(&self, series_id: &str) -> Result<SeriesAggregate, SourceError> {
        let resp: AggregateResp = self
            .get_json(
                &format!("/manga/{series_id}/aggregate"),
                &self.language_query(),
                &format!("aggregate {series_id}"),
            )
            .await?;
        Ok(into_aggregate(resp))
    }

    fn name(&self) -> &'static str {
        "MangaDex"
    }
}
