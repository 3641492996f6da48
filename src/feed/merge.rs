// src/feed/merge.rs
//! Prepend fresh entries to the persisted feed without losing history.
//!
//! The prior document is parsed into items and carried forward unchanged
//! behind the freshly rendered ones. Channel metadata always comes from the
//! fresh render. A prior document that cannot be parsed, or that holds no
//! items, is treated as absent.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::document::{Channel, Image, Item, RssDocument};
use super::entry::{event_to_item, EntryStyle};
use crate::detector::UpdateEvent;

/// Channel-level metadata for rendered documents.
#[derive(Debug, Clone)]
pub struct ChannelMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
    pub logo: Option<String>,
}

impl ChannelMeta {
    /// MangaDex follows feed defaults for a given site base.
    pub fn mangadex(site_url: &str, language: Option<String>) -> Self {
        Self {
            title: "MangaDex Subscriptions".to_string(),
            link: site_url.to_string(),
            description: "MangaDex User Feed".to_string(),
            language,
            logo: Some(format!("{site_url}/favicon.svg")),
        }
    }
}

pub struct FeedMerger {
    channel: ChannelMeta,
    style: EntryStyle,
}

impl FeedMerger {
    pub fn new(channel: ChannelMeta, style: EntryStyle) -> Self {
        Self { channel, style }
    }

    fn document(&self, items: Vec<Item>) -> RssDocument {
        RssDocument::new(Channel {
            title: self.channel.title.clone(),
            link: self.channel.link.clone(),
            description: self.channel.description.clone(),
            language: self.channel.language.clone(),
            generator: Some(env!("CARGO_PKG_NAME").to_string()),
            image: self.channel.logo.as_ref().map(|url| Image {
                url: url.clone(),
                title: self.channel.title.clone(),
                link: self.channel.link.clone(),
            }),
            items,
        })
    }

    /// Render `fresh` (newest first) as a standalone document.
    pub fn render(&self, fresh: &[UpdateEvent]) -> Result<String> {
        let items = fresh.iter().map(|ev| event_to_item(ev, &self.style)).collect();
        self.document(items).to_xml()
    }

    /// Items of a prior document, or `None` if it has none we can read.
    fn prior_items(prior: &str) -> Option<Vec<Item>> {
        match RssDocument::parse(prior) {
            Ok(doc) if !doc.channel.items.is_empty() => Some(doc.channel.items),
            Ok(_) => {
                warn!(target: "feed", "prior document has no items; treating as absent");
                None
            }
            Err(e) => {
                warn!(target: "feed", error = %format!("{e:#}"), "prior document unreadable; treating as absent");
                None
            }
        }
    }

    /// Fresh entries first, then every prior entry in its original order.
    /// An empty `fresh` with a prior document returns that document as-is.
    pub fn merge(&self, fresh: &[UpdateEvent], prior: Option<&str>) -> Result<String> {
        if fresh.is_empty() {
            if let Some(p) = prior {
                return Ok(p.to_string());
            }
        }

        let Some(prior_items) = prior.and_then(Self::prior_items) else {
            return self.render(fresh);
        };

        let mut items: Vec<Item> = fresh
            .iter()
            .map(|ev| event_to_item(ev, &self.style))
            .collect();
        let fresh_count = items.len();
        items.extend(prior_items);
        debug!(target: "feed", fresh = fresh_count, total = items.len(), "merged feed items");
        self.document(items).to_xml()
    }

    /// Merge into the document at `path`. Nothing is written when `fresh`
    /// is empty. Returns whether the file was written.
    pub fn write(&self, path: &Path, fresh: &[UpdateEvent]) -> Result<bool> {
        if fresh.is_empty() {
            debug!(target: "feed", path = %path.display(), "no fresh entries; feed left untouched");
            return Ok(false);
        }

        let prior = match fs::read_to_string(path) {
            Ok(s) => Some(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("reading feed from {}", path.display()))
            }
        };

        let xml = self.merge(fresh, prior.as_deref())?;
        crate::write_atomic(path, xml.as_bytes())
            .with_context(|| format!("writing feed to {}", path.display()))?;
        info!(target: "feed", path = %path.display(), entries = fresh.len(), "feed updated");
        Ok(true)
    }
}
