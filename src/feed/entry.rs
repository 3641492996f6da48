// src/feed/entry.rs
//! UpdateEvent → RSS item presentation.

use html_escape::{encode_double_quoted_attribute, encode_single_quoted_attribute, encode_text};

use super::document::{Guid, Item};
use crate::detector::UpdateEvent;

/// Presentation knobs for entries.
#[derive(Debug, Clone)]
pub struct EntryStyle {
    /// Reader site base, e.g. `https://mangadex.org`.
    pub site_url: String,
    /// Flag chapters below the series' latest with "(old)".
    pub annotate_old: bool,
}

impl EntryStyle {
    fn chapter_url(&self, chapter_id: &str) -> String {
        format!("{}/chapter/{chapter_id}", self.site_url)
    }

    fn series_url(&self, series_id: &str) -> String {
        format!("{}/title/{series_id}", self.site_url)
    }
}

pub fn entry_title(ev: &UpdateEvent, style: &EntryStyle) -> String {
    let mut title = format!("Chapter {} of {} released", ev.key, ev.series_title);
    if let Some(vol) = ev.volume.as_deref() {
        title = format!("Volume {vol}, {title}");
    }
    if style.annotate_old && ev.is_old() {
        title.push_str(" (old)");
    }
    title
}

pub fn entry_description(ev: &UpdateEvent, style: &EntryStyle) -> String {
    let chapter_url = style.chapter_url(&ev.chapter_id);
    let anchor = match ev.chapter_title.as_deref() {
        Some(t) => format!("Chapter {} ({})", ev.key, t),
        None => format!("Chapter {}", ev.key),
    };
    let chapter_link = format!(
        "<a href='{}'>{}</a>",
        encode_single_quoted_attribute(&chapter_url),
        encode_text(&anchor)
    );
    let series_link = format!(
        "<a href=\"{}\">{}</a>",
        encode_double_quoted_attribute(&style.series_url(&ev.series_id)),
        encode_text(&ev.series_title)
    );

    let mut out = if style.annotate_old && ev.is_old() {
        let latest = match ev.latest.locator.as_deref() {
            Some(id) => format!(
                "<a href=\"{}\">{}</a>",
                encode_double_quoted_attribute(&style.chapter_url(id)),
                encode_text(&ev.latest.key.to_string())
            ),
            None => encode_text(&ev.latest.key.to_string()).into_owned(),
        };
        format!("An old chapter {chapter_link} of {series_link} was released. Latest: {latest}")
    } else {
        format!("A new chapter {chapter_link} of {series_link} was released.")
    };

    if let Some(ext) = ev.external_link.as_deref() {
        out.push_str(&format!(
            " Read it at <a href=\"{}\">the publisher</a>.",
            encode_double_quoted_attribute(ext)
        ));
    }
    out
}

/// Build the RSS item for one event.
pub fn event_to_item(ev: &UpdateEvent, style: &EntryStyle) -> Item {
    let link = ev
        .external_link
        .clone()
        .unwrap_or_else(|| format!("{}/1", style.chapter_url(&ev.chapter_id)));

    Item {
        title: Some(entry_title(ev, style)),
        link: Some(link),
        description: Some(entry_description(ev, style)),
        guid: Some(Guid {
            is_permalink: Some(true),
            value: style.chapter_url(&ev.chapter_id),
        }),
        pub_date: Some(ev.published_at.to_rfc2822()),
    }
}
