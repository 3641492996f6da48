// src/feed/document.rs
//! RSS 2.0 document model, read and written through quick-xml's serde support.
//!
//! Only the elements this crate produces are modelled; unknown channel or
//! item elements in a prior document are dropped on the next rewrite.
//! Channel metadata is optional on read so a prior document with items is
//! never rejected over a missing header field.
//!
//! Text content is trimmed on read: `<title>  x  </title>` comes back as
//! `"x"`. Documents written by `to_xml` carry no surrounding whitespace in
//! text nodes, so their items survive a rewrite unchanged.

use anyhow::{Context, Result};
use quick_xml::de::from_str;
use quick_xml::se::Serializer;
use serde::{Deserialize, Serialize};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "rss")]
pub struct RssDocument {
    #[serde(rename = "@version")]
    pub version: String,
    pub channel: Channel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Guid>,
    #[serde(
        rename = "pubDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pub_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guid {
    #[serde(
        rename = "@isPermaLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_permalink: Option<bool>,
    #[serde(rename = "$text")]
    pub value: String,
}

impl RssDocument {
    pub fn new(channel: Channel) -> Self {
        Self {
            version: "2.0".to_string(),
            channel,
        }
    }

    pub fn parse(xml: &str) -> Result<Self> {
        from_str(xml).context("parsing rss document")
    }

    /// Indented XML with declaration.
    pub fn to_xml(&self) -> Result<String> {
        let mut body = String::new();
        let mut ser = Serializer::with_root(&mut body, Some("rss")).context("rss serializer")?;
        ser.indent(' ', 2);
        self.serialize(ser).context("serializing rss document")?;

        let mut out = String::with_capacity(XML_DECL.len() + body.len() + 1);
        out.push_str(XML_DECL);
        out.push_str(&body);
        out.push('\n');
        Ok(out)
    }
}
