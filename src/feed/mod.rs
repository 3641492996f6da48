// src/feed/mod.rs
pub mod document;
pub mod entry;
pub mod merge;

pub use document::RssDocument;
pub use entry::{event_to_item, EntryStyle};
pub use merge::{ChannelMeta, FeedMerger};
