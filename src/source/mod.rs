// src/source/mod.rs
pub mod error;
pub mod mangadex;
pub mod session;
pub mod types;

pub use error::SourceError;
pub use types::{ChapterMeta, RawUpdate, SeriesAggregate, SeriesMeta, UpdateSource};
