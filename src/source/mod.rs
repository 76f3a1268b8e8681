//! Read-only access to the conversation archive.
//!
//! [`DataSource`] is the seam between the timeline engine and wherever the archive
//! actually lives. Two adapters ship with the crate:
//!
//! - [`HttpDataSource`] talks to the archive's JSON API
//! - [`ExportDataSource`] serves a conversations export file from memory
//!
//! Implementations must be cheap to share behind `Arc<dyn DataSource>`; the store
//! issues calls from spawned tasks.

pub mod export;
pub mod http;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

pub use export::ExportDataSource;
pub use http::HttpDataSource;

use crate::models::{ConversationDetail, DayConversations, SearchResults, Stats, YearContribution};

/// Default number of hits requested by a search.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("conversation not found: {0}")]
    NotFound(String),
    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid archive URL: {0}")]
    InvalidUrl(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("search index error: {0}")]
    Index(#[from] tantivy::TantivyError),
}

/// Read-only operations offered by the archive.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn stats(&self) -> Result<Stats, SourceError>;

    async fn contribution(&self, year: i32) -> Result<YearContribution, SourceError>;

    async fn conversations_for_date(&self, date: NaiveDate)
    -> Result<DayConversations, SourceError>;

    async fn conversation(&self, id: &str) -> Result<ConversationDetail, SourceError>;

    async fn search(&self, query: &str, limit: usize) -> Result<SearchResults, SourceError>;
}
