//! Chat Timeline - browse a chat archive as a contribution-style heatmap
//!
//! The core is [`TimelineStore`], an observable state container that drives a
//! GitHub-style activity heatmap over a [`DataSource`]:
//!
//! - Rolling 12-month window and per-year views with a per-year contribution cache
//! - Day selection, conversation detail and free-text search
//! - Last-request-wins handling for every asynchronous transition
//! - Data sources for the archive HTTP API and for a local conversations export
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::path::Path;
//!
//! use chat_timeline::{ExportDataSource, StoreOptions, TimelineStore};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let source = ExportDataSource::load(Path::new("conversations.json"))?;
//! let store = TimelineStore::new(Arc::new(source), StoreOptions::default());
//! store.initialize().await?;
//! println!("{} conversations in the last 12 months", store.visible_count());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod clipboard;
pub mod config;
pub mod export;
pub mod logging;
pub mod models;
pub mod source;
pub mod timeline;
pub mod tui;

// Re-export commonly used types
pub use models::{ConversationDetail, ConversationSummary, Stats, YearContribution};
pub use source::{DataSource, ExportDataSource, HttpDataSource, SourceError};
pub use timeline::{Phase, StoreOptions, TimelineState, TimelineStore, Window};
