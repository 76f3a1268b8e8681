//! Data models for the conversation archive.
//!
//! These mirror the payloads exchanged with a [`DataSource`](crate::source::DataSource):
//!
//! - [`Stats`] - archive-wide totals and the covered date range
//! - [`YearContribution`] / [`DailyCount`] - per-day conversation counts for one year
//! - [`ConversationSummary`] - one row of a day listing or a search result
//! - [`ConversationDetail`] / [`Message`] - a full transcript
//!
//! Field names follow the camelCase JSON of the archive API. Lenient field parsing
//! (empty strings, epoch-or-RFC3339 timestamps) lives in the `deserializers` module.

pub mod contribution;
pub mod conversation;
pub mod deserializers;
pub mod stats;

pub use contribution::{DailyCount, YearContribution};
pub use conversation::{
    ConversationDetail, ConversationSummary, DayConversations, Message, SearchResults,
};
pub use stats::{DateRange, ModelCount, Stats};
