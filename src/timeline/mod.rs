//! Timeline state engine.
//!
//! - [`window`] derives the heatmap cells, month labels and header statistics
//! - [`cache`] holds fetched per-year contribution data
//! - [`state`] is the snapshot handed to views
//! - [`store`] owns both and drives every transition

pub mod cache;
pub mod clock;
pub mod state;
pub mod store;
pub mod window;

pub use cache::ContributionCache;
pub use clock::{Clock, FixedClock, SystemClock};
pub use state::{ListView, Phase, TimelineState};
pub use store::{ListenerId, StoreOptions, TimelineStore};
pub use window::{
    Cell, MonthLabel, Window, bucket_level, compute_window, rolling_bounds, visible_count,
    visible_date_range_label,
};
