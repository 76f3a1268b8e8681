//! Heatmap window derivation.
//!
//! Cells are laid out in a 7-row grid filled top to bottom, left to right. In year mode
//! a day's column is its ordinal within the year divided by seven; in rolling mode it is
//! its index within the merged window divided by seven. Neither mode aligns rows to
//! weekdays.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};

use super::cache::ContributionCache;
use super::state::TimelineState;

pub const WEEK_ROWS: usize = 7;

const MONTH_NAMES: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// Map a day's conversation count to a heatmap intensity in `0..=4`.
pub fn bucket_level(count: u32) -> u8 {
    match count {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=9 => 3,
        _ => 4,
    }
}

/// One day of the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub date: NaiveDate,
    pub count: u32,
    pub level: u8,
    pub column: usize,
    pub row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthLabel {
    pub text: &'static str,
    pub column: usize,
}

/// Date-ordered cells plus month label positions for the active window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    pub cells: Vec<Cell>,
    pub month_labels: Vec<MonthLabel>,
}

impl Window {
    /// Sum of counts of every cell in the window.
    pub fn total(&self) -> u64 {
        self.cells.iter().map(|c| u64::from(c.count)).sum()
    }

    pub fn column_count(&self) -> usize {
        self.cells.iter().map(|c| c.column + 1).max().unwrap_or(0)
    }

    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.cells.binary_search_by_key(&date, |c| c.date).ok()
    }

    pub fn cell_at(&self, column: usize, row: usize) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column == column && c.row == row)
    }
}

/// Derive the window for a specific year, or the rolling twelve months when
/// `selected_year` is `None`.
pub fn compute_window(
    cache: &ContributionCache,
    selected_year: Option<i32>,
    now: NaiveDateTime,
) -> Window {
    match selected_year {
        Some(year) => year_window(cache, year),
        None => rolling_window(cache, now),
    }
}

/// Inclusive bounds of the rolling window: twelve months before `now` at the start of
/// that day, through the end of `now`'s day.
pub fn rolling_bounds(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let today = now.date();
    let start = today.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN);
    let end = today.and_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(now);
    (start.and_time(NaiveTime::MIN), end)
}

fn year_window(cache: &ContributionCache, year: i32) -> Window {
    let mut days: Vec<_> = cache
        .get(year)
        .map(|c| c.days.iter().filter(|d| d.date.year() == year).copied().collect())
        .unwrap_or_default();
    days.sort_by_key(|d| d.date);

    let cells = days
        .into_iter()
        .map(|d| {
            let ordinal = d.date.ordinal0() as usize;
            Cell {
                date: d.date,
                count: d.count,
                level: bucket_level(d.count),
                column: ordinal / WEEK_ROWS,
                row: ordinal % WEEK_ROWS,
            }
        })
        .collect();

    let month_labels = (1..=12u32)
        .filter_map(|month| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(MonthLabel {
                text: MONTH_NAMES[month as usize - 1],
                column: first.ordinal0() as usize / WEEK_ROWS,
            })
        })
        .collect();

    Window { cells, month_labels }
}

fn rolling_window(cache: &ContributionCache, now: NaiveDateTime) -> Window {
    let (start, end) = rolling_bounds(now);
    let (first_day, last_day) = (start.date(), end.date());

    let mut days: Vec<_> = [now.year() - 1, now.year()]
        .iter()
        .filter_map(|&year| cache.get(year))
        .flat_map(|c| c.days.iter().copied())
        .filter(|d| d.date >= first_day && d.date <= last_day)
        .collect();
    days.sort_by_key(|d| d.date);

    let mut cells = Vec::with_capacity(days.len());
    let mut month_labels: Vec<MonthLabel> = Vec::new();
    let mut current_month = None;

    for (idx, d) in days.into_iter().enumerate() {
        let column = idx / WEEK_ROWS;
        let key = (d.date.year(), d.date.month());
        if current_month != Some(key) {
            current_month = Some(key);
            month_labels.push(MonthLabel { text: MONTH_NAMES[key.1 as usize - 1], column });
        }
        cells.push(Cell {
            date: d.date,
            count: d.count,
            level: bucket_level(d.count),
            column,
            row: idx % WEEK_ROWS,
        });
    }

    Window { cells, month_labels }
}

/// The "Conversations" statistic for the active window.
pub fn visible_count(state: &TimelineState, cache: &ContributionCache, now: NaiveDateTime) -> u64 {
    compute_window(cache, state.selected_year, now).total()
}

/// Human-readable span of the active window, e.g. `2025-02 → 2026-01`.
pub fn visible_date_range_label(state: &TimelineState, now: NaiveDateTime) -> String {
    if let Some(year) = state.selected_year {
        return format!("{}-01 → {}-12", year, year);
    }
    let end = now.date();
    let start = end.checked_sub_months(Months::new(11)).unwrap_or(end);
    format!("{}-{:02} → {}-{:02}", start.year(), start.month(), end.year(), end.month())
}
