use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of conversations started on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}

/// Daily counts for one calendar year. Days absent from `days` count as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearContribution {
    pub year: i32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub max: u32,
    #[serde(default)]
    pub days: Vec<DailyCount>,
}

impl YearContribution {
    /// Build a contribution from raw day counts, computing `total` and `max`
    /// and ordering days by date.
    pub fn from_days(year: i32, mut days: Vec<DailyCount>) -> Self {
        days.sort_by_key(|d| d.date);
        let total = days.iter().map(|d| u64::from(d.count)).sum();
        let max = days.iter().map(|d| d.count).max().unwrap_or(0);
        Self { year, total, max, days }
    }
}
