use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, deserialize_with = "crate::models::deserializers::deserialize_optional_date")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "crate::models::deserializers::deserialize_optional_date")]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCount {
    pub model: String,
    pub count: u64,
}

/// Archive-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub total_conversations: u64,
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub top_models: Vec<ModelCount>,
}

impl Stats {
    /// Years covered by the archive, newest first. Empty when the archive is empty.
    pub fn selectable_years(&self) -> Vec<i32> {
        match (self.date_range.start, self.date_range.end) {
            (Some(start), Some(end)) if start <= end => (start.year()..=end.year()).rev().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with_range(start: Option<&str>, end: Option<&str>) -> Stats {
        let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        Stats {
            date_range: DateRange { start: start.map(parse), end: end.map(parse) },
            ..Stats::default()
        }
    }

    #[test]
    fn test_selectable_years_newest_first() {
        let stats = stats_with_range(Some("2022-12-05"), Some("2025-01-02"));
        assert_eq!(stats.selectable_years(), vec![2025, 2024, 2023, 2022]);
    }

    #[test]
    fn test_selectable_years_single_year() {
        let stats = stats_with_range(Some("2024-03-01"), Some("2024-03-09"));
        assert_eq!(stats.selectable_years(), vec![2024]);
    }

    #[test]
    fn test_selectable_years_empty_archive() {
        assert!(stats_with_range(None, None).selectable_years().is_empty());
        assert!(stats_with_range(Some("2024-03-01"), None).selectable_years().is_empty());
    }

    #[test]
    fn test_stats_deserialize_camel_case() {
        let json = r#"{
            "totalConversations": 12,
            "totalMessages": 340,
            "dateRange": {"start": "2024-01-01", "end": "2024-06-30"},
            "topModels": [{"model": "gpt-4o", "count": 9}]
        }"#;
        let stats: Stats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_conversations, 12);
        assert_eq!(stats.total_messages, 340);
        assert_eq!(stats.top_models[0].model, "gpt-4o");
        assert_eq!(stats.selectable_years(), vec![2024]);
    }
}
