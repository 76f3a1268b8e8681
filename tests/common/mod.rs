//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chat_timeline::models::{
    ConversationDetail, ConversationSummary, DailyCount, DateRange, DayConversations, Message,
    SearchResults, Stats, YearContribution,
};
use chat_timeline::source::{DataSource, SourceError};
use chat_timeline::timeline::{FixedClock, StoreOptions, TimelineStore};
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
}

/// "Now" used by store tests.
pub fn now() -> NaiveDateTime {
    at("2024-10-18 12:00:00")
}

pub fn summary(id: &str, title: &str) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        title: title.to_string(),
        model: Some("gpt-4o".to_string()),
        message_count: Some(2),
        create_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
    }
}

pub fn detail(id: &str) -> ConversationDetail {
    ConversationDetail {
        id: id.to_string(),
        title: format!("Conversation {}", id),
        create_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
        update_time: None,
        model: Some("gpt-4o".to_string()),
        messages: vec![Message {
            id: Some("m1".to_string()),
            role: Some("user".to_string()),
            name: None,
            content: "hello".to_string(),
            timestamp: None,
        }],
        is_archived: false,
    }
}

/// Scripted data source with call counters, injectable failures and per-request
/// delays.
pub struct FakeSource {
    stats: Stats,
    years: HashMap<i32, Vec<DailyCount>>,
    days: HashMap<NaiveDate, Vec<ConversationSummary>>,
    details: HashMap<String, ConversationDetail>,
    hits: HashMap<String, Vec<ConversationSummary>>,
    delays: HashMap<String, Duration>,
    failing_years: Mutex<HashSet<i32>>,
    fail_stats: AtomicBool,
    fail_days: AtomicBool,
    fail_search: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            stats: Stats {
                total_conversations: 3,
                total_messages: 9,
                date_range: DateRange { start: Some(date("2022-03-01")), end: Some(date("2024-10-01")) },
                top_models: Vec::new(),
            },
            years: HashMap::new(),
            days: HashMap::new(),
            details: HashMap::new(),
            hits: HashMap::new(),
            delays: HashMap::new(),
            failing_years: Mutex::new(HashSet::new()),
            fail_stats: AtomicBool::new(false),
            fail_days: AtomicBool::new(false),
            fail_search: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every day of `year` with count 1, plus the given overrides.
    pub fn with_year(mut self, year: i32, overrides: &[(&str, u32)]) -> Self {
        let mut days: Vec<DailyCount> = date(&format!("{}-01-01", year))
            .iter_days()
            .take_while(|d| d.year() == year)
            .map(|d| DailyCount { date: d, count: 1 })
            .collect();
        for (day, count) in overrides {
            let target = date(day);
            if let Some(entry) = days.iter_mut().find(|d| d.date == target) {
                entry.count = *count;
            }
        }
        self.years.insert(year, days);
        self
    }

    pub fn with_day(mut self, day: &str, conversations: Vec<ConversationSummary>) -> Self {
        self.days.insert(date(day), conversations);
        self
    }

    pub fn with_detail(mut self, detail: ConversationDetail) -> Self {
        self.details.insert(detail.id.clone(), detail);
        self
    }

    pub fn with_hits(mut self, query: &str, hits: Vec<ConversationSummary>) -> Self {
        self.hits.insert(query.to_string(), hits);
        self
    }

    /// Delay the response to a call named like the call log (e.g. `search:rust`).
    pub fn with_delay(mut self, call: &str, delay: Duration) -> Self {
        self.delays.insert(call.to_string(), delay);
        self
    }

    pub fn fail_year(&self, year: i32) {
        self.failing_years.lock().unwrap().insert(year);
    }

    pub fn fail_stats(&self) {
        self.fail_stats.store(true, Ordering::SeqCst);
    }

    pub fn fail_days(&self) {
        self.fail_days.store(true, Ordering::SeqCst);
    }

    pub fn fail_search(&self) {
        self.fail_search.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    async fn record(&self, call: String) {
        let delay = self.delays.get(&call).copied();
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DataSource for FakeSource {
    async fn stats(&self) -> Result<Stats, SourceError> {
        self.record("stats".to_string()).await;
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(SourceError::Status { status: 500, body: "stats unavailable".into() });
        }
        Ok(self.stats.clone())
    }

    async fn contribution(&self, year: i32) -> Result<YearContribution, SourceError> {
        self.record(format!("contribution:{}", year)).await;
        if self.failing_years.lock().unwrap().contains(&year) {
            return Err(SourceError::Status { status: 503, body: "busy".into() });
        }
        let days = self.years.get(&year).cloned().unwrap_or_default();
        Ok(YearContribution::from_days(year, days))
    }

    async fn conversations_for_date(
        &self,
        day: NaiveDate,
    ) -> Result<DayConversations, SourceError> {
        self.record(format!("day:{}", day)).await;
        if self.fail_days.load(Ordering::SeqCst) {
            return Err(SourceError::Status { status: 502, body: "bad gateway".into() });
        }
        Ok(DayConversations {
            date: Some(day),
            conversations: self.days.get(&day).cloned().unwrap_or_default(),
        })
    }

    async fn conversation(&self, id: &str) -> Result<ConversationDetail, SourceError> {
        self.record(format!("conversation:{}", id)).await;
        self.details.get(id).cloned().ok_or_else(|| SourceError::NotFound(id.to_string()))
    }

    async fn search(&self, query: &str, _limit: usize) -> Result<SearchResults, SourceError> {
        self.record(format!("search:{}", query)).await;
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(SourceError::Status { status: 500, body: "index offline".into() });
        }
        Ok(SearchResults {
            query: query.to_string(),
            results: self.hits.get(query).cloned().unwrap_or_default(),
        })
    }
}

/// Store over `source` with a fixed clock at [`now`].
pub fn store_with(source: Arc<FakeSource>, options: StoreOptions) -> TimelineStore {
    TimelineStore::with_clock(source, Arc::new(FixedClock(now())), options)
}

/// Builder for conversations export files
pub struct ExportBuilder {
    temp_dir: TempDir,
    records: Vec<Value>,
}

impl ExportBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir, records: Vec::new() }
    }

    /// Add a conversation whose messages alternate user/assistant, one second apart.
    pub fn conversation(mut self, id: &str, title: &str, create_time: i64, messages: &[&str]) -> Self {
        let mapping: serde_json::Map<String, Value> = messages
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let role = if i % 2 == 0 { "user" } else { "assistant" };
                (
                    format!("node-{}", i),
                    json!({
                        "message": {
                            "id": format!("{}-m{}", id, i),
                            "author": {"role": role},
                            "content": {"content_type": "text", "parts": [text]},
                            "create_time": create_time + i as i64 + 1
                        }
                    }),
                )
            })
            .collect();

        self.records.push(json!({
            "id": id,
            "title": title,
            "create_time": create_time,
            "update_time": create_time + messages.len() as i64,
            "default_model_slug": "gpt-4o",
            "mapping": mapping,
        }));
        self
    }

    /// Add a raw record as-is.
    pub fn raw(mut self, record: Value) -> Self {
        self.records.push(record);
        self
    }

    /// Write `conversations.json` and return the temp dir with its path.
    pub fn build(self) -> (TempDir, PathBuf) {
        let path = self.temp_dir.path().join("conversations.json");
        fs::write(&path, Value::Array(self.records).to_string())
            .expect("Failed to write conversations.json");
        (self.temp_dir, path)
    }
}

impl Default for ExportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}
