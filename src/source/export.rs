//! Serve a conversations export file (a JSON array of conversation records).
//!
//! The whole export is loaded into memory once. Every [`DataSource`] operation is then
//! answered from precomputed indexes: conversations by id, by UTC start day, and an
//! in-RAM tantivy index over titles and message text for search.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value as _,
};
use tantivy::tokenizer::{
    AsciiFoldingFilter, LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, doc};
use tracing::{debug, info};

use super::{DataSource, SourceError};
use crate::models::{
    ConversationDetail, ConversationSummary, DailyCount, DateRange, DayConversations, Message,
    ModelCount, SearchResults, Stats, YearContribution,
};

const UNTITLED: &str = "(no title)";
const TOP_MODELS: usize = 10;
const TITLE_BOOST: f32 = 3.0;
const CONTENT_BOOST: f32 = 1.0;
const TOKENIZER: &str = "archive_text";
const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Debug, Deserialize)]
struct RawConversation {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    create_time: Option<f64>,
    #[serde(default)]
    update_time: Option<f64>,
    #[serde(default)]
    default_model_slug: Option<String>,
    #[serde(default)]
    is_archived: Option<bool>,
    #[serde(default)]
    mapping: Option<HashMap<String, RawNode>>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    author: Option<RawAuthor>,
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default)]
    create_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    parts: Option<Vec<Value>>,
}

#[derive(Debug)]
struct StoredConversation {
    id: String,
    title: String,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
    model: Option<String>,
    is_archived: bool,
    messages: Vec<Message>,
}

impl StoredConversation {
    fn display_title(&self) -> String {
        if self.title.is_empty() { UNTITLED.to_string() } else { self.title.clone() }
    }

    fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.display_title(),
            model: self.model.clone(),
            message_count: Some(self.messages.len() as u32),
            create_time: Some(self.create_time),
        }
    }

    fn searchable_content(&self) -> String {
        self.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n")
    }

    fn search_hit(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.display_title(),
            model: self.model.clone(),
            message_count: None,
            create_time: Some(self.create_time),
        }
    }
}

/// Full-text index over conversation titles and message text.
struct SearchIndex {
    index: Index,
    reader: IndexReader,
    id: Field,
    title: Field,
    content: Field,
}

impl fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIndex")
            .field("documents", &self.reader.searcher().num_docs())
            .finish_non_exhaustive()
    }
}

impl SearchIndex {
    fn build(conversations: &[StoredConversation]) -> Result<Self, SourceError> {
        let text = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let mut schema = Schema::builder();
        let id = schema.add_text_field("id", STRING | STORED);
        let title = schema.add_text_field("title", text.clone());
        let content = schema.add_text_field("content", text);

        let index = Index::create_in_ram(schema.build());
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(40))
            .filter(LowerCaser)
            .filter(AsciiFoldingFilter)
            .build();
        index.tokenizers().register(TOKENIZER, analyzer);

        let mut writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;
        for c in conversations {
            writer.add_document(doc!(
                id => c.id.as_str(),
                title => c.title.as_str(),
                content => c.searchable_content(),
            ))?;
        }
        writer.commit()?;

        let reader: IndexReader =
            index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        Ok(Self { index, reader, id, title, content })
    }

    /// Ids of the best matches, highest score first.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<(f32, String)>, SourceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut parser = QueryParser::for_index(&self.index, vec![self.title, self.content]);
        parser.set_field_boost(self.title, TITLE_BOOST);
        parser.set_field_boost(self.content, CONTENT_BOOST);
        // Free text from the search box; syntax errors degrade to the terms that did parse.
        let (query, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            debug!(errors = errors.len(), "search query parsed leniently");
        }

        let searcher = self.reader.searcher();
        let mut hits = Vec::new();
        for (score, address) in searcher.search(&query, &TopDocs::with_limit(limit))? {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.id).and_then(|v| v.as_str()) {
                hits.push((score, id.to_string()));
            }
        }
        Ok(hits)
    }
}

/// In-memory archive built from an export file.
#[derive(Debug)]
pub struct ExportDataSource {
    conversations: Vec<StoredConversation>,
    by_id: HashMap<String, usize>,
    by_date: BTreeMap<NaiveDate, Vec<usize>>,
    index: SearchIndex,
}

impl ExportDataSource {
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let json = fs::read_to_string(path)
            .map_err(|source| SourceError::Io { path: path.to_path_buf(), source })?;
        let source = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            conversations = source.conversations.len(),
            "loaded conversations export"
        );
        Ok(source)
    }

    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let raw: Vec<RawConversation> = serde_json::from_str(json)?;
        let mut conversations = Vec::with_capacity(raw.len());
        let mut by_id = HashMap::new();
        let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();

        for record in raw {
            let Some(create_time) = record.create_time.and_then(conversation_timestamp) else {
                debug!(id = ?record.id, "skipping conversation without create_time");
                continue;
            };
            let update_time =
                record.update_time.and_then(conversation_timestamp).unwrap_or(create_time);
            let id = record.id.or(record.conversation_id).unwrap_or_default();

            let idx = conversations.len();
            by_id.insert(id.clone(), idx);
            by_date.entry(create_time.date_naive()).or_default().push(idx);
            conversations.push(StoredConversation {
                id,
                title: record.title.unwrap_or_default(),
                create_time,
                update_time,
                model: record.default_model_slug.filter(|m| !m.is_empty()),
                is_archived: record.is_archived.unwrap_or(false),
                messages: linearize_messages(record.mapping.unwrap_or_default()),
            });
        }

        let index = SearchIndex::build(&conversations)?;
        Ok(Self { conversations, by_id, by_date, index })
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[async_trait]
impl DataSource for ExportDataSource {
    async fn stats(&self) -> Result<Stats, SourceError> {
        if self.conversations.is_empty() {
            return Ok(Stats::default());
        }

        let mut model_counts: HashMap<&str, u64> = HashMap::new();
        for c in &self.conversations {
            if let Some(model) = c.model.as_deref() {
                *model_counts.entry(model).or_insert(0) += 1;
            }
        }
        let mut top_models: Vec<ModelCount> = model_counts
            .into_iter()
            .map(|(model, count)| ModelCount { model: model.to_string(), count })
            .collect();
        top_models.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.model.cmp(&b.model)));
        top_models.truncate(TOP_MODELS);

        Ok(Stats {
            total_conversations: self.conversations.len() as u64,
            total_messages: self.conversations.iter().map(|c| c.messages.len() as u64).sum(),
            date_range: DateRange {
                start: self.by_date.keys().next().copied(),
                end: self.by_date.keys().next_back().copied(),
            },
            top_models,
        })
    }

    async fn contribution(&self, year: i32) -> Result<YearContribution, SourceError> {
        let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            return Ok(YearContribution::from_days(year, Vec::new()));
        };
        let days = first
            .iter_days()
            .take_while(|d| d.year() == year)
            .map(|date| DailyCount {
                date,
                count: self.by_date.get(&date).map(|v| v.len() as u32).unwrap_or(0),
            })
            .collect();
        Ok(YearContribution::from_days(year, days))
    }

    async fn conversations_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<DayConversations, SourceError> {
        let mut found: Vec<&StoredConversation> = self
            .by_date
            .get(&date)
            .map(|indexes| indexes.iter().map(|&i| &self.conversations[i]).collect())
            .unwrap_or_default();
        found.sort_by(|a, b| b.create_time.cmp(&a.create_time));

        Ok(DayConversations {
            date: Some(date),
            conversations: found.into_iter().map(StoredConversation::summary).collect(),
        })
    }

    async fn conversation(&self, id: &str) -> Result<ConversationDetail, SourceError> {
        let c = self
            .by_id
            .get(id)
            .map(|&i| &self.conversations[i])
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;

        Ok(ConversationDetail {
            id: c.id.clone(),
            title: c.display_title(),
            create_time: Some(c.create_time),
            update_time: Some(c.update_time),
            model: c.model.clone(),
            messages: c.messages.clone(),
            is_archived: c.is_archived,
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchResults, SourceError> {
        let mut seen = HashSet::new();
        let mut hits: Vec<(f32, &StoredConversation)> = self
            .index
            .search(query, limit)?
            .into_iter()
            .filter_map(|(score, id)| {
                let idx = *self.by_id.get(&id)?;
                seen.insert(idx).then(|| (score, &self.conversations[idx]))
            })
            .collect();
        hits.sort_by(|a, b| {
            b.0.total_cmp(&a.0).then_with(|| b.1.create_time.cmp(&a.1.create_time))
        });

        Ok(SearchResults {
            query: query.to_string(),
            results: hits.into_iter().map(|(_, c)| c.search_hit()).collect(),
        })
    }
}

/// Conversation timestamps only need to be representable; the epoch and earlier are valid.
fn conversation_timestamp(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

/// Message timestamps of zero or less mean "not recorded".
fn timestamp_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

/// Flatten the node mapping into a list of messages ordered by creation time.
fn linearize_messages(mapping: HashMap<String, RawNode>) -> Vec<Message> {
    let mut timed: Vec<(f64, Message)> = mapping
        .into_values()
        .filter_map(|node| node.message)
        .map(|msg| {
            let content = msg
                .content
                .and_then(|c| c.parts)
                .unwrap_or_default()
                .iter()
                .filter_map(part_text)
                .collect::<String>();
            let created = msg.create_time.unwrap_or(0.0);
            let (role, name) = match msg.author {
                Some(author) => (author.role, author.name),
                None => (None, None),
            };
            let message = Message {
                id: msg.id,
                role,
                name,
                content,
                timestamp: timestamp_from_secs(created),
            };
            (created, message)
        })
        .collect();

    timed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
    timed.into_iter().map(|(_, m)| m).collect()
}

fn part_text(part: &Value) -> Option<String> {
    match part {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("text")
            .or_else(|| obj.get("content"))
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
        _ => None,
    }
}
