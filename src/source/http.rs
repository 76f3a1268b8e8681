use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{DataSource, SourceError};
use crate::models::{ConversationDetail, DayConversations, SearchResults, Stats, YearContribution};

/// Client for the archive's JSON API (`/api/...` endpoints).
pub struct HttpDataSource {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpDataSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(SourceError::InvalidUrl(format!("{}: not a base URL", base_url)));
        }
        // Url::join replaces the last segment unless the path ends with '/'
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status: status.as_u16(), body });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn stats(&self) -> Result<Stats, SourceError> {
        self.get_json(self.endpoint("api/stats")?).await
    }

    async fn contribution(&self, year: i32) -> Result<YearContribution, SourceError> {
        let mut url = self.endpoint("api/contribution")?;
        url.query_pairs_mut().append_pair("year", &year.to_string());
        self.get_json(url).await
    }

    async fn conversations_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<DayConversations, SourceError> {
        let mut url = self.endpoint("api/conversations")?;
        url.query_pairs_mut().append_pair("date", &date.format("%Y-%m-%d").to_string());
        self.get_json(url).await
    }

    async fn conversation(&self, id: &str) -> Result<ConversationDetail, SourceError> {
        let mut url = self.endpoint("api/conversation/")?;
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(id);

        // A missing conversation comes back as 200 {"error": "..."}
        let value: Value = self.get_json(url).await?;
        if value.get("error").is_some() {
            return Err(SourceError::NotFound(id.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchResults, SourceError> {
        let mut url = self.endpoint("api/search")?;
        url.query_pairs_mut().append_pair("q", query).append_pair("limit", &limit.to_string());
        self.get_json(url).await
    }
}
