//! Runtime configuration.
//!
//! Values come from global CLI flags, each with an environment variable fallback
//! (see [`crate::cli::GlobalArgs`]). [`Config::data_source`] turns the configured
//! source into a shareable [`DataSource`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::source::{DataSource, ExportDataSource, HttpDataSource};
use crate::timeline::StoreOptions;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const MAX_SEARCH_LIMIT: usize = 500;

/// Where the archive is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Remote { base_url: String },
    Export { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: SourceConfig,
    pub request_timeout: Duration,
    pub search_limit: usize,
}

impl Config {
    /// Build a validated configuration. A data file, when given, takes precedence
    /// over the base URL.
    pub fn new(
        base_url: &str,
        data_file: Option<PathBuf>,
        timeout_secs: u64,
        search_limit: usize,
    ) -> Result<Self> {
        if timeout_secs == 0 {
            bail!("Request timeout must be at least 1 second");
        }
        if search_limit == 0 || search_limit > MAX_SEARCH_LIMIT {
            bail!("Search limit must be between 1 and {} (got {})", MAX_SEARCH_LIMIT, search_limit);
        }

        let source = match data_file {
            Some(path) => SourceConfig::Export { path },
            None => {
                let base_url = base_url.trim();
                if base_url.is_empty() {
                    bail!("Archive URL cannot be empty");
                }
                SourceConfig::Remote { base_url: base_url.to_string() }
            }
        };

        Ok(Self { source, request_timeout: Duration::from_secs(timeout_secs), search_limit })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions { request_timeout: self.request_timeout, search_limit: self.search_limit }
    }

    /// Open the configured data source.
    pub fn data_source(&self) -> Result<Arc<dyn DataSource>> {
        match &self.source {
            SourceConfig::Remote { base_url } => {
                let source = HttpDataSource::new(base_url, self.request_timeout)
                    .with_context(|| format!("Failed to create client for {}", base_url))?;
                Ok(Arc::new(source))
            }
            SourceConfig::Export { path } => {
                let source = ExportDataSource::load(path).with_context(|| {
                    format!("Failed to load conversations export {}", path.display())
                })?;
                Ok(Arc::new(source))
            }
        }
    }

    /// Short description of the source for status lines.
    pub fn describe_source(&self) -> String {
        match &self.source {
            SourceConfig::Remote { base_url } => base_url.clone(),
            SourceConfig::Export { path } => path.display().to_string(),
        }
    }
}
