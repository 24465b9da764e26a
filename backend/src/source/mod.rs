//! Table loading: bundled fixtures, warehouse queries and the extract cache.
//!
//! [`TableLoader::load`] is the single entry point used by every processor.
//! It picks the source, then restricts the rows to the requested companies.

pub mod warehouse;

use std::env;
use std::path::PathBuf;

use crate::cache::{ExtractCache, DEFAULT_CACHE_DIR};
use crate::error::{LoadError, LoadResult, WarehouseError};
use crate::logs::{log_info, log_warning};
use crate::models::{CompanyScope, Domain};
use crate::parser::parse_csv;
use crate::table::Table;

pub use warehouse::WarehouseClient;

/// Connection settings for the data sources.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the warehouse query service
    pub warehouse_url: Option<String>,
    /// Bearer token sent to the warehouse
    pub warehouse_token: Option<String>,
    /// Directory of cached extracts
    pub cache_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            warehouse_url: None,
            warehouse_token: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl SourceConfig {
    /// Read `PROFILES_WAREHOUSE_URL`, `PROFILES_WAREHOUSE_TOKEN` and
    /// `PROFILES_CACHE_DIR`, after loading a `.env` file when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            warehouse_url: non_empty("PROFILES_WAREHOUSE_URL"),
            warehouse_token: non_empty("PROFILES_WAREHOUSE_TOKEN"),
            cache_dir: non_empty("PROFILES_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_warehouse(mut self, url: impl Into<String>) -> Self {
        self.warehouse_url = Some(url.into());
        self
    }
}

/// Bundled sample extract for a domain.
pub fn fixture(domain: Domain) -> &'static str {
    match domain {
        Domain::Incidents => include_str!("../../data/fixtures/incidents.csv"),
        Domain::Conditions => include_str!("../../data/fixtures/conditions.csv"),
        Domain::Traffic => include_str!("../../data/fixtures/traffic.csv"),
        Domain::Tolls => include_str!("../../data/fixtures/tolls.csv"),
    }
}

/// Loads company-scoped tables for the processors.
#[derive(Debug, Clone)]
pub struct TableLoader {
    config: SourceConfig,
    cache: ExtractCache,
}

impl TableLoader {
    pub fn new(config: SourceConfig) -> Self {
        let cache = ExtractCache::with_dir(&config.cache_dir);
        Self { config, cache }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn cache(&self) -> &ExtractCache {
        &self.cache
    }

    /// Load the table for `domain`, restricted to `companies`.
    ///
    /// `test` reads the bundled fixture and ignores `remote`. `remote` queries
    /// the warehouse and refreshes the cached extract. Otherwise the cached
    /// extract is read.
    pub async fn load(
        &self,
        domain: Domain,
        remote: bool,
        companies: &CompanyScope,
        test: bool,
    ) -> LoadResult<Table> {
        let table = if test {
            self.load_fixture(domain)?
        } else if remote {
            self.load_remote(domain).await?
        } else {
            self.load_cached(domain)?
        };

        let total = table.len();
        let scoped = table.scope(domain, companies)?;
        log_info(format!(
            "Loaded {} {} rows ({} before scoping to {})",
            scoped.len(),
            domain,
            total,
            companies
        ));
        Ok(scoped)
    }

    fn load_fixture(&self, domain: Domain) -> LoadResult<Table> {
        parse_csv(fixture(domain), ',').map_err(|e| LoadError::DataUnavailable {
            domain,
            reason: format!("bundled fixture: {}", e),
        })
    }

    async fn load_remote(&self, domain: Domain) -> LoadResult<Table> {
        let unavailable = |e: WarehouseError| LoadError::DataUnavailable {
            domain,
            reason: e.to_string(),
        };

        let url = self.config.warehouse_url.as_deref().ok_or_else(|| {
            unavailable(WarehouseError::NotConfigured(
                "PROFILES_WAREHOUSE_URL not set".to_string(),
            ))
        })?;

        let mut client = WarehouseClient::new(url);
        if let Some(token) = &self.config.warehouse_token {
            client = client.with_token(token.clone());
        }

        let table = client.fetch(domain).await.map_err(unavailable)?;

        if let Err(e) = self.cache.save(domain, &table, "warehouse") {
            log_warning(format!("Could not cache {} extract: {}", domain, e));
        }
        Ok(table)
    }

    fn load_cached(&self, domain: Domain) -> LoadResult<Table> {
        self.cache
            .load(domain)
            .map_err(|e| LoadError::DataUnavailable {
                domain,
                reason: format!("{} (in {})", e, self.cache.dir().display()),
            })
    }
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new(SourceConfig::default())
    }
}
