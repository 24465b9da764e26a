//! Extract Cache - Store and reuse warehouse extracts
//!
//! Each domain has at most one cached extract, saved as `{dir}/{domain}.json`.
//! Extracts come from warehouse queries or from imported CSV exports.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CacheError, CacheResult};
use crate::models::Domain;
use crate::parser::parse_csv_file_auto;
use crate::table::{Row, Table};

/// Directory where extracts are stored (relative to current dir)
pub const DEFAULT_CACHE_DIR: &str = ".profiles/extracts";

/// A stored extract with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredExtract {
    pub domain: Domain,
    /// RFC 3339 timestamp of the fetch or import
    pub fetched_at: String,
    /// Where the rows came from (`warehouse` or the imported file path)
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl StoredExtract {
    pub fn table(&self) -> Table {
        Table::new(self.headers.clone(), self.rows.clone())
    }

    pub fn into_table(self) -> Table {
        Table::new(self.headers, self.rows)
    }
}

/// Summary line for `cache list`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractInfo {
    pub domain: Domain,
    pub fetched_at: String,
    pub source: String,
    pub rows: usize,
}

/// Local store of the latest extract per domain
#[derive(Debug, Clone)]
pub struct ExtractCache {
    dir: PathBuf,
}

impl ExtractCache {
    /// Cache rooted at [`DEFAULT_CACHE_DIR`]
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_CACHE_DIR)
    }

    /// Cache rooted at a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: PathBuf::from(dir.as_ref()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, domain: Domain) -> PathBuf {
        self.dir.join(format!("{}.json", domain))
    }

    /// Store `table` as the extract for `domain`, replacing any previous one.
    pub fn save(&self, domain: Domain, table: &Table, source: &str) -> CacheResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stored = StoredExtract {
            domain,
            fetched_at: chrono::Utc::now().to_rfc3339(),
            source: source.to_string(),
            headers: table.headers().to_vec(),
            rows: table.rows().to_vec(),
        };

        let path = self.path_for(domain);
        fs::write(&path, serde_json::to_string(&stored)?)?;
        Ok(path)
    }

    /// Read the extract for `domain`
    pub fn get(&self, domain: Domain) -> CacheResult<StoredExtract> {
        let path = self.path_for(domain);
        if !path.exists() {
            return Err(CacheError::NotFound(domain));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read the extract for `domain` as a table
    pub fn load(&self, domain: Domain) -> CacheResult<Table> {
        Ok(self.get(domain)?.into_table())
    }

    /// Summaries of every stored extract, in domain order.
    /// Unreadable files are skipped.
    pub fn list(&self) -> Vec<ExtractInfo> {
        Domain::ALL
            .iter()
            .filter_map(|&domain| self.get(domain).ok())
            .map(|stored| ExtractInfo {
                domain: stored.domain,
                fetched_at: stored.fetched_at,
                source: stored.source,
                rows: stored.rows.len(),
            })
            .collect()
    }

    /// Import a CSV export as the extract for `domain`
    pub fn import(&self, domain: Domain, path: &Path) -> CacheResult<usize> {
        let parsed = parse_csv_file_auto(path)?;
        let rows = parsed.table.len();
        self.save(domain, &parsed.table, &path.display().to_string())?;
        Ok(rows)
    }

    /// Delete the extract for `domain`
    pub fn delete(&self, domain: Domain) -> CacheResult<()> {
        let path = self.path_for(domain);
        if !path.exists() {
            return Err(CacheError::NotFound(domain));
        }
        fs::remove_file(&path)?;
        Ok(())
    }
}

impl Default for ExtractCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> Table {
        Table::from_records(vec![
            json!({"Pipeline": "Alliance Pipeline Ltd.", "Daily Toll": "0.9826"}),
            json!({"Pipeline": "Westcoast Energy Inc.", "Daily Toll": "0.4410"}),
        ])
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let cache = ExtractCache::with_dir(dir.path());

        cache.save(Domain::Tolls, &sample(), "warehouse").unwrap();
        let table = cache.load(Domain::Tolls).unwrap();

        assert_eq!(table, sample());
        assert!(dir.path().join("tolls.json").exists());
    }

    #[test]
    fn test_missing_extract() {
        let cache = ExtractCache::with_dir(tempdir().unwrap().path());
        let err = cache.load(Domain::Incidents).unwrap_err();
        assert!(matches!(err, CacheError::NotFound(Domain::Incidents)));
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let cache = ExtractCache::with_dir(dir.path());

        cache.save(Domain::Traffic, &sample(), "warehouse").unwrap();
        cache.save(Domain::Tolls, &sample(), "warehouse").unwrap();

        let listed = cache.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].domain, Domain::Traffic);
        assert_eq!(listed[0].rows, 2);

        cache.delete(Domain::Traffic).unwrap();
        assert_eq!(cache.list().len(), 1);
        assert!(cache.delete(Domain::Traffic).is_err());
    }

    #[test]
    fn test_import_csv() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("export.csv");
        fs::write(&csv_path, "Company;Condition Status\nNOVA Gas Transmission Ltd.;Closed\n").unwrap();

        let cache = ExtractCache::with_dir(dir.path().join("cache"));
        let rows = cache.import(Domain::Conditions, &csv_path).unwrap();
        assert_eq!(rows, 1);

        let stored = cache.get(Domain::Conditions).unwrap();
        assert_eq!(stored.headers, vec!["Company", "Condition Status"]);
        assert!(stored.source.ends_with("export.csv"));
    }
}
