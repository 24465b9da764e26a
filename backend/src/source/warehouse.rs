//! HTTP client for the reporting warehouse.
//!
//! The warehouse exposes one endpoint, `POST {url}/query`, taking
//! `{"domain": "...", "query": "..."}` and answering with a row set
//! `{"columns": [...], "rows": [...]}`. Rows may be objects keyed by column
//! or arrays in column order.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{WarehouseError, WarehouseResult};
use crate::logs::log_info;
use crate::models::Domain;
use crate::table::Table;

/// Row set returned by the warehouse
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    columns: Vec<String>,
    rows: Vec<Value>,
}

/// Error body returned with a non-2xx status
#[derive(Debug, Deserialize)]
struct QueryError {
    error: String,
}

/// Warehouse client
#[derive(Debug, Clone)]
pub struct WarehouseClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl WarehouseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    /// Send `token` as a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run the query for `domain` and return the whole result as a table.
    pub async fn fetch(&self, domain: Domain) -> WarehouseResult<Table> {
        let url = format!("{}/query", self.base_url);
        log_info(format!("Querying warehouse for {}: {}", domain, domain.query()));

        let body = serde_json::json!({
            "domain": domain.as_str(),
            "query": domain.query(),
        });

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WarehouseError::HttpError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WarehouseError::HttpError(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<QueryError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(WarehouseError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        parse_response(&text)
    }
}

/// Turn a warehouse response body into a table.
fn parse_response(body: &str) -> WarehouseResult<Table> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| WarehouseError::InvalidResponse(e.to_string()))?;

    let mut records = Vec::with_capacity(response.rows.len());
    for (idx, row) in response.rows.into_iter().enumerate() {
        match row {
            Value::Object(_) => records.push(row),
            Value::Array(cells) => {
                if cells.len() != response.columns.len() {
                    return Err(WarehouseError::InvalidResponse(format!(
                        "row {} has {} cells for {} columns",
                        idx,
                        cells.len(),
                        response.columns.len()
                    )));
                }
                let object: Map<String, Value> =
                    response.columns.iter().cloned().zip(cells).collect();
                records.push(Value::Object(object));
            }
            other => {
                return Err(WarehouseError::InvalidResponse(format!(
                    "row {} is not an object or array: {}",
                    idx, other
                )))
            }
        }
    }

    let table = Table::from_records(records);
    if response.columns.is_empty() {
        return Ok(table);
    }

    // Declared column order wins over key order
    let mut headers = response.columns;
    for header in table.headers() {
        if !headers.contains(header) {
            headers.push(header.clone());
        }
    }
    Ok(Table::new(headers, table.into_rows()))
}
