//! Tolls per pipeline, path and service, aligned on each path's date axis.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ProcessError, ProcessResult};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{parse_date, CompanyScope, DateTriple, Domain};
use crate::source::TableLoader;
use crate::table::{observation, text, Table};

const COL_PIPELINE: &str = "Pipeline";
const COL_PATH: &str = "Path";
const COL_SERVICE: &str = "Service";
const COL_DATE: &str = "Date";
const COL_TOLL: &str = "Daily Toll";
const COL_UNITS: &str = "Units";

/// Series colors, assigned by service order within a path.
pub const PALETTE: [&str; 8] = [
    "#054169", "#FFBE4B", "#5FBEE6", "#559B37", "#FF821E", "#871455", "#8c8c96", "#42464B",
];

/// Firm services are always drawn in the first palette color.
fn service_color(service: &str, index: usize) -> &'static str {
    if service == "FT, Demand" || service.starts_with("Firm Full Path Service") {
        PALETTE[0]
    } else {
        PALETTE[index % PALETTE.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TollsMeta {
    #[serde(rename = "pipelineID")]
    pub pipeline_id: String,
    pub frequency: &'static str,
    /// Distinct units, first-appearance order
    pub units: Vec<String>,
    pub build: bool,
}

/// One entry of a path: the date axis or a service series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TollSeries {
    #[serde(rename_all = "camelCase")]
    Dates {
        name: &'static str,
        x_axis: u8,
        data: Vec<DateTriple>,
    },
    #[serde(rename_all = "camelCase")]
    Service {
        name: String,
        y_axis: u8,
        color: &'static str,
        data: Vec<Option<f64>>,
    },
}

/// Tolls artifact of one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TollsBundle {
    pub meta: TollsMeta,
    /// Path to `[dates, service...]`
    pub tolls: BTreeMap<String, Vec<TollSeries>>,
}

/// Parameters of a tolls run.
#[derive(Debug, Clone, Default)]
pub struct TollsRequest {
    pub remote: bool,
    pub test: bool,
    pub pipelines: CompanyScope,
}

/// Tolls of one path, services kept in first-appearance order.
#[derive(Debug, Default)]
struct PathTolls {
    dates: Vec<NaiveDate>,
    services: Vec<(String, BTreeMap<NaiveDate, Option<f64>>)>,
}

impl PathTolls {
    fn push(&mut self, service: String, date: NaiveDate, toll: Option<f64>) {
        if !self.dates.contains(&date) {
            self.dates.push(date);
        }
        let idx = match self.services.iter().position(|(s, _)| *s == service) {
            Some(idx) => idx,
            None => {
                self.services.push((service, BTreeMap::new()));
                self.services.len() - 1
            }
        };
        // First observation wins for a repeated date
        self.services[idx].1.entry(date).or_insert(toll);
    }

    fn into_series(mut self) -> Vec<TollSeries> {
        self.dates.sort();
        let mut series = vec![TollSeries::Dates {
            name: "date",
            x_axis: 1,
            data: self.dates.iter().copied().map(DateTriple).collect(),
        }];

        for (index, (service, values)) in self.services.into_iter().enumerate() {
            let data = self
                .dates
                .iter()
                .map(|d| values.get(d).copied().flatten())
                .collect();
            series.push(TollSeries::Service {
                color: service_color(&service, index),
                name: service,
                y_axis: 0,
                data,
            });
        }
        series
    }
}

/// Load tolls for the requested pipelines and build one bundle per pipeline.
pub async fn process_tolls(
    loader: &TableLoader,
    request: &TollsRequest,
) -> ProcessResult<BTreeMap<String, TollsBundle>> {
    log_info(format!("Processing tolls for {}", request.pipelines));
    let table = loader
        .load(Domain::Tolls, request.remote, &request.pipelines, request.test)
        .await?;

    let bundles = tolls_from_table(&table)?;
    log_success(format!("Tolls built for {} pipeline(s)", bundles.len()));
    Ok(bundles)
}

/// Build tolls bundles from an already-scoped table.
pub fn tolls_from_table(table: &Table) -> ProcessResult<BTreeMap<String, TollsBundle>> {
    table.require_columns(&[COL_PIPELINE, COL_PATH, COL_SERVICE, COL_DATE, COL_TOLL])?;

    let mut pipelines: BTreeMap<String, (Vec<String>, BTreeMap<String, PathTolls>)> =
        BTreeMap::new();

    for (idx, row) in table.rows().iter().enumerate() {
        let (Some(pipeline), Some(path), Some(service)) = (
            text(row, COL_PIPELINE),
            text(row, COL_PATH),
            text(row, COL_SERVICE),
        ) else {
            log_warning(format!(
                "Skipping tolls row {}: pipeline, path and service are required",
                idx + 1
            ));
            continue;
        };
        let record = format!("{} / {} / {}", pipeline, path, service);

        let raw_date = text(row, COL_DATE).unwrap_or_default();
        let date = parse_date(&raw_date).ok_or_else(|| ProcessError::InvalidValue {
            column: COL_DATE.to_string(),
            value: raw_date.clone(),
            record: record.clone(),
        })?;
        let toll = observation(row, COL_TOLL, &record)?;

        let (units, paths) = pipelines.entry(pipeline).or_default();
        if let Some(unit) = text(row, COL_UNITS) {
            if !units.contains(&unit) {
                units.push(unit);
            }
        }
        paths.entry(path).or_default().push(service, date, toll);
    }

    Ok(pipelines
        .into_iter()
        .map(|(pipeline, (units, paths))| {
            let bundle = TollsBundle {
                meta: TollsMeta {
                    pipeline_id: pipeline.clone(),
                    frequency: "daily",
                    units,
                    build: true,
                },
                tolls: paths
                    .into_iter()
                    .map(|(path, tolls)| (path, tolls.into_series()))
                    .collect(),
            };
            (pipeline, bundle)
        })
        .collect())
}
