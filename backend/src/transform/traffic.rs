//! Throughput and capacity per key point.
//!
//! Rows are filtered by commodity, resampled to the requested frequency and
//! grouped by key point. Each point becomes a `[date axis, in, cap]` dataset
//! with a short trend description.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{LoadError, ProcessError, ProcessResult};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{parse_date, Commodity, CompanyScope, DateTriple, Domain, Frequency, Lang};
use crate::profiles;
use crate::source::TableLoader;
use crate::table::{observation, text, Table};

const COL_POINT: &str = "Key Point";
const COL_POINT_NAME: &str = "Key Point Name";
const COL_COMMODITY: &str = "Commodity";
const COL_DATE: &str = "Date";
const COL_THROUGHPUT: &str = "Throughput";
const COL_CAPACITY: &str = "Capacity";

// =============================================================================
// Output types
// =============================================================================

/// Sorted, de-duplicated dates of one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateAxis {
    pub name: &'static str,
    pub min: DateTriple,
    pub data: Vec<DateTriple>,
}

/// Values aligned to a [`DateAxis`], `null` where missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub id: &'static str,
    pub data: Vec<Option<f64>>,
}

/// `[date axis, throughput, capacity]`, serialized as a 3-element array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointDataset(pub DateAxis, pub Series, pub Series);

impl PointDataset {
    pub fn dates(&self) -> &[DateTriple] {
        &self.0.data
    }

    pub fn throughput(&self) -> &[Option<f64>] {
        &self.1.data
    }

    pub fn capacity(&self) -> &[Option<f64>] {
        &self.2.data
    }

    /// Mean of the non-missing throughput values.
    pub fn mean_throughput(&self) -> Option<f64> {
        let values: Vec<f64> = self.throughput().iter().flatten().copied().collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficMeta {
    pub company_name: Option<String>,
    pub units: &'static str,
    pub build: bool,
    pub frequency: Frequency,
    pub commodity: Commodity,
    pub lang: Lang,
    pub default_point: Option<String>,
    /// Key point id to display name
    pub point_names: BTreeMap<String, String>,
    /// One description per produced point
    pub trend_text: BTreeMap<String, String>,
}

/// Traffic artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficBundle {
    pub meta: TrafficMeta,
    pub traffic: BTreeMap<String, PointDataset>,
}

/// Artifact plus the filtered rows it was built from.
#[derive(Debug, Clone)]
pub struct TrafficOutput {
    pub bundle: TrafficBundle,
    pub raw: Table,
}

/// Parameters of a traffic run.
#[derive(Debug, Clone)]
pub struct TrafficRequest {
    pub test: bool,
    /// Query the warehouse instead of reading the cached extract
    pub sql: bool,
    pub commodity: Commodity,
    pub frequency: Frequency,
    pub companies: CompanyScope,
    pub lang: Lang,
}

impl TrafficRequest {
    pub fn new(commodity: Commodity, companies: CompanyScope) -> Self {
        Self {
            test: false,
            sql: false,
            commodity,
            frequency: Frequency::default(),
            companies,
            lang: Lang::default(),
        }
    }
}

// =============================================================================
// Resampling
// =============================================================================

#[derive(Debug, Default)]
struct Bucket {
    throughput: (f64, usize),
    capacity: (f64, usize),
}

impl Bucket {
    fn push(&mut self, throughput: Option<f64>, capacity: Option<f64>) {
        if let Some(v) = throughput {
            self.throughput.0 += v;
            self.throughput.1 += 1;
        }
        if let Some(v) = capacity {
            self.capacity.0 += v;
            self.capacity.1 += 1;
        }
    }

    fn mean((sum, n): (f64, usize)) -> Option<f64> {
        (n > 0).then(|| round2(sum / n as f64))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Date an observation is filed under for the given frequency.
fn bucket_date(date: NaiveDate, frequency: Frequency) -> NaiveDate {
    match frequency {
        Frequency::Daily => date,
        Frequency::Monthly => date.with_day(1).unwrap_or(date),
    }
}

fn commodity_matches(raw: &str, commodity: Commodity) -> bool {
    let raw = raw.trim().to_lowercase();
    match commodity {
        Commodity::Gas => matches!(raw.as_str(), "gas" | "natural gas"),
        Commodity::Oil => matches!(raw.as_str(), "oil" | "liquid" | "liquids" | "crude oil"),
    }
}

/// Resampled observations of one key point.
#[derive(Debug, Default)]
struct PointSeries {
    name: Option<String>,
    buckets: BTreeMap<NaiveDate, Bucket>,
}

fn group_points(table: &Table, frequency: Frequency) -> ProcessResult<BTreeMap<String, PointSeries>> {
    let mut points: BTreeMap<String, PointSeries> = BTreeMap::new();

    for (idx, row) in table.rows().iter().enumerate() {
        let Some(point) = text(row, COL_POINT) else {
            log_warning(format!("Skipping traffic row {}: no key point", idx + 1));
            continue;
        };
        let raw_date = text(row, COL_DATE).unwrap_or_default();
        let date = parse_date(&raw_date).ok_or_else(|| ProcessError::InvalidValue {
            column: COL_DATE.to_string(),
            value: raw_date.clone(),
            record: point.clone(),
        })?;

        let throughput = observation(row, COL_THROUGHPUT, &point)?;
        let capacity = observation(row, COL_CAPACITY, &point)?;

        let series = points.entry(point).or_default();
        if series.name.is_none() {
            series.name = text(row, COL_POINT_NAME);
        }
        series
            .buckets
            .entry(bucket_date(date, frequency))
            .or_default()
            .push(throughput, capacity);
    }

    Ok(points)
}

fn build_dataset(point: &str, series: &PointSeries) -> ProcessResult<PointDataset> {
    let dates: Vec<NaiveDate> = series.buckets.keys().copied().collect();
    let throughput: Vec<Option<f64>> = series
        .buckets
        .values()
        .map(|b| Bucket::mean(b.throughput))
        .collect();
    let capacity: Vec<Option<f64>> = series
        .buckets
        .values()
        .map(|b| Bucket::mean(b.capacity))
        .collect();

    let usable = throughput.iter().flatten().count();
    let Some(&min) = dates.first() else {
        return Err(ProcessError::InsufficientHistory {
            point: point.to_string(),
            dates: 0,
        });
    };
    if dates.len() < 2 || usable < 2 {
        return Err(ProcessError::InsufficientHistory {
            point: point.to_string(),
            dates: dates.len().min(usable),
        });
    }

    Ok(PointDataset(
        DateAxis {
            name: "date",
            min: DateTriple(min),
            data: dates.into_iter().map(DateTriple).collect(),
        },
        Series {
            id: "in",
            data: throughput,
        },
        Series {
            id: "cap",
            data: capacity,
        },
    ))
}

// =============================================================================
// Trend text
// =============================================================================

fn format_number(value: f64, lang: Lang) -> String {
    let text = format!("{:.2}", value);
    match lang {
        Lang::En => text,
        Lang::Fr => text.replace('.', ","),
    }
}

/// Describe the latest throughput of a point against one year earlier, or
/// against the earliest value when the axis does not reach back a year.
pub fn trend_text(
    name: &str,
    dataset: &PointDataset,
    units: &str,
    lang: Lang,
) -> ProcessResult<String> {
    let observed: Vec<(NaiveDate, f64)> = dataset
        .dates()
        .iter()
        .zip(dataset.throughput())
        .filter_map(|(d, v)| v.map(|v| (d.0, v)))
        .collect();

    let (Some(&(first_date, first)), Some(&(last_date, last))) = (observed.first(), observed.last())
    else {
        return Err(ProcessError::InsufficientHistory {
            point: name.to_string(),
            dates: observed.len(),
        });
    };
    if observed.len() < 2 {
        return Err(ProcessError::InsufficientHistory {
            point: name.to_string(),
            dates: observed.len(),
        });
    }

    let year_earlier = last_date.with_year(last_date.year() - 1);
    let (prev_date, prev) = year_earlier
        .and_then(|target| observed.iter().find(|(d, _)| *d == target).copied())
        .unwrap_or((first_date, first));

    let change = if prev != 0.0 {
        Some((last - prev) / prev * 100.0)
    } else {
        None
    };

    let date = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
    let (last_s, prev_s) = (format_number(last, lang), format_number(prev, lang));

    let text = match lang {
        Lang::En => {
            let movement = match change {
                Some(pct) if (pct * 10.0).round() > 0.0 => format!("up {:.1}% from", pct),
                Some(pct) if (pct * 10.0).round() < 0.0 => format!("down {:.1}% from", pct.abs()),
                Some(_) => "unchanged from".to_string(),
                None => "compared with".to_string(),
            };
            format!(
                "Throughput at {} averaged {} {} on {}, {} {} {} on {}.",
                name,
                last_s,
                units,
                date(last_date),
                movement,
                prev_s,
                units,
                date(prev_date)
            )
        }
        Lang::Fr => {
            let pct = |p: f64| format!("{:.1}", p).replace('.', ",");
            let movement = match change {
                Some(p) if (p * 10.0).round() > 0.0 => {
                    format!("en hausse de {} % par rapport à", pct(p))
                }
                Some(p) if (p * 10.0).round() < 0.0 => {
                    format!("en baisse de {} % par rapport à", pct(p.abs()))
                }
                Some(_) => "inchangé par rapport à".to_string(),
                None => "comparativement à".to_string(),
            };
            format!(
                "Le débit à {} était en moyenne de {} {} le {}, {} {} {} le {}.",
                name,
                last_s,
                units,
                date(last_date),
                movement,
                prev_s,
                units,
                date(prev_date)
            )
        }
    };

    Ok(text)
}

// =============================================================================
// Processor
// =============================================================================

/// Load traffic for the requested companies and build the per-point datasets.
pub async fn process_traffic(
    loader: &TableLoader,
    request: &TrafficRequest,
) -> ProcessResult<TrafficOutput> {
    log_info(format!(
        "Processing {} traffic ({:?}) for {}",
        request.commodity.as_str(),
        request.frequency,
        request.companies
    ));
    let table = loader
        .load(Domain::Traffic, request.sql, &request.companies, request.test)
        .await?;

    let output = traffic_from_table(table, request)?;
    log_success(format!(
        "{} key points, default point {}",
        output.bundle.traffic.len(),
        output.bundle.meta.default_point.as_deref().unwrap_or("none")
    ));
    Ok(output)
}

/// Build the traffic artifact from an already-scoped table.
pub fn traffic_from_table(table: Table, request: &TrafficRequest) -> ProcessResult<TrafficOutput> {
    table.require_columns(&[COL_POINT, COL_COMMODITY, COL_DATE, COL_THROUGHPUT, COL_CAPACITY])?;

    let raw = table.retain(|row| {
        text(row, COL_COMMODITY).is_some_and(|c| commodity_matches(&c, request.commodity))
    });
    if raw.is_empty() {
        return Err(LoadError::EmptyResult {
            domain: Domain::Traffic,
            scope: request.companies.clone(),
        }
        .into());
    }

    let units = request.commodity.units();
    let mut traffic = BTreeMap::new();
    let mut point_names = BTreeMap::new();
    let mut trend = BTreeMap::new();

    for (point, series) in group_points(&raw, request.frequency)? {
        let name = series.name.clone().unwrap_or_else(|| point.clone());
        let built = build_dataset(&point, &series)
            .and_then(|dataset| Ok((trend_text(&name, &dataset, units, request.lang)?, dataset)));

        match built {
            Ok((text, dataset)) => {
                trend.insert(point.clone(), text);
                point_names.insert(point.clone(), name);
                traffic.insert(point, dataset);
            }
            Err(e @ ProcessError::InsufficientHistory { .. }) => {
                log_warning(format!("Skipping key point {} ({}): {}", point, name, e));
            }
            Err(e) => return Err(e),
        }
    }

    let meta = TrafficMeta {
        company_name: request.companies.single().map(String::from),
        units,
        build: !traffic.is_empty(),
        frequency: request.frequency,
        commodity: request.commodity,
        lang: request.lang,
        default_point: default_point(&request.companies, &traffic),
        point_names,
        trend_text: trend,
    };

    Ok(TrafficOutput {
        bundle: TrafficBundle { meta, traffic },
        raw,
    })
}

/// Profile override for a single company when that point was produced,
/// otherwise the point with the highest mean throughput.
fn default_point(
    companies: &CompanyScope,
    traffic: &BTreeMap<String, PointDataset>,
) -> Option<String> {
    let preferred = companies
        .single()
        .and_then(profiles::find_by_company)
        .and_then(|p| p.default_point)
        .filter(|point| traffic.contains_key(*point));
    if let Some(point) = preferred {
        return Some(point.to_string());
    }

    let mut best: Option<(&String, f64)> = None;
    for (point, dataset) in traffic {
        if let Some(mean) = dataset.mean_throughput() {
            if best.map_or(true, |(_, b)| mean > b) {
                best = Some((point, mean));
            }
        }
    }
    best.map(|(point, _)| point.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(point: &str, date: &str, throughput: &str, capacity: &str) -> serde_json::Value {
        json!({
            "Corporate Entity": "Test Pipeline Co.",
            "Key Point": point,
            "Key Point Name": format!("Point {}", point),
            "Commodity": "gas",
            "Date": date,
            "Throughput": throughput,
            "Capacity": capacity,
        })
    }

    fn request(frequency: Frequency) -> TrafficRequest {
        TrafficRequest {
            frequency,
            ..TrafficRequest::new(Commodity::Gas, CompanyScope::all())
        }
    }

    #[test]
    fn test_monthly_resample_averages_and_dates_first_of_month() {
        let table = Table::from_records(vec![
            row("1", "2020-01-05", "1.00", "2.00"),
            row("1", "2020-01-20", "1.06", "2.00"),
            row("1", "2020-02-03", "1.10", ""),
        ]);
        let output = traffic_from_table(table, &request(Frequency::Monthly)).unwrap();
        let dataset = &output.bundle.traffic["1"];

        let dates: Vec<[i32; 3]> = dataset.dates().iter().map(|d| d.parts()).collect();
        assert_eq!(dates, vec![[2020, 1, 1], [2020, 2, 1]]);
        assert_eq!(dataset.throughput(), &[Some(1.03), Some(1.1)]);
        assert_eq!(dataset.capacity(), &[Some(2.0), None]);
    }

    #[test]
    fn test_dataset_serializes_as_triple() {
        let table = Table::from_records(vec![
            row("1", "2020-01-01", "1", "2"),
            row("1", "2020-01-02", "3", "2"),
        ]);
        let output = traffic_from_table(table, &request(Frequency::Daily)).unwrap();
        let json = serde_json::to_value(&output.bundle.traffic["1"]).unwrap();

        assert_eq!(
            json,
            json!([
                {"name": "date", "min": [2020, 1, 1], "data": [[2020, 1, 1], [2020, 1, 2]]},
                {"id": "in", "data": [1.0, 3.0]},
                {"id": "cap", "data": [2.0, 2.0]}
            ])
        );
    }

    #[test]
    fn test_single_date_point_is_skipped() {
        let table = Table::from_records(vec![
            row("1", "2020-01-01", "1", "2"),
            row("1", "2020-02-01", "2", "2"),
            row("2", "2020-01-01", "5", "6"),
        ]);
        let output = traffic_from_table(table, &request(Frequency::Monthly)).unwrap();
        let meta = &output.bundle.meta;

        assert!(output.bundle.traffic.contains_key("1"));
        assert!(!output.bundle.traffic.contains_key("2"));
        assert_eq!(meta.trend_text.len(), output.bundle.traffic.len());
        assert_eq!(meta.default_point.as_deref(), Some("1"));
        assert!(meta.build);
    }

    #[test]
    fn test_no_point_with_history_still_builds_meta() {
        let table = Table::from_records(vec![row("2", "2020-01-01", "5", "6")]);
        let output = traffic_from_table(table, &request(Frequency::Monthly)).unwrap();
        assert!(!output.bundle.meta.build);
        assert_eq!(output.bundle.meta.default_point, None);
    }

    #[test]
    fn test_commodity_filter_empty_result() {
        let table = Table::from_records(vec![row("1", "2020-01-01", "1", "2")]);
        let req = TrafficRequest::new(Commodity::Oil, CompanyScope::all());
        let err = traffic_from_table(table, &req).unwrap_err();
        assert!(matches!(err, ProcessError::Load(LoadError::EmptyResult { .. })));
    }

    #[test]
    fn test_default_point_highest_mean() {
        let table = Table::from_records(vec![
            row("A", "2020-01-01", "1", "2"),
            row("A", "2020-02-01", "1", "2"),
            row("B", "2020-01-01", "4", "5"),
            row("B", "2020-02-01", "5", "5"),
        ]);
        let output = traffic_from_table(table, &request(Frequency::Monthly)).unwrap();
        assert_eq!(output.bundle.meta.default_point.as_deref(), Some("B"));
        assert_eq!(output.bundle.meta.units, "Bcf/d");
    }

    #[test]
    fn test_trend_text_year_over_year() {
        let table = Table::from_records(vec![
            row("1", "2019-01-01", "1.00", "2"),
            row("1", "2019-06-01", "4.00", "2"),
            row("1", "2020-01-01", "1.10", "2"),
        ]);
        let output = traffic_from_table(table, &request(Frequency::Monthly)).unwrap();
        let text = &output.bundle.meta.trend_text["1"];

        assert!(text.contains("up 10.0%"), "{}", text);
        assert!(text.contains("2019-01-01"));
    }

    #[test]
    fn test_trend_text_french() {
        let table = Table::from_records(vec![
            row("1", "2020-01-01", "2.00", "3"),
            row("1", "2020-02-01", "1.50", "3"),
        ]);
        let req = TrafficRequest {
            lang: Lang::Fr,
            ..request(Frequency::Monthly)
        };
        let output = traffic_from_table(table, &req).unwrap();
        let text = &output.bundle.meta.trend_text["1"];

        assert!(text.contains("en baisse de 25,0 %"), "{}", text);
        assert!(text.contains("1,50 Bcf/d"));
    }

    #[test]
    fn test_invalid_date_rejected() {
        let table = Table::from_records(vec![row("1", "January", "1", "2")]);
        assert!(matches!(
            traffic_from_table(table, &request(Frequency::Daily)),
            Err(ProcessError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_row_without_key_point_is_skipped() {
        let table = Table::from_records(vec![
            row("1", "2020-01-01", "1", "2"),
            row("", "2020-01-15", "9", "9"),
            row("1", "2020-02-01", "2", "2"),
        ]);
        let output = traffic_from_table(table, &request(Frequency::Monthly)).unwrap();

        assert_eq!(output.bundle.traffic.len(), 1);
        assert_eq!(output.bundle.traffic["1"].throughput(), &[Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_non_numeric_throughput_rejected() {
        let table = Table::from_records(vec![row("1", "2020-01-01", "high", "2")]);
        assert!(matches!(
            traffic_from_table(table, &request(Frequency::Daily)),
            Err(ProcessError::InvalidValue { ref column, .. }) if column == "Throughput"
        ));
    }
}
