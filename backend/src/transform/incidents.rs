//! Incident reports: event list, release volumes and summary metadata.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{ProcessError, ProcessResult};
use crate::logs::{log_info, log_success};
use crate::models::{CompanyScope, Domain};
use crate::source::TableLoader;
use crate::table::{list, observation, text, Row, Table};
use crate::transform::most_common::{most_common, most_common_values, MostCommon};

/// Incident type tags counted as serious events.
pub const SERIOUS_EVENT_TYPES: [&str; 3] = [
    "Adverse Environmental Effects",
    "Serious Injury (CER or TSB)",
    "Fatality",
];

/// Tag marking an incident as a release of substance.
pub const RELEASE_OF_SUBSTANCE: &str = "Release of Substance";

const COL_NUMBER: &str = "Incident Number";
const COL_COMPANY: &str = "Company";
const COL_TYPES: &str = "Incident Types";
const COL_STATUS: &str = "Status";
const COL_SUBSTANCE: &str = "Substance";
const COL_VOLUME: &str = "Approximate Volume Released";
const COL_YEAR: &str = "Year";
const COL_WHAT: &str = "What Happened";
const COL_WHY: &str = "Why It Happened";
const COL_PROVINCE: &str = "Province";

const REQUIRED_COLUMNS: [&str; 8] = [
    COL_NUMBER,
    COL_TYPES,
    COL_STATUS,
    COL_SUBSTANCE,
    COL_VOLUME,
    COL_YEAR,
    COL_WHAT,
    COL_WHY,
];

static NON_ALNUM: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"[^a-z0-9]+"));

// =============================================================================
// Records
// =============================================================================

/// Unordered set of tags from a multi-valued cell.
///
/// Tags keep their first-appearance order for output; membership is exact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Tags of `column`, from comma-separated text or an array cell.
    pub fn from_cell(row: &Row, column: &str) -> Self {
        Self(list(row, column, ','))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One incident report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub id: String,
    pub company: Option<String>,
    pub types: TagSet,
    pub status: Option<String>,
    pub substance: Option<String>,
    pub volume: Option<f64>,
    pub year: Option<i32>,
    pub what: TagSet,
    pub why: TagSet,
    pub province: Option<String>,
}

impl IncidentRecord {
    fn from_row(idx: usize, row: &Row) -> ProcessResult<Self> {
        let id = text(row, COL_NUMBER).unwrap_or_else(|| format!("row {}", idx + 1));

        let volume = observation(row, COL_VOLUME, &id)?;
        let year = match observation(row, COL_YEAR, &id)? {
            Some(y) if y.fract() == 0.0 => {
                Some(i32::try_from(y as i64).map_err(|_| invalid(row, COL_YEAR, &id))?)
            }
            Some(_) => return Err(invalid(row, COL_YEAR, &id)),
            None => None,
        };

        Ok(Self {
            company: text(row, COL_COMPANY),
            types: TagSet::from_cell(row, COL_TYPES),
            status: text(row, COL_STATUS),
            substance: text(row, COL_SUBSTANCE),
            volume,
            year,
            what: TagSet::from_cell(row, COL_WHAT),
            why: TagSet::from_cell(row, COL_WHY),
            province: text(row, COL_PROVINCE),
            id,
        })
    }

    pub fn is_release(&self) -> bool {
        self.types.contains(RELEASE_OF_SUBSTANCE)
    }
}

fn invalid(row: &Row, column: &str, id: &str) -> ProcessError {
    ProcessError::InvalidValue {
        column: column.to_string(),
        value: text(row, column).unwrap_or_default(),
        record: id.to_string(),
    }
}

/// A release incident with a known, positive volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeRecord {
    /// Short substance code, see [`substance_code`]
    pub substance: String,
    /// Short status code, see [`status_code`]
    pub status: String,
    pub year: i32,
    /// Released volume in m³
    pub volume: f64,
}

/// Short code of a substance name. Unlisted names are lowercased with
/// everything but ASCII letters and digits removed.
pub fn substance_code(substance: &str) -> ProcessResult<String> {
    let code = match substance.trim() {
        "Natural Gas - Sweet" => "ngsweet",
        "Natural Gas - Sour" => "ngsour",
        "Crude Oil - Sweet" => "cosweet",
        "Crude Oil - Sour" => "cosour",
        "Crude Oil - Synthetic" => "cosynthetic",
        "Fuel Gas" => "fgas",
        "Lube Oil" => "loil",
        "Condensate" => "condensate",
        "Diesel Fuel" => "diesel",
        "Gasoline" => "gasoline",
        "Natural Gas Liquids" => "ngl",
        "Propane" => "propane",
        "Butane" => "butane",
        "Sulphur Dioxide" => "so2",
        "Hydrogen Sulphide" => "h2s",
        other => {
            let re = NON_ALNUM
                .as_ref()
                .map_err(|e| ProcessError::InvalidArgument(e.to_string()))?;
            return Ok(re.replace_all(&other.to_lowercase(), "").into_owned());
        }
    };
    Ok(code.to_string())
}

/// Short code of an incident status.
pub fn status_code(status: &str) -> String {
    match status.trim() {
        "Closed" => "c".to_string(),
        "Submitted" => "s".to_string(),
        "Initially Submitted" => "is".to_string(),
        other => other
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .flat_map(char::to_lowercase)
            .collect(),
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Serious event tallies, one per tag of [`SERIOUS_EVENT_TYPES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeriousEvents {
    #[serde(rename = "Adverse Environmental Effects")]
    pub adverse_environmental_effects: usize,
    #[serde(rename = "Serious Injury (CER or TSB)")]
    pub serious_injury: usize,
    #[serde(rename = "Fatality")]
    pub fatality: usize,
}

impl SeriousEvents {
    fn count(records: &[IncidentRecord]) -> Self {
        let tally = |tag: &str| records.iter().filter(|r| r.types.contains(tag)).count();
        Self {
            adverse_environmental_effects: tally(SERIOUS_EVENT_TYPES[0]),
            serious_injury: tally(SERIOUS_EVENT_TYPES[1]),
            fatality: tally(SERIOUS_EVENT_TYPES[2]),
        }
    }
}

/// Events in one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub events: usize,
}

/// Events per year, ascending, with zero-filled gaps between the first and
/// last year present.
pub fn yearly_trend(records: &[IncidentRecord]) -> Vec<YearCount> {
    let years: Vec<i32> = records.iter().filter_map(|r| r.year).collect();
    let (Some(&first), Some(&last)) = (years.iter().min(), years.iter().max()) else {
        return Vec::new();
    };

    (first..=last)
        .map(|year| YearCount {
            year,
            events: years.iter().filter(|&&y| y == year).count(),
        })
        .collect()
}

/// Summary block of the incidents artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentMeta {
    pub company_name: Option<String>,
    pub build: bool,
    pub total_events: usize,
    pub release_events: usize,
    /// Sum of released volume in m³, one decimal
    pub total_volume: f64,
    pub serious_events: SeriousEvents,
    pub most_common_substance: Option<MostCommon>,
    pub most_common_what: Option<MostCommon>,
    pub most_common_why: Option<MostCommon>,
    pub trend: Vec<YearCount>,
}

// =============================================================================
// Processor
// =============================================================================

/// Parameters of an incidents run.
#[derive(Debug, Clone, Default)]
pub struct IncidentRequest {
    pub remote: bool,
    pub test: bool,
    pub companies: CompanyScope,
}

/// Incidents artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentOutput {
    pub meta: IncidentMeta,
    #[serde(rename = "events")]
    pub incidents: Vec<IncidentRecord>,
    pub volume: Vec<VolumeRecord>,
}

/// Load incidents for the requested companies and summarize them.
pub async fn process_incidents(
    loader: &TableLoader,
    request: &IncidentRequest,
) -> ProcessResult<IncidentOutput> {
    log_info(format!("Processing incidents for {}", request.companies));
    let table = loader
        .load(Domain::Incidents, request.remote, &request.companies, request.test)
        .await?;

    let output = incidents_from_table(&table, &request.companies)?;
    log_success(format!(
        "{} incidents, {} with release volume",
        output.meta.total_events,
        output.volume.len()
    ));
    Ok(output)
}

/// Summarize an already-scoped incidents table.
pub fn incidents_from_table(table: &Table, companies: &CompanyScope) -> ProcessResult<IncidentOutput> {
    table.require_columns(&REQUIRED_COLUMNS)?;

    let incidents = table
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| IncidentRecord::from_row(idx, row))
        .collect::<ProcessResult<Vec<_>>>()?;

    let mut volume = Vec::new();
    for record in incidents.iter().filter(|r| r.is_release()) {
        if let (Some(v), Some(year)) = (record.volume, record.year) {
            if v > 0.0 {
                volume.push(VolumeRecord {
                    substance: substance_code(record.substance.as_deref().unwrap_or(""))?,
                    status: status_code(record.status.as_deref().unwrap_or("")),
                    year,
                    volume: v,
                });
            }
        }
    }

    let total_volume = volume.iter().map(|v| v.volume).sum::<f64>();
    let what = incidents.iter().flat_map(|r| r.what.iter().cloned());
    let why = incidents.iter().flat_map(|r| r.why.iter().cloned());

    let meta = IncidentMeta {
        company_name: companies.single().map(String::from),
        build: !incidents.is_empty(),
        total_events: incidents.len(),
        release_events: incidents.iter().filter(|r| r.is_release()).count(),
        total_volume: (total_volume * 10.0).round() / 10.0,
        serious_events: SeriousEvents::count(&incidents),
        most_common_substance: most_common(table, COL_SUBSTANCE, 1)?,
        most_common_what: most_common_values(what, 2)?,
        most_common_why: most_common_values(why, 2)?,
        trend: yearly_trend(&incidents),
    };

    Ok(IncidentOutput {
        meta,
        incidents,
        volume,
    })
}
