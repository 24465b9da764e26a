//! Regulatory conditions: status normalization, per-region map data and
//! the status summary.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ProcessError, ProcessResult};
use crate::logs::{log_info, log_success};
use crate::models::{CompanyScope, ConditionStatus, Domain, Lang};
use crate::source::TableLoader;
use crate::table::{list, text, Row, Table};
use crate::transform::most_common::{most_common, MostCommon};

const COL_NUMBER: &str = "Condition Number";
const COL_COMPANY: &str = "Company";
const COL_PROJECT: &str = "Project Name";
const COL_STATUS: &str = "Condition Status";
const COL_LOCATION: &str = "Location";
const COL_THEMES: &str = "Theme(s)";

/// One regulatory condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRecord {
    pub id: String,
    pub company: Option<String>,
    pub project: Option<String>,
    pub status: ConditionStatus,
    pub regions: Vec<String>,
    pub themes: Vec<String>,
}

impl ConditionRecord {
    fn from_row(idx: usize, row: &Row) -> ProcessResult<Self> {
        let id = text(row, COL_NUMBER).unwrap_or_else(|| format!("row {}", idx + 1));

        let raw_status = text(row, COL_STATUS).unwrap_or_default();
        let status = ConditionStatus::normalize(&raw_status).ok_or_else(|| {
            ProcessError::UnknownStatus {
                value: raw_status.clone(),
                record: id.clone(),
            }
        })?;

        Ok(Self {
            company: text(row, COL_COMPANY),
            project: text(row, COL_PROJECT),
            status,
            regions: list(row, COL_LOCATION, ','),
            themes: list(row, COL_THEMES, ','),
            id,
        })
    }

    /// At least one region, so the condition can be drawn on the map.
    pub fn on_map(&self) -> bool {
        !self.regions.is_empty()
    }
}

/// Counts per normalized status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    #[serde(rename = "Open")]
    pub open: usize,
    #[serde(rename = "In Progress")]
    pub in_progress: usize,
    #[serde(rename = "Closed")]
    pub closed: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: ConditionStatus) {
        match status {
            ConditionStatus::Open => self.open += 1,
            ConditionStatus::InProgress => self.in_progress += 1,
            ConditionStatus::Closed => self.closed += 1,
        }
    }

    pub fn get(&self, status: ConditionStatus) -> usize {
        match status {
            ConditionStatus::Open => self.open,
            ConditionStatus::InProgress => self.in_progress,
            ConditionStatus::Closed => self.closed,
        }
    }

    pub fn total(&self) -> usize {
        self.open + self.in_progress + self.closed
    }
}

/// One condition located in one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCondition {
    pub region: String,
    pub id: String,
    pub status: ConditionStatus,
    pub project: Option<String>,
}

/// Status counts of one map region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapMeta {
    pub id: String,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotOnMap {
    pub total: usize,
    pub status: StatusCounts,
}

/// On-map status counts plus the conditions without a region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSummary {
    #[serde(flatten)]
    pub on_map: StatusCounts,
    pub not_on_map: NotOnMap,
}

impl ConditionSummary {
    pub fn total(&self) -> usize {
        self.on_map.total() + self.not_on_map.total
    }
}

/// Status labels in the display language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLabels {
    #[serde(rename = "Open")]
    pub open: &'static str,
    #[serde(rename = "In Progress")]
    pub in_progress: &'static str,
    #[serde(rename = "Closed")]
    pub closed: &'static str,
}

impl StatusLabels {
    pub fn for_lang(lang: Lang) -> Self {
        Self {
            open: ConditionStatus::Open.label(lang),
            in_progress: ConditionStatus::InProgress.label(lang),
            closed: ConditionStatus::Closed.label(lang),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionMeta {
    pub company_name: Option<String>,
    pub build: bool,
    pub lang: Lang,
    pub status_labels: StatusLabels,
    pub summary: ConditionSummary,
    pub top_projects: Option<MostCommon>,
}

/// Parameters of a conditions run.
#[derive(Debug, Clone, Default)]
pub struct ConditionRequest {
    pub remote: bool,
    pub test: bool,
    pub companies: CompanyScope,
    pub lang: Lang,
}

/// Conditions artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOutput {
    pub meta: ConditionMeta,
    pub conditions: Vec<ConditionRecord>,
    pub regions: Vec<RegionCondition>,
    pub map_meta: Vec<MapMeta>,
}

/// Load conditions for the requested companies and build the map data.
pub async fn process_conditions(
    loader: &TableLoader,
    request: &ConditionRequest,
) -> ProcessResult<ConditionOutput> {
    log_info(format!(
        "Processing conditions for {} ({})",
        request.companies,
        request.lang.as_str()
    ));
    let table = loader
        .load(Domain::Conditions, request.remote, &request.companies, request.test)
        .await?;

    let output = conditions_from_table(&table, &request.companies, request.lang)?;
    log_success(format!(
        "{} conditions across {} regions, {} not on map",
        output.conditions.len(),
        output.map_meta.len(),
        output.meta.summary.not_on_map.total
    ));
    Ok(output)
}

/// Build the conditions artifact from an already-scoped table.
pub fn conditions_from_table(
    table: &Table,
    companies: &CompanyScope,
    lang: Lang,
) -> ProcessResult<ConditionOutput> {
    table.require_columns(&[COL_NUMBER, COL_PROJECT, COL_STATUS, COL_LOCATION])?;

    let conditions = table
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| ConditionRecord::from_row(idx, row))
        .collect::<ProcessResult<Vec<_>>>()?;

    let mut summary = ConditionSummary::default();
    let mut by_region: BTreeMap<String, StatusCounts> = BTreeMap::new();
    let mut regions = Vec::new();

    for condition in &conditions {
        if !condition.on_map() {
            summary.not_on_map.total += 1;
            summary.not_on_map.status.add(condition.status);
            continue;
        }

        summary.on_map.add(condition.status);
        for region in &condition.regions {
            by_region
                .entry(region.clone())
                .or_default()
                .add(condition.status);
            regions.push(RegionCondition {
                region: region.clone(),
                id: condition.id.clone(),
                status: condition.status,
                project: condition.project.clone(),
            });
        }
    }

    let map_meta = by_region
        .into_iter()
        .map(|(id, counts)| MapMeta { id, counts })
        .collect();

    let meta = ConditionMeta {
        company_name: companies.single().map(String::from),
        build: !conditions.is_empty(),
        lang,
        status_labels: StatusLabels::for_lang(lang),
        summary,
        top_projects: most_common(table, COL_PROJECT, 3)?,
    };

    Ok(ConditionOutput {
        meta,
        conditions,
        regions,
        map_meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(number: &str, status: &str, location: &str) -> serde_json::Value {
        json!({
            "Condition Number": number,
            "Company": "NOVA Gas Transmission Ltd.",
            "Project Name": "North Montney Mainline",
            "Condition Status": status,
            "Location": location,
            "Theme(s)": "Environmental Protection",
        })
    }

    #[test]
    fn test_summary_partitions_conditions() {
        let table = Table::from_records(vec![
            condition("1", "Closed", "Red Deer"),
            condition("2", "in progress", "Red Deer, Camrose--Drumheller"),
            condition("3", " Open ", ""),
            condition("4", "CLOSED", "nan"),
        ]);
        let output = conditions_from_table(&table, &CompanyScope::all(), Lang::En).unwrap();
        let summary = &output.meta.summary;

        assert_eq!(summary.on_map.closed, 1);
        assert_eq!(summary.on_map.in_progress, 1);
        assert_eq!(summary.not_on_map.total, 2);
        assert_eq!(summary.not_on_map.status.open, 1);
        assert_eq!(summary.total(), output.conditions.len());
    }

    #[test]
    fn test_map_meta_sorted_with_zero_defaults() {
        let table = Table::from_records(vec![
            condition("1", "Closed", "Red Deer"),
            condition("2", "Open", "Camrose--Drumheller, Red Deer"),
        ]);
        let output = conditions_from_table(&table, &CompanyScope::all(), Lang::En).unwrap();

        let ids: Vec<&str> = output.map_meta.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["Camrose--Drumheller", "Red Deer"]);
        assert_eq!(output.regions.len(), 3);

        let json = serde_json::to_value(&output.map_meta[0]).unwrap();
        assert_eq!(
            json,
            json!({"id": "Camrose--Drumheller", "Open": 1, "In Progress": 0, "Closed": 0})
        );
    }

    #[test]
    fn test_repeated_region_counts_once() {
        let table = Table::from_records(vec![condition("1", "Closed", "Red Deer, Red Deer")]);
        let output = conditions_from_table(&table, &CompanyScope::all(), Lang::En).unwrap();

        assert_eq!(output.conditions[0].regions, vec!["Red Deer".to_string()]);
        assert_eq!(output.map_meta.len(), 1);
        assert_eq!(output.map_meta[0].counts.closed, 1);
        assert_eq!(output.regions.len(), 1);
    }

    #[test]
    fn test_array_cells_from_warehouse() {
        let table = Table::from_records(vec![json!({
            "Condition Number": "XO-200-2014-2",
            "Project Name": "Line 3 Replacement",
            "Condition Status": "Closed",
            "Location": ["Southwest", "South Central"],
            "Theme(s)": ["Indigenous Engagement"],
        })]);
        let output = conditions_from_table(&table, &CompanyScope::all(), Lang::En).unwrap();

        let ids: Vec<&str> = output.map_meta.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["South Central", "Southwest"]);
        assert_eq!(output.conditions[0].themes, vec!["Indigenous Engagement".to_string()]);
    }

    #[test]
    fn test_unknown_status_fails() {
        let table = Table::from_records(vec![
            condition("1", "Closed", "Red Deer"),
            condition("XG-9", "Pending", "Red Deer"),
        ]);
        let err = conditions_from_table(&table, &CompanyScope::all(), Lang::En).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::UnknownStatus { ref value, ref record } if value == "Pending" && record == "XG-9"
        ));
    }

    #[test]
    fn test_blank_status_fails() {
        let table = Table::from_records(vec![condition("1", "  ", "Red Deer")]);
        assert!(matches!(
            conditions_from_table(&table, &CompanyScope::all(), Lang::En),
            Err(ProcessError::UnknownStatus { .. })
        ));
    }

    #[test]
    fn test_lang_changes_labels_only() {
        let table = Table::from_records(vec![condition("1", "In Progress", "Red Deer")]);
        let en = conditions_from_table(&table, &CompanyScope::all(), Lang::En).unwrap();
        let fr = conditions_from_table(&table, &CompanyScope::all(), Lang::Fr).unwrap();

        assert_eq!(fr.meta.status_labels.in_progress, "En cours");
        assert_eq!(en.meta.summary, fr.meta.summary);
        assert_eq!(en.map_meta, fr.map_meta);

        let json = serde_json::to_value(&fr.meta).unwrap();
        assert_eq!(json["lang"], "fr");
        assert_eq!(json["summary"]["In Progress"], 1);
        assert_eq!(json["summary"]["notOnMap"]["total"], 0);
    }
}
