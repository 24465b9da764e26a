//! Domain models shared by the loaders and the transforms.
//!
//! - [`Domain`] - Dataset kind (incidents, conditions, traffic, tolls)
//! - [`CompanyScope`] - Exact-match company filter
//! - [`Lang`] - Display language of labels and trend text
//! - [`Commodity`] / [`Frequency`] - Traffic filters
//! - [`ConditionStatus`] - Normalized regulatory condition status
//! - [`DateTriple`] - Date serialized as `[year, month, day]`

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Domain
// =============================================================================

/// A dataset served by the warehouse and turned into one dashboard section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Incidents,
    Conditions,
    Traffic,
    Tolls,
}

impl Domain {
    /// All domains, in build order.
    pub const ALL: [Domain; 4] = [
        Domain::Incidents,
        Domain::Conditions,
        Domain::Traffic,
        Domain::Tolls,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incidents => "incidents",
            Self::Conditions => "conditions",
            Self::Traffic => "traffic",
            Self::Tolls => "tolls",
        }
    }

    /// Column holding the company (or pipeline) name used for scoping.
    pub fn company_column(&self) -> &'static str {
        match self {
            Self::Incidents | Self::Conditions => "Company",
            Self::Traffic => "Corporate Entity",
            Self::Tolls => "Pipeline",
        }
    }

    /// Warehouse query for the domain. Company scoping happens after load.
    pub fn query(&self) -> &'static str {
        match self {
            Self::Incidents => "SELECT * FROM [vwIncidents];",
            Self::Conditions => "SELECT * FROM [vwConditions];",
            Self::Traffic => "SELECT * FROM [vwTraffic] ORDER BY [Date];",
            Self::Tolls => "SELECT * FROM [vwTolls];",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incidents" => Ok(Self::Incidents),
            "conditions" => Ok(Self::Conditions),
            "traffic" => Ok(Self::Traffic),
            "tolls" => Ok(Self::Tolls),
            other => Err(format!("unknown domain '{}'", other)),
        }
    }
}

// =============================================================================
// Company Scope
// =============================================================================

/// Set of company names a run is restricted to.
///
/// Matching is exact and case-sensitive. An empty scope means all companies.
/// Names keep their insertion order so messages and file names are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyScope(Vec<String>);

impl CompanyScope {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scope = Vec::new();
        for name in names {
            let name = name.into();
            if !scope.contains(&name) {
                scope.push(name);
            }
        }
        Self(scope)
    }

    /// Scope that retains every row.
    pub fn all() -> Self {
        Self(Vec::new())
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, company: &str) -> bool {
        self.0.iter().any(|c| c == company)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// The company name when exactly one is in scope.
    pub fn single(&self) -> Option<&str> {
        match self.0.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for CompanyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("all companies")
        } else {
            f.write_str(&self.0.join(", "))
        }
    }
}

// =============================================================================
// Display language
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Fr,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }
}

// =============================================================================
// Traffic filters
// =============================================================================

/// Product carried by a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Commodity {
    Gas,
    Oil,
}

impl Commodity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gas => "gas",
            Self::Oil => "oil",
        }
    }

    /// Display unit of throughput and capacity values.
    pub fn units(&self) -> &'static str {
        match self {
            Self::Gas => "Bcf/d",
            Self::Oil => "Mb/d",
        }
    }
}

/// Time step of traffic series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    #[default]
    Monthly,
}

// =============================================================================
// Condition status
// =============================================================================

/// Status of a regulatory condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Closed,
}

impl ConditionStatus {
    pub const ALL: [ConditionStatus; 3] = [Self::Open, Self::InProgress, Self::Closed];

    /// Normalize a raw status cell.
    ///
    /// Case, surrounding whitespace and `-`/`_` separators are ignored, so
    /// `" in-progress "` reads as [`ConditionStatus::InProgress`]. Blank or
    /// unrecognized values return `None`.
    pub fn normalize(raw: &str) -> Option<Self> {
        let key = raw
            .trim()
            .to_lowercase()
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        match key.as_str() {
            "open" => Some(Self::Open),
            "in progress" | "inprogress" => Some(Self::InProgress),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Closed => "Closed",
        }
    }

    /// Human-readable label in the requested language.
    pub fn label(&self, lang: Lang) -> &'static str {
        match (self, lang) {
            (Self::Open, Lang::En) => "Open",
            (Self::InProgress, Lang::En) => "In Progress",
            (Self::Closed, Lang::En) => "Closed",
            (Self::Open, Lang::Fr) => "Ouvert",
            (Self::InProgress, Lang::Fr) => "En cours",
            (Self::Closed, Lang::Fr) => "Fermé",
        }
    }
}

// =============================================================================
// Dates
// =============================================================================

/// A calendar date that serializes as `[year, month, day]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTriple(pub NaiveDate);

impl DateTriple {
    pub fn parts(&self) -> [i32; 3] {
        [self.0.year(), self.0.month() as i32, self.0.day() as i32]
    }
}

impl From<NaiveDate> for DateTriple {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Serialize for DateTriple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.parts().serialize(serializer)
    }
}

/// Parse the date formats found in extracts (`2019-01-31`, `2019-01-31 00:00:00`,
/// `2019-01-31T00:00:00`, `2019/01/31`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y/%m/%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_normalization() {
        assert_eq!(ConditionStatus::normalize("Closed"), Some(ConditionStatus::Closed));
        assert_eq!(ConditionStatus::normalize(" CLOSED "), Some(ConditionStatus::Closed));
        assert_eq!(ConditionStatus::normalize("in progress"), Some(ConditionStatus::InProgress));
        assert_eq!(ConditionStatus::normalize("In-Progress"), Some(ConditionStatus::InProgress));
        assert_eq!(ConditionStatus::normalize("open"), Some(ConditionStatus::Open));
        assert_eq!(ConditionStatus::normalize(""), None);
        assert_eq!(ConditionStatus::normalize("Pending"), None);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ConditionStatus::InProgress.label(Lang::En), "In Progress");
        assert_eq!(ConditionStatus::InProgress.label(Lang::Fr), "En cours");
        assert_eq!(
            serde_json::to_value(ConditionStatus::InProgress).unwrap(),
            "In Progress"
        );
    }

    #[test]
    fn test_company_scope() {
        let scope = CompanyScope::new(["NOVA Gas Transmission Ltd.", "NOVA Gas Transmission Ltd."]);
        assert_eq!(scope.names().len(), 1);
        assert!(scope.contains("NOVA Gas Transmission Ltd."));
        assert!(!scope.contains("nova gas transmission ltd."));
        assert_eq!(scope.single(), Some("NOVA Gas Transmission Ltd."));
        assert!(CompanyScope::all().is_all());
        assert_eq!(CompanyScope::all().single(), None);
    }

    #[test]
    fn test_date_triple_serialization() {
        let date = NaiveDate::from_ymd_opt(2005, 11, 1).unwrap();
        let json = serde_json::to_value(DateTriple(date)).unwrap();
        assert_eq!(json, serde_json::json!([2005, 11, 1]));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 1, 31);
        assert_eq!(parse_date("2019-01-31"), expected);
        assert_eq!(parse_date("2019-01-31 00:00:00"), expected);
        assert_eq!(parse_date("2019-01-31T00:00:00"), expected);
        assert_eq!(parse_date("2019/01/31"), expected);
        assert_eq!(parse_date("31 Jan 2019"), None);
    }

    #[test]
    fn test_domain_round_trip_names() {
        for domain in Domain::ALL {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
        }
        assert_eq!(Domain::Traffic.company_column(), "Corporate Entity");
        assert_eq!(Commodity::Gas.units(), "Bcf/d");
    }
}
