//! High-level pipeline API: run processors and write dashboard artifacts.
//!
//! Each `run_*` function loads, transforms, validates and writes one domain.
//! [`build_profile`] runs every section enabled for a company profile.
//!
//! # Example
//!
//! ```rust,ignore
//! use profiles::transform::pipeline::{build_profile, BuildOptions, OutputConfig};
//! use profiles::source::{SourceConfig, TableLoader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = TableLoader::new(SourceConfig::from_env());
//!     let report = build_profile(&loader, "ngtl", &BuildOptions::default(), &OutputConfig::from_env()).await?;
//!
//!     println!("Wrote {} artifacts", report.artifacts.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{OutputError, OutputResult, PipelineError, PipelineResult};
use crate::logs::{log_error, log_info, log_info_indent, log_success, RUN_LOG};
use crate::models::{CompanyScope, Domain, Frequency, Lang};
use crate::profiles::{self, Profile};
use crate::source::TableLoader;
use crate::transform::conditions::{process_conditions, ConditionRequest};
use crate::transform::incidents::{process_incidents, IncidentRequest};
use crate::transform::tolls::{process_tolls, TollsRequest};
use crate::transform::traffic::{process_traffic, TrafficRequest};
use crate::validation::validate_artifact;

/// Default artifact directory (relative to current dir)
pub const DEFAULT_OUT_DIR: &str = "dist";

/// Where and how artifacts are written
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    /// Check artifacts against their schema before writing
    pub validate: bool,
}

impl OutputConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            validate: true,
        }
    }

    /// `PROFILES_OUT_DIR`, or [`DEFAULT_OUT_DIR`]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let dir = env::var("PROFILES_OUT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OUT_DIR.to_string());
        Self::new(dir)
    }

    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OUT_DIR)
    }
}

/// File stem of a company: its alphanumeric characters only
/// (`NOVA Gas Transmission Ltd.` -> `NOVAGasTransmissionLtd`).
pub fn file_stem(company: &str) -> String {
    let stem: String = company.chars().filter(|c| c.is_alphanumeric()).collect();
    if stem.is_empty() {
        "all".to_string()
    } else {
        stem
    }
}

/// File stem of a scope: `all`, the single company's stem, or the stems of
/// every company joined with `_`. Company stems never contain `_`, so two
/// different scopes never share a file.
pub fn scope_stem(scope: &CompanyScope) -> String {
    if scope.is_all() {
        return "all".to_string();
    }
    scope
        .names()
        .iter()
        .map(|name| file_stem(name))
        .collect::<Vec<_>>()
        .join("_")
}

/// `<out>/<domain>/company_data[/<lang>]/<stem>.json`, see [`scope_stem`]
pub fn artifact_path(
    out_dir: &Path,
    domain: Domain,
    scope: &CompanyScope,
    lang: Option<Lang>,
) -> PathBuf {
    let mut path = out_dir.join(domain.as_str()).join("company_data");
    if let Some(lang) = lang {
        path = path.join(lang.as_str());
    }
    path.join(format!("{}.json", scope_stem(scope)))
}

/// Serialize, validate and write one artifact. Returns the written path.
pub fn write_artifact<T: Serialize>(
    output: &OutputConfig,
    domain: Domain,
    scope: &CompanyScope,
    lang: Option<Lang>,
    artifact: &T,
) -> OutputResult<PathBuf> {
    let value = serde_json::to_value(artifact)?;

    if output.validate {
        validate_artifact(domain, &value)
            .map_err(|errors| OutputError::SchemaError { domain, errors })?;
    }

    let path = artifact_path(&output.out_dir, domain, scope, lang);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_string(&value)?)?;

    log_success(format!("Wrote {}", path.display()));
    Ok(path)
}

/// Incidents for one scope, written to one artifact.
pub async fn run_incidents(
    loader: &TableLoader,
    request: &IncidentRequest,
    output: &OutputConfig,
) -> PipelineResult<PathBuf> {
    let result = process_incidents(loader, request).await?;
    Ok(write_artifact(output, Domain::Incidents, &request.companies, None, &result)?)
}

/// Conditions for one scope, written under the language folder.
pub async fn run_conditions(
    loader: &TableLoader,
    request: &ConditionRequest,
    output: &OutputConfig,
) -> PipelineResult<PathBuf> {
    let result = process_conditions(loader, request).await?;
    Ok(write_artifact(
        output,
        Domain::Conditions,
        &request.companies,
        Some(request.lang),
        &result,
    )?)
}

/// Traffic for one scope, written under the language folder.
pub async fn run_traffic(
    loader: &TableLoader,
    request: &TrafficRequest,
    output: &OutputConfig,
) -> PipelineResult<PathBuf> {
    let result = process_traffic(loader, request).await?;
    Ok(write_artifact(
        output,
        Domain::Traffic,
        &request.companies,
        Some(request.lang),
        &result.bundle,
    )?)
}

/// Tolls, one artifact per pipeline.
pub async fn run_tolls(
    loader: &TableLoader,
    request: &TollsRequest,
    output: &OutputConfig,
) -> PipelineResult<Vec<PathBuf>> {
    let bundles = process_tolls(loader, request).await?;
    let mut paths = Vec::with_capacity(bundles.len());
    for (pipeline, bundle) in &bundles {
        let scope = CompanyScope::new([pipeline.as_str()]);
        paths.push(write_artifact(output, Domain::Tolls, &scope, None, bundle)?);
    }
    Ok(paths)
}

/// Source and display options shared by every section of a profile build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub test: bool,
    pub remote: bool,
    pub lang: Lang,
    pub frequency: Frequency,
}

/// Artifacts written for one profile.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub profile: &'static str,
    pub artifacts: Vec<PathBuf>,
    /// Warnings logged during the build, such as skipped key points
    pub warnings: Vec<String>,
}

/// Build every enabled section of the profile `id`.
pub async fn build_profile(
    loader: &TableLoader,
    id: &str,
    options: &BuildOptions,
    output: &OutputConfig,
) -> PipelineResult<BuildReport> {
    let profile = profiles::find(id).ok_or_else(|| PipelineError::UnknownProfile(id.to_string()))?;

    let mut capture = RUN_LOG.capture();
    let artifacts = build(loader, profile, options, output)
        .await
        .inspect_err(|e| log_error(format!("Profile {} failed: {}", id, e)))?;

    Ok(BuildReport {
        profile: profile.id,
        artifacts,
        warnings: capture.warnings(),
    })
}

async fn build(
    loader: &TableLoader,
    profile: &'static Profile,
    options: &BuildOptions,
    output: &OutputConfig,
) -> PipelineResult<Vec<PathBuf>> {
    log_info(format!("Building profile {} ({})", profile.id, profile.company));
    let companies = CompanyScope::new([profile.company]);
    let mut artifacts = Vec::new();

    if profile.sections.safety {
        log_info_indent("Section: safety", 1);
        let incidents = IncidentRequest {
            remote: options.remote,
            test: options.test,
            companies: companies.clone(),
        };
        artifacts.push(run_incidents(loader, &incidents, output).await?);

        let conditions = ConditionRequest {
            remote: options.remote,
            test: options.test,
            companies: companies.clone(),
            lang: options.lang,
        };
        artifacts.push(run_conditions(loader, &conditions, output).await?);
    }

    if profile.sections.traffic {
        log_info_indent("Section: traffic", 1);
        let traffic = TrafficRequest {
            test: options.test,
            sql: options.remote,
            commodity: profile.commodity,
            frequency: options.frequency,
            companies: companies.clone(),
            lang: options.lang,
        };
        artifacts.push(run_traffic(loader, &traffic, output).await?);
    }

    if profile.sections.tolls {
        if let Some(pipeline) = profile.tolls_pipeline {
            log_info_indent("Section: tolls", 1);
            let tolls = TollsRequest {
                remote: options.remote,
                test: options.test,
                pipelines: CompanyScope::new([pipeline]),
            };
            artifacts.extend(run_tolls(loader, &tolls, output).await?);
        }
    }

    log_success(format!(
        "Profile {} done: {} artifact(s)",
        profile.id,
        artifacts.len()
    ));
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("NOVA Gas Transmission Ltd."), "NOVAGasTransmissionLtd");
        assert_eq!(file_stem("Trans-Northern Pipelines Inc."), "TransNorthernPipelinesInc");
        assert_eq!(file_stem(""), "all");
    }

    #[test]
    fn test_artifact_path_layout() {
        let scope = CompanyScope::new(["Alliance Pipeline Ltd."]);
        let path = artifact_path(Path::new("dist"), Domain::Conditions, &scope, Some(Lang::Fr));
        assert_eq!(
            path,
            PathBuf::from("dist/conditions/company_data/fr/AlliancePipelineLtd.json")
        );

        let path = artifact_path(Path::new("dist"), Domain::Tolls, &CompanyScope::new(["Alliance"]), None);
        assert_eq!(path, PathBuf::from("dist/tolls/company_data/Alliance.json"));
    }

    #[test]
    fn test_scope_stem() {
        assert_eq!(scope_stem(&CompanyScope::all()), "all");
        assert_eq!(scope_stem(&CompanyScope::new(["NOVA Gas Transmission Ltd."])), "NOVAGasTransmissionLtd");
        assert_eq!(scope_stem(&CompanyScope::new(["A", "B"])), "A_B");
        assert_eq!(scope_stem(&CompanyScope::new(["A_B"])), "AB");
        assert_ne!(
            scope_stem(&CompanyScope::new(["A", "B"])),
            scope_stem(&CompanyScope::new(["AB"]))
        );
    }

    #[test]
    fn test_write_rejects_invalid_artifact() {
        let dir = tempdir().unwrap();
        let output = OutputConfig::new(dir.path());
        let bogus = serde_json::json!({ "meta": {} });

        let scope = CompanyScope::new(["Alliance"]);

        let err = write_artifact(&output, Domain::Tolls, &scope, None, &bogus).unwrap_err();
        assert!(matches!(err, OutputError::SchemaError { domain: Domain::Tolls, .. }));
        assert!(!artifact_path(dir.path(), Domain::Tolls, &scope, None).exists());

        let path = write_artifact(&output.without_validation(), Domain::Tolls, &scope, None, &bogus).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), r#"{"meta":{}}"#);
    }
}
