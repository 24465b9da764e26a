//! JSON Schema validation for dashboard artifacts.
//!
//! Every artifact written by the pipeline is checked against the schema of
//! its domain (JSON Schema Draft 7) before it reaches disk.
//!
//! # Embedded Schemas
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `incidents.schema.json`
//! - `conditions.schema.json`
//! - `traffic.schema.json`
//! - `tolls.schema.json`
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use profiles::models::Domain;
//! use profiles::validation::validate_artifact;
//!
//! let tolls = json!({
//!     "meta": { "pipelineID": "Alliance", "frequency": "daily", "units": ["$/Mcf"], "build": true },
//!     "tolls": {}
//! });
//! assert!(validate_artifact(Domain::Tolls, &tolls).is_ok());
//! ```

use serde_json::Value;

use crate::models::Domain;

/// Validate a JSON value against a JSON schema.
///
/// # Arguments
/// * `schema` - The JSON schema (already parsed)
/// * `data` - The value to validate
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use profiles::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["meta"],
///     "properties": {
///         "meta": { "type": "object" }
///     }
/// });
///
/// assert!(validate(&schema, &json!({ "meta": {} })).is_ok());
/// assert!(validate(&schema, &json!({ "traffic": {} })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Simpler variant: just true/false.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Raw schema text for a domain.
pub fn schema_source(domain: Domain) -> &'static str {
    match domain {
        Domain::Incidents => include_str!("../../schemas/incidents.schema.json"),
        Domain::Conditions => include_str!("../../schemas/conditions.schema.json"),
        Domain::Traffic => include_str!("../../schemas/traffic.schema.json"),
        Domain::Tolls => include_str!("../../schemas/tolls.schema.json"),
    }
}

/// Parsed schema for a domain.
pub fn schema(domain: Domain) -> Result<Value, Vec<String>> {
    serde_json::from_str(schema_source(domain))
        .map_err(|e| vec![format!("Invalid embedded {} schema: {}", domain, e)])
}

/// Validate an artifact against the schema of its domain.
pub fn validate_artifact(domain: Domain, data: &Value) -> Result<(), Vec<String>> {
    validate(&schema(domain)?, data)
}

/// Quick check against the schema of a domain.
pub fn is_valid_artifact(domain: Domain, data: &Value) -> bool {
    schema(domain).is_ok_and(|schema| is_valid(&schema, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_schemas_compile() {
        for domain in Domain::ALL {
            let schema = schema(domain).unwrap();
            assert!(jsonschema::draft7::new(&schema).is_ok(), "{}", domain);
        }
    }

    #[test]
    fn test_valid_tolls() {
        let tolls = json!({
            "meta": { "pipelineID": "Alliance", "frequency": "daily", "units": ["$/Mcf"], "build": true },
            "tolls": {
                "AECO to Chicago": [
                    { "name": "date", "xAxis": 1, "data": [[2019, 1, 1]] },
                    { "name": "FT, Demand", "yAxis": 0, "color": "#054169", "data": [1.2203] }
                ]
            }
        });
        assert!(is_valid_artifact(Domain::Tolls, &tolls));
    }

    #[test]
    fn test_invalid_traffic_dataset() {
        let traffic = json!({
            "meta": {
                "units": "Bcf/d", "build": true, "frequency": "monthly", "commodity": "gas",
                "defaultPoint": "32", "trendText": {}
            },
            "traffic": {
                "32": [{ "name": "date", "min": [2005, 11, 1], "data": [[2005, 11, 1]] }]
            }
        });
        let errors = validate_artifact(Domain::Traffic, &traffic).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_conditions_missing_summary() {
        let conditions = json!({
            "meta": { "companyName": null, "build": true, "lang": "en", "statusLabels": {}, "topProjects": null },
            "conditions": [],
            "regions": [],
            "mapMeta": []
        });
        assert!(!is_valid_artifact(Domain::Conditions, &conditions));
    }

    #[test]
    fn test_generic_validate() {
        let schema = json!({ "type": "object", "required": ["meta"] });
        assert!(validate(&schema, &json!({ "meta": {} })).is_ok());
        assert!(!is_valid(&schema, &json!([])));
    }
}
