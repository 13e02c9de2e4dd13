//! Scenario documents: the static configuration a session runs against.
//!
//! Raw JSON is checked against `contracts/scenario.schema.json` before it is
//! decoded, so a [`Scenario`] value is always well-formed.

use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::build_cart::BuildCartConfig;
use crate::contract::{collect_issues, compile_schema, parse_document};
use crate::error::{ContractError, ScenarioError};

const SCENARIO_SCHEMA_NAME: &str = "scenario.schema.json";
const SCENARIO_SCHEMA: &str = include_str!("../contracts/scenario.schema.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioMode {
    Guided,
    Assisted,
    Timed,
    Certification,
}

impl fmt::Display for ScenarioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioMode::Guided => write!(f, "guided"),
            ScenarioMode::Assisted => write!(f, "assisted"),
            ScenarioMode::Timed => write!(f, "timed"),
            ScenarioMode::Certification => write!(f, "certification"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PickTask {
    pub pick_task_id: String,
    pub location_code: String,
    pub item_barcode: String,
    pub expected_tote_slot: u32,
    pub quantity_required: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildCartSetup {
    pub required_tote_count: NonZeroU32,
}

/// Immutable scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scenario {
    pub version: String,
    pub id: String,
    pub mode: ScenarioMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub build_cart: BuildCartSetup,
    pub pick_tasks: Vec<PickTask>,
}

impl Scenario {
    /// Validate and decode a scenario from raw JSON.
    pub fn from_value(value: Value) -> Result<Self, ScenarioError> {
        Self::from_value_with_origin(value, "inline scenario")
    }

    fn from_value_with_origin(value: Value, origin: &str) -> Result<Self, ScenarioError> {
        validate_scenario(&value).map_err(|errors| match errors {
            ScenarioValidation::Contract(e) => ScenarioError::Contract(e),
            ScenarioValidation::Invalid(errors) => ScenarioError::Invalid {
                origin: origin.to_string(),
                errors,
            },
        })?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn build_cart_config(&self) -> BuildCartConfig {
        BuildCartConfig::new(self.build_cart.required_tote_count)
    }

    pub fn task(&self, index: usize) -> Option<&PickTask> {
        self.pick_tasks.get(index)
    }
}

/// Outcome of [`validate_scenario`] when the document is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioValidation {
    /// The scenario schema itself could not be loaded.
    Contract(ContractError),
    /// The document violates the schema; one message per violation.
    Invalid(Vec<String>),
}

fn scenario_validator() -> Result<&'static jsonschema::Validator, ContractError> {
    static VALIDATOR: OnceLock<Result<jsonschema::Validator, ContractError>> = OnceLock::new();

    VALIDATOR
        .get_or_init(|| {
            let schema = parse_document(SCENARIO_SCHEMA_NAME, SCENARIO_SCHEMA)?;
            compile_schema(SCENARIO_SCHEMA_NAME, &schema)
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Check a raw document against the scenario schema.
pub fn validate_scenario(value: &Value) -> Result<(), ScenarioValidation> {
    let validator = scenario_validator().map_err(ScenarioValidation::Contract)?;
    collect_issues(validator, value).map_err(|e| ScenarioValidation::Invalid(e.issues))
}

/// Read, validate and decode a scenario file.
pub fn load_scenario_from_file(path: impl AsRef<Path>) -> Result<Scenario, ScenarioError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| ScenarioError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Scenario::from_value_with_origin(value, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "version": "v1",
            "id": "scenario-minimal",
            "mode": "guided",
            "buildCart": { "requiredToteCount": 1 },
            "pickTasks": [{
                "pickTaskId": "PT-1",
                "locationCode": "LOC-1",
                "itemBarcode": "ITEM-1",
                "expectedToteSlot": 1,
                "quantityRequired": 1
            }]
        })
    }

    #[test]
    fn test_minimal_scenario_decodes() {
        let scenario = Scenario::from_value(minimal()).unwrap();
        assert_eq!(scenario.build_cart.required_tote_count.get(), 1);
        assert_eq!(scenario.pick_tasks.len(), 1);
        assert_eq!(scenario.mode, ScenarioMode::Guided);
        assert_eq!(scenario.task(0).unwrap().pick_task_id, "PT-1");
        assert!(scenario.task(1).is_none());
    }

    #[test]
    fn test_extra_top_level_field_rejected() {
        let mut doc = minimal();
        doc["unexpectedTopLevelField"] = json!(true);
        assert!(matches!(
            validate_scenario(&doc),
            Err(ScenarioValidation::Invalid(_))
        ));
    }

    #[test]
    fn test_extra_pick_task_field_rejected() {
        let mut doc = minimal();
        doc["pickTasks"][0]["extraField"] = json!("not-allowed");
        assert!(validate_scenario(&doc).is_err());
    }

    #[test]
    fn test_zero_tote_count_rejected() {
        let mut doc = minimal();
        doc["buildCart"]["requiredToteCount"] = json!(0);
        let err = Scenario::from_value(doc).unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid { .. }));
    }

    #[test]
    fn test_missing_fields_reported() {
        let err = Scenario::from_value(json!({ "version": "v1" })).unwrap_err();
        match err {
            ScenarioError::Invalid { errors, .. } => assert!(!errors.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, minimal().to_string()).unwrap();
        let scenario = load_scenario_from_file(&path).unwrap();
        assert_eq!(scenario.id, "scenario-minimal");

        let missing = load_scenario_from_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ScenarioError::Read { .. }));
    }
}
