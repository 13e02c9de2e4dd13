//! Event contract: canonical enumerations cross-checked against the schema
//! documents, plus the structural validator every event passes through.
//!
//! The documents live in `contracts/` and are embedded at compile time. The
//! process-wide contract is built once on first use; if the documents and the
//! Rust enumerations disagree, every caller gets the same [`ContractError`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use serde_json::Value;
use tracing::{error, info};

use crate::core::{Event, EventType};
use crate::error::{ContractError, ErrorCode, ValidationErrors};

pub(crate) const EVENTS_SCHEMA_NAME: &str = "events.schema.json";
pub(crate) const ERRORS_DOCUMENT_NAME: &str = "errors.json";

const EVENTS_SCHEMA: &str = include_str!("../contracts/events.schema.json");
const ERRORS_DOCUMENT: &str = include_str!("../contracts/errors.json");

/// Validated event contract.
pub struct EventContract {
    validator: jsonschema::Validator,
}

impl fmt::Debug for EventContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContract")
            .field("event_types", &EventType::ALL.len())
            .field("error_codes", &ErrorCode::ALL.len())
            .finish()
    }
}

impl EventContract {
    /// Build a contract from raw schema documents.
    ///
    /// # Errors
    ///
    /// - [`ContractError::SchemaDocument`] if a document is not JSON, lacks the
    ///   expected list, or is not a usable JSON Schema
    /// - [`ContractError::EventTypesDiverged`] / [`ContractError::ErrorCodesDiverged`]
    ///   if the lists differ from [`EventType::ALL`] / [`ErrorCode::ALL`] in
    ///   length or membership
    pub fn from_documents(
        events_schema: &str,
        errors_document: &str,
    ) -> Result<Self, ContractError> {
        let schema = parse_document(EVENTS_SCHEMA_NAME, events_schema)?;
        let errors = parse_document(ERRORS_DOCUMENT_NAME, errors_document)?;

        let declared_types = string_list(EVENTS_SCHEMA_NAME, &schema, "/properties/type/enum")?;
        let canonical_types: Vec<&str> = EventType::ALL.iter().map(EventType::as_str).collect();
        if let Some((missing, unexpected)) = diverges(&canonical_types, &declared_types) {
            return Err(ContractError::EventTypesDiverged {
                document: EVENTS_SCHEMA_NAME,
                expected: canonical_types.len(),
                found: declared_types.len(),
                missing,
                unexpected,
            });
        }

        let declared_codes = string_list(ERRORS_DOCUMENT_NAME, &errors, "/errorCodes")?;
        let canonical_codes: Vec<&str> = ErrorCode::ALL.iter().map(ErrorCode::as_str).collect();
        if let Some((missing, unexpected)) = diverges(&canonical_codes, &declared_codes) {
            return Err(ContractError::ErrorCodesDiverged {
                document: ERRORS_DOCUMENT_NAME,
                expected: canonical_codes.len(),
                found: declared_codes.len(),
                missing,
                unexpected,
            });
        }

        let validator = compile_schema(EVENTS_SCHEMA_NAME, &schema)?;
        Ok(Self { validator })
    }

    /// The process-wide contract built from the embedded documents.
    pub fn shared() -> Result<&'static EventContract, ContractError> {
        static CONTRACT: OnceLock<Result<EventContract, ContractError>> = OnceLock::new();

        CONTRACT
            .get_or_init(|| {
                let contract = EventContract::from_documents(EVENTS_SCHEMA, ERRORS_DOCUMENT);
                match &contract {
                    Ok(_) => info!(
                        event_types = EventType::ALL.len(),
                        error_codes = ErrorCode::ALL.len(),
                        "event contract initialized"
                    ),
                    Err(e) => error!(error = %e, "event contract rejected its schema documents"),
                }
                contract
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Validate an arbitrary JSON value against the event schema.
    pub fn validate_value(&self, value: &Value) -> Result<(), ValidationErrors> {
        collect_issues(&self.validator, value)
    }

    /// Validate a typed event by its wire representation.
    pub fn validate_event(&self, event: &Event) -> Result<(), ValidationErrors> {
        let value = serde_json::to_value(event)
            .map_err(|e| ValidationErrors::new(vec![format!("root {e}")]))?;
        self.validate_value(&value)
    }

    /// Validate a batch of emitted events, reporting every failure with its
    /// index in the batch.
    pub fn validate_batch(&self, events: &[Event]) -> Result<(), Vec<(usize, ValidationErrors)>> {
        let failures: Vec<_> = events
            .iter()
            .enumerate()
            .filter_map(|(i, event)| self.validate_event(event).err().map(|e| (i, e)))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

pub(crate) fn parse_document(document: &'static str, raw: &str) -> Result<Value, ContractError> {
    serde_json::from_str(raw).map_err(|e| ContractError::SchemaDocument {
        document,
        reason: e.to_string(),
    })
}

pub(crate) fn compile_schema(
    document: &'static str,
    schema: &Value,
) -> Result<jsonschema::Validator, ContractError> {
    jsonschema::options()
        .should_validate_formats(true)
        .build(schema)
        .map_err(|e| ContractError::SchemaDocument {
            document,
            reason: e.to_string(),
        })
}

/// Run the validator and render each failure as `<instance path> <message>`.
pub(crate) fn collect_issues(
    validator: &jsonschema::Validator,
    value: &Value,
) -> Result<(), ValidationErrors> {
    let issues: Vec<String> = validator
        .iter_errors(value)
        .map(|error| {
            let path = error.instance_path.to_string();
            let at = if path.is_empty() { "root".to_string() } else { path };
            format!("{at} {error}")
        })
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors::new(issues))
    }
}

fn string_list(
    document: &'static str,
    value: &Value,
    pointer: &str,
) -> Result<Vec<String>, ContractError> {
    let items = value
        .pointer(pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| ContractError::SchemaDocument {
            document,
            reason: format!("missing array at {pointer}"),
        })?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ContractError::SchemaDocument {
                    document,
                    reason: format!("non-string entry at {pointer}: {item}"),
                })
        })
        .collect()
}

/// Compare a canonical list against a declared one. Returns `(missing,
/// unexpected)` when they differ in length or membership.
fn diverges(canonical: &[&str], declared: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    let canonical_set: BTreeSet<&str> = canonical.iter().copied().collect();
    let declared_set: BTreeSet<&str> = declared.iter().map(String::as_str).collect();

    if canonical.len() == declared.len() && canonical_set == declared_set {
        return None;
    }

    let missing = canonical_set
        .difference(&declared_set)
        .map(|s| s.to_string())
        .collect();
    let unexpected = declared_set
        .difference(&canonical_set)
        .map(|s| s.to_string())
        .collect();
    Some((missing, unexpected))
}
