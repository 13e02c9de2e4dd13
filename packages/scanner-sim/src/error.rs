//! Error codes and structured error types.
//!
//! There are two tiers and they never mix:
//!
//! - [`ErrorCode`] values describe **procedural** mistakes made by a trainee.
//!   They are data: a machine records them as a `STEP_REJECTED` + `ERROR`
//!   event pair and the session carries on.
//! - [`ContractError`], [`EngineError`], [`ScenarioError`] and
//!   [`ConfigError`] are Rust errors. They mean the engine, its schema
//!   documents, or its inputs are broken, and they abort the call.
//!
//! # The Error Boundary Rule
//!
//! > **A trainee never sees an `EngineError`.**
//!
//! If an emitted event fails validation that is a defect in a machine, not a
//! wrong answer, so the router returns `Err` instead of recording it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::EventType;

// =============================================================================
// Error Codes
// =============================================================================

/// The closed set of procedural error codes.
///
/// Ordering follows `contracts/errors.json`, so a `BTreeMap<ErrorCode, _>`
/// iterates in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "ERR_SEQUENCE_TOTE_BEFORE_ITEM")]
    SequenceToteBeforeItem,
    #[serde(rename = "ERR_SEQUENCE_QTY_BEFORE_ITEM")]
    SequenceQtyBeforeItem,
    #[serde(rename = "ERR_SEQUENCE_QTY_MISSING")]
    SequenceQtyMissing,
    #[serde(rename = "ERR_SEQUENCE_CTRL_E_TOO_EARLY")]
    SequenceCtrlETooEarly,
    #[serde(rename = "ERR_SEQUENCE_CTRL_A_TOO_EARLY")]
    SequenceCtrlATooEarly,
    #[serde(rename = "ERR_SEQUENCE_SETUP_INCOMPLETE")]
    SequenceSetupIncomplete,
    #[serde(rename = "ERR_WRONG_ITEM_SCANNED")]
    WrongItemScanned,
    #[serde(rename = "ERR_ITEM_NOT_RECOGNIZED")]
    ItemNotRecognized,
    #[serde(rename = "ERR_WRONG_TOTE_SCANNED")]
    WrongToteScanned,
    #[serde(rename = "ERR_TOTE_DUPLICATE_IN_SETUP")]
    ToteDuplicateInSetup,
    #[serde(rename = "ERR_TOTE_SLOT_MISMATCH")]
    ToteSlotMismatch,
    #[serde(rename = "ERR_TOTE_ALREADY_ALLOCATED")]
    ToteAlreadyAllocated,
    #[serde(rename = "ERR_CART_ALREADY_CREATED")]
    CartAlreadyCreated,
    #[serde(rename = "ERR_SHORT_INVENTORY")]
    ShortInventory,
    #[serde(rename = "ERR_DAMAGED_ITEM")]
    DamagedItem,
    #[serde(rename = "ERR_INVALID_ITEM")]
    InvalidItem,
}

/// Coarse grouping of error codes for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Steps performed out of order.
    Sequence,
    /// Wrong or unknown item.
    Item,
    /// Wrong, duplicated or misplaced tote.
    Tote,
    /// Cart already exists.
    Cart,
    /// Stock problems found at the location.
    Inventory,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Sequence => write!(f, "sequence"),
            ErrorCategory::Item => write!(f, "item"),
            ErrorCategory::Tote => write!(f, "tote"),
            ErrorCategory::Cart => write!(f, "cart"),
            ErrorCategory::Inventory => write!(f, "inventory"),
        }
    }
}

impl ErrorCode {
    /// Every error code, in canonical order.
    pub const ALL: [ErrorCode; 16] = [
        ErrorCode::SequenceToteBeforeItem,
        ErrorCode::SequenceQtyBeforeItem,
        ErrorCode::SequenceQtyMissing,
        ErrorCode::SequenceCtrlETooEarly,
        ErrorCode::SequenceCtrlATooEarly,
        ErrorCode::SequenceSetupIncomplete,
        ErrorCode::WrongItemScanned,
        ErrorCode::ItemNotRecognized,
        ErrorCode::WrongToteScanned,
        ErrorCode::ToteDuplicateInSetup,
        ErrorCode::ToteSlotMismatch,
        ErrorCode::ToteAlreadyAllocated,
        ErrorCode::CartAlreadyCreated,
        ErrorCode::ShortInventory,
        ErrorCode::DamagedItem,
        ErrorCode::InvalidItem,
    ];

    /// The six ordering mistakes that count as critical sequence violations.
    pub const CRITICAL_SEQUENCE: [ErrorCode; 6] = [
        ErrorCode::SequenceToteBeforeItem,
        ErrorCode::SequenceQtyBeforeItem,
        ErrorCode::SequenceQtyMissing,
        ErrorCode::SequenceCtrlETooEarly,
        ErrorCode::SequenceCtrlATooEarly,
        ErrorCode::SequenceSetupIncomplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SequenceToteBeforeItem => "ERR_SEQUENCE_TOTE_BEFORE_ITEM",
            ErrorCode::SequenceQtyBeforeItem => "ERR_SEQUENCE_QTY_BEFORE_ITEM",
            ErrorCode::SequenceQtyMissing => "ERR_SEQUENCE_QTY_MISSING",
            ErrorCode::SequenceCtrlETooEarly => "ERR_SEQUENCE_CTRL_E_TOO_EARLY",
            ErrorCode::SequenceCtrlATooEarly => "ERR_SEQUENCE_CTRL_A_TOO_EARLY",
            ErrorCode::SequenceSetupIncomplete => "ERR_SEQUENCE_SETUP_INCOMPLETE",
            ErrorCode::WrongItemScanned => "ERR_WRONG_ITEM_SCANNED",
            ErrorCode::ItemNotRecognized => "ERR_ITEM_NOT_RECOGNIZED",
            ErrorCode::WrongToteScanned => "ERR_WRONG_TOTE_SCANNED",
            ErrorCode::ToteDuplicateInSetup => "ERR_TOTE_DUPLICATE_IN_SETUP",
            ErrorCode::ToteSlotMismatch => "ERR_TOTE_SLOT_MISMATCH",
            ErrorCode::ToteAlreadyAllocated => "ERR_TOTE_ALREADY_ALLOCATED",
            ErrorCode::CartAlreadyCreated => "ERR_CART_ALREADY_CREATED",
            ErrorCode::ShortInventory => "ERR_SHORT_INVENTORY",
            ErrorCode::DamagedItem => "ERR_DAMAGED_ITEM",
            ErrorCode::InvalidItem => "ERR_INVALID_ITEM",
        }
    }

    pub fn is_critical_sequence(&self) -> bool {
        Self::CRITICAL_SEQUENCE.contains(self)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::SequenceToteBeforeItem
            | ErrorCode::SequenceQtyBeforeItem
            | ErrorCode::SequenceQtyMissing
            | ErrorCode::SequenceCtrlETooEarly
            | ErrorCode::SequenceCtrlATooEarly
            | ErrorCode::SequenceSetupIncomplete => ErrorCategory::Sequence,
            ErrorCode::WrongItemScanned
            | ErrorCode::ItemNotRecognized
            | ErrorCode::DamagedItem
            | ErrorCode::InvalidItem => ErrorCategory::Item,
            ErrorCode::WrongToteScanned
            | ErrorCode::ToteDuplicateInSetup
            | ErrorCode::ToteSlotMismatch
            | ErrorCode::ToteAlreadyAllocated => ErrorCategory::Tote,
            ErrorCode::CartAlreadyCreated => ErrorCategory::Cart,
            ErrorCode::ShortInventory => ErrorCategory::Inventory,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownIdentifier {
                kind: "error code",
                value: s.to_string(),
            })
    }
}

/// Returned when a string is not one of the canonical identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownIdentifier {
    pub kind: &'static str,
    pub value: String,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Structured schema-validation failure for a single JSON document.
///
/// Each issue is a human-readable message produced by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .issues.join("; "))]
pub struct ValidationErrors {
    pub issues: Vec<String>,
}

impl ValidationErrors {
    pub fn new(issues: Vec<String>) -> Self {
        Self { issues }
    }
}

// =============================================================================
// Contract Errors
// =============================================================================

/// The canonical enumerations disagree with their backing documents, or a
/// document cannot be used at all.
///
/// Always a deployment-configuration defect. `Clone` so the process-wide
/// contract can hand the same failure to every caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("schema document {document} is unusable: {reason}")]
    SchemaDocument {
        document: &'static str,
        reason: String,
    },

    #[error(
        "event types diverged from {document}: expected {expected}, found {found}, \
         missing {missing:?}, unexpected {unexpected:?}"
    )]
    EventTypesDiverged {
        document: &'static str,
        expected: usize,
        found: usize,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error(
        "error codes diverged from {document}: expected {expected}, found {found}, \
         missing {missing:?}, unexpected {unexpected:?}"
    )]
    ErrorCodesDiverged {
        document: &'static str,
        expected: usize,
        found: usize,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Fatal failures raised by the session router.
///
/// None of these are recoverable; the session passed in is consumed and the
/// caller must treat the run as aborted.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller submitted an action that does not satisfy the event schema.
    #[error("action {event_id} ({event_type}) failed validation: {errors}")]
    InvalidAction {
        event_id: String,
        event_type: EventType,
        errors: ValidationErrors,
    },

    /// A machine produced an event that does not satisfy the event schema.
    #[error("emitted event {event_id} ({event_type}) failed validation: {errors}")]
    InvalidEmittedEvent {
        event_id: String,
        event_type: EventType,
        errors: ValidationErrors,
    },

    #[error(transparent)]
    Contract(#[from] ContractError),
}

// =============================================================================
// Scenario Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scenario file {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Scenario validation failed for {origin}: {}", .errors.join(" | "))]
    Invalid { origin: String, errors: Vec<String> },

    #[error("scenario could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

// =============================================================================
// Config Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    Malformed {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{var} is out of range: {reason}")]
    OutOfRange { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_names_match_serde() {
        for code in ErrorCode::ALL {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, serde_json::Value::String(code.as_str().to_string()));
            assert_eq!(code.as_str().parse::<ErrorCode>().unwrap(), code);
        }
    }

    #[test]
    fn test_critical_sequence_set() {
        let critical: Vec<_> = ErrorCode::ALL
            .iter()
            .filter(|c| c.is_critical_sequence())
            .collect();
        assert_eq!(critical.len(), 6);
        assert!(critical
            .iter()
            .all(|c| c.category() == ErrorCategory::Sequence));
        assert!(!ErrorCode::ToteDuplicateInSetup.is_critical_sequence());
    }

    #[test]
    fn test_canonical_order_is_sort_order() {
        let mut sorted = ErrorCode::ALL;
        sorted.sort();
        assert_eq!(sorted, ErrorCode::ALL);
    }

    #[test]
    fn test_scenario_invalid_message() {
        let err = ScenarioError::Invalid {
            origin: "inline".into(),
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Scenario validation failed for inline: a | b");
    }
}
