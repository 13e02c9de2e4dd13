//! Core event types for the scanner simulator.
//!
//! # Overview
//!
//! Every trainee input and every engine reaction is an [`Event`]:
//! - **Actions** are inbound events submitted by the caller (`RF_LOGIN`,
//!   `SCAN_ITEM`, ...)
//! - **Synthetic** events are echoes produced by a machine in response to an
//!   action (`STEP_ACCEPTED`, `STEP_REJECTED`, `ERROR`)
//! - **Exception** events are produced by the exceptions overlay
//!
//! Events are immutable once constructed. Fields are private and the payload
//! is only reachable through a shared reference.
//!
//! # Correlation
//!
//! Actions can carry optional [`Correlation`] ids (cart session, cart, round,
//! pick task). Synthetic events do not inherit them; they share the action's
//! timestamp, trainee and session only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorCode, UnknownIdentifier};

// =============================================================================
// Event Type
// =============================================================================

/// The closed set of event types.
///
/// The order of [`EventType::ALL`] matches the `type` enum of
/// `contracts/events.schema.json`; the two are cross-checked when the
/// [`EventContract`](crate::contract::EventContract) is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RfLogin,
    RfMenuSelect,
    RfKeyCtrlT,
    RfTaskGroupSet,
    RfZoneSelected,
    ScanCartLabel,
    ScanToteAssign,
    RfKeyCtrlE,
    PickAssign,
    ArriveLocation,
    ScanItem,
    EnterQuantity,
    ScanToteVerify,
    RfEndOfToteShown,
    RfKeyCtrlA,
    TotePlacedOnConveyor,
    RfKeyCtrlW,
    RfKeyCtrlK,
    ExceptionToteAllocated,
    ExceptionCartAlreadyCreated,
    ExceptionIncorrectLocation,
    ExceptionIncorrectTote,
    ExceptionInvalidItemLast,
    ExceptionInvalidItemNotLast,
    ExceptionShortInventory,
    ExceptionDamagedItem,
    StepAccepted,
    StepRejected,
    Error,
}

/// Where an event type comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRole {
    /// Submitted by the trainee (or the terminal on their behalf).
    Input,
    /// Emitted by a machine as an echo of an action.
    Synthetic,
    /// Raised by the exceptions overlay.
    Exception,
}

impl EventType {
    /// Every event type, in canonical order.
    pub const ALL: [EventType; 29] = [
        EventType::RfLogin,
        EventType::RfMenuSelect,
        EventType::RfKeyCtrlT,
        EventType::RfTaskGroupSet,
        EventType::RfZoneSelected,
        EventType::ScanCartLabel,
        EventType::ScanToteAssign,
        EventType::RfKeyCtrlE,
        EventType::PickAssign,
        EventType::ArriveLocation,
        EventType::ScanItem,
        EventType::EnterQuantity,
        EventType::ScanToteVerify,
        EventType::RfEndOfToteShown,
        EventType::RfKeyCtrlA,
        EventType::TotePlacedOnConveyor,
        EventType::RfKeyCtrlW,
        EventType::RfKeyCtrlK,
        EventType::ExceptionToteAllocated,
        EventType::ExceptionCartAlreadyCreated,
        EventType::ExceptionIncorrectLocation,
        EventType::ExceptionIncorrectTote,
        EventType::ExceptionInvalidItemLast,
        EventType::ExceptionInvalidItemNotLast,
        EventType::ExceptionShortInventory,
        EventType::ExceptionDamagedItem,
        EventType::StepAccepted,
        EventType::StepRejected,
        EventType::Error,
    ];

    /// Canonical wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RfLogin => "RF_LOGIN",
            EventType::RfMenuSelect => "RF_MENU_SELECT",
            EventType::RfKeyCtrlT => "RF_KEY_CTRL_T",
            EventType::RfTaskGroupSet => "RF_TASK_GROUP_SET",
            EventType::RfZoneSelected => "RF_ZONE_SELECTED",
            EventType::ScanCartLabel => "SCAN_CART_LABEL",
            EventType::ScanToteAssign => "SCAN_TOTE_ASSIGN",
            EventType::RfKeyCtrlE => "RF_KEY_CTRL_E",
            EventType::PickAssign => "PICK_ASSIGN",
            EventType::ArriveLocation => "ARRIVE_LOCATION",
            EventType::ScanItem => "SCAN_ITEM",
            EventType::EnterQuantity => "ENTER_QUANTITY",
            EventType::ScanToteVerify => "SCAN_TOTE_VERIFY",
            EventType::RfEndOfToteShown => "RF_END_OF_TOTE_SHOWN",
            EventType::RfKeyCtrlA => "RF_KEY_CTRL_A",
            EventType::TotePlacedOnConveyor => "TOTE_PLACED_ON_CONVEYOR",
            EventType::RfKeyCtrlW => "RF_KEY_CTRL_W",
            EventType::RfKeyCtrlK => "RF_KEY_CTRL_K",
            EventType::ExceptionToteAllocated => "EXCEPTION_TOTE_ALLOCATED",
            EventType::ExceptionCartAlreadyCreated => "EXCEPTION_CART_ALREADY_CREATED",
            EventType::ExceptionIncorrectLocation => "EXCEPTION_INCORRECT_LOCATION",
            EventType::ExceptionIncorrectTote => "EXCEPTION_INCORRECT_TOTE",
            EventType::ExceptionInvalidItemLast => "EXCEPTION_INVALID_ITEM_LAST",
            EventType::ExceptionInvalidItemNotLast => "EXCEPTION_INVALID_ITEM_NOT_LAST",
            EventType::ExceptionShortInventory => "EXCEPTION_SHORT_INVENTORY",
            EventType::ExceptionDamagedItem => "EXCEPTION_DAMAGED_ITEM",
            EventType::StepAccepted => "STEP_ACCEPTED",
            EventType::StepRejected => "STEP_REJECTED",
            EventType::Error => "ERROR",
        }
    }

    pub fn role(&self) -> EventRole {
        match self {
            EventType::StepAccepted | EventType::StepRejected | EventType::Error => {
                EventRole::Synthetic
            }
            EventType::ExceptionToteAllocated
            | EventType::ExceptionCartAlreadyCreated
            | EventType::ExceptionIncorrectLocation
            | EventType::ExceptionIncorrectTote
            | EventType::ExceptionInvalidItemLast
            | EventType::ExceptionInvalidItemNotLast
            | EventType::ExceptionShortInventory
            | EventType::ExceptionDamagedItem => EventRole::Exception,
            _ => EventRole::Input,
        }
    }

    /// The three action types that count toward pick accuracy.
    pub fn is_pick_action(&self) -> bool {
        matches!(
            self,
            EventType::ScanItem | EventType::EnterQuantity | EventType::ScanToteVerify
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownIdentifier {
                kind: "event type",
                value: s.to_string(),
            })
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Free-form event payload.
///
/// Backed by a sorted map so serialization is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl IntoIterator for Payload {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        Value::Object(payload.0)
    }
}

// =============================================================================
// Identity & Correlation
// =============================================================================

/// Trainee and session identity shared by every event of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIds {
    pub trainee_id: String,
    pub session_id: String,
}

impl SessionIds {
    pub fn new(trainee_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            trainee_id: trainee_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// Optional correlation ids carried by actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_task_id: Option<String>,
}

// =============================================================================
// Event
// =============================================================================

/// An immutable event record.
///
/// Serializes to the wire shape validated by `contracts/events.schema.json`:
///
/// ```text
/// { eventId, timestamp, type, traineeId, sessionId, payload,
///   cartSessionId?, cartId?, roundNumber?, pickTaskId? }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    event_id: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    event_type: EventType,
    trainee_id: String,
    session_id: String,
    payload: Payload,
    #[serde(flatten)]
    correlation: Correlation,
}

impl Event {
    pub fn new(
        event_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        event_type: EventType,
        ids: &SessionIds,
        payload: Payload,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            timestamp,
            event_type,
            trainee_id: ids.trainee_id.clone(),
            session_id: ids.session_id.clone(),
            payload,
            correlation: Correlation::default(),
        }
    }

    /// Attach correlation ids. Consumes the event so the result is still
    /// constructed exactly once.
    pub fn with_correlation(mut self, correlation: Correlation) -> Self {
        self.correlation = correlation;
        self
    }

    /// Build a synthetic event that answers this one.
    ///
    /// The id is `<action id>:<suffix>`; timestamp, trainee and session are
    /// copied; correlation ids are not.
    pub(crate) fn derive(&self, suffix: &str, event_type: EventType, payload: Payload) -> Event {
        Event {
            event_id: format!("{}:{}", self.event_id, suffix),
            timestamp: self.timestamp,
            event_type,
            trainee_id: self.trainee_id.clone(),
            session_id: self.session_id.clone(),
            payload,
            correlation: Correlation::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.event_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn trainee_id(&self) -> &str {
        &self.trainee_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    pub fn is(&self, event_type: EventType) -> bool {
        self.event_type == event_type
    }

    /// `acceptedType` of a `STEP_ACCEPTED` echo.
    pub fn accepted_type(&self) -> Option<EventType> {
        if self.event_type != EventType::StepAccepted {
            return None;
        }
        self.payload.get_str("acceptedType")?.parse().ok()
    }

    /// `rejectedType` of a `STEP_REJECTED` echo.
    pub fn rejected_type(&self) -> Option<EventType> {
        if self.event_type != EventType::StepRejected {
            return None;
        }
        self.payload.get_str("rejectedType")?.parse().ok()
    }

    /// `errorCode` of a `STEP_REJECTED` or `ERROR` event.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self.event_type {
            EventType::StepRejected | EventType::Error => {
                self.payload.get_str("errorCode")?.parse().ok()
            }
            _ => None,
        }
    }
}

// =============================================================================
// Event Log
// =============================================================================

/// Append-only, ordered record of everything that happened in a session.
///
/// There is no API to remove, reorder or edit entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog(Vec<Event>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.0.extend(events);
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Event> {
        self.0.last()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
