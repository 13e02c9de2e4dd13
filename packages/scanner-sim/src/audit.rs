//! Audit history for the exceptions overlay.
//!
//! The overlay keeps its own record of every action it saw and every exception
//! it raised, separate from the session's [`EventLog`](crate::core::EventLog).
//!
//! # Usage
//!
//! ```ignore
//! let trail = overlay_state.history();
//! for entry in trail.exceptions() {
//!     tracing::info!(event_id = %entry.event.id(), "exception raised");
//! }
//! ```

use serde::Serialize;

use crate::core::{Event, EventRole};

/// Why an entry was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryOrigin {
    /// An action handed to the overlay.
    Action,
    /// An exception event the overlay raised itself.
    Exception,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub origin: EntryOrigin,
    pub event: Event,
}

impl AuditEntry {
    pub fn is_exception(&self) -> bool {
        self.origin == EntryOrigin::Exception
    }
}

/// Append-only audit trail. Cloned along with the overlay state so every
/// state value owns its full history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. Exception-role events are tagged as exceptions.
    pub fn record(&mut self, event: Event) {
        let origin = match event.event_type().role() {
            EventRole::Exception => EntryOrigin::Exception,
            EventRole::Input | EventRole::Synthetic => EntryOrigin::Action,
        };
        self.entries.push(AuditEntry { origin, event });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// The most recent `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<&AuditEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn exceptions(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(|e| e.is_exception())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> AuditStats {
        let exceptions = self.exceptions().count();
        AuditStats {
            total_entries: self.entries.len(),
            actions: self.entries.len() - exceptions,
            exceptions,
        }
    }
}

/// Summary statistics from the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditStats {
    pub total_entries: usize,
    pub actions: usize,
    pub exceptions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventType;
    use crate::testing::ActionFactory;

    #[test]
    fn test_record_and_stats() {
        let mut f = ActionFactory::new();
        let mut trail = AuditTrail::new();
        assert!(trail.is_empty());

        trail.record(f.ctrl_k());
        trail.record(f.any(EventType::ExceptionShortInventory));
        trail.record(f.ctrl_w());

        assert_eq!(trail.len(), 3);
        assert_eq!(
            trail.stats(),
            AuditStats {
                total_entries: 3,
                actions: 2,
                exceptions: 1
            }
        );

        let recent = trail.recent(2);
        assert_eq!(recent[0].event.event_type(), EventType::RfKeyCtrlW);
        assert!(recent[1].is_exception());
    }
}
