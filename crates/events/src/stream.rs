//! Append-only event stream

use serde::{Deserialize, Serialize};

use crate::diag::{DiagSeverity, Diagnostic};
use crate::events::{Event, EventData};
use crate::origin::Origin;

/// The ordered sequence of events produced by one evaluation run.
///
/// Strings inside events are owned copies, so the stream stays valid for
/// as long as the consumer needs it regardless of evaluator internals.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventStream {
    events: Vec<Event>,
}

impl EventStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, origin: Origin, data: EventData) {
        self.events.push(Event::new(origin, data));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Hand the events to the consumer, leaving the stream empty.
    #[must_use]
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Count events whose serialized tag equals `tag`.
    #[must_use]
    pub fn count_tag(&self, tag: &str) -> usize {
        self.events.iter().filter(|e| e.tag() == tag).count()
    }

    /// All diagnostics in emission order.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&Origin, &Diagnostic)> {
        self.events.iter().filter_map(|e| match &e.data {
            EventData::Diagnostic(d) => Some((&e.origin, d)),
            _ => None,
        })
    }

    /// Diagnostics of one severity whose cause contains `needle`.
    #[must_use]
    pub fn has_diag_cause_containing(&self, severity: DiagSeverity, needle: &str) -> bool {
        self.diagnostics()
            .any(|(_, d)| d.severity == severity && d.cause.contains(needle))
    }
}

impl<'a> IntoIterator for &'a EventStream {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{DiagClass, DiagCode};

    fn origin() -> Origin {
        Origin::new("CMakeLists.txt", 1, "project")
    }

    #[test]
    fn push_preserves_order() {
        let mut stream = EventStream::new();
        stream.push(
            origin(),
            EventData::ProjectDeclare {
                name: "p".into(),
                version: String::new(),
                description: String::new(),
                languages: String::new(),
            },
        );
        stream.push(
            origin(),
            EventData::TargetDeclare {
                name: "app".into(),
                kind: crate::events::TargetKind::Executable,
            },
        );
        let tags: Vec<_> = stream.iter().map(Event::tag).collect();
        assert_eq!(tags, vec!["project_declare", "target_declare"]);
    }

    #[test]
    fn diagnostics_filter() {
        let mut stream = EventStream::new();
        stream.push(
            origin(),
            EventData::Diagnostic(Diagnostic::new(
                DiagSeverity::Error,
                "file",
                "file",
                "Security Violation: path escapes project roots",
                "",
                DiagClass::IoEnvError,
                DiagCode::SecurityViolation,
            )),
        );
        assert!(stream.has_diag_cause_containing(DiagSeverity::Error, "Security Violation"));
        assert!(!stream.has_diag_cause_containing(DiagSeverity::Warning, "Security Violation"));
        assert_eq!(stream.count_tag("diagnostic"), 1);
    }
}
