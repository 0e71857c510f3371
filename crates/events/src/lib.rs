#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event stream for the cmeval CMake evaluator
//!
//! The evaluator communicates exclusively through tagged events: target
//! declarations, property assignments, install rules, cache writes,
//! find-package results, and diagnostics. Consumers pattern-match on the
//! single [`EventData`] sum type; there is no trait-object event
//! hierarchy.
//!
//! ## Ordering and ownership
//!
//! - Events preserve the source order of the statements that produced
//!   them; sub-events of one statement appear in argument order.
//! - Diagnostics are interleaved with regular events in emission order.
//! - Every string stored in an event is owned by the event, so event data
//!   stays valid until the [`EventStream`] is dropped — the evaluator's
//!   per-statement temporaries never leak into the stream.

pub mod diag;
pub mod events;
pub mod origin;
pub mod report;
pub mod stream;

pub use diag::{DiagCode, DiagClass, DiagSeverity, Diagnostic};
pub use events::{
    CustomCommandKind, Event, EventData, InstallRuleKind, TargetKind, TargetPropOp, Visibility,
};
pub use origin::Origin;
pub use report::{OverallStatus, RunReport};
pub use stream::EventStream;
