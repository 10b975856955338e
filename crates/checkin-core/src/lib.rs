//! # checkin-core
//!
//! Shared library for the student check-in client containing the scan
//! payload parser, the canonical student record, the punctuality rules, and
//! the outbound wire format.
//!
//! It has zero dependencies on OS APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! A gate operator scans the QR code printed on a student card.  The scanner
//! hands us whatever text was encoded in the code, which in practice comes in
//! two shapes: a JSON object, or a loose `key: value` list separated by
//! newlines, `;`, or `|`.  This crate turns that text into a validated
//! [`StudentRecord`], works out whether the student arrived on time, and
//! produces the single JSON line the client pushes to the school's server.
//!
//! ```text
//! raw scan text ──> parse_payload ──> StudentRecord
//!                                          │
//!                   VisitDetails ──────────┤
//!                                          v
//!                               OutboundMessage (+ evaluate)
//!                                          │
//!                                          v
//!                                  one JSON wire line
//! ```
//!
//! - **`domain`** – The student record, its validating builder, key
//!   normalisation, and the server address settings.
//!
//! - **`protocol`** – Everything that touches text formats: the payload
//!   parser, the punctuality evaluator, and the outbound serializer.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `checkin_core::StudentRecord` instead of `checkin_core::domain::student::StudentRecord`.
pub use domain::connection::{ConfigError, ConnectionConfig};
pub use domain::student::{normalize_key, RecordBuilder, RecordError, StudentRecord};
pub use protocol::outbound::{serialize_visit, OutboundError, OutboundMessage, VisitDetails};
pub use protocol::payload::{parse_payload, PayloadError};
pub use protocol::punctuality::{evaluate, reading_timestamp_now, EntryStatus};
