//! checkin-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does checkin-client do? (for beginners)
//!
//! A check-in *station* sits at a school gate.  Staff scan each student's
//! QR card; the station turns the scan into a validated student record,
//! stamps it with the time, works out whether the student is on time, and
//! sends it to the school's server as one line of JSON.
//!
//! The station application:
//!
//! 1. Parses the raw scan text (JSON or `key: value` text) with
//!    `checkin_core::parse_payload`.
//! 2. Keeps the record in an editable form so staff can fix or complete it.
//! 3. Keeps one TCP connection to the server open, reconnecting on a fixed
//!    tick whenever it drops, for as long as staff want to stay connected.
//! 4. On submit, serializes the record plus station metadata and writes it
//!    to the connection.  Nothing is queued: if the write fails the operator
//!    is told and submits again once the connection is back.

/// Application layer: the reconnection driver and the submit use case.
pub mod application;

/// Infrastructure layer: network transport, settings file, and UI bridge.
pub mod infrastructure;
