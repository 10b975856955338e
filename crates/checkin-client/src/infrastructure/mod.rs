//! Infrastructure layer for the check-in client.
//!
//! # Sub-modules
//!
//! - **`network`** – The persistent TCP connection to the server: the
//!   `Connector`/`LineSink` transport traits, the TCP implementation, and a
//!   mock transport for tests.
//!
//! - **`storage`** – The station's TOML settings file.
//!
//! - **`ui_bridge`** – Application state shared by the front end, plus the
//!   commands the front end invokes (scan, connect/disconnect, submit,
//!   status).  It is the only module that sees both the use cases and the
//!   operator-facing messages.

pub mod network;
pub mod storage;
pub mod ui_bridge;
