//! Application layer use cases for the check-in client.
//!
//! # What use cases does the client have?
//!
//! - **`maintain_connection`** – The reconnection driver.  On a fixed tick it
//!   compares the operator's "stay connected" wish and typed host/port with
//!   the real connection, and connects, closes, or does nothing.
//!
//! - **`submit_visit`** – Serializes a validated student record plus the
//!   station's visit metadata into one JSON line and sends it.
//!
//! Both work against the generic `PersistentConnection<C>`, so tests run
//! them over the in-memory mock transport.

pub mod maintain_connection;
pub mod submit_visit;
