//! Storage infrastructure: the station's settings file.
//!
//! The client keeps no data between runs except its settings.  Scanned
//! records live only in memory and leave the machine through the server
//! connection.

pub mod config;
