//! Protocol module: the text formats the client reads and writes.

pub mod outbound;
pub mod payload;
pub mod punctuality;

pub use outbound::{serialize_visit, OutboundError, OutboundMessage, VisitDetails};
pub use payload::{parse_payload, PayloadError};
pub use punctuality::{evaluate, reading_timestamp_now, EntryStatus, READING_TIME_FORMAT};
