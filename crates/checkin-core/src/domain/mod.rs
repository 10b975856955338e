//! Domain layer: pure value types with no I/O.
//!
//! - **`student`** – The canonical [`student::StudentRecord`], the validating
//!   [`student::RecordBuilder`] every input path goes through, and the key
//!   normalisation shared by all payload formats.
//! - **`connection`** – Operator-supplied server address, revalidated on
//!   every connect attempt.

pub mod connection;
pub mod student;
