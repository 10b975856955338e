//! Outbound wire message: one JSON object per line.
//!
//! # Wire format
//!
//! ```text
//! {"documento":"…","carne":"…","nombres":"…","apellidos":"…","grado":"…",
//!  "fecha_hora_lectura":"2024-03-01 06:59:00","dispositivo":"…",
//!  "docente_funcionario":"…","estado_ingreso":"A tiempo","observacion":"…"}\n
//! ```
//!
//! (shown wrapped; on the wire it is a single line)
//!
//! All ten keys are always present and always strings, in the order above.
//! JSON string escaping turns any newline typed into the observation field
//! into `\n`, so the encoded object can never break the line framing.  The
//! terminating newline itself is appended by the transport, not here.

use serde::Serialize;
use thiserror::Error;

use crate::domain::student::StudentRecord;
use crate::protocol::punctuality::{evaluate, EntryStatus};

/// Failure while encoding an [`OutboundMessage`].
#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Operator-entered metadata for one check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitDetails {
    /// Reading time in `yyyy-MM-dd HH:mm:ss`; usually stamped at scan time.
    pub reading_time: String,
    /// Name of the gate device (e.g. `"Porteria 1"`).
    pub device: String,
    /// Teacher or staff member registering the entry.
    pub operator: String,
    /// Whether the punctuality verdict is computed at all.
    pub punctuality_enabled: bool,
    /// Expected entry time, `HH:MM`.
    pub expected_time: String,
    pub observation: String,
}

impl Default for VisitDetails {
    fn default() -> Self {
        Self {
            reading_time: String::new(),
            device: String::new(),
            operator: String::new(),
            punctuality_enabled: true,
            expected_time: "07:00".to_string(),
            observation: String::new(),
        }
    }
}

/// The record as it travels to the server.
///
/// Field order here is the key order on the wire.  Fields are private: a
/// message is fixed once [`OutboundMessage::new`] has computed its verdict.
///
/// ```rust,compile_fail
/// use checkin_core::{EntryStatus, OutboundMessage, StudentRecord, VisitDetails};
///
/// let record = StudentRecord::builder()
///     .documento("1")
///     .carne("C")
///     .nombres("Ana")
///     .apellidos("Ruiz")
///     .grado("5to")
///     .build()
///     .unwrap();
/// let mut message = OutboundMessage::new(&record, &VisitDetails::default());
/// message.estado_ingreso = EntryStatus::OnTime;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    documento: String,
    carne: String,
    nombres: String,
    apellidos: String,
    grado: String,
    fecha_hora_lectura: String,
    dispositivo: String,
    docente_funcionario: String,
    estado_ingreso: EntryStatus,
    observacion: String,
}

impl OutboundMessage {
    /// Combines a validated record with the visit metadata.
    ///
    /// `estado_ingreso` is computed here, at send time, from the reading time
    /// and the punctuality settings.
    pub fn new(record: &StudentRecord, details: &VisitDetails) -> Self {
        Self {
            documento: record.documento().to_string(),
            carne: record.carne().to_string(),
            nombres: record.nombres().to_string(),
            apellidos: record.apellidos().to_string(),
            grado: record.grado().to_string(),
            fecha_hora_lectura: details.reading_time.clone(),
            dispositivo: details.device.clone(),
            docente_funcionario: details.operator.clone(),
            estado_ingreso: evaluate(
                &details.reading_time,
                details.punctuality_enabled,
                &details.expected_time,
            ),
            observacion: details.observation.clone(),
        }
    }

    pub fn documento(&self) -> &str {
        &self.documento
    }

    pub fn fecha_hora_lectura(&self) -> &str {
        &self.fecha_hora_lectura
    }

    pub fn dispositivo(&self) -> &str {
        &self.dispositivo
    }

    pub fn docente_funcionario(&self) -> &str {
        &self.docente_funcionario
    }

    /// The punctuality verdict computed at construction.
    pub fn estado_ingreso(&self) -> EntryStatus {
        self.estado_ingreso
    }

    pub fn observacion(&self) -> &str {
        &self.observacion
    }

    /// Encodes the message as one line of JSON, without the terminator.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::Encode`] if serialization fails.
    pub fn to_wire_line(&self) -> Result<String, OutboundError> {
        let line = serde_json::to_string(self)?;
        debug_assert!(!line.contains('\n'), "wire line must not contain a newline");
        Ok(line)
    }
}

/// Shorthand for `OutboundMessage::new(record, details).to_wire_line()`.
///
/// # Errors
///
/// Returns [`OutboundError::Encode`] if serialization fails.
pub fn serialize_visit(
    record: &StudentRecord,
    details: &VisitDetails,
) -> Result<String, OutboundError> {
    OutboundMessage::new(record, details).to_wire_line()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
