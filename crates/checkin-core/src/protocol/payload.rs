//! Tolerant parser for scanned QR payloads.
//!
//! Student cards in circulation encode the same five fields in two ways:
//!
//! ```text
//! {"documento":"1020","carne":"C-7","nombres":"Ana","apellidos":"Ruiz","grado":"5to"}
//!
//! Documento: 1020
//! Carné: C-7
//! Nombres: Ana | Apellidos = Ruiz ; Grado: 5to
//! ```
//!
//! [`parse_payload`] tries the JSON shape first and falls back to key/value
//! text only when the input is not a JSON object.  Both shapes end in the same
//! [`RecordBuilder`], so validation is identical whichever format was scanned.
//!
//! # Key/value rules
//!
//! - Entries are separated by any of `\n`, `;`, `|`.
//! - Within an entry the first `:` separates key from value; if there is no
//!   `:`, the first `=` does.  Entries with neither are skipped.
//! - Keys go through [`normalize_key`]; values are trimmed.
//! - A later entry for the same key replaces an earlier one.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::student::{
    normalize_key, RecordBuilder, RecordError, StudentRecord, CANONICAL_FIELDS, CARNET,
    IDENTIFICACION,
};

/// Why a scan could not be turned into a [`StudentRecord`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The scanner returned nothing, or only whitespace.
    #[error("scan returned no content")]
    Blank,

    /// Not a JSON object, and no `key:value` / `key=value` entry was found.
    #[error("payload is neither a JSON object nor key/value text")]
    Unrecognized,

    /// The payload was readable but a required field is missing or blank.
    #[error("incomplete student data: {0}")]
    Invalid(#[from] RecordError),
}

/// Parses raw scanner text into a validated [`StudentRecord`].
///
/// # Errors
///
/// See [`PayloadError`].
///
/// # Examples
///
/// ```rust
/// use checkin_core::parse_payload;
///
/// let from_json = parse_payload(
///     r#"{"documento":"1","carne":"A","nombres":"Ana","apellidos":"Ruiz","grado":"5to"}"#,
/// ).unwrap();
/// let from_text = parse_payload("documento:1;carné=A|nombres: Ana\napellidos:Ruiz;grado:5to").unwrap();
/// assert_eq!(from_json, from_text);
/// ```
pub fn parse_payload(raw: &str) -> Result<StudentRecord, PayloadError> {
    if raw.trim().is_empty() {
        return Err(PayloadError::Blank);
    }

    let builder = match json_fields(raw) {
        Some(builder) => {
            debug!("scan payload decoded as JSON object");
            builder
        }
        None => {
            debug!("scan payload is not a JSON object; using key/value fallback");
            key_value_fields(raw)?
        }
    };

    Ok(builder.build()?)
}

/// Collects fields from a JSON object, or `None` if `raw` is not one.
///
/// Exact canonical spellings take precedence over other keys that normalise
/// to the same name (`carne` over `carné`), unless the exact one is blank.
fn json_fields(raw: &str) -> Option<RecordBuilder> {
    let object = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        _ => return None,
    };

    let mut fields: HashMap<String, String> = HashMap::new();
    let mut exact: Vec<(&str, String)> = Vec::new();

    for (key, value) in &object {
        let text = json_text(value);
        if is_known_spelling(key) {
            exact.push((key.as_str(), text));
            continue;
        }
        let slot = fields.entry(normalize_key(key)).or_default();
        if slot.trim().is_empty() {
            *slot = text;
        }
    }

    for (key, text) in exact {
        if !text.trim().is_empty() || !fields.contains_key(key) {
            fields.insert(key.to_string(), text);
        }
    }

    Some(RecordBuilder::from_fields(fields))
}

fn is_known_spelling(key: &str) -> bool {
    CANONICAL_FIELDS.contains(&key) || key == IDENTIFICACION || key == CARNET
}

/// Renders a JSON value as field text.  Numbers keep their literal form so a
/// card encoding `"documento": 1020` still reads as `"1020"`.
fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn key_value_fields(raw: &str) -> Result<RecordBuilder, PayloadError> {
    let mut fields: Vec<(String, String)> = Vec::new();

    for entry in raw.split(|c| matches!(c, '\n' | ';' | '|')) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let Some(separator) = entry.find(':').or_else(|| entry.find('=')) else {
            trace!("skipping payload entry without separator: {entry:?}");
            continue;
        };

        let key = normalize_key(&entry[..separator]);
        let value = entry[separator + 1..].trim().to_string();
        fields.push((key, value));
    }

    if fields.is_empty() {
        return Err(PayloadError::Unrecognized);
    }

    Ok(RecordBuilder::from_fields(fields))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
