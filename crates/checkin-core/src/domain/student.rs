//! The canonical student record and its validating builder.
//!
//! Every way a record can enter the system (a JSON QR code, a key/value QR
//! code, or the operator typing the fields by hand) ends in
//! [`RecordBuilder::build`].  That single step is what guarantees callers see
//! identical validation regardless of which format supplied the data.
//!
//! # Field aliases
//!
//! Student cards printed by different systems do not agree on key names.
//! Two aliases are accepted, and only when the canonical key is blank:
//!
//! | Canonical   | Alias            |
//! |-------------|------------------|
//! | `documento` | `identificacion` |
//! | `carne`     | `carnet`         |
//!
//! # Key normalisation
//!
//! Keys are compared after [`normalize_key`]: lowercase, accents stripped,
//! spaces and underscores removed.  So `"Carné"`, `"CARNE"` and `"car_ne"`
//! are all the same key.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

pub const DOCUMENTO: &str = "documento";
pub const CARNE: &str = "carne";
pub const NOMBRES: &str = "nombres";
pub const APELLIDOS: &str = "apellidos";
pub const GRADO: &str = "grado";

/// Alias accepted for [`DOCUMENTO`].
pub const IDENTIFICACION: &str = "identificacion";
/// Alias accepted for [`CARNE`].
pub const CARNET: &str = "carnet";

/// The five required fields, in the order they are validated and serialized.
pub const CANONICAL_FIELDS: [&str; 5] = [DOCUMENTO, CARNE, NOMBRES, APELLIDOS, GRADO];

/// Validation failure while building a [`StudentRecord`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// A required field is absent or blank after alias resolution and trimming.
    #[error("required field `{0}` is missing or blank")]
    MissingField(&'static str),
}

/// A validated student identity.
///
/// All five fields are non-blank and trimmed.  The struct has no public
/// constructor other than [`RecordBuilder::build`], so holding a
/// `StudentRecord` is proof that validation passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRecord {
    documento: String,
    carne: String,
    nombres: String,
    apellidos: String,
    grado: String,
}

impl StudentRecord {
    /// Starts an empty builder, used for manual entry.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// National identity document number.
    pub fn documento(&self) -> &str {
        &self.documento
    }

    /// School card number.
    pub fn carne(&self) -> &str {
        &self.carne
    }

    pub fn nombres(&self) -> &str {
        &self.nombres
    }

    pub fn apellidos(&self) -> &str {
        &self.apellidos
    }

    /// Grade or class the student belongs to (e.g. `"5to"`).
    pub fn grado(&self) -> &str {
        &self.grado
    }
}

impl fmt::Display for StudentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (doc {}, carné {}, {})",
            self.nombres, self.apellidos, self.documento, self.carne, self.grado
        )
    }
}

/// Collects raw field values and validates them into a [`StudentRecord`].
///
/// Values are stored untouched; trimming and alias resolution happen in
/// [`build`](Self::build).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBuilder {
    documento: String,
    identificacion: String,
    carne: String,
    carnet: String,
    nombres: String,
    apellidos: String,
    grado: String,
}

impl RecordBuilder {
    /// Builds from an arbitrary key→value mapping.
    ///
    /// Keys are passed through [`normalize_key`] first; unknown keys are
    /// ignored.  When two keys normalise to the same field, the later one wins.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = Self::default();
        for (key, value) in fields {
            builder.set(&normalize_key(key.as_ref()), value.into());
        }
        builder
    }

    /// Stores `value` under an already-normalised key.
    ///
    /// Returns `false` when the key is not a canonical field or an alias.
    pub fn set(&mut self, normalized_key: &str, value: String) -> bool {
        let slot = match normalized_key {
            DOCUMENTO => &mut self.documento,
            IDENTIFICACION => &mut self.identificacion,
            CARNE => &mut self.carne,
            CARNET => &mut self.carnet,
            NOMBRES => &mut self.nombres,
            APELLIDOS => &mut self.apellidos,
            GRADO => &mut self.grado,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn documento(mut self, value: impl Into<String>) -> Self {
        self.documento = value.into();
        self
    }

    pub fn carne(mut self, value: impl Into<String>) -> Self {
        self.carne = value.into();
        self
    }

    pub fn nombres(mut self, value: impl Into<String>) -> Self {
        self.nombres = value.into();
        self
    }

    pub fn apellidos(mut self, value: impl Into<String>) -> Self {
        self.apellidos = value.into();
        self
    }

    pub fn grado(mut self, value: impl Into<String>) -> Self {
        self.grado = value.into();
        self
    }

    /// Resolves aliases, trims every field, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingField`] naming the first blank field in
    /// [`CANONICAL_FIELDS`] order.
    pub fn build(&self) -> Result<StudentRecord, RecordError> {
        let documento = resolve(&self.documento, &self.identificacion);
        let carne = resolve(&self.carne, &self.carnet);
        let nombres = self.nombres.trim().to_string();
        let apellidos = self.apellidos.trim().to_string();
        let grado = self.grado.trim().to_string();

        for (name, value) in CANONICAL_FIELDS
            .into_iter()
            .zip([&documento, &carne, &nombres, &apellidos, &grado])
        {
            if value.is_empty() {
                return Err(RecordError::MissingField(name));
            }
        }

        Ok(StudentRecord {
            documento,
            carne,
            nombres,
            apellidos,
            grado,
        })
    }
}

/// Trimmed `primary`, or trimmed `alias` when `primary` is blank.
fn resolve(primary: &str, alias: &str) -> String {
    let primary = primary.trim();
    if primary.is_empty() {
        alias.trim().to_string()
    } else {
        primary.to_string()
    }
}

/// Normalises a payload key for comparison.
///
/// Lowercases, decomposes to Unicode NFD and drops the combining marks
/// (so `é` becomes `e`), then removes spaces and underscores.  Applying it
/// twice gives the same result as applying it once.
///
/// ```rust
/// use checkin_core::normalize_key;
///
/// assert_eq!(normalize_key(" Docu_Mento "), "documento");
/// assert_eq!(normalize_key("Carné"), "carne");
/// ```
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| *c != ' ' && *c != '_')
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
