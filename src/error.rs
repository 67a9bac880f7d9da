use thiserror::Error;

/// Failures of the PEM armor or its base64 payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PemError {
    #[error("missing -----BEGIN marker")]
    MissingBegin,
    #[error("missing -----END {0}----- marker")]
    MissingEnd(String),
    #[error("empty PEM label")]
    EmptyLabel,
    #[error("invalid PEM label {0:?}")]
    InvalidLabel(String),
    #[error("mismatched labels: BEGIN {begin} / END {end}")]
    MismatchedLabels { begin: String, end: String },
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("input is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("odd number of digits")]
    OddLength,
    #[error("invalid character {c:?} at index {index}")]
    InvalidCharacter { c: char, index: usize },
    #[error("invalid C array element {0:?}")]
    InvalidElement(String),
}

impl From<hex::FromHexError> for HexError {
    fn from(e: hex::FromHexError) -> Self {
        match e {
            hex::FromHexError::InvalidHexCharacter { c, index } => {
                HexError::InvalidCharacter { c, index }
            }
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                HexError::OddLength
            }
        }
    }
}

/// Structural TLV violations. Offsets are relative to the start of the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerError {
    #[error("empty input")]
    Empty,
    #[error("truncated input at offset {0}")]
    Truncated(usize),
    #[error("length {len} at offset {offset} overruns remaining {remaining} bytes")]
    LengthOverrun {
        offset: usize,
        len: usize,
        remaining: usize,
    },
    #[error("indefinite length at offset {0}")]
    IndefiniteLength(usize),
    #[error("unsupported length encoding at offset {0}")]
    BadLength(usize),
    #[error("tag number too large at offset {0}")]
    TagOverflow(usize),
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
    #[error("{0} trailing bytes after certificate")]
    TrailingData(usize),
    #[error("invalid OBJECT IDENTIFIER encoding")]
    InvalidOid,
    #[error("invalid {0} encoding")]
    InvalidPrimitive(&'static str),
    #[error("invalid time {0:?}")]
    InvalidTime(String),
}

/// The four error kinds reported by every entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("malformed PEM: {0}")]
    MalformedPem(#[from] PemError),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] HexError),
    #[error("malformed DER: {0}")]
    MalformedDer(#[from] DerError),
    #[error("unsupported structure: {field}: {reason}")]
    UnsupportedStructure { field: &'static str, reason: String },
}

impl Error {
    pub(crate) fn structure(field: &'static str, reason: impl Into<String>) -> Self {
        Error::UnsupportedStructure {
            field,
            reason: reason.into(),
        }
    }

    /// Taxonomy name of the error, stable across detail changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedPem(_) => "MalformedPem",
            Error::InvalidHex(_) => "InvalidHex",
            Error::MalformedDer(_) => "MalformedDer",
            Error::UnsupportedStructure { .. } => "UnsupportedStructure",
        }
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::InvalidHex(e.into())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::MalformedPem(e.into())
    }
}
