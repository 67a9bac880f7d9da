//! The four string-level entry points.
//!
//! None of them panic or unwind. Failures come back as data: a `Result`
//! for the codecs, an [`Inspection`] for the inspector, and [`render`]
//! for callers that want the flat `Error: <reason>` text.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Error;
use crate::hex;
use crate::options::Options;
use crate::pem;
use crate::sha256;
use crate::x509::{self, CertificateRecord};

/// Result of [`inspect_pem`], serialized either as the record itself or
/// as `{"error": "<reason>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Inspection {
    Certificate(CertificateRecord),
    Failure { error: String },
}

impl Inspection {
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "serializing inspection failed");
                r#"{"error":"serialization failed"}"#.to_string()
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Inspection::Failure { .. })
    }

    pub fn certificate(&self) -> Option<&CertificateRecord> {
        match self {
            Inspection::Certificate(c) => Some(c),
            Inspection::Failure { .. } => None,
        }
    }
}

impl From<Result<CertificateRecord, Error>> for Inspection {
    fn from(r: Result<CertificateRecord, Error>) -> Self {
        match r {
            Ok(record) => Inspection::Certificate(record),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "certificate inspection failed");
                Inspection::Failure {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Flattens a codec result into the page's text form.
pub fn render(result: Result<String, Error>) -> String {
    match result {
        Ok(s) => s,
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "conversion failed");
            format!("Error: {}", e)
        }
    }
}

/// PEM text to the hex of its decoded body.
pub fn pem_to_hex(text: &str) -> Result<String, Error> {
    debug!(len = text.len(), "pem_to_hex");
    let block = pem::decode(text)?;

    Ok(hex::encode(&block.body))
}

pub fn hex_to_pem(text: &str, label: &str) -> Result<String, Error> {
    hex_to_pem_with(text, label, &Options::default())
}

pub fn hex_to_pem_with(text: &str, label: &str, opts: &Options) -> Result<String, Error> {
    debug!(len = text.len(), label, "hex_to_pem");
    pem::check_label(label)?;
    let bytes = hex::decode(text.trim())?;

    Ok(pem::encode_with_width(
        &bytes,
        label,
        opts.effective_line_width(),
    ))
}

/// Lowercase hex SHA-256 of the UTF-8 bytes of `text`.
pub fn sha256_hex(text: &str) -> String {
    debug!(len = text.len(), "sha256_hex");
    hex::encode(&sha256::digest(text.as_bytes()))
}

/// SHA-256 of the bytes a hex string denotes, rather than of its characters.
pub fn sha256_hex_of_hex(text: &str) -> Result<String, Error> {
    let bytes = hex::decode(text.trim())?;

    Ok(hex::encode(&sha256::digest(&bytes)))
}

pub fn inspect_pem(text: &str) -> Inspection {
    inspect_pem_with(text, &Options::default())
}

pub fn inspect_pem_with(text: &str, opts: &Options) -> Inspection {
    x509::inspect_with(text.as_bytes(), opts).into()
}

pub fn pem_to_c_array(text: &str) -> Result<String, Error> {
    let block = pem::decode(text)?;

    Ok(hex::to_c_array(&block.body))
}

pub fn c_array_to_pem(text: &str, label: &str) -> Result<String, Error> {
    pem::check_label(label)?;
    let bytes = hex::from_c_array(text)?;

    Ok(pem::encode(&bytes, label))
}
