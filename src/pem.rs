//! PEM armor (RFC 7468) around base64 payloads.
//!
//! ```text
//! -----BEGIN <LABEL>-----
//! <base64, 64 characters per line>
//! -----END <LABEL>-----
//! ```

use base64::prelude::*;
use tracing::debug;

use crate::error::{Error, PemError};
use crate::options::DEFAULT_LINE_WIDTH;

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";
const BEGIN_MARK: &[u8] = b"-----BEGIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    pub label: String,
    pub body: Vec<u8>,
}

impl PemBlock {
    pub fn new(label: impl Into<String>, body: Vec<u8>) -> PemBlock {
        PemBlock {
            label: label.into(),
            body,
        }
    }

    pub fn encode(&self) -> String {
        encode(&self.body, &self.label)
    }
}

fn begin_label(line: &str) -> Option<&str> {
    line.strip_prefix(BEGIN)?.strip_suffix(DASHES)
}

fn end_label(line: &str) -> Option<&str> {
    line.strip_prefix(END)?.strip_suffix(DASHES)
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_graphic() && c != '-'
}

/// RFC 7468 label: printable ASCII, with single `-` or space separators
/// between label characters.
pub fn check_label(label: &str) -> Result<(), PemError> {
    if label.trim().is_empty() {
        return Err(PemError::EmptyLabel);
    }

    let mut prev_sep = true;
    for c in label.chars() {
        let sep = c == '-' || c == ' ';
        if (!sep && !is_label_char(c)) || (sep && prev_sep) {
            return Err(PemError::InvalidLabel(label.to_string()));
        }
        prev_sep = sep;
    }
    if prev_sep {
        return Err(PemError::InvalidLabel(label.to_string()));
    }

    Ok(())
}

/// Parses one block starting at `lines`, which must be positioned right
/// after a BEGIN marker carrying `label`.
fn read_block<'a, I>(label: &str, lines: &mut I) -> Result<PemBlock, Error>
where
    I: Iterator<Item = &'a str>,
{
    check_label(label)?;

    let mut b64 = String::new();

    for line in lines {
        let line = line.trim();

        if let Some(end) = end_label(line) {
            if end != label {
                return Err(PemError::MismatchedLabels {
                    begin: label.to_string(),
                    end: end.to_string(),
                }
                .into());
            }

            let body = BASE64_STANDARD.decode(b64.as_bytes())?;
            debug!(label, len = body.len(), "decoded PEM block");

            return Ok(PemBlock::new(label, body));
        }

        if begin_label(line).is_some() {
            break;
        }

        b64.extend(line.chars().filter(|c| !c.is_whitespace()));
    }

    Err(PemError::MissingEnd(label.to_string()).into())
}

/// Decodes the first PEM block of `text`.
pub fn decode(text: &str) -> Result<PemBlock, Error> {
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        if let Some(label) = begin_label(line.trim()) {
            return read_block(label, &mut lines);
        }
    }

    Err(PemError::MissingBegin.into())
}

pub fn decode_bytes(input: &[u8]) -> Result<PemBlock, Error> {
    let text = std::str::from_utf8(input).map_err(|_| PemError::NotUtf8)?;

    decode(text)
}

/// Decodes every block of a bundle, in order.
pub fn decode_all(text: &str) -> Result<Vec<PemBlock>, Error> {
    let mut blocks = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        if let Some(label) = begin_label(line.trim()) {
            blocks.push(read_block(label, &mut lines)?);
        }
    }

    if blocks.is_empty() {
        return Err(PemError::MissingBegin.into());
    }

    Ok(blocks)
}

pub fn encode(bytes: &[u8], label: &str) -> String {
    encode_with_width(bytes, label, DEFAULT_LINE_WIDTH)
}

pub fn encode_with_width(bytes: &[u8], label: &str, width: usize) -> String {
    let width = if width == 0 { DEFAULT_LINE_WIDTH } else { width };
    let b64 = BASE64_STANDARD.encode(bytes);

    let mut out = String::with_capacity(b64.len() + b64.len() / width + 2 * label.len() + 32);
    out.push_str(BEGIN);
    out.push_str(label);
    out.push_str(DASHES);
    out.push('\n');

    // base64 output is ASCII, so byte chunks are char boundaries
    for chunk in b64.as_bytes().chunks(width) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }

    out.push_str(END);
    out.push_str(label);
    out.push_str(DASHES);
    out.push('\n');

    out
}

pub fn looks_like_pem(input: &[u8]) -> bool {
    input.windows(BEGIN_MARK.len()).any(|w| w == BEGIN_MARK)
}
