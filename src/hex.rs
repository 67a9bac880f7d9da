//! Bytes to hex digits and back.
//!
//! The plain form is the boundary wire format: lowercase, two digits per
//! byte, no separators. The C array form (`0x30, 0x82, ...`) is what gets
//! pasted into firmware sources.

use crate::error::{Error, HexError};

const C_ARRAY_PER_LINE: usize = 16;

pub fn encode(bytes: &[u8]) -> String {
    ::hex::encode(bytes)
}

/// Case-insensitive decode. Odd length or any non-hex character fails.
pub fn decode(text: &str) -> Result<Vec<u8>, Error> {
    Ok(::hex::decode(text)?)
}

pub fn is_hex(text: &str) -> bool {
    !text.is_empty() && text.len() % 2 == 0 && text.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn to_c_array(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 6);

    for (i, chunk) in bytes.chunks(C_ARRAY_PER_LINE).enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        let line: Vec<String> = chunk.iter().map(|b| format!("0x{:02x}", b)).collect();
        out.push_str(&line.join(", "));
    }

    out
}

/// Accepts `0x30, 0x82` style lists, optionally wrapped in braces.
/// Elements without the `0x` prefix must still be exactly two hex digits.
pub fn from_c_array(text: &str) -> Result<Vec<u8>, Error> {
    let body = text.trim();
    let body = body
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .unwrap_or(body);

    let mut out = Vec::new();

    for item in body.split(|c: char| c == ',' || c.is_whitespace()) {
        if item.is_empty() {
            continue;
        }

        let digits = item
            .strip_prefix("0x")
            .or_else(|| item.strip_prefix("0X"))
            .unwrap_or(item);

        if digits.is_empty()
            || digits.len() > 2
            || (digits.len() == 1 && digits == item)
            || !digits.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(HexError::InvalidElement(item.to_string()).into());
        }

        let byte = u8::from_str_radix(digits, 16)
            .map_err(|_| HexError::InvalidElement(item.to_string()))?;
        out.push(byte);
    }

    Ok(out)
}
