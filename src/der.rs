//! Definite-length DER tag-length-value walker.
//!
//! ```text
//! +--------+-----+--------+
//! | class  | P/C | number |   0b11111 in number => high-tag-number form
//! | 2 bits |  1  | 5 bits |
//! +--------+-----+--------+
//! ```
//!
//! The walker holds no state between calls. A [`Cursor`] is a copyable
//! window over the input; every read hands back the advanced cursor so
//! offsets only ever move forward and are checked against the window end
//! before each access.

use tracing::trace;

use crate::error::DerError;

pub const TAG_BOOLEAN: u32 = 0x01;
pub const TAG_INTEGER: u32 = 0x02;
pub const TAG_BIT_STRING: u32 = 0x03;
pub const TAG_OCTET_STRING: u32 = 0x04;
pub const TAG_NULL: u32 = 0x05;
pub const TAG_OID: u32 = 0x06;
pub const TAG_UTF8_STRING: u32 = 0x0c;
pub const TAG_SEQUENCE: u32 = 0x10;
pub const TAG_SET: u32 = 0x11;
pub const TAG_NUMERIC_STRING: u32 = 0x12;
pub const TAG_PRINTABLE_STRING: u32 = 0x13;
pub const TAG_TELETEX_STRING: u32 = 0x14;
pub const TAG_IA5_STRING: u32 = 0x16;
pub const TAG_UTC_TIME: u32 = 0x17;
pub const TAG_GENERALIZED_TIME: u32 = 0x18;
pub const TAG_VISIBLE_STRING: u32 = 0x1a;
pub const TAG_UNIVERSAL_STRING: u32 = 0x1c;
pub const TAG_BMP_STRING: u32 = 0x1e;

const MAX_LENGTH_BYTES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl Class {
    fn from_bits(b: u8) -> Class {
        match b >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub class: Class,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub fn is_universal(&self, number: u32) -> bool {
        self.class == Class::Universal && self.number == number
    }

    pub fn is_context(&self, number: u32) -> bool {
        self.class == Class::ContextSpecific && self.number == number
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerNode<'a> {
    pub tag: Tag,
    /// Absolute offset of the tag byte in the parsed input.
    pub offset: usize,
    /// Content octets.
    pub value: &'a [u8],
    /// Full TLV encoding, header included.
    pub raw: &'a [u8],
    /// Parsed content of constructed nodes, empty for primitives.
    pub children: Vec<DerNode<'a>>,
}

/// Read position plus the exclusive end of the current window.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a [u8]) -> Cursor<'a> {
        Cursor {
            input,
            pos: 0,
            end: input.len(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    fn read_u8(self) -> Result<(u8, Cursor<'a>), DerError> {
        if self.is_empty() {
            return Err(DerError::Truncated(self.pos));
        }
        let b = self.input[self.pos];

        Ok((
            b,
            Cursor {
                pos: self.pos + 1,
                ..self
            },
        ))
    }

    fn take(self, len: usize) -> Result<(&'a [u8], Cursor<'a>), DerError> {
        if len > self.remaining() {
            return Err(DerError::LengthOverrun {
                offset: self.pos,
                len,
                remaining: self.remaining(),
            });
        }
        let end = self.pos + len;

        Ok((&self.input[self.pos..end], Cursor { pos: end, ..self }))
    }

    /// A cursor limited to the next `len` bytes.
    fn window(self, len: usize) -> Cursor<'a> {
        Cursor {
            end: self.pos + len,
            ..self
        }
    }

    fn read_tag(self) -> Result<(Tag, Cursor<'a>), DerError> {
        let start = self.pos;
        let (first, mut cur) = self.read_u8()?;
        let class = Class::from_bits(first);
        let constructed = first & 0x20 != 0;
        let mut number = u32::from(first & 0x1f);

        if number == 0x1f {
            number = 0;
            loop {
                let (b, next) = cur.read_u8()?;
                cur = next;
                if number > (u32::MAX >> 7) {
                    return Err(DerError::TagOverflow(start));
                }
                number = (number << 7) | u32::from(b & 0x7f);
                if b & 0x80 == 0 {
                    break;
                }
            }
        }

        Ok((
            Tag {
                class,
                constructed,
                number,
            },
            cur,
        ))
    }

    fn read_length(self) -> Result<(usize, Cursor<'a>), DerError> {
        let start = self.pos;
        let (first, mut cur) = self.read_u8()?;

        if first < 0x80 {
            return Ok((usize::from(first), cur));
        }
        if first == 0x80 {
            return Err(DerError::IndefiniteLength(start));
        }

        let count = usize::from(first & 0x7f);
        if count > MAX_LENGTH_BYTES {
            return Err(DerError::BadLength(start));
        }

        let mut len: usize = 0;
        for _ in 0..count {
            let (b, next) = cur.read_u8()?;
            cur = next;
            len = (len << 8) | usize::from(b);
        }

        Ok((len, cur))
    }

    /// Reads one complete TLV, recursing into constructed values.
    pub fn read_node(
        self,
        depth: usize,
        max_depth: usize,
    ) -> Result<(DerNode<'a>, Cursor<'a>), DerError> {
        if depth > max_depth {
            return Err(DerError::TooDeep(max_depth));
        }

        let offset = self.pos;
        let (tag, cur) = self.read_tag()?;
        let (len, cur) = cur.read_length()?;
        let value_start = cur.pos;
        let (value, next) = cur.take(len)?;

        trace!(offset, ?tag, len, depth, "der node");

        let mut children = Vec::new();
        if tag.constructed {
            let mut inner = cur.window(len);
            while !inner.is_empty() {
                let (child, rest) = inner.read_node(depth + 1, max_depth)?;
                children.push(child);
                inner = rest;
            }
        }

        debug_assert_eq!(value_start + len, next.pos);

        Ok((
            DerNode {
                tag,
                offset,
                value,
                raw: &self.input[offset..next.pos],
                children,
            },
            next,
        ))
    }
}

/// Parses exactly one node spanning the whole input.
pub fn parse(input: &[u8], max_depth: usize) -> Result<DerNode<'_>, DerError> {
    if input.is_empty() {
        return Err(DerError::Empty);
    }

    let (node, rest) = Cursor::new(input).read_node(0, max_depth)?;
    if !rest.is_empty() {
        return Err(DerError::TrailingData(rest.remaining()));
    }

    Ok(node)
}

pub fn read_bool(node: &DerNode<'_>) -> Result<bool, DerError> {
    match node.value {
        [0x00] => Ok(false),
        [0xff] => Ok(true),
        _ => Err(DerError::InvalidPrimitive("BOOLEAN")),
    }
}

/// Content octets of an INTEGER, two's complement, sign preserved.
pub fn read_integer<'a>(node: &DerNode<'a>) -> Result<&'a [u8], DerError> {
    if node.value.is_empty() {
        return Err(DerError::InvalidPrimitive("INTEGER"));
    }

    Ok(node.value)
}

/// Small non-negative INTEGER, such as the certificate version.
pub fn read_small_uint(node: &DerNode<'_>) -> Result<u64, DerError> {
    let bytes = read_integer(node)?;
    if bytes[0] & 0x80 != 0 || bytes.len() > 8 {
        return Err(DerError::InvalidPrimitive("INTEGER"));
    }

    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Returns `(unused_bits, bits)` of a BIT STRING.
pub fn read_bit_string<'a>(node: &DerNode<'a>) -> Result<(u8, &'a [u8]), DerError> {
    match node.value.split_first() {
        Some((&unused, bits)) if unused < 8 && !(bits.is_empty() && unused != 0) => {
            Ok((unused, bits))
        }
        _ => Err(DerError::InvalidPrimitive("BIT STRING")),
    }
}
