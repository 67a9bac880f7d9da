use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::debug;

use crate::der::{self, DerNode};
use crate::der::{
    TAG_BIT_STRING, TAG_BMP_STRING, TAG_GENERALIZED_TIME, TAG_IA5_STRING, TAG_INTEGER,
    TAG_NUMERIC_STRING, TAG_OID, TAG_PRINTABLE_STRING, TAG_SEQUENCE, TAG_SET,
    TAG_TELETEX_STRING, TAG_UNIVERSAL_STRING, TAG_UTC_TIME, TAG_UTF8_STRING, TAG_VISIBLE_STRING,
};
use crate::error::{DerError, Error};
use crate::ext::{self, ExtensionEntry, X509Ext};
use crate::hex;
use crate::oid::{self, ObjectIdentifier};
use crate::options::Options;
use crate::pem;
use crate::sha256;

const CERTIFICATE_LABELS: &[&str] = &["CERTIFICATE", "X509 CERTIFICATE"];
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidStr {
    pub oid: ObjectIdentifier,
    pub data: String,
}

/// RDNs in encoded order, each holding one or more attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct X509Name {
    pub rdns: Vec<Vec<OidStr>>,
}

/// Ordered and compared by instant, whatever the encoding.
#[derive(Debug, Clone, Copy)]
pub enum X509Time {
    Utc(NaiveDateTime),
    Gen(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    pub oid: ObjectIdentifier,
    /// Named curve, when the parameters are an OBJECT IDENTIFIER.
    pub curve: Option<ObjectIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubKey {
    pub algorithm: AlgorithmIdentifier,
    /// Full SubjectPublicKeyInfo encoding.
    pub spki: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509 {
    /// Stored value, one less than the displayed version.
    pub version: u64,
    pub sn: Vec<u8>,
    pub sign_alg: AlgorithmIdentifier,
    pub issuer: X509Name,
    pub not_before: X509Time,
    pub not_after: X509Time,
    pub subject: X509Name,
    pub pub_key: PubKey,
    pub ext: Vec<X509Ext>,
    pub sign: Vec<u8>,
    pub fingerprint: [u8; sha256::DIGEST_LEN],
}

/// Flat, display-ready view of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub subject: String,
    pub issuer: String,
    pub valid_from: String,
    pub valid_to: String,
    pub serial_number: String,
    pub version: String,
    pub signature_algorithm: String,
    pub public_key_algorithm: String,
    pub public_key: String,
    pub extensions: Vec<ExtensionEntry>,
    pub signature_value: String,
    pub fingerprint_sha256: String,
}

fn escape_value(s: &str) -> Cow<'_, str> {
    if !s.contains(|c| matches!(c, ',' | '+' | '\\')) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if matches!(c, ',' | '+' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }

    Cow::Owned(out)
}

impl fmt::Display for X509Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            for (j, attr) in rdn.iter().enumerate() {
                if j > 0 {
                    f.write_str("+")?;
                }
                match attr.oid.attribute_name() {
                    Some(name) => write!(f, "{}={}", name, escape_value(&attr.data))?,
                    None => write!(f, "{}={}", attr.oid, escape_value(&attr.data))?,
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for X509Time {
    fn eq(&self, other: &Self) -> bool {
        self.datetime() == other.datetime()
    }
}

impl Eq for X509Time {}

impl PartialOrd for X509Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for X509Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.datetime().cmp(&other.datetime())
    }
}

impl X509Time {
    pub fn datetime(&self) -> NaiveDateTime {
        match self {
            X509Time::Utc(t) | X509Time::Gen(t) => *t,
        }
    }

    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub fn iso8601(&self) -> String {
        let t = self.datetime();
        let mut s = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            t.year(),
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second()
        );

        let nanos = t.nanosecond();
        if nanos > 0 {
            let frac = format!("{:09}", nanos);
            s.push('.');
            s.push_str(frac.trim_end_matches('0'));
        }
        s.push('Z');

        s
    }
}

impl AlgorithmIdentifier {
    pub fn describe(&self) -> String {
        let base = self.oid.describe_algorithm();

        match (&self.curve, self.oid.is(oid::EC_PUBLIC_KEY)) {
            (Some(curve), true) => match curve.algorithm_name() {
                Some(name) => format!("{} {}", base, name),
                None => format!("{} {}", base, curve),
            },
            _ => base,
        }
    }
}

fn digits(s: &[u8]) -> Result<u32, ()> {
    if s.is_empty() || !s.iter().all(u8::is_ascii_digit) {
        return Err(());
    }

    Ok(s.iter().fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0')))
}

fn datetime(year: i32, rest: &[u8], frac: &[u8]) -> Result<NaiveDateTime, ()> {
    let field = |i: usize| digits(&rest[i..i + 2]);

    let mut nanos = 0u32;
    if !frac.is_empty() {
        if frac.len() > 9 {
            return Err(());
        }
        nanos = digits(frac)? * 10u32.pow(9 - frac.len() as u32);
    }

    let (month, day) = (field(0)?, field(2)?);
    let (hour, min, sec) = (field(4)?, field(6)?, field(8)?);

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_nano_opt(hour, min, sec, nanos))
        .ok_or(())
}

/// `YYMMDDHHMMSSZ`, YY 50..=99 is 19YY, 00..=49 is 20YY.
fn parse_utc_time(s: &[u8]) -> Result<NaiveDateTime, ()> {
    match s {
        [body @ .., b'Z'] if body.len() == 12 => {
            let yy = digits(&body[..2])? as i32;
            let year = if yy >= 50 { 1900 + yy } else { 2000 + yy };

            datetime(year, &body[2..], &[])
        }
        _ => Err(()),
    }
}

/// `YYYYMMDDHHMMSS[.f+]Z`
fn parse_generalized_time(s: &[u8]) -> Result<NaiveDateTime, ()> {
    let body = match s {
        [body @ .., b'Z'] if body.len() >= 14 => body,
        _ => return Err(()),
    };

    let (main, frac) = match body[14..].split_first() {
        None => (body, &[][..]),
        Some((b'.', frac)) if !frac.is_empty() => (&body[..14], frac),
        _ => return Err(()),
    };

    let year = digits(&main[..4])? as i32;

    datetime(year, &main[4..], frac)
}

fn get_time(node: &DerNode<'_>) -> Result<X509Time, Error> {
    let invalid = || DerError::InvalidTime(String::from_utf8_lossy(node.value).into_owned());

    if node.tag.is_universal(TAG_UTC_TIME) {
        let t = parse_utc_time(node.value).map_err(|_| invalid())?;
        Ok(X509Time::Utc(t))
    } else if node.tag.is_universal(TAG_GENERALIZED_TIME) {
        let t = parse_generalized_time(node.value).map_err(|_| invalid())?;
        Ok(X509Time::Gen(t))
    } else {
        Err(Error::structure("validity", "expected UTCTime or GeneralizedTime"))
    }
}

fn get_asn1_seq<'n, 'a>(
    v: &'n [DerNode<'a>],
    idx: usize,
    field: &'static str,
) -> Result<&'n DerNode<'a>, Error> {
    let node = v.get(idx).ok_or_else(|| Error::structure(field, "missing"))?;
    if !node.tag.is_universal(TAG_SEQUENCE) {
        return Err(Error::structure(field, "expected SEQUENCE"));
    }

    Ok(node)
}

fn get_version(v: &[DerNode<'_>]) -> Result<Option<u64>, Error> {
    let node = match v.first() {
        Some(n) if n.tag.is_context(0) => n,
        _ => return Ok(None),
    };

    match node.children.as_slice() {
        [int] if int.tag.is_universal(TAG_INTEGER) => Ok(Some(der::read_small_uint(int)?)),
        _ => Err(Error::structure("version", "expected [0] { INTEGER }")),
    }
}

fn get_serial_number(v: &[DerNode<'_>], idx: usize) -> Result<Vec<u8>, Error> {
    match v.get(idx) {
        Some(n) if n.tag.is_universal(TAG_INTEGER) => Ok(der::read_integer(n)?.to_vec()),
        Some(_) => Err(Error::structure("serialNumber", "expected INTEGER")),
        None => Err(Error::structure("serialNumber", "missing")),
    }
}

fn get_algorithm(
    v: &[DerNode<'_>],
    idx: usize,
    field: &'static str,
) -> Result<AlgorithmIdentifier, Error> {
    let seq = get_asn1_seq(v, idx, field)?;

    let oid = match seq.children.first() {
        Some(n) if n.tag.is_universal(TAG_OID) => ObjectIdentifier::from_der(n.value)?,
        _ => return Err(Error::structure(field, "missing algorithm OID")),
    };

    let curve = match seq.children.get(1) {
        Some(n) if n.tag.is_universal(TAG_OID) => Some(ObjectIdentifier::from_der(n.value)?),
        _ => None,
    };

    if seq.children.len() > 2 {
        return Err(Error::structure(field, "unexpected trailing field"));
    }

    Ok(AlgorithmIdentifier { oid, curve })
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn utf16be(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));

    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn utf32be(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 4 != 0 {
        return None;
    }

    bytes
        .chunks_exact(4)
        .map(|c| char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
        .collect()
}

/// Text of a directory string, or `#<hex of the TLV>` when it is not one.
fn attribute_text(node: &DerNode<'_>) -> String {
    let text = match (node.tag.class, node.tag.number) {
        (der::Class::Universal, TAG_UTF8_STRING)
        | (der::Class::Universal, TAG_PRINTABLE_STRING)
        | (der::Class::Universal, TAG_IA5_STRING)
        | (der::Class::Universal, TAG_NUMERIC_STRING)
        | (der::Class::Universal, TAG_VISIBLE_STRING) => {
            std::str::from_utf8(node.value).ok().map(str::to_string)
        }
        (der::Class::Universal, TAG_TELETEX_STRING) => Some(latin1(node.value)),
        (der::Class::Universal, TAG_BMP_STRING) => utf16be(node.value),
        (der::Class::Universal, TAG_UNIVERSAL_STRING) => utf32be(node.value),
        _ => None,
    };

    text.unwrap_or_else(|| format!("#{}", hex::encode(node.raw)))
}

fn get_x509_name(v: &[DerNode<'_>], idx: usize, field: &'static str) -> Result<X509Name, Error> {
    let seq = get_asn1_seq(v, idx, field)?;
    let mut rdns = Vec::with_capacity(seq.children.len());

    for set in &seq.children {
        if !set.tag.is_universal(TAG_SET) || set.children.is_empty() {
            return Err(Error::structure(field, "expected non-empty SET"));
        }

        let mut rdn = Vec::with_capacity(set.children.len());
        for atv in &set.children {
            if !atv.tag.is_universal(TAG_SEQUENCE) {
                return Err(Error::structure(field, "expected AttributeTypeAndValue"));
            }
            match atv.children.as_slice() {
                [typ, value] if typ.tag.is_universal(TAG_OID) => rdn.push(OidStr {
                    oid: ObjectIdentifier::from_der(typ.value)?,
                    data: attribute_text(value),
                }),
                _ => return Err(Error::structure(field, "expected AttributeTypeAndValue")),
            }
        }
        rdns.push(rdn);
    }

    Ok(X509Name { rdns })
}

fn get_x509_time(v: &[DerNode<'_>], idx: usize) -> Result<(X509Time, X509Time), Error> {
    let seq = get_asn1_seq(v, idx, "validity")?;

    match seq.children.as_slice() {
        [nb, na] => Ok((get_time(nb)?, get_time(na)?)),
        _ => Err(Error::structure("validity", "expected two Time values")),
    }
}

fn get_pub_key(v: &[DerNode<'_>], idx: usize) -> Result<PubKey, Error> {
    let seq = get_asn1_seq(v, idx, "subjectPublicKeyInfo")?;

    let algorithm = get_algorithm(&seq.children, 0, "subjectPublicKeyInfo.algorithm")?;
    match seq.children.get(1) {
        Some(bits) if bits.tag.is_universal(TAG_BIT_STRING) && seq.children.len() == 2 => {
            der::read_bit_string(bits)?;
        }
        _ => {
            return Err(Error::structure(
                "subjectPublicKeyInfo",
                "expected BIT STRING subjectPublicKey",
            ))
        }
    }

    Ok(PubKey {
        algorithm,
        spki: seq.raw.to_vec(),
    })
}

fn get_signature(v: &[DerNode<'_>]) -> Result<Vec<u8>, Error> {
    match v.get(2) {
        Some(n) if n.tag.is_universal(TAG_BIT_STRING) => Ok(der::read_bit_string(n)?.1.to_vec()),
        Some(_) => Err(Error::structure("signatureValue", "expected BIT STRING")),
        None => Err(Error::structure("signatureValue", "missing")),
    }
}

/// Walks a parsed Certificate. All or nothing.
pub fn x509_decode(root: &DerNode<'_>) -> Result<X509, Error> {
    if !root.tag.is_universal(TAG_SEQUENCE) {
        return Err(Error::structure("certificate", "expected SEQUENCE"));
    }
    let x509 = &root.children;
    if x509.len() != 3 {
        return Err(Error::structure(
            "certificate",
            format!("expected 3 elements, found {}", x509.len()),
        ));
    }

    let body = &get_asn1_seq(x509, 0, "tbsCertificate")?.children;

    /* Version */
    let version = get_version(body)?;
    let mut idx = match version {
        Some(_) => 1,
        None => 0,
    };

    /* Serial Number */
    let sn = get_serial_number(body, idx)?;
    idx += 1;

    /* Signature Algorithm */
    let sign_alg = get_algorithm(body, idx, "signature")?;
    idx += 1;

    /* Issuer */
    let issuer = get_x509_name(body, idx, "issuer")?;
    idx += 1;

    /* Validity time */
    let (not_before, not_after) = get_x509_time(body, idx)?;
    idx += 1;

    /* Subject */
    let subject = get_x509_name(body, idx, "subject")?;
    idx += 1;

    /* Subject Public Key Info */
    let pub_key = get_pub_key(body, idx)?;
    idx += 1;

    /* Unique IDs, skipped */
    for n in [1, 2] {
        if body.get(idx).map_or(false, |b| b.tag.is_context(n)) {
            idx += 1;
        }
    }

    /* Extensions */
    let ext = match body.get(idx) {
        Some(n) if n.tag.is_context(3) => {
            idx += 1;
            ext::get_extensions(n)?
        }
        _ => Vec::new(),
    };

    if idx != body.len() {
        return Err(Error::structure("tbsCertificate", "unexpected trailing field"));
    }

    /* Outer signature algorithm, must be present */
    get_algorithm(x509, 1, "signatureAlgorithm")?;

    /* Signature */
    let sign = get_signature(x509)?;

    Ok(X509 {
        version: version.unwrap_or(0),
        sn,
        sign_alg,
        issuer,
        not_before,
        not_after,
        subject,
        pub_key,
        ext,
        sign,
        fingerprint: sha256::digest(root.raw),
    })
}

impl X509 {
    pub fn record(&self) -> CertificateRecord {
        CertificateRecord {
            subject: self.subject.to_string(),
            issuer: self.issuer.to_string(),
            valid_from: self.not_before.iso8601(),
            valid_to: self.not_after.iso8601(),
            serial_number: hex::encode(&self.sn),
            version: (self.version + 1).to_string(),
            signature_algorithm: self.sign_alg.describe(),
            public_key_algorithm: self.pub_key.algorithm.describe(),
            public_key: pem::encode(&self.pub_key.spki, PUBLIC_KEY_LABEL),
            extensions: self.ext.iter().map(X509Ext::entry).collect(),
            signature_value: hex::encode(&self.sign),
            fingerprint_sha256: hex::encode(&self.fingerprint),
        }
    }
}

fn certificate_der<'a>(input: &'a [u8], opts: &Options) -> Result<Cow<'a, [u8]>, Error> {
    if pem::looks_like_pem(input) {
        let block = pem::decode_bytes(input)?;
        if !CERTIFICATE_LABELS.contains(&block.label.as_str()) {
            return Err(Error::structure(
                "pem label",
                format!("expected CERTIFICATE, found {}", block.label),
            ));
        }
        return Ok(Cow::Owned(block.body));
    }

    if opts.accept_raw_hex {
        if let Ok(text) = std::str::from_utf8(input) {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            if hex::is_hex(&compact) {
                return Ok(Cow::Owned(hex::decode(&compact)?));
            }
        }
    }

    Ok(Cow::Borrowed(input))
}

/// Decodes a certificate given as PEM, hex text or raw DER.
pub fn decode_with(input: &[u8], opts: &Options) -> Result<X509, Error> {
    let der_bytes = certificate_der(input, opts)?;
    let root = der::parse(&der_bytes, opts.max_depth)?;

    x509_decode(&root)
}

pub fn inspect_with(input: &[u8], opts: &Options) -> Result<CertificateRecord, Error> {
    debug!(len = input.len(), "inspecting certificate");

    Ok(decode_with(input, opts)?.record())
}

pub fn inspect(input: &[u8]) -> Result<CertificateRecord, Error> {
    inspect_with(input, &Options::default())
}
