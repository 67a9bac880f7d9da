use serde::Serialize;

use crate::der::{self, DerNode, TAG_BOOLEAN, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE};
use crate::error::Error;
use crate::hex;
use crate::oid::ObjectIdentifier;

/// One certificate extension, payload kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Ext {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    pub data: Vec<u8>,
}

/// Display form of an extension inside the inspection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionEntry {
    pub oid: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    pub critical: bool,
}

impl X509Ext {
    pub fn name(&self) -> Option<&'static str> {
        self.oid.extension_name()
    }

    pub fn data_hex(&self) -> String {
        hex::encode(&self.data)
    }

    pub fn entry(&self) -> ExtensionEntry {
        ExtensionEntry {
            oid: self.oid.dotted(),
            data: self.data_hex(),
            name: self.name(),
            critical: self.critical,
        }
    }
}

fn get_ext(seq: &DerNode<'_>) -> Result<X509Ext, Error> {
    if !seq.tag.is_universal(TAG_SEQUENCE) {
        return Err(Error::structure("extension", "expected SEQUENCE"));
    }

    let items = &seq.children;
    let oid = match items.first() {
        Some(n) if n.tag.is_universal(TAG_OID) => ObjectIdentifier::from_der(n.value)?,
        _ => return Err(Error::structure("extension", "missing extnID")),
    };

    let (critical, idx) = match items.get(1) {
        Some(n) if n.tag.is_universal(TAG_BOOLEAN) => (der::read_bool(n)?, 2),
        _ => (false, 1),
    };

    let data = match items.get(idx) {
        Some(n) if n.tag.is_universal(TAG_OCTET_STRING) => n.value.to_vec(),
        _ => return Err(Error::structure("extension", "missing extnValue")),
    };

    if items.len() > idx + 1 {
        return Err(Error::structure("extension", "unexpected trailing field"));
    }

    Ok(X509Ext {
        oid,
        critical,
        data,
    })
}

/// Parses the `[3] EXPLICIT Extensions` wrapper, in encoded order.
pub fn get_extensions(node: &DerNode<'_>) -> Result<Vec<X509Ext>, Error> {
    let seq = match node.children.as_slice() {
        [seq] if seq.tag.is_universal(TAG_SEQUENCE) => seq,
        _ => return Err(Error::structure("extensions", "expected [3] { SEQUENCE }")),
    };

    seq.children.iter().map(get_ext).collect()
}
