//! Object identifiers and the fixed display-name tables.

use std::fmt;

use crate::error::DerError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    pub arcs: Vec<u64>,
}

impl ObjectIdentifier {
    pub fn new(arcs: Vec<u64>) -> ObjectIdentifier {
        ObjectIdentifier { arcs }
    }

    /// Decodes the content octets of an OBJECT IDENTIFIER.
    pub fn from_der(content: &[u8]) -> Result<ObjectIdentifier, DerError> {
        if content.is_empty() {
            return Err(DerError::InvalidOid);
        }

        let mut arcs = Vec::new();
        let mut acc: u64 = 0;
        let mut in_arc = false;

        for &b in content {
            // leading 0x80 is a non-minimal subidentifier
            if !in_arc && b == 0x80 {
                return Err(DerError::InvalidOid);
            }
            if acc > (u64::MAX >> 7) {
                return Err(DerError::InvalidOid);
            }
            acc = (acc << 7) | u64::from(b & 0x7f);
            in_arc = b & 0x80 != 0;

            if !in_arc {
                if arcs.is_empty() {
                    let (first, second) = match acc {
                        0..=39 => (0, acc),
                        40..=79 => (1, acc - 40),
                        _ => (2, acc - 80),
                    };
                    arcs.push(first);
                    arcs.push(second);
                } else {
                    arcs.push(acc);
                }
                acc = 0;
            }
        }

        if in_arc {
            return Err(DerError::InvalidOid);
        }

        Ok(ObjectIdentifier { arcs })
    }

    pub fn dotted(&self) -> String {
        self.to_string()
    }

    pub fn is(&self, arcs: &[u64]) -> bool {
        self.arcs == arcs
    }

    pub fn attribute_name(&self) -> Option<&'static str> {
        lookup(ATTRIBUTE_NAMES, &self.arcs)
    }

    pub fn algorithm_name(&self) -> Option<&'static str> {
        lookup(ALGORITHM_NAMES, &self.arcs)
    }

    pub fn extension_name(&self) -> Option<&'static str> {
        lookup(EXTENSION_NAMES, &self.arcs)
    }

    /// `"<name> (<dotted>)"` when the algorithm is known, else the dotted form.
    pub fn describe_algorithm(&self) -> String {
        match self.algorithm_name() {
            Some(name) => format!("{} ({})", name, self),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

fn lookup(table: &[(&'static [u64], &'static str)], arcs: &[u64]) -> Option<&'static str> {
    table
        .iter()
        .find(|(oid, _)| *oid == arcs)
        .map(|(_, name)| *name)
}

pub const EC_PUBLIC_KEY: &[u64] = &[1, 2, 840, 10045, 2, 1];

/// Distinguished name attribute types.
pub const ATTRIBUTE_NAMES: &[(&[u64], &str)] = &[
    (&[2, 5, 4, 3], "CN"),
    (&[2, 5, 4, 4], "SN"),
    (&[2, 5, 4, 5], "serialNumber"),
    (&[2, 5, 4, 6], "C"),
    (&[2, 5, 4, 7], "L"),
    (&[2, 5, 4, 8], "ST"),
    (&[2, 5, 4, 9], "street"),
    (&[2, 5, 4, 10], "O"),
    (&[2, 5, 4, 11], "OU"),
    (&[2, 5, 4, 12], "title"),
    (&[2, 5, 4, 42], "givenName"),
    (&[1, 2, 840, 113549, 1, 9, 1], "emailAddress"),
    (&[0, 9, 2342, 19200300, 100, 1, 1], "UID"),
    (&[0, 9, 2342, 19200300, 100, 1, 25], "DC"),
];

/// Signature, public key and named curve algorithms.
pub const ALGORITHM_NAMES: &[(&[u64], &str)] = &[
    (&[1, 2, 840, 113549, 1, 1, 1], "rsaEncryption"),
    (&[1, 2, 840, 113549, 1, 1, 4], "md5WithRSAEncryption"),
    (&[1, 2, 840, 113549, 1, 1, 5], "sha1WithRSAEncryption"),
    (&[1, 2, 840, 113549, 1, 1, 10], "rsassaPss"),
    (&[1, 2, 840, 113549, 1, 1, 11], "sha256WithRSAEncryption"),
    (&[1, 2, 840, 113549, 1, 1, 12], "sha384WithRSAEncryption"),
    (&[1, 2, 840, 113549, 1, 1, 13], "sha512WithRSAEncryption"),
    (&[1, 2, 840, 10040, 4, 1], "dsa"),
    (&[1, 2, 840, 10045, 2, 1], "ecPublicKey"),
    (&[1, 2, 840, 10045, 4, 1], "ecdsaWithSHA1"),
    (&[1, 2, 840, 10045, 4, 3, 2], "ecdsaWithSHA256"),
    (&[1, 2, 840, 10045, 4, 3, 3], "ecdsaWithSHA384"),
    (&[1, 2, 840, 10045, 4, 3, 4], "ecdsaWithSHA512"),
    (&[1, 2, 840, 10045, 3, 1, 7], "prime256v1"),
    (&[1, 3, 132, 0, 10], "secp256k1"),
    (&[1, 3, 132, 0, 34], "secp384r1"),
    (&[1, 3, 132, 0, 35], "secp521r1"),
    (&[1, 3, 101, 110], "X25519"),
    (&[1, 3, 101, 111], "X448"),
    (&[1, 3, 101, 112], "Ed25519"),
    (&[1, 3, 101, 113], "Ed448"),
];

pub const EXTENSION_NAMES: &[(&[u64], &str)] = &[
    (&[2, 5, 29, 14], "subjectKeyIdentifier"),
    (&[2, 5, 29, 15], "keyUsage"),
    (&[2, 5, 29, 17], "subjectAltName"),
    (&[2, 5, 29, 18], "issuerAltName"),
    (&[2, 5, 29, 19], "basicConstraints"),
    (&[2, 5, 29, 30], "nameConstraints"),
    (&[2, 5, 29, 31], "cRLDistributionPoints"),
    (&[2, 5, 29, 32], "certificatePolicies"),
    (&[2, 5, 29, 35], "authorityKeyIdentifier"),
    (&[2, 5, 29, 37], "extKeyUsage"),
    (&[1, 3, 6, 1, 5, 5, 7, 1, 1], "authorityInfoAccess"),
    (&[1, 3, 6, 1, 4, 1, 11129, 2, 4, 2], "ctPrecertificateSCTs"),
];
