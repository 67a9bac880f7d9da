//! A simple library for looking inside PEM, hex and X509 data:
//! PEM/hex conversion, SHA-256 digests and certificate inspection.
//! Certificates are read with a small DER tag-length-value walker.

pub mod api;
pub mod der;
pub mod error;
pub mod ext;
pub mod hex;
pub mod oid;
pub mod options;
pub mod pem;
pub mod sha256;
pub mod x509;

pub use api::*;
pub use error::{DerError, Error, HexError, PemError};
pub use ext::*;
pub use options::Options;
pub use pem::PemBlock;
pub use x509::*;
