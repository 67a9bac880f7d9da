use chrono::{TimeZone, Utc};
use regex::Regex;
use ring::rand::SystemRandom;
use ring::signature::{self, EcdsaKeyPair, KeyPair};
use rustc_serialize::base64::FromBase64;
use simple_asn1::{ASN1Block, ASN1Class, BigInt, BigUint, OID};
use simple_x509_inspect::*;
use std::fs;
use std::str;

const REGEX: &str = r"(-----BEGIN .*-----\n)((?:(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)*\n)+)(-----END .*-----)";

const COUNTRY: &str = "AU";
const STATE: &str = "Some-State";
const ORGANIZATION: &str = "Internet Widgits Pty Ltd";

const OID_EC_PUBLIC_KEY: &[u64] = &[1, 2, 840, 10045, 2, 1];
const OID_PRIME256V1: &[u64] = &[1, 2, 840, 10045, 3, 1, 7];
const OID_ECDSA_SHA256: &[u64] = &[1, 2, 840, 10045, 4, 3, 2];

enum NameValue {
    PrStr(&'static str),
    Utf8(&'static str),
}

struct Attr {
    oid: Vec<u64>,
    value: NameValue,
}

enum Time {
    Utc(i64),
    Gen(i64),
}

struct CertSpec {
    version: Option<u64>,
    sn: Vec<u8>,
    issuer: Vec<Vec<Attr>>,
    subject: Vec<Vec<Attr>>,
    not_before: Time,
    not_after: Time,
    ext: Vec<(Vec<u64>, bool, Vec<u8>)>,
}

fn pr(oid: &[u64], s: &'static str) -> Vec<Attr> {
    vec![Attr {
        oid: oid.to_vec(),
        value: NameValue::PrStr(s),
    }]
}

fn utf8(oid: &[u64], s: &'static str) -> Vec<Attr> {
    vec![Attr {
        oid: oid.to_vec(),
        value: NameValue::Utf8(s),
    }]
}

fn widgits_name() -> Vec<Vec<Attr>> {
    vec![
        pr(&[2, 5, 4, 6], COUNTRY),        /* countryName */
        utf8(&[2, 5, 4, 8], STATE),        /* stateOrProvinceName */
        utf8(&[2, 5, 4, 10], ORGANIZATION), /* organizationName */
    ]
}

impl CertSpec {
    fn root() -> CertSpec {
        CertSpec {
            version: Some(2),
            sn: vec![0x00, 0xf2, 0xf9, 0xd8, 0x03, 0xd7, 0xb7, 0xd7, 0x34],
            issuer: widgits_name(),
            subject: widgits_name(),
            not_before: Time::Utc(1_619_014_703),
            not_after: Time::Utc(1_650_550_703),
            ext: vec![
                /* basicConstraints CA */
                (vec![2, 5, 29, 19], true, vec![0x30, 0x03, 0x01, 0x01, 0xff]),
                /* keyUsage */
                (vec![2, 5, 29, 15], true, vec![0x03, 0x02, 0x01, 0x06]),
                (vec![1, 2, 3, 4, 5], false, vec![0x0c, 0x02, 0x68, 0x69]),
            ],
        }
    }
}

fn oid_new(id: &[u64]) -> OID {
    OID::new(id.iter().map(|i| BigUint::from(*i)).collect())
}

fn x509_name(name: &[Vec<Attr>]) -> ASN1Block {
    let mut rdns = Vec::new();

    for rdn in name {
        let mut set = Vec::new();
        for a in rdn {
            let value = match a.value {
                NameValue::PrStr(s) => ASN1Block::PrintableString(0, s.to_string()),
                NameValue::Utf8(s) => ASN1Block::UTF8String(0, s.to_string()),
            };
            set.push(ASN1Block::Sequence(
                0,
                vec![ASN1Block::ObjectIdentifier(0, oid_new(&a.oid)), value],
            ));
        }
        rdns.push(ASN1Block::Set(0, set));
    }

    ASN1Block::Sequence(0, rdns)
}

fn x509_time(t: &Time) -> ASN1Block {
    match t {
        Time::Utc(s) => ASN1Block::UTCTime(0, Utc.timestamp_opt(*s, 0).unwrap()),
        Time::Gen(s) => ASN1Block::GeneralizedTime(0, Utc.timestamp_opt(*s, 0).unwrap()),
    }
}

fn version_explicit(val: u64) -> ASN1Block {
    ASN1Block::Explicit(
        ASN1Class::ContextSpecific,
        0,
        BigUint::from(0_u32),
        Box::new(ASN1Block::Integer(0, BigInt::from(val))),
    )
}

fn extension_explicit(ext: &[(Vec<u64>, bool, Vec<u8>)]) -> ASN1Block {
    let mut list = Vec::new();

    for (oid, critical, data) in ext {
        let mut e = vec![ASN1Block::ObjectIdentifier(0, oid_new(oid))];
        if *critical {
            e.push(ASN1Block::Boolean(0, true));
        }
        e.push(ASN1Block::OctetString(0, data.clone()));
        list.push(ASN1Block::Sequence(0, e));
    }

    ASN1Block::Explicit(
        ASN1Class::ContextSpecific,
        0,
        BigUint::from(3_u32),
        Box::new(ASN1Block::Sequence(0, list)),
    )
}

fn context_explicit(tag: u32, inner: ASN1Block) -> ASN1Block {
    ASN1Block::Explicit(
        ASN1Class::ContextSpecific,
        0,
        BigUint::from(tag),
        Box::new(inner),
    )
}

fn unique_id(tag: u32) -> ASN1Block {
    context_explicit(tag, ASN1Block::BitString(0, 16, vec![0x12, 0x34]))
}

fn sign_alg() -> ASN1Block {
    ASN1Block::Sequence(0, vec![ASN1Block::ObjectIdentifier(0, oid_new(OID_ECDSA_SHA256))])
}

fn ec_pub(key: &[u8]) -> ASN1Block {
    let alg = vec![
        ASN1Block::ObjectIdentifier(0, oid_new(OID_EC_PUBLIC_KEY)),
        ASN1Block::ObjectIdentifier(0, oid_new(OID_PRIME256V1)),
    ];

    ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Sequence(0, alg),
            ASN1Block::BitString(0, key.len() * 8, key.to_vec()),
        ],
    )
}

struct Signer {
    rng: SystemRandom,
    key: EcdsaKeyPair,
}

impl Signer {
    fn new() -> Signer {
        let rng = SystemRandom::new();
        let pkcs8 =
            EcdsaKeyPair::generate_pkcs8(&signature::ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
                .unwrap_or_else(|_| panic!("keygen failed"));
        let key = EcdsaKeyPair::from_pkcs8(
            &signature::ECDSA_P256_SHA256_ASN1_SIGNING,
            pkcs8.as_ref(),
            &rng,
        )
        .unwrap_or_else(|_| panic!("bad pkcs8"));

        Signer { rng, key }
    }

    fn public_key(&self) -> &[u8] {
        self.key.public_key().as_ref()
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.key
            .sign(&self.rng, data)
            .unwrap_or_else(|_| panic!("sign() failed"))
            .as_ref()
            .to_vec()
    }
}

fn tbs_body(spec: &CertSpec, signer: &Signer) -> Vec<ASN1Block> {
    let mut body = Vec::new();

    /* Version */
    if let Some(v) = spec.version {
        body.push(version_explicit(v));
    }

    /* Serial Number */
    body.push(ASN1Block::Integer(0, BigInt::from_signed_bytes_be(&spec.sn)));

    /* Signature Algorithm */
    body.push(sign_alg());

    /* Issuer name */
    body.push(x509_name(&spec.issuer));

    /* Validity time */
    body.push(ASN1Block::Sequence(
        0,
        vec![x509_time(&spec.not_before), x509_time(&spec.not_after)],
    ));

    /* Subject name */
    body.push(x509_name(&spec.subject));

    /* Subject Public Key Info */
    body.push(ec_pub(signer.public_key()));

    /* Extensions */
    if !spec.ext.is_empty() {
        body.push(extension_explicit(&spec.ext));
    }

    body
}

fn sign_cert(body: Vec<ASN1Block>, signer: &Signer) -> Vec<u8> {
    let tbs = ASN1Block::Sequence(0, body);
    let data = simple_asn1::to_der(&tbs).unwrap_or_else(|_| panic!("serialize tbs"));
    let sign = signer.sign(&data);

    let cert = ASN1Block::Sequence(
        0,
        vec![tbs, sign_alg(), ASN1Block::BitString(0, sign.len() * 8, sign)],
    );

    simple_asn1::to_der(&cert).unwrap_or_else(|_| panic!("serialize cert"))
}

fn build_cert(spec: &CertSpec, signer: &Signer) -> Vec<u8> {
    sign_cert(tbs_body(spec, signer), signer)
}

fn cert_pem(der: &[u8]) -> String {
    hex_to_pem(&simple_x509_inspect::hex::encode(der), "CERTIFICATE")
        .unwrap_or_else(|e| panic!("hex_to_pem: {}", e))
}

fn pem_to_der(f: &str) -> Option<Vec<u8>> {
    let r = Regex::new(REGEX).ok()?;
    let v = r.replace(f, "$2");
    let b = v.replace('\n', "");
    b.from_base64().ok()
}

fn record(inspection: &Inspection) -> &CertificateRecord {
    match inspection {
        Inspection::Certificate(c) => c,
        Inspection::Failure { error } => panic!("inspection failed: {}", error),
    }
}

fn failure_kind(input: &[u8]) -> &'static str {
    match x509::inspect(input) {
        Ok(_) => panic!("inspection unexpectedly succeeded"),
        Err(e) => e.kind(),
    }
}

#[test]
fn x509_ec_root_inspect() {
    let signer = Signer::new();
    let der = build_cert(&CertSpec::root(), &signer);
    let pem = cert_pem(&der);

    let inspection = inspect_pem(&pem);
    let cert = record(&inspection);

    let subject = format!("C={}, ST={}, O={}", COUNTRY, STATE, ORGANIZATION);
    assert_eq!(cert.version, "3");
    assert_eq!(cert.serial_number, "00f2f9d803d7b7d734");
    assert_eq!(cert.subject, subject);
    assert_eq!(cert.issuer, subject);
    assert_eq!(cert.valid_from, "2021-04-21T14:18:23Z");
    assert_eq!(cert.valid_to, "2022-04-21T14:18:23Z");
    assert!(cert.valid_from < cert.valid_to);
    assert_eq!(
        cert.signature_algorithm,
        "ecdsaWithSHA256 (1.2.840.10045.4.3.2)"
    );
    assert_eq!(
        cert.public_key_algorithm,
        "ecPublicKey (1.2.840.10045.2.1) prime256v1"
    );

    let dotted = Regex::new(r"^[0-2](\.\d+)+$").unwrap();
    assert_eq!(cert.extensions.len(), 3);
    assert!(cert.extensions.iter().all(|e| dotted.is_match(&e.oid)));
    assert_eq!(cert.extensions[0].oid, "2.5.29.19");
    assert_eq!(cert.extensions[0].data, "30030101ff");
    assert_eq!(cert.extensions[0].name, Some("basicConstraints"));
    assert!(cert.extensions[0].critical);
    assert_eq!(cert.extensions[1].name, Some("keyUsage"));
    assert_eq!(cert.extensions[2].oid, "1.2.3.4.5");
    assert_eq!(cert.extensions[2].name, None);
    assert!(!cert.extensions[2].critical);

    let fp = ring::digest::digest(&ring::digest::SHA256, &der);
    assert_eq!(
        cert.fingerprint_sha256,
        simple_x509_inspect::hex::encode(fp.as_ref())
    );
}

#[test]
fn x509_public_key_rewrapped() {
    let signer = Signer::new();
    let der = build_cert(&CertSpec::root(), &signer);
    let inspection = inspect_pem(&cert_pem(&der));
    let cert = record(&inspection);

    let block = pem::decode(&cert.public_key).unwrap_or_else(|e| panic!("{}", e));
    assert_eq!(block.label, "PUBLIC KEY");

    let spki = simple_asn1::to_der(&ec_pub(signer.public_key())).unwrap();
    assert_eq!(block.body, spki);
    assert!(block.body.ends_with(signer.public_key()));
}

#[test]
fn x509_signature_value_verifies() {
    let signer = Signer::new();
    let der = build_cert(&CertSpec::root(), &signer);
    let inspection = inspect_pem(&cert_pem(&der));
    let cert = record(&inspection);

    let root = der::parse(&der, 32).unwrap_or_else(|e| panic!("{}", e));
    let tbs = root.children[0].raw;
    let sig = simple_x509_inspect::hex::decode(&cert.signature_value).unwrap();

    let key =
        signature::UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_ASN1, signer.public_key());
    assert!(key.verify(tbs, &sig).is_ok());
}

#[test]
fn x509_inspect_idempotent() {
    let signer = Signer::new();
    let pem = cert_pem(&build_cert(&CertSpec::root(), &signer));

    let a = inspect_pem(&pem).to_json();
    let b = inspect_pem(&pem).to_json();
    assert_eq!(a, b);
    assert!(!inspect_pem(&pem).is_error());
}

#[test]
fn x509_json_schema() {
    let signer = Signer::new();
    let pem = cert_pem(&build_cert(&CertSpec::root(), &signer));
    let json = inspect_pem(&pem).to_json();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();

    for key in [
        "subject",
        "issuer",
        "validFrom",
        "validTo",
        "serialNumber",
        "version",
        "signatureAlgorithm",
        "publicKeyAlgorithm",
        "publicKey",
    ] {
        assert!(v[key].is_string(), "{} is not a string", key);
    }

    let ext = v["extensions"].as_array().unwrap();
    assert_eq!(ext.len(), 3);
    assert!(ext.iter().all(|e| e["oid"].is_string() && e["data"].is_string()));
    assert!(v.get("error").is_none());
}

#[test]
fn x509_v1_without_extensions() {
    let signer = Signer::new();
    let mut spec = CertSpec::root();
    spec.version = None;
    spec.ext.clear();
    spec.subject = vec![utf8(&[2, 5, 4, 3], "leaf.example")];

    let inspection = inspect_pem(&cert_pem(&build_cert(&spec, &signer)));
    let cert = record(&inspection);
    assert_eq!(cert.version, "1");
    assert_eq!(cert.subject, "CN=leaf.example");
    assert!(cert.extensions.is_empty());
}

#[test]
fn x509_negative_serial_and_generalized_time() {
    let signer = Signer::new();
    let mut spec = CertSpec::root();
    spec.sn = vec![0xff, 0x01];
    spec.not_after = Time::Gen(2_556_144_000); /* 2051-01-01 */

    let inspection = inspect_pem(&cert_pem(&build_cert(&spec, &signer)));
    let cert = record(&inspection);
    assert_eq!(cert.serial_number, "ff01");
    assert_eq!(cert.valid_to, "2051-01-01T00:00:00Z");
    assert!(cert.valid_from < cert.valid_to);
}

#[test]
fn x509_multi_valued_rdn() {
    let signer = Signer::new();
    let mut spec = CertSpec::root();
    spec.subject = vec![
        vec![
            Attr {
                oid: vec![2, 5, 4, 3],
                value: NameValue::Utf8("a"),
            },
            Attr {
                oid: vec![2, 5, 4, 11],
                value: NameValue::Utf8("b"),
            },
        ],
        utf8(&[1, 2, 840, 113549, 1, 9, 1], "ca@example.com"),
        pr(&[1, 2, 3, 4], "x"),
    ];

    let inspection = inspect_pem(&cert_pem(&build_cert(&spec, &signer)));
    assert_eq!(
        record(&inspection).subject,
        "CN=a+OU=b, emailAddress=ca@example.com, 1.2.3.4=x"
    );
}

#[test]
fn x509_raw_der_and_hex_input() {
    let signer = Signer::new();
    let der = build_cert(&CertSpec::root(), &signer);

    let from_der = x509::inspect(&der).unwrap_or_else(|e| panic!("{}", e));
    let hex_text = simple_x509_inspect::hex::encode(&der);
    let from_hex = x509::inspect(hex_text.as_bytes()).unwrap_or_else(|e| panic!("{}", e));
    let from_pem = x509::inspect(cert_pem(&der).as_bytes()).unwrap_or_else(|e| panic!("{}", e));

    assert_eq!(from_der, from_hex);
    assert_eq!(from_der, from_pem);
}

#[test]
fn x509_truncated_is_malformed() {
    let signer = Signer::new();
    let der = build_cert(&CertSpec::root(), &signer);

    for cut in 0..der.len() {
        assert_eq!(failure_kind(&der[..cut]), "MalformedDer", "cut at {}", cut);
    }
}

#[test]
fn x509_length_overrun_and_indefinite() {
    let signer = Signer::new();
    let der = build_cert(&CertSpec::root(), &signer);
    assert_eq!(der[1], 0x82);

    let mut long = der.clone();
    long[2] = long[2].wrapping_add(1);
    assert_eq!(failure_kind(&long), "MalformedDer");

    let mut indefinite = der.clone();
    indefinite[1] = 0x80;
    assert_eq!(failure_kind(&indefinite), "MalformedDer");

    let mut trailing = der;
    trailing.push(0x00);
    assert_eq!(failure_kind(&trailing), "MalformedDer");
}

#[test]
fn x509_missing_field_is_unsupported() {
    let signer = Signer::new();
    let mut body = tbs_body(&CertSpec::root(), &signer);
    body.truncate(4); /* version, serial, signature, issuer */

    let der = sign_cert(body, &signer);
    let inspection = inspect_pem(&cert_pem(&der));
    match inspection {
        Inspection::Failure { error } => {
            assert!(error.starts_with("unsupported structure: validity"), "{}", error)
        }
        Inspection::Certificate(_) => panic!("partial certificate accepted"),
    }
}

#[test]
fn x509_unique_ids_skipped() {
    let signer = Signer::new();

    /* issuerUniqueID and subjectUniqueID go before the extensions */
    let mut body = tbs_body(&CertSpec::root(), &signer);
    let ext = body.pop().unwrap();
    body.push(unique_id(1));
    body.push(unique_id(2));
    body.push(ext);

    let inspection = inspect_pem(&cert_pem(&sign_cert(body, &signer)));
    let cert = record(&inspection);
    assert_eq!(cert.version, "3");
    assert_eq!(cert.extensions.len(), 3);
    assert_eq!(cert.extensions[0].oid, "2.5.29.19");

    /* subjectUniqueID alone, no extensions */
    let mut spec = CertSpec::root();
    spec.ext.clear();
    let mut body = tbs_body(&spec, &signer);
    body.push(unique_id(2));

    let inspection = inspect_pem(&cert_pem(&sign_cert(body, &signer)));
    let cert = record(&inspection);
    let subject = format!("C={}, ST={}, O={}", COUNTRY, STATE, ORGANIZATION);
    assert!(cert.extensions.is_empty());
    assert_eq!(cert.subject, subject);
}

#[test]
fn x509_unexpected_tbs_field() {
    let signer = Signer::new();
    let mut body = tbs_body(&CertSpec::root(), &signer);
    body.push(context_explicit(5, ASN1Block::Null(0)));

    let der = sign_cert(body, &signer);
    let err = x509::inspect(&der).unwrap_err();
    assert_eq!(err.kind(), "UnsupportedStructure");
    assert_eq!(
        err.to_string(),
        "unsupported structure: tbsCertificate: unexpected trailing field"
    );

    /* unique IDs after the extensions are out of order */
    let mut body = tbs_body(&CertSpec::root(), &signer);
    body.push(unique_id(1));
    assert_eq!(failure_kind(&sign_cert(body, &signer)), "UnsupportedStructure");
}

#[test]
fn pem_codec_matches_regex_decoder() {
    let signer = Signer::new();
    let der = build_cert(&CertSpec::root(), &signer);
    let pem = cert_pem(&der);

    assert_eq!(pem_to_der(&pem), Some(der.clone()));
    assert_eq!(
        pem_to_hex(&pem).unwrap(),
        simple_x509_inspect::hex::encode(&der)
    );
    assert!(pem.lines().filter(|l| !l.starts_with("-----")).all(|l| l.len() <= 64));
}

#[test]
fn pem_round_trip_labels() {
    let data: Vec<u8> = (0..=255u8).collect();

    for label in ["CERTIFICATE", "PUBLIC KEY", "X509 CRL", "A"] {
        for n in [0usize, 1, 2, 3, 63, 64, 65, 256] {
            let block = pem::decode(&pem::encode(&data[..n], label)).unwrap();
            assert_eq!(block.label, label);
            assert_eq!(block.body, &data[..n]);
        }
    }
}

#[test]
fn pem_missing_end_marker() {
    let signer = Signer::new();
    let pem = cert_pem(&build_cert(&CertSpec::root(), &signer));
    let cut = pem
        .lines()
        .filter(|l| !l.starts_with("-----END"))
        .collect::<Vec<_>>()
        .join("\n");

    let err = pem_to_hex(&cut).unwrap_err();
    assert_eq!(err.kind(), "MalformedPem");
    assert!(render(pem_to_hex(&cut)).starts_with("Error: "));
}

#[test]
fn hex_round_trip_lowercases() {
    for s in ["", "00", "ABCDEF", "0a1B2c3D", "ffFF"] {
        let bytes = simple_x509_inspect::hex::decode(s).unwrap();
        assert_eq!(simple_x509_inspect::hex::encode(&bytes), s.to_lowercase());
    }
    assert_eq!(
        simple_x509_inspect::hex::decode("0").unwrap_err().kind(),
        "InvalidHex"
    );
}

#[test]
fn sha256_matches_ring() {
    let data: Vec<u8> = (0..600u32).map(|i| (i * 31 % 256) as u8).collect();

    for n in (0..200).chain([255, 256, 447, 448, 511, 512, 513, 600]) {
        let ours = sha256::digest(&data[..n]);
        let theirs = ring::digest::digest(&ring::digest::SHA256, &data[..n]);
        assert_eq!(&ours[..], theirs.as_ref(), "length {}", n);
    }

    assert_eq!(
        sha256_hex("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn x509_system_certificates() {
    let ret = fs::read_dir("/etc/ssl/certs/");
    let paths = match ret {
        Ok(p) => p,
        Err(_) => return, /* skip test */
    };

    let mut counter = 0;

    for path in paths {
        let p = match path {
            Ok(pt) => pt.path().display().to_string(),
            Err(_) => continue,
        };
        let pem = match std::fs::read(&p) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let st = match str::from_utf8(&pem) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let der = match pem_to_der(st) {
            Some(d) => d,
            None => continue,
        };

        let block = pem::decode(st).unwrap_or_else(|e| panic!("{}: {}", p, e));
        assert_eq!(block.body, der, "{}", p);

        let inspection = inspect_pem(st);
        if let Inspection::Failure { error } = &inspection {
            println!("Failed to inspect {}: {}", p, error);
            continue;
        }
        assert_eq!(inspection.to_json(), inspect_pem(st).to_json());
        counter += 1;
    }

    println!("{} certificates are tested", counter);
}
