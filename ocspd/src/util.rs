//! Utility functions for reading certificate and key material from the filesystem

use std::fs;
use std::path::Path;

use log::error;

use der::{Decode, DecodePem};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use x509_cert::Certificate;

use crate::error::{Error, Result};

/// `buffer_to_hex` takes a byte slice and returns a string featuring upper case ASCII hex
/// characters (without commas, spaces, or brackets).
pub fn buffer_to_hex(buffer: &[u8]) -> String {
    hex::encode_upper(buffer)
}

/// `parse_cert_file` reads a PEM or binary DER encoded [`Certificate`] from the indicated file.
pub fn parse_cert_file(filename: &str) -> Result<Certificate> {
    let buf = fs::read(Path::new(filename))?;
    let r = if buf.starts_with(b"-----BEGIN") {
        Certificate::from_pem(&buf)
    } else {
        Certificate::from_der(&buf)
    };
    match r {
        Ok(cert) => Ok(cert),
        Err(e) => {
            error!("Failed to parse certificate from {} with {}", filename, e);
            Err(Error::ParseError)
        }
    }
}

/// `parse_key_file` reads a PEM encoded RSA private key from the indicated file. PKCS#8 and
/// PKCS#1 encodings are accepted.
pub fn parse_key_file(filename: &str) -> Result<RsaPrivateKey> {
    let buf = fs::read_to_string(Path::new(filename))?;
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(&buf) {
        return Ok(key);
    }
    match RsaPrivateKey::from_pkcs1_pem(&buf) {
        Ok(key) => Ok(key),
        Err(e) => {
            error!("Failed to parse private key from {} with {}", filename, e);
            Err(Error::ParseError)
        }
    }
}
