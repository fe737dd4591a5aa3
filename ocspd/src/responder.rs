//! Structures and functions implementing the OCSP protocol engine
//!
//! The engine validates each inbound request against the one issuing CA this responder is
//! configured for, classifies the target serial against the revocation log, and produces a
//! signed basic OCSP response. Requests bound to a different CA are rejected before any index
//! lookup so status information is never produced for an unrelated CA's serial numbers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, info};

use const_oid::db::rfc6960::{ID_PKIX_OCSP_BASIC, ID_PKIX_OCSP_NONCE};
use der::asn1::{BitString, GeneralizedTime, Null, ObjectIdentifier, OctetString};
use der::{AnyRef, Decode, Encode};
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::CrlReason;
use x509_cert::ext::{Extension, Extensions};
use x509_cert::Certificate;
use x509_ocsp::*;

use crate::alg_oids::*;
use crate::config::ResponderConfig;
use crate::error::{Error, Result};
use crate::index::{CertIndex, IndexStatus};
use crate::nonce::NonceCache;
use crate::util::{buffer_to_hex, parse_cert_file, parse_key_file};

/// Seconds in the freshness window placed on either side of the response generation time:
/// thisUpdate sits a day in the past and nextUpdate a day in the future, tolerating clock skew
/// between responder and client.
const UPDATE_WINDOW_SECS: u64 = 86400;

/// OcspResponder is the context object for request handling: the configured CA and responder
/// certificates, the responder signing key, a handle to the revocation-status index and the
/// nonce anti-replay cache. One instance is constructed at startup and shared read-only across
/// concurrent requests.
pub struct OcspResponder {
    /// Startup configuration the responder was built from
    pub config: ResponderConfig,
    /// The CA certificate requests must be bound to
    pub ca_cert: Certificate,
    /// The certificate embedded in responses so clients can validate the signature chain
    pub resp_cert: Certificate,
    enc_ca_subject: Vec<u8>,
    ca_key_bits: Vec<u8>,
    signing_key: SigningKey<Sha256>,
    index: CertIndex,
    nonces: NonceCache,
}

impl OcspResponder {
    /// Instantiates a responder context from the configured paths. The CA certificate, responder
    /// certificate and responder key are required invariants for answering any request, so a
    /// failure to load any of them is an error the caller should treat as fatal.
    pub fn new(config: ResponderConfig) -> Result<Self> {
        let ca_cert = parse_cert_file(&config.ca_cert_file)?;
        let resp_cert = parse_cert_file(&config.resp_cert_file)?;
        let key = parse_key_file(&config.resp_key_file)?;

        let enc_ca_subject = ca_cert.tbs_certificate.subject.to_der()?;
        let ca_key_bits = ca_cert
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes()
            .to_vec();

        let index = CertIndex::new(&config.index_file);
        let nonces = NonceCache::new(config.nonce_capacity);
        Ok(OcspResponder {
            config,
            ca_cert,
            resp_cert,
            enc_ca_subject,
            ca_key_bits,
            signing_key: SigningKey::new(key),
            index,
            nonces,
        })
    }

    /// `verify_issuer` recomputes the hashes of the configured CA certificate's subject name and
    /// public key using the hash algorithm declared in the request's CertID and compares them to
    /// the hashes the request carries. A request prepared against a different CA fails here,
    /// before any index lookup.
    pub fn verify_issuer(&self, cert_id: &CertId) -> Result<()> {
        let name_hash = hash_with(&cert_id.hash_algorithm.oid, &self.enc_ca_subject)?;
        if name_hash.as_slice() != cert_id.issuer_name_hash.as_bytes() {
            info!("Issuer name hash does not match the configured CA");
            return Err(Error::IssuerMismatch);
        }
        let key_hash = hash_with(&cert_id.hash_algorithm.oid, &self.ca_key_bits)?;
        if key_hash.as_slice() != cert_id.issuer_key_hash.as_bytes() {
            info!("Issuer key hash does not match the configured CA");
            return Err(Error::IssuerMismatch);
        }
        Ok(())
    }

    /// `classify` maps an index lookup outcome to a wire status: valid rows answer Good, revoked
    /// rows answer Revoked with the recorded revocation time, and everything else (absent or
    /// expired) answers Unknown. This is a pure mapping with no side effects beyond the lazy
    /// index refresh.
    pub fn classify(&self, serial: &[u8]) -> Result<CertStatus> {
        match self.index.lookup(serial) {
            Some(entry) => match entry.status {
                IndexStatus::Valid => {
                    info!("Certificate with serial 0x{} is valid", entry.serial_hex);
                    Ok(CertStatus::Good(Null))
                }
                IndexStatus::Revoked => {
                    info!("Certificate with serial 0x{} is revoked", entry.serial_hex);
                    let revoked_at = match entry.revoked_at {
                        Some(t) => t,
                        None => return Err(Error::IndexFormatError),
                    };
                    Ok(CertStatus::Revoked(RevokedInfo {
                        revocation_time: ocsp_time(revoked_at.unix_duration().as_secs())?,
                        revocation_reason: Some(CrlReason::Unspecified),
                    }))
                }
                IndexStatus::Expired => {
                    info!("Certificate with serial 0x{} is expired", entry.serial_hex);
                    Ok(CertStatus::Unknown(Null))
                }
            },
            None => {
                info!(
                    "Serial 0x{} not found in revocation log",
                    buffer_to_hex(serial)
                );
                Ok(CertStatus::Unknown(Null))
            }
        }
    }

    /// `handle_request` takes a DER encoded OCSP request, validates it against the configured CA,
    /// classifies the target serial and returns a signed, DER encoded OCSP response. Each request
    /// is handled exactly once; any failure is terminal for that request.
    pub fn handle_request(&self, raw_req: &[u8]) -> Result<Vec<u8>> {
        let req = match OcspRequest::from_der(raw_req) {
            Ok(req) => req,
            Err(e) => {
                info!("Failed to parse OcspRequest with {}", e);
                return Err(Error::Asn1Error(e));
            }
        };
        let request = match req.tbs_request.request_list.first() {
            Some(r) => r,
            None => {
                info!("Rejected OcspRequest with an empty request list");
                return Err(Error::ParseError);
            }
        };

        self.verify_issuer(&request.req_cert)?;

        let serial = request.req_cert.serial_number.as_bytes();
        let cert_status = self.classify(serial)?;

        // the replay check runs before any response is produced; an accepted nonce is echoed
        // back in the response extensions
        let mut response_extensions = None;
        if let Some(nonce) = check_for_nonce_extension(&req.tbs_request.request_extensions) {
            self.nonces.check_and_insert(nonce.extn_value.as_bytes())?;
            response_extensions = Some(vec![nonce.clone()]);
        }

        let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs(),
            Err(_e) => return Err(Error::Unrecognized),
        };
        let single = SingleResponse {
            cert_id: request.req_cert.clone(),
            cert_status,
            this_update: ocsp_time(now - UPDATE_WINDOW_SECS)?,
            next_update: Some(ocsp_time(now + UPDATE_WINDOW_SECS)?),
            single_extensions: None,
        };
        let tbs_response_data = ResponseData {
            version: Version::V1,
            responder_id: ResponderId::ByName(self.resp_cert.tbs_certificate.subject.clone()),
            produced_at: ocsp_time(now)?,
            responses: vec![single],
            response_extensions,
        };

        let enc_response_data = tbs_response_data.to_der()?;
        let signature = match self.signing_key.try_sign(&enc_response_data) {
            Ok(sig) => sig.to_vec(),
            Err(e) => {
                error!("Failed to sign response data with {}", e);
                return Err(Error::SigningError);
            }
        };

        let basic = BasicOcspResponse {
            tbs_response_data,
            signature_algorithm: AlgorithmIdentifierOwned {
                oid: PKIXALG_SHA256_WITH_RSA_ENCRYPTION,
                parameters: Some(AnyRef::NULL.into()),
            },
            signature: BitString::from_bytes(&signature)?,
            certs: Some(vec![self.resp_cert.clone()]),
        };
        let response = OcspResponse {
            response_status: OcspResponseStatus::Successful,
            response_bytes: Some(ResponseBytes {
                response_type: ID_PKIX_OCSP_BASIC,
                response: OctetString::new(basic.to_der()?)?,
            }),
        };
        debug!("Writing response for serial 0x{}", buffer_to_hex(serial));
        Ok(response.to_der()?)
    }
}

/// `hash_with` digests the presented buffer with the algorithm identified by the presented OID.
/// SHA-1, SHA-256, SHA-384 and SHA-512 are supported, covering the hash algorithms OCSP clients
/// declare in CertID.
pub fn hash_with(oid: &ObjectIdentifier, buffer: &[u8]) -> Result<Vec<u8>> {
    match *oid {
        PKIXALG_SHA1 => Ok(Sha1::digest(buffer).to_vec()),
        PKIXALG_SHA256 => Ok(Sha256::digest(buffer).to_vec()),
        PKIXALG_SHA384 => Ok(Sha384::digest(buffer).to_vec()),
        PKIXALG_SHA512 => Ok(Sha512::digest(buffer).to_vec()),
        _ => {
            error!("Unrecognized or unsupported hash algorithm: {}", oid);
            Err(Error::Unrecognized)
        }
    }
}

/// `check_for_nonce_extension` takes the request extensions and returns the nonce extension if
/// one is present.
fn check_for_nonce_extension(exts: &Option<Extensions>) -> Option<&Extension> {
    if let Some(exts) = exts {
        for ext in exts {
            if ext.extn_id == ID_PKIX_OCSP_NONCE {
                debug!("Detected nonce extension");
                return Some(ext);
            }
        }
    }
    None
}

fn ocsp_time(secs: u64) -> Result<OcspGeneralizedTime> {
    Ok(OcspGeneralizedTime::from(
        GeneralizedTime::from_unix_duration(Duration::from_secs(secs))?,
    ))
}

#[test]
fn test_hash_with() {
    use hex_literal::hex;

    let result = hash_with(&PKIXALG_SHA1, "abc".as_bytes()).unwrap();
    assert_eq!(result, hex!("A9993E364706816ABA3E25717850C26C9CD0D89D"));

    let result = hash_with(&PKIXALG_SHA256, "abc".as_bytes()).unwrap();
    assert_eq!(
        result,
        hex!("BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD")
    );

    assert!(hash_with(&PKIXALG_SHA384, "abc".as_bytes()).is_ok());
    assert!(hash_with(&PKIXALG_SHA512, "abc".as_bytes()).is_ok());
    assert_eq!(
        Some(Error::Unrecognized),
        hash_with(&PKIXALG_RSA_ENCRYPTION, "abc".as_bytes()).err()
    );
}
