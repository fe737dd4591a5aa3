//! Runtime configuration for the responder

/// ResponderConfig carries the startup parameters handed to the core: locations of the CA
/// material and revocation log, listener settings and protocol policy flags. One instance is
/// collected from the command line at startup and held read-only for the process lifetime.
#[derive(Clone, Debug)]
pub struct ResponderConfig {
    /// Path to the revocation log file maintained by the external CA tool
    pub index_file: String,
    /// Path to the CA certificate this responder answers for
    pub ca_cert_file: String,
    /// Path to the responder certificate embedded in responses
    pub resp_cert_file: String,
    /// Path to the responder private key (PKCS#8 or PKCS#1 PEM)
    pub resp_key_file: String,
    /// Address to listen on
    pub address: String,
    /// Port to listen on
    pub port: u16,
    /// Serve over TLS
    pub ssl: bool,
    /// Path to the TLS certificate used when `ssl` is set
    pub tls_cert_file: String,
    /// Path to the TLS key used when `ssl` is set
    pub tls_key_file: String,
    /// Require the application/ocsp-request content type on POST requests
    pub strict: bool,
    /// Number of request nonces remembered by the anti-replay cache
    pub nonce_capacity: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        ResponderConfig {
            index_file: "index.txt".to_string(),
            ca_cert_file: "ca.crt".to_string(),
            resp_cert_file: "responder.crt".to_string(),
            resp_key_file: "responder.key".to_string(),
            address: "0.0.0.0".to_string(),
            port: 8888,
            ssl: false,
            tls_cert_file: "responder.crt".to_string(),
            tls_key_file: "responder.key".to_string(),
            strict: false,
            nonce_capacity: 128,
        }
    }
}
