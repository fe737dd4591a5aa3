//! Command line argument processing

use clap::Parser;

use ocspd::ResponderConfig;

/// Arguments for the ocspd application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct OcspdArgs {
    /// Full path and filename of the revocation log file maintained by the CA tool
    #[arg(long, default_value = "index.txt")]
    pub index: String,

    /// Full path and filename of the CA certificate this responder answers for
    #[arg(long, default_value = "ca.crt")]
    pub ca_cert: String,

    /// Full path and filename of the responder certificate
    #[arg(long, default_value = "responder.crt")]
    pub resp_cert: String,

    /// Full path and filename of the responder private key (PKCS#8 or PKCS#1 PEM)
    #[arg(long, default_value = "responder.key")]
    pub resp_key: String,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub address: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8888)]
    pub port: u16,

    /// Serve over TLS
    #[arg(long)]
    pub ssl: bool,

    /// Full path and filename of the TLS certificate (defaults to the responder certificate)
    #[arg(long)]
    pub tls_cert: Option<String>,

    /// Full path and filename of the TLS key (defaults to the responder key)
    #[arg(long)]
    pub tls_key: Option<String>,

    /// Require the application/ocsp-request content type on POST requests
    #[arg(long)]
    pub strict: bool,

    /// Number of request nonces remembered by the anti-replay cache
    #[arg(long, default_value_t = 128)]
    pub nonce_capacity: usize,

    /// Full path and filename of YAML-formatted logging configuration information
    #[arg(long)]
    pub logging_config: Option<String>,
}

impl OcspdArgs {
    /// Collects the parsed arguments into a [`ResponderConfig`].
    pub fn to_config(&self) -> ResponderConfig {
        ResponderConfig {
            index_file: self.index.clone(),
            ca_cert_file: self.ca_cert.clone(),
            resp_cert_file: self.resp_cert.clone(),
            resp_key_file: self.resp_key.clone(),
            address: self.address.clone(),
            port: self.port,
            ssl: self.ssl,
            tls_cert_file: self.tls_cert.clone().unwrap_or_else(|| self.resp_cert.clone()),
            tls_key_file: self.tls_key.clone().unwrap_or_else(|| self.resp_key.clone()),
            strict: self.strict,
            nonce_capacity: self.nonce_capacity,
        }
    }
}
