//! Error types

use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Error type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// ParseError occurs when an artifact could not be parsed, i.e., a request, certificate or key.
    ParseError,
    /// IssuerMismatch occurs when the issuer hashes in a request do not match the CA certificate
    /// this responder is configured to answer for.
    IssuerMismatch,
    /// ReplayDetected occurs when a request presents a nonce value that was already accepted.
    ReplayDetected,
    /// IndexFormatError occurs when the revocation log could not be parsed during a reload. The
    /// previously loaded snapshot remains in service.
    IndexFormatError,
    /// SigningError occurs when the responder key cannot produce a signature over response data.
    SigningError,
    /// Unrecognized occurs when an error condition does not match anything else here.
    Unrecognized,
    /// Asn1Error is used to propagate error information from the der crate.
    Asn1Error(der::Error),
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    StdIoError(std::io::ErrorKind),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParseError => write!(f, "ParseError"),
            Error::IssuerMismatch => write!(f, "IssuerMismatch"),
            Error::ReplayDetected => write!(f, "ReplayDetected"),
            Error::IndexFormatError => write!(f, "IndexFormatError"),
            Error::SigningError => write!(f, "SigningError"),
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
        }
    }
}

#[test]
fn error_test() {
    let _s = format!("{}", Error::ParseError);
    let _s = format!("{}", Error::IssuerMismatch);
    let _s = format!("{}", Error::ReplayDetected);
    let _s = format!("{}", Error::IndexFormatError);
    let _s = format!("{}", Error::SigningError);
    let _s = format!("{}", Error::Unrecognized);
    let _s = format!("{}", Error::StdIoError(std::io::ErrorKind::NotFound));
}
