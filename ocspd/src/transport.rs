//! HTTP transport bridging inbound requests to the protocol engine
//!
//! The wire contract is a single endpoint: `POST /` with the DER request as the body, or
//! `GET /<base64url(request)>` with the request carried in the path. Successful answers are 200
//! with the `application/ocsp-response` content type; any other method, a decode failure or an
//! engine-reported error is an empty 400. No structured protocol-level error body is returned;
//! operational detail goes to the log only.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use base64ct::{Base64Url, Base64UrlUnpadded, Encoding};
use log::{error, info};

use crate::error::{Error, Result};
use crate::responder::OcspResponder;

/// Content type required on POST requests when strict mode is configured
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";
/// Content type carried on successful responses
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// `build_router` wires the two inbound request shapes onto a shared responder context.
pub fn build_router(responder: Arc<OcspResponder>) -> Router {
    Router::new()
        .route("/", any(handle_root))
        .route("/*encoded", any(handle_encoded))
        .with_state(responder)
}

/// `serve` binds the configured listener and dispatches requests until the process terminates,
/// over TLS when so configured.
pub async fn serve(responder: Arc<OcspResponder>) -> Result<()> {
    let addr = format!("{}:{}", responder.config.address, responder.config.port);
    info!(
        "OCSP responder starting on {} with SSL:{}",
        addr, responder.config.ssl
    );

    if responder.config.ssl {
        let sock_addr: SocketAddr = match addr.parse() {
            Ok(a) => a,
            Err(e) => {
                error!("Failed to parse listen address {} with {}", addr, e);
                return Err(Error::ParseError);
            }
        };
        let tls = match RustlsConfig::from_pem_file(
            &responder.config.tls_cert_file,
            &responder.config.tls_key_file,
        )
        .await
        {
            Ok(tls) => tls,
            Err(e) => {
                error!("Failed to load TLS certificate or key with {}", e);
                return Err(Error::StdIoError(e.kind()));
            }
        };
        let app = build_router(responder);
        if let Err(e) = axum_server::bind_rustls(sock_addr, tls)
            .serve(app.into_make_service())
            .await
        {
            return Err(Error::StdIoError(e.kind()));
        }
    } else {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let app = build_router(responder);
        if let Err(e) = axum::serve(listener, app).await {
            return Err(Error::StdIoError(e.kind()));
        }
    }
    Ok(())
}

async fn handle_root(
    State(responder): State<Arc<OcspResponder>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!("Got {} request", method);
    if method != Method::POST {
        info!("Unsupported request method");
        return reject();
    }
    if responder.config.strict && !has_ocsp_content_type(&headers) {
        info!("Strict mode requires correct Content-Type header");
        return reject();
    }
    respond(&responder, &body)
}

async fn handle_encoded(
    State(responder): State<Arc<OcspResponder>>,
    method: Method,
    Path(encoded): Path<String>,
) -> Response {
    info!("Got {} request for /{}", method, encoded);
    if method != Method::GET {
        info!("Unsupported request method");
        return reject();
    }
    let raw_req = match decode_request_path(&encoded) {
        Ok(raw) => raw,
        Err(_e) => {
            info!("Failed to decode request path as base64url");
            return reject();
        }
    };
    respond(&responder, &raw_req)
}

/// `decode_request_path` decodes the path segment of a GET request. Both padded and unpadded
/// base64url are accepted.
pub fn decode_request_path(encoded: &str) -> Result<Vec<u8>> {
    if let Ok(decoded) = Base64Url::decode_vec(encoded) {
        return Ok(decoded);
    }
    match Base64UrlUnpadded::decode_vec(encoded) {
        Ok(decoded) => Ok(decoded),
        Err(_e) => Err(Error::ParseError),
    }
}

fn has_ocsp_content_type(headers: &HeaderMap) -> bool {
    match headers.get(header::CONTENT_TYPE) {
        Some(value) => value.as_bytes() == OCSP_REQUEST_CONTENT_TYPE.as_bytes(),
        None => false,
    }
}

fn respond(responder: &OcspResponder, raw_req: &[u8]) -> Response {
    match responder.handle_request(raw_req) {
        Ok(enc_resp) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, OCSP_RESPONSE_CONTENT_TYPE)],
            enc_resp,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to produce a response with {}", e);
            reject()
        }
    }
}

fn reject() -> Response {
    StatusCode::BAD_REQUEST.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64url_variants_accepted() {
        assert_eq!(vec![0xfb, 0xef, 0xff], decode_request_path("--__").unwrap());
        // unpadded form of a two byte value
        assert_eq!(vec![0xfb, 0xef], decode_request_path("--8").unwrap());
        // padded form of the same value
        assert_eq!(vec![0xfb, 0xef], decode_request_path("--8=").unwrap());
        assert!(decode_request_path("!!!not-base64url!!!").is_err());
        assert!(decode_request_path("abc/def").is_err());
    }
}
