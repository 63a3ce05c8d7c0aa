// TLS profiles for the appliance
//
// The i-soft controller serves a self-signed certificate and negotiates
// only old parameters (RSA key exchange, CBC suites, TLS 1.0 to 1.2).
// The default profile goes through OpenSSL with the cipher policy
// `DEFAULT:@SECLEVEL=0`, peer verification off and no hostname check,
// and sends each request over a fresh HTTP/1.1 connection. A relaxed
// rustls profile is kept for firmware that speaks modern TLS.
// Nothing else in the workspace should use these.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::Empty;
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONNECTION, HOST, HeaderValue, USER_AGENT};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode, SslVersion};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::net::TcpStream;
use tokio_openssl::SslStream;
use tracing::debug;
use url::Url;

use crate::error::{BoxError, Error};

/// OpenSSL cipher policy the controller needs.
pub const LEGACY_CIPHER_LIST: &str = "DEFAULT:@SECLEVEL=0";

// ── OpenSSL connector ───────────────────────────────────────────────

/// One-shot HTTPS client for the appliance built on OpenSSL.
#[derive(Clone)]
pub struct LegacyConnector {
    ssl: SslConnector,
    user_agent: HeaderValue,
}

impl LegacyConnector {
    pub fn new(user_agent: &'static str) -> Result<Self, Error> {
        let mut builder = SslConnector::builder(SslMethod::tls_client()).map_err(openssl_err)?;
        builder
            .set_cipher_list(LEGACY_CIPHER_LIST)
            .map_err(openssl_err)?;
        builder
            .set_min_proto_version(Some(SslVersion::TLS1))
            .map_err(openssl_err)?;
        builder.set_verify(SslVerifyMode::NONE);

        Ok(Self {
            ssl: builder.build(),
            user_agent: HeaderValue::from_static(user_agent),
        })
    }

    /// Open a connection, run the handshake and send a GET for `url`.
    ///
    /// Returns once the response head has arrived; the body is left to
    /// the caller. `http://` URLs skip TLS.
    pub(crate) async fn send(&self, url: &Url) -> Result<Response<Incoming>, BoxError> {
        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
            .ok_or("device URL has no host")?;
        let port = url.port_or_known_default().unwrap_or(443);
        let request = self.request(url, host)?;
        let tcp = TcpStream::connect((host, port)).await?;

        if url.scheme() == "http" {
            return exchange(TokioIo::new(tcp), request).await;
        }

        let mut config = self.ssl.configure()?;
        config.set_verify_hostname(false);
        let mut stream = SslStream::new(config.into_ssl(host)?, tcp)?;
        Pin::new(&mut stream).connect().await?;
        debug!(
            version = stream.ssl().version_str(),
            cipher = stream.ssl().current_cipher().map(|c| c.name()),
            "tls session established"
        );

        exchange(TokioIo::new(stream), request).await
    }

    fn request(&self, url: &Url, host: &str) -> Result<Request<Empty<Bytes>>, BoxError> {
        let target = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_owned(),
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        Ok(Request::get(target)
            .header(HOST, authority)
            .header(USER_AGENT, self.user_agent.clone())
            .header(CONNECTION, "close")
            .body(Empty::<Bytes>::new())?)
    }
}

/// One HTTP/1.1 request over an established stream.
async fn exchange<T>(io: T, request: Request<Empty<Bytes>>) -> Result<Response<Incoming>, BoxError>
where
    T: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(io).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!(error = %e, "device connection closed with error");
        }
    });
    Ok(sender.send_request(request).await?)
}

impl fmt::Debug for LegacyConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyConnector")
            .field("ciphers", &LEGACY_CIPHER_LIST)
            .finish_non_exhaustive()
    }
}

/// Non-2xx status returned over the OpenSSL connector.
#[derive(Debug, thiserror::Error)]
#[error("HTTP status {0}")]
pub struct UnexpectedStatus(pub StatusCode);

fn openssl_err(e: openssl::error::ErrorStack) -> Error {
    Error::Tls(format!("OpenSSL setup failed: {e}"))
}

// ── Relaxed rustls profile ──────────────────────────────────────────

/// Accepts any server certificate, any server name, and any handshake
/// signature.
#[derive(Debug)]
pub struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

/// Relaxed `rustls` configuration: no certificate checks, every TLS 1.2
/// and 1.3 suite of the `ring` provider. Cannot reach units that only
/// offer RSA key exchange.
pub fn relaxed_rustls_config() -> Result<ClientConfig, Error> {
    let mut provider = rustls::crypto::ring::default_provider();
    provider.cipher_suites = rustls::crypto::ring::ALL_CIPHER_SUITES.to_vec();

    let config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(rustls::ALL_VERSIONS)
        .map_err(|e| Error::Tls(format!("unsupported protocol versions: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
        .with_no_client_auth();

    Ok(config)
}
