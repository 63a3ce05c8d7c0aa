#![allow(clippy::unwrap_used)]
// Handshake tests against a local OpenSSL server that only offers what
// the controller offers: a self-signed certificate and RSA key exchange
// with a CBC suite.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::ssl::{Ssl, SslContext, SslMethod, SslVersion};
use openssl::x509::{X509, X509Builder, X509NameBuilder};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_openssl::SslStream;
use url::Url;

use isoft_api::{ErrorKind, TlsMode, Transport, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

fn self_signed() -> (PKey<Private>, X509) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "i-soft").unwrap();
    let name = name.build();

    let mut cert = X509Builder::new().unwrap();
    cert.set_version(2).unwrap();
    cert.set_subject_name(&name).unwrap();
    cert.set_issuer_name(&name).unwrap();
    cert.set_pubkey(&key).unwrap();
    cert.set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    cert.set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    cert.sign(&key, MessageDigest::sha256()).unwrap();
    (key, cert.build())
}

/// Serve every request with `status_line` and a JSON body whose `data`
/// is the negotiated cipher. Raw request heads are collected.
async fn legacy_device(status_line: &'static str) -> (Url, Arc<Mutex<Vec<String>>>) {
    let (key, cert) = self_signed();
    let mut ctx = SslContext::builder(SslMethod::tls_server()).unwrap();
    ctx.set_private_key(&key).unwrap();
    ctx.set_certificate(&cert).unwrap();
    ctx.set_cipher_list("AES128-SHA:@SECLEVEL=0").unwrap();
    ctx.set_max_proto_version(Some(SslVersion::TLS1_2)).unwrap();
    let ctx = ctx.build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let heads = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&heads);

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let ssl = Ssl::new(&ctx).unwrap();
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let mut stream = SslStream::new(ssl, tcp).unwrap();
                if Pin::new(&mut stream).accept().await.is_err() {
                    return;
                }
                let cipher = stream
                    .ssl()
                    .current_cipher()
                    .map(|c| c.name())
                    .unwrap_or_default();

                let mut head = Vec::new();
                let mut chunk = [0_u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }
                log.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).into_owned());

                let body = json!({ "status": "ok", "data": cipher }).to_string();
                let reply = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    let url = Url::parse(&format!(
        "https://127.0.0.1:{port}/?group=register&command=show&msgnumber=1"
    ))
    .unwrap();
    (url, heads)
}

fn config(tls: TlsMode, attempts: u32) -> TransportConfig {
    TransportConfig {
        tls,
        ..TransportConfig::default()
    }
    .with_timeout(Duration::from_secs(5))
    .with_max_attempts(attempts)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_default_profile_negotiates_rsa_cbc_suite() {
    let (url, heads) = legacy_device("200 OK").await;
    let transport = Transport::new(&TransportConfig::default()).unwrap();

    let body: Value = transport.submit(&url).await.unwrap();
    assert_eq!(body, json!({ "status": "ok", "data": "AES128-SHA" }));

    let heads = heads.lock().unwrap();
    assert_eq!(heads.len(), 1);
    let head = heads[0].to_lowercase();
    assert!(
        head.starts_with("get /?group=register&command=show&msgnumber=1 http/1.1\r\n"),
        "{head}"
    );
    assert!(head.contains("user-agent: isoft/"), "{head}");
}

#[tokio::test]
async fn test_rustls_profile_cannot_reach_legacy_unit() {
    let (url, heads) = legacy_device("200 OK").await;
    let transport = Transport::new(&config(TlsMode::RelaxedRustls, 2)).unwrap();

    let err = transport.submit::<Value>(&url).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Communication);
    assert!(matches!(
        err,
        isoft_api::Error::Communication { attempts: 2, .. }
    ));
    assert!(heads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_forbidden_over_legacy_tls_is_authentication_error() {
    let (url, heads) = legacy_device("403 Forbidden").await;
    let transport = Transport::new(&config(TlsMode::LegacyDevice, 4)).unwrap();

    let err = transport.submit::<Value>(&url).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.status(), Some(403));
    assert_eq!(heads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_server_error_over_legacy_tls_is_retried() {
    let (url, heads) = legacy_device("500 Internal Server Error").await;
    let transport = Transport::new(&config(TlsMode::LegacyDevice, 2)).unwrap();

    let err = transport.submit::<Value>(&url).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Communication);
    assert_eq!(err.status(), Some(500));
    assert_eq!(heads.lock().unwrap().len(), 2);
}
