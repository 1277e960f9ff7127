// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! TLS handshakes against a local server with an rcgen-issued chain

use std::io::Write;
use std::sync::Arc;

use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa};
use simplereq::{
    ClientConfig, Fingerprint, MapEnvironment, RequestOptions, SslOverride,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;

type Client = simplereq::Client;

struct Pki {
    ca_pem: String,
    server_der: Vec<u8>,
    server_key_der: Vec<u8>,
    ca: Certificate,
}

fn ca(name: &str) -> Certificate {
    let mut params = CertificateParams::new(vec![]);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.distinguished_name.push(DnType::CommonName, name);
    Certificate::from_params(params).unwrap()
}

fn issue(ca: &Certificate, name: &str) -> (Vec<u8>, Vec<u8>, String, String) {
    let mut params = CertificateParams::new(vec![name.to_string()]);
    params.distinguished_name.push(DnType::CommonName, name);
    let cert = Certificate::from_params(params).unwrap();
    (
        cert.serialize_der_with_signer(ca).unwrap(),
        cert.serialize_private_key_der(),
        cert.serialize_pem_with_signer(ca).unwrap(),
        cert.serialize_private_key_pem(),
    )
}

fn pki() -> Pki {
    let ca = ca("simplereq test CA");
    let (server_der, server_key_der, _, _) = issue(&ca, "localhost");
    Pki {
        ca_pem: ca.serialize_pem().unwrap(),
        server_der,
        server_key_der,
        ca,
    }
}

/// Serve `ok` over TLS on an ephemeral port, one response per connection
async fn serve(config: rustls::ServerConfig) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(stream).await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tls.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let _ = tls
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                    .await;
                let _ = tls.shutdown().await;
            });
        }
    });

    port
}

fn server_config(pki: &Pki) -> rustls::ServerConfig {
    rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(
            vec![rustls::Certificate(pki.server_der.clone())],
            rustls::PrivateKey(pki.server_key_der.clone()),
        )
        .unwrap()
}

fn bundle(pem: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(pem.as_bytes()).unwrap();
    file
}

fn client() -> Client {
    Client::with_environment(ClientConfig::default(), MapEnvironment::new())
}

#[tokio::test]
async fn test_handshake_with_matching_ca() {
    let pki = pki();
    let port = serve(server_config(&pki)).await;
    let ca = bundle(&pki.ca_pem);

    let response = client()
        .get(
            &format!("https://localhost:{}/", port),
            RequestOptions::new().verify(ca.path().to_path_buf()),
        )
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_handshake_with_wrong_ca_fails() {
    let pki = pki();
    let port = serve(server_config(&pki)).await;
    let other = ca("unrelated CA");
    let wrong = bundle(&other.serialize_pem().unwrap());

    let err = client()
        .get(
            &format!("https://localhost:{}/", port),
            RequestOptions::new().verify(wrong.path().to_path_buf()),
        )
        .await
        .unwrap_err();
    assert!(err.is_transport(), "{}", err);
}

#[tokio::test]
async fn test_ca_bundle_from_environment() {
    let pki = pki();
    let port = serve(server_config(&pki)).await;
    let ca = bundle(&pki.ca_pem);

    let env = MapEnvironment::new().set("REQUESTS_CA_BUNDLE", ca.path().to_string_lossy());
    let client: Client = Client::with_environment(ClientConfig::default(), env);
    let response = client
        .get(&format!("https://localhost:{}/", port), RequestOptions::new())
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_verification_disabled() {
    let pki = pki();
    let port = serve(server_config(&pki)).await;
    let url = format!("https://localhost:{}/", port);

    let response = client().get(&url, RequestOptions::new().verify(false)).await.unwrap();
    assert!(response.is_success());

    let response = client().get(&url, RequestOptions::new().verify_ssl(false)).await.unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_fingerprint_pin() {
    let pki = pki();
    let port = serve(server_config(&pki)).await;
    let url = format!("https://localhost:{}/", port);
    let client = client();

    let pinned = Fingerprint::of_der(&pki.server_der);
    let response = client.get(&url, RequestOptions::new().fingerprint(pinned)).await.unwrap();
    assert!(response.is_success());

    let wrong = Fingerprint::of_der(b"some other certificate");
    let err = client
        .get(&url, RequestOptions::new().ssl(SslOverride::Fingerprint(wrong)))
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_preconfigured_context() {
    let pki = pki();
    let port = serve(server_config(&pki)).await;

    let mut roots = rustls::RootCertStore::empty();
    roots
        .add(&rustls::Certificate(pki.ca.serialize_der().unwrap()))
        .unwrap();
    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let response = client()
        .get(
            &format!("https://localhost:{}/", port),
            RequestOptions::new().ssl_context(Arc::new(config)),
        )
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_client_certificate() {
    let pki = pki();
    let client_ca = ca("simplereq client CA");
    let (_, _, client_cert_pem, client_key_pem) = issue(&client_ca, "client.test");

    let mut client_roots = rustls::RootCertStore::empty();
    client_roots
        .add(&rustls::Certificate(client_ca.serialize_der().unwrap()))
        .unwrap();
    let config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_client_cert_verifier(Arc::new(
            rustls::server::AllowAnyAuthenticatedClient::new(client_roots),
        ))
        .with_single_cert(
            vec![rustls::Certificate(pki.server_der.clone())],
            rustls::PrivateKey(pki.server_key_der.clone()),
        )
        .unwrap();
    let port = serve(config).await;
    let url = format!("https://localhost:{}/", port);
    let ca = bundle(&pki.ca_pem);

    let cert = bundle(&client_cert_pem);
    let key = bundle(&client_key_pem);
    let response = client()
        .get(
            &url,
            RequestOptions::new()
                .verify(ca.path().to_path_buf())
                .cert((cert.path(), key.path())),
        )
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "ok");

    let without = client()
        .get(&url, RequestOptions::new().verify(ca.path().to_path_buf()))
        .await;
    assert!(without.is_err());
}
