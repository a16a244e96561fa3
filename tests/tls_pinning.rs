//! Pinning against a local HTTPS server with a generated certificate

#![cfg(feature = "native")]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nativehttp::{DirectoryRoots, Error, NativeHttp, Options, Result};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

struct TlsServer {
    addr: SocketAddr,
    pem: String,
    pin: String,
}

/// Serve `ok` over TLS on 127.0.0.1 with a fresh self-signed certificate
async fn serve_tls() -> TlsServer {
    let certified = rcgen::generate_simple_self_signed(vec!["127.0.0.1".to_string()]).unwrap();
    let pem = certified.cert.pem();
    let pin = format!(
        "sha256/{}",
        STANDARD.encode(Sha256::digest(certified.key_pair.public_key_der()))
    );
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        certified.key_pair.serialize_der(),
    ));

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![certified.cert.der().clone()], key)
    .unwrap();
    let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(stream).await else {
                    return;
                };
                let mut request = [0u8; 4096];
                let _ = tls.read(&mut request).await;
                let _ = tls
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
                    )
                    .await;
                let _ = tls.shutdown().await;
            });
        }
    });

    TlsServer { addr, pem, pin }
}

fn native(assets: &Path, root: &Path) -> NativeHttp {
    NativeHttp::builder()
        .native()
        .assets_dir(assets)
        .directories(DirectoryRoots::under(root))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_matching_certificate_asset_connects() -> Result<()> {
    let server = serve_tls().await;
    let assets = tempfile::tempdir()?;
    std::fs::write(assets.path().join("server.cer"), &server.pem)?;
    let root = tempfile::tempdir()?;

    let response = native(assets.path(), root.path())
        .fetch(
            &format!("https://{}/", server.addr),
            Options::new().ssl_pinning(["server"]),
        )
        .await?;

    assert_eq!(response.status, 200);
    assert_eq!(response.text(), Some("ok"));

    Ok(())
}

#[tokio::test]
async fn test_foreign_certificate_asset_is_rejected() -> Result<()> {
    let server = serve_tls().await;
    let other = rcgen::generate_simple_self_signed(vec!["127.0.0.1".to_string()]).unwrap();
    let assets = tempfile::tempdir()?;
    std::fs::write(assets.path().join("other.cer"), other.cert.pem())?;
    let root = tempfile::tempdir()?;

    let result = native(assets.path(), root.path())
        .fetch(
            &format!("https://{}/", server.addr),
            Options::new().ssl_pinning(["other"]),
        )
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error, Error::Tls { .. }), "unexpected error: {:?}", error);
    assert_eq!(error.rejection().code, Some("SSL_ERROR"));

    Ok(())
}

#[tokio::test]
async fn test_public_key_pinning_still_validates_the_chain() -> Result<()> {
    let server = serve_tls().await;
    let assets = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;

    let result = native(assets.path(), root.path())
        .fetch(
            &format!("https://{}/", server.addr),
            Options::new()
                .ssl_pinning([server.pin.as_str()])
                .pk_pinning(true),
        )
        .await;

    // The pin matches but the self-signed chain is not in the WebPKI roots
    let error = result.unwrap_err();
    assert!(matches!(error, Error::Tls { .. }), "unexpected error: {:?}", error);
    assert_eq!(error.code(), Some("SSL_ERROR"));

    Ok(())
}
