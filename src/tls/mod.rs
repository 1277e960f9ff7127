// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! TLS settings for a request
//!
//! `verify`/`cert` style parameters become a [`TlsConfig`]. A lower-level
//! [`SslOverride`] skips that translation and is handed to the transport as is.

mod fingerprint;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use fingerprint::Fingerprint;

use crate::error::{Error, Result};
use crate::proxy::Verify;

/// Whether the peer certificate is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerifyMode {
    None,
    Required,
}

/// Where trusted CA certificates come from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustRoots {
    /// Built-in / platform roots
    Default,
    /// Only the certificates in this PEM file
    File(PathBuf),
}

/// Client certificate for mutual TLS
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientIdentity {
    /// One PEM file holding certificate chain and private key
    Combined(PathBuf),
    /// Separate certificate and key files
    Pair { cert: PathBuf, key: PathBuf },
}

impl From<PathBuf> for ClientIdentity {
    fn from(path: PathBuf) -> Self {
        ClientIdentity::Combined(path)
    }
}

impl From<&str> for ClientIdentity {
    fn from(path: &str) -> Self {
        ClientIdentity::Combined(PathBuf::from(path))
    }
}

impl<C: Into<PathBuf>, K: Into<PathBuf>> From<(C, K)> for ClientIdentity {
    fn from((cert, key): (C, K)) -> Self {
        ClientIdentity::Pair {
            cert: cert.into(),
            key: key.into(),
        }
    }
}

/// Trust and identity configuration for one request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlsConfig {
    pub verify_mode: VerifyMode,
    /// Must equal `verify_mode == Required`; the transport checks hostnames
    /// exactly when it checks certificates
    pub check_hostname: bool,
    pub trust_roots: TrustRoots,
    pub client_identity: Option<ClientIdentity>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        build_tls_config(&Verify::Enabled, None)
    }
}

/// Turn `verify` and `cert` into a [`TlsConfig`]
pub fn build_tls_config(verify: &Verify, cert: Option<&ClientIdentity>) -> TlsConfig {
    let (verify_mode, check_hostname, trust_roots) = match verify {
        Verify::Disabled => (VerifyMode::None, false, TrustRoots::Default),
        Verify::Enabled => (VerifyMode::Required, true, TrustRoots::Default),
        Verify::CaBundle(path) => (VerifyMode::Required, true, TrustRoots::File(path.clone())),
    };
    TlsConfig {
        verify_mode,
        check_hostname,
        trust_roots,
        client_identity: cert.cloned(),
    }
}

/// Fully formed TLS decision supplied by the caller
#[derive(Clone)]
pub enum SslOverride {
    /// Skip certificate verification
    Disabled,
    /// Accept only the certificate with this digest
    Fingerprint(Fingerprint),
    /// Use this rustls configuration unchanged
    Preconfigured(Arc<rustls::ClientConfig>),
}

impl fmt::Debug for SslOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SslOverride::Disabled => write!(f, "Disabled"),
            SslOverride::Fingerprint(fp) => write!(f, "Fingerprint({})", fp),
            SslOverride::Preconfigured(_) => write!(f, "Preconfigured(..)"),
        }
    }
}

/// What the transport receives
#[derive(Debug, Clone)]
pub enum TlsSetting {
    Config(TlsConfig),
    Override(SslOverride),
}

impl TlsSetting {
    /// Choose between a caller override and the `verify`/`cert` translation
    pub fn select(ssl: Option<SslOverride>, verify: &Verify, cert: Option<&ClientIdentity>) -> Self {
        match ssl {
            Some(ssl) => TlsSetting::Override(ssl),
            None => TlsSetting::Config(build_tls_config(verify, cert)),
        }
    }
}

/// PEM material read from disk for a [`TlsConfig`]
#[derive(Debug, Clone, Default)]
pub struct LoadedTls {
    /// Skip certificate and hostname verification
    pub accept_invalid_certs: bool,
    /// Replacement trust roots; `None` keeps the defaults
    pub roots: Option<Vec<reqwest::Certificate>>,
    /// Client identity
    pub identity: Option<reqwest::Identity>,
}

impl TlsConfig {
    /// Read trust roots and client identity from disk
    pub async fn load(&self) -> Result<LoadedTls> {
        if self.check_hostname != (self.verify_mode == VerifyMode::Required) {
            return Err(Error::Config(format!(
                "check_hostname={} cannot be combined with verify_mode={:?}",
                self.check_hostname, self.verify_mode
            )));
        }
        let roots = match &self.trust_roots {
            TrustRoots::Default => None,
            TrustRoots::File(path) => Some(load_ca_bundle(path).await?),
        };
        let identity = match &self.client_identity {
            None => None,
            Some(identity) => Some(load_identity(identity).await?),
        };
        Ok(LoadedTls {
            accept_invalid_certs: self.verify_mode == VerifyMode::None,
            roots,
            identity,
        })
    }
}

const BEGIN_CERT: &str = "-----BEGIN CERTIFICATE-----";

/// Decode every certificate in a PEM bundle.
///
/// Text outside PEM sections (bundle comments) is skipped. A section that is
/// truncated, badly encoded, or silently passed over by the parser is a
/// format error.
pub fn parse_pem_certificates(pem: &[u8]) -> Result<Vec<Vec<u8>>> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .map_err(|e| Error::format(format!("malformed PEM: {}", e)))?;

    let sections = String::from_utf8_lossy(pem).matches(BEGIN_CERT).count();
    if sections != certs.len() {
        return Err(Error::format(format!(
            "found {} certificate sections but decoded {}",
            sections,
            certs.len()
        )));
    }
    Ok(certs)
}

async fn load_ca_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>> {
    let pem = tokio::fs::read(path).await?;
    let certs = parse_pem_certificates(&pem).map_err(|e| match e {
        Error::Format(msg) => Error::format(format!("invalid CA bundle {}: {}", path.display(), msg)),
        other => other,
    })?;
    if certs.is_empty() {
        return Err(Error::format(format!(
            "no certificates found in CA bundle {}",
            path.display()
        )));
    }
    certs
        .iter()
        .map(|der| {
            reqwest::Certificate::from_der(der).map_err(|e| {
                Error::format(format!("invalid certificate in {}: {}", path.display(), e))
            })
        })
        .collect()
}

async fn load_identity(identity: &ClientIdentity) -> Result<reqwest::Identity> {
    let pem = match identity {
        ClientIdentity::Combined(path) => tokio::fs::read(path).await?,
        ClientIdentity::Pair { cert, key } => {
            let mut pem = tokio::fs::read(cert).await?;
            pem.push(b'\n');
            pem.extend(tokio::fs::read(key).await?);
            pem
        }
    };
    reqwest::Identity::from_pem(&pem).map_err(|e| Error::tls(format!("invalid client identity: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ca_pem() -> String {
        let mut params = rcgen::CertificateParams::new(vec!["Test CA".to_string()]);
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        rcgen::Certificate::from_params(params)
            .unwrap()
            .serialize_pem()
            .unwrap()
    }

    #[test]
    fn test_verify_disabled() {
        let config = build_tls_config(&Verify::Disabled, None);
        assert_eq!(config.verify_mode, VerifyMode::None);
        assert!(!config.check_hostname);
        assert_eq!(config.trust_roots, TrustRoots::Default);
    }

    #[test]
    fn test_verify_enabled_and_bundle() {
        let config = TlsConfig::default();
        assert_eq!(config.verify_mode, VerifyMode::Required);
        assert!(config.check_hostname);
        assert_eq!(config.trust_roots, TrustRoots::Default);

        let config = build_tls_config(&Verify::from("/etc/ca.pem"), None);
        assert_eq!(config.trust_roots, TrustRoots::File("/etc/ca.pem".into()));
        assert!(config.check_hostname);
    }

    #[test]
    fn test_client_identity_shapes() {
        let pair = ClientIdentity::from(("client.crt", "client.key"));
        let config = build_tls_config(&Verify::Enabled, Some(&pair));
        assert_eq!(
            config.client_identity,
            Some(ClientIdentity::Pair {
                cert: "client.crt".into(),
                key: "client.key".into(),
            })
        );

        let combined = ClientIdentity::from("client.pem");
        let config = build_tls_config(&Verify::Enabled, Some(&combined));
        assert_eq!(config.client_identity, Some(ClientIdentity::Combined("client.pem".into())));
    }

    #[test]
    fn test_override_skips_builder() {
        let setting = TlsSetting::select(Some(SslOverride::Disabled), &Verify::from("/ca.pem"), None);
        assert!(matches!(setting, TlsSetting::Override(SslOverride::Disabled)));

        let setting = TlsSetting::select(None, &Verify::Disabled, None);
        assert!(matches!(setting, TlsSetting::Config(ref c) if c.verify_mode == VerifyMode::None));
    }

    #[test]
    fn test_pem_certificates() {
        let bundle = format!("# comment\n{}\n{}", ca_pem(), ca_pem());
        assert_eq!(parse_pem_certificates(bundle.as_bytes()).unwrap().len(), 2);
        assert!(parse_pem_certificates(b"nothing here").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_pem_block_is_rejected() {
        let bundle = format!("{}-----BEGIN CERTIFICATE-----\nMIIBtruncated\n", ca_pem());
        assert!(parse_pem_certificates(bundle.as_bytes()).unwrap_err().is_format());
    }

    #[tokio::test]
    async fn test_load_bundle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}{}", ca_pem(), ca_pem()).unwrap();

        let config = build_tls_config(&Verify::CaBundle(file.path().to_path_buf()), None);
        let loaded = config.load().await.unwrap();
        assert_eq!(loaded.roots.map(|r| r.len()), Some(2));
        assert!(!loaded.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_hostname_check_follows_verification() {
        let mut config = TlsConfig::default();
        config.check_hostname = false;
        assert!(matches!(config.load().await, Err(Error::Config(_))));

        let mut config = build_tls_config(&Verify::Disabled, None);
        assert!(config.load().await.unwrap().accept_invalid_certs);
        config.check_hostname = true;
        assert!(matches!(config.load().await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_load_errors() {
        let missing = build_tls_config(&Verify::from("/nonexistent/ca.pem"), None);
        assert!(matches!(missing.load().await, Err(Error::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not a certificate").unwrap();
        let empty = build_tls_config(&Verify::CaBundle(file.path().to_path_buf()), None);
        assert!(empty.load().await.unwrap_err().is_format());
    }
}
