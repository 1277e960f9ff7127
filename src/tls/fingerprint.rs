// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Certificate pinning by SHA-256 fingerprint

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, ServerName};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// SHA-256 digest of a server's end-entity certificate (DER)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Build from raw digest bytes. MD5 and SHA-1 sized digests are refused.
    pub fn from_bytes(digest: &[u8]) -> Result<Self> {
        match digest.len() {
            32 => {
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(digest);
                Ok(Self(bytes))
            }
            16 | 20 => Err(Error::format(
                "md5 and sha1 fingerprints are insecure and not supported",
            )),
            n => Err(Error::format(format!("fingerprint has unexpected length {}", n))),
        }
    }

    /// Parse hex, with or without `:` separators
    pub fn from_hex(hex_digest: &str) -> Result<Self> {
        let cleaned: String = hex_digest.chars().filter(|c| *c != ':').collect();
        let bytes = hex::decode(cleaned)
            .map_err(|e| Error::format(format!("invalid fingerprint hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Fingerprint of a DER certificate
    pub fn of_der(der: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(der));
        Self(bytes)
    }

    /// Digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// rustls client configuration that accepts exactly this certificate
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::builder()
            .with_safe_defaults()
            .with_custom_certificate_verifier(Arc::new(FingerprintVerifier { pinned: *self }))
            .with_no_client_auth()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(self.0))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Accepts the server certificate only when its digest equals the pin.
/// Chain and hostname are not checked; the pin replaces both.
struct FingerprintVerifier {
    pinned: Fingerprint,
}

impl ServerCertVerifier for FingerprintVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let actual = Fingerprint::of_der(&end_entity.0);
        if actual == self.pinned {
            Ok(ServerCertVerified::assertion())
        } else {
            tracing::warn!(expected = %self.pinned, actual = %actual, "certificate fingerprint mismatch");
            Err(rustls::Error::General(format!(
                "fingerprint mismatch: expected {}, got {}",
                self.pinned, actual
            )))
        }
    }
}
