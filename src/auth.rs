// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Basic-auth credentials and normalization of the shapes callers pass in

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Canonical basic-auth credentials
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicAuth {
    /// Login
    pub login: String,
    /// Password, empty when none was given
    pub password: String,
}

impl BasicAuth {
    /// Create credentials
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Encode as an `Authorization` header value
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.login, self.password);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }

    /// Decode an `Authorization: Basic ...` header value
    pub fn decode(header: &str) -> Result<Self> {
        let (scheme, encoded) = header
            .trim()
            .split_once(' ')
            .ok_or_else(|| Error::format("authorization header has no credentials"))?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(Error::format(format!("unknown authorization scheme '{}'", scheme)));
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::format(format!("invalid base64 credentials: {}", e)))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|e| Error::format(format!("credentials are not UTF-8: {}", e)))?;
        let (login, password) = decoded
            .split_once(':')
            .ok_or_else(|| Error::format("credentials have no ':' separator"))?;
        Ok(Self::new(login, password))
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl<L: Into<String>, P: Into<String>> From<(L, P)> for BasicAuth {
    fn from((login, password): (L, P)) -> Self {
        Self::new(login, password)
    }
}

/// Basic-auth object in the shape used by requests-compatible code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBasicAuth {
    pub username: String,
    pub password: String,
}

/// Digest-auth object in the shape used by requests-compatible code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpDigestAuth {
    pub username: String,
    pub password: String,
}

/// Whatever a caller handed in as `auth`
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Already canonical
    Basic(BasicAuth),
    /// `(user, password)`
    Pair(String, String),
    /// Foreign basic-auth object
    HttpBasic(HttpBasicAuth),
    /// Foreign digest-auth object
    HttpDigest(HttpDigestAuth),
    /// Bearer token
    Bearer(String),
    /// Anything else, described by kind
    Other(String),
}

impl Credentials {
    /// Short description used in error messages; never includes secrets
    pub fn kind(&self) -> String {
        match self {
            Credentials::Basic(_) => "basic auth".to_string(),
            Credentials::Pair(..) => "credential pair".to_string(),
            Credentials::HttpBasic(_) => "http basic auth".to_string(),
            Credentials::HttpDigest(_) => "http digest auth".to_string(),
            Credentials::Bearer(_) => "bearer token".to_string(),
            Credentials::Other(kind) => kind.clone(),
        }
    }
}

impl From<BasicAuth> for Credentials {
    fn from(auth: BasicAuth) -> Self {
        Credentials::Basic(auth)
    }
}

impl From<(&str, &str)> for Credentials {
    fn from((login, password): (&str, &str)) -> Self {
        Credentials::Pair(login.to_string(), password.to_string())
    }
}

impl From<(String, String)> for Credentials {
    fn from((login, password): (String, String)) -> Self {
        Credentials::Pair(login, password)
    }
}

impl From<HttpBasicAuth> for Credentials {
    fn from(auth: HttpBasicAuth) -> Self {
        Credentials::HttpBasic(auth)
    }
}

impl From<HttpDigestAuth> for Credentials {
    fn from(auth: HttpDigestAuth) -> Self {
        Credentials::HttpDigest(auth)
    }
}

/// Coerce caller credentials into [`BasicAuth`]
pub fn normalize_auth(auth: Option<Credentials>) -> Result<Option<BasicAuth>> {
    let auth = match auth {
        Some(auth) => auth,
        None => return Ok(None),
    };

    match auth {
        Credentials::Basic(basic) => Ok(Some(basic)),
        Credentials::Pair(login, password) => Ok(Some(BasicAuth::new(login, password))),
        Credentials::HttpBasic(HttpBasicAuth { username, password }) => {
            Ok(Some(BasicAuth::new(username, password)))
        }
        Credentials::HttpDigest(_) => Err(Error::not_implemented("digest authentication")),
        other => Err(Error::unsupported_auth(other.kind())),
    }
}
