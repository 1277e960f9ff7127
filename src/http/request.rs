// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Per-call request options and the request handed to a transport

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use super::response::Response;
use crate::auth::{BasicAuth, Credentials};
use crate::error::{Error, Result};
use crate::proxy::{ProxyMap, ProxySpec, Verify};
use crate::tls::{ClientIdentity, Fingerprint, SslOverride, TlsSetting};

/// Response callback in the style of requests' `hooks`. Not supported; a
/// request carrying one is refused.
pub type Hook = Arc<dyn Fn(&Response) + Send + Sync>;

/// Request body given as `data`
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// Raw bytes, sent as is
    Bytes(Bytes),
    /// Text, sent as UTF-8
    Text(String),
    /// Form fields, urlencoded
    Form(Vec<(String, String)>),
}

impl From<Bytes> for Data {
    fn from(bytes: Bytes) -> Self {
        Data::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Data::Bytes(bytes.into())
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Data::Text(text)
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Data::Text(text.to_string())
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Data {
    fn from(fields: Vec<(K, V)>) -> Self {
        Data::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Keyword-style options for one request. Everything is optional.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Query parameters appended to the URL
    pub params: Vec<(String, String)>,
    /// Body
    pub data: Option<Data>,
    /// JSON body; cannot be combined with `data`
    pub json: Option<serde_json::Value>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Cookies added for this request only
    pub cookies: Option<Vec<(String, String)>>,
    /// Credentials for basic auth
    pub auth: Option<Credentials>,
    /// Total timeout, overriding the client's
    pub timeout: Option<Duration>,
    /// Follow redirects (defaults to true)
    pub allow_redirects: Option<bool>,
    /// Redirect limit, overriding the client's
    pub max_redirects: Option<usize>,
    /// Scheme → proxy map merged over the environment
    pub proxies: Option<ProxyMap>,
    /// Certificate verification, merged with the environment's CA bundle
    pub verify: Option<Verify>,
    /// Client certificate
    pub cert: Option<ClientIdentity>,
    /// Explicit proxy URL; skips environment resolution
    pub proxy: Option<String>,
    /// Credentials for the explicit proxy
    pub proxy_auth: Option<BasicAuth>,
    /// `Some(false)` disables verification
    pub verify_ssl: Option<bool>,
    /// Certificate pin
    pub fingerprint: Option<Fingerprint>,
    /// Preconfigured rustls client configuration
    pub ssl_context: Option<Arc<rustls::ClientConfig>>,
    /// Lower-level TLS override
    pub ssl: Option<SslOverride>,
    /// Response hooks (unsupported)
    pub hooks: Vec<Hook>,
    /// Streaming response mode (unsupported)
    pub stream: bool,
}

impl RequestOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Set the body
    pub fn data(mut self, data: impl Into<Data>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set a urlencoded form body
    pub fn form<K: Into<String>, V: Into<String>>(mut self, fields: Vec<(K, V)>) -> Self {
        self.data = Some(Data::from(fields));
        self
    }

    /// Set a JSON body
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.json = Some(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a cookie for this request only
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Set credentials
    pub fn auth(mut self, auth: impl Into<Credentials>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Follow redirects or not
    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = Some(allow);
        self
    }

    /// Set max redirects
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }

    /// Set the proxy map
    pub fn proxies(mut self, proxies: ProxyMap) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Set verification
    pub fn verify(mut self, verify: impl Into<Verify>) -> Self {
        self.verify = Some(verify.into());
        self
    }

    /// Set client certificate
    pub fn cert(mut self, cert: impl Into<ClientIdentity>) -> Self {
        self.cert = Some(cert.into());
        self
    }

    /// Use this proxy, ignoring the environment
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Credentials for the explicit proxy
    pub fn proxy_auth(mut self, auth: BasicAuth) -> Self {
        self.proxy_auth = Some(auth);
        self
    }

    /// Enable/disable verification at the TLS layer
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Pin the server certificate
    pub fn fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Use a preconfigured rustls configuration
    pub fn ssl_context(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.ssl_context = Some(config);
        self
    }

    /// Set the TLS override directly
    pub fn ssl(mut self, ssl: SslOverride) -> Self {
        self.ssl = Some(ssl);
        self
    }

    /// Register a response hook
    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Request streaming mode
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Refuse options this client does not implement
    pub(crate) fn check_supported(&self) -> Result<()> {
        if !self.hooks.is_empty() {
            return Err(Error::not_implemented("request hooks"));
        }
        if self.stream {
            return Err(Error::not_implemented("streaming responses"));
        }
        Ok(())
    }

    /// Collapse `ssl`, `verify_ssl`, `fingerprint` and `ssl_context` into one
    /// override. At most one of them may be set.
    pub(crate) fn ssl_override(&self) -> Result<Option<SslOverride>> {
        let mut found: Vec<SslOverride> = Vec::new();
        if let Some(ssl) = &self.ssl {
            found.push(ssl.clone());
        }
        match self.verify_ssl {
            Some(false) => found.push(SslOverride::Disabled),
            Some(true) if found.is_empty() && self.fingerprint.is_none() && self.ssl_context.is_none() => {}
            Some(true) => {
                return Err(Error::format(
                    "verify_ssl cannot be combined with ssl, fingerprint or ssl_context",
                ))
            }
            None => {}
        }
        if let Some(fp) = self.fingerprint {
            found.push(SslOverride::Fingerprint(fp));
        }
        if let Some(config) = &self.ssl_context {
            found.push(SslOverride::Preconfigured(config.clone()));
        }

        if found.len() > 1 {
            return Err(Error::format(
                "ssl, verify_ssl, fingerprint and ssl_context are mutually exclusive",
            ));
        }
        Ok(found.pop())
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("params", &self.params)
            .field("data", &self.data)
            .field("json", &self.json)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("auth", &self.auth.as_ref().map(Credentials::kind))
            .field("timeout", &self.timeout)
            .field("allow_redirects", &self.allow_redirects)
            .field("max_redirects", &self.max_redirects)
            .field("proxies", &self.proxies)
            .field("verify", &self.verify)
            .field("cert", &self.cert)
            .field("proxy", &self.proxy)
            .field("proxy_auth", &self.proxy_auth)
            .field("verify_ssl", &self.verify_ssl)
            .field("fingerprint", &self.fingerprint)
            .field("ssl_context", &self.ssl_context.is_some())
            .field("ssl", &self.ssl)
            .field("hooks", &self.hooks.len())
            .field("stream", &self.stream)
            .finish()
    }
}

/// Redirect handling, part of a transport route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectPolicy {
    /// Return 3xx responses as they are
    None,
    /// Follow up to this many redirects
    Limited(usize),
}

/// Fully resolved request as a transport receives it
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// Request method
    pub method: Method,
    /// Request URL, query included
    pub url: Url,
    /// Request headers, authorization included
    pub headers: HeaderMap,
    /// Encoded body
    pub body: Option<Bytes>,
    /// Proxy to route through
    pub proxy: ProxySpec,
    /// TLS settings
    pub tls: TlsSetting,
    /// Total timeout
    pub timeout: Option<Duration>,
    /// Redirect handling
    pub redirect: RedirectPolicy,
}

impl PreparedRequest {
    /// Start from a method and URL with no proxy and default TLS
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            proxy: ProxySpec::direct(),
            tls: TlsSetting::Config(Default::default()),
            timeout: None,
            redirect: RedirectPolicy::Limited(10),
        }
    }

    /// Append query parameters
    pub fn with_params(mut self, params: &[(String, String)]) -> Self {
        if !params.is_empty() {
            self.url.query_pairs_mut().extend_pairs(params);
        }
        self
    }

    /// Add headers; invalid names or values are a format error
    pub fn with_headers(mut self, headers: &[(String, String)]) -> Result<Self> {
        for (name, value) in headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::format(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| Error::format(format!("invalid value for header '{}': {}", name, e)))?;
            self.headers.append(name, value);
        }
        Ok(self)
    }

    /// Encode `data` or `json` as the body
    pub fn with_body(mut self, data: Option<&Data>, json: Option<&serde_json::Value>) -> Result<Self> {
        let (body, content_type) = match (data, json) {
            (Some(_), Some(_)) => {
                return Err(Error::format("data and json cannot be used at the same time"))
            }
            (None, None) => return Ok(self),
            (None, Some(json)) => (Bytes::from(serde_json::to_vec(json)?), Some("application/json")),
            (Some(Data::Bytes(bytes)), None) => (bytes.clone(), None),
            (Some(Data::Text(text)), None) => {
                (Bytes::from(text.clone()), Some("text/plain; charset=utf-8"))
            }
            (Some(Data::Form(fields)), None) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields)
                    .finish();
                (Bytes::from(encoded), Some("application/x-www-form-urlencoded"))
            }
        };

        if let Some(content_type) = content_type {
            if !self.headers.contains_key(CONTENT_TYPE) {
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }
        self.body = Some(body);
        Ok(self)
    }

    /// Set the `Authorization` header for basic auth
    pub fn with_basic_auth(mut self, auth: Option<&BasicAuth>) -> Result<Self> {
        if let Some(auth) = auth {
            let value = HeaderValue::try_from(auth.encode())
                .map_err(|e| Error::format(format!("invalid credentials: {}", e)))?;
            self.headers.insert(AUTHORIZATION, value);
        }
        Ok(self)
    }

    /// Metadata kept on the response
    pub fn info(&self) -> RequestInfo {
        RequestInfo {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

/// What was sent, as recorded on the response
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Request method
    pub method: Method,
    /// Request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Proxy the request was routed through
    pub proxy: ProxySpec,
}
