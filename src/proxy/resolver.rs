// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Per-request proxy selection

use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

use super::env::{Environment, ProxyMap, NO_PROXY_KEY};
use super::matcher::HostNameMatcher;
use crate::auth::BasicAuth;
use crate::error::{Error, Result};

/// Proxy to use for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProxySpec {
    /// Proxy URL with credentials removed
    pub proxy_url: Option<Url>,
    /// Credentials taken from the proxy URL or supplied by the caller
    pub credentials: Option<BasicAuth>,
}

impl ProxySpec {
    /// No proxy
    pub fn direct() -> Self {
        Self::default()
    }

    /// Explicit proxy, bypassing environment resolution entirely
    pub fn explicit(proxy_url: Url, credentials: Option<BasicAuth>) -> Self {
        Self {
            proxy_url: Some(proxy_url),
            credentials,
        }
    }

    /// Check if the request goes direct
    pub fn is_direct(&self) -> bool {
        self.proxy_url.is_none()
    }
}

impl fmt::Display for ProxySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.proxy_url, &self.credentials) {
            (None, _) => write!(f, "direct"),
            (Some(url), None) => write!(f, "{}", url),
            (Some(url), Some(auth)) => write!(f, "{} (as {})", url, auth.login),
        }
    }
}

/// Check whether `url` must skip the proxy.
///
/// The NO_PROXY list is consulted first; the platform bypass rule, if the
/// environment has one, is only asked about the bare hostname.
pub fn should_bypass_proxies(url: &Url, no_proxy: Option<&str>, env: &dyn Environment) -> bool {
    let host = match url.host_str() {
        Some(host) => host,
        None => return false,
    };

    if let Some(no_proxy) = no_proxy.filter(|s| !s.is_empty()) {
        let port = url.port_or_known_default().map(|p| p.to_string());
        if HostNameMatcher::from_no_proxy(no_proxy).matches(host, port.as_deref()) {
            return true;
        }
    }

    env.proxy_bypass(host).unwrap_or(false)
}

/// Pick the proxy for `url` from a merged proxy map
pub fn resolve_proxy(url: &Url, proxies: &ProxyMap, env: &dyn Environment) -> Result<ProxySpec> {
    if url.scheme() == NO_PROXY_KEY {
        return Err(Error::format(format!(
            "'{}' is not a valid scheme for a request URL",
            url.scheme()
        )));
    }

    if should_bypass_proxies(url, proxies.no_proxy(), env) {
        tracing::debug!(url = %url, "proxy bypassed");
        return Ok(ProxySpec::direct());
    }

    let raw = match proxies.get(url.scheme()) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(ProxySpec::direct()),
    };

    let spec = split_proxy_credentials(raw)?;
    tracing::debug!(url = %url, proxy = %spec, "proxy selected");
    Ok(spec)
}

/// Parse a proxy URL, moving any `user:password@` into credentials.
///
/// A bare `host:port` is taken to be an http proxy.
pub fn split_proxy_credentials(raw: &str) -> Result<ProxySpec> {
    let raw = raw.trim();
    let mut proxy_url = if raw.contains("://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("http://{}", raw))
    }
    .map_err(|e| Error::format(format!("invalid proxy URL '{}': {}", raw, e)))?;

    if proxy_url.host_str().is_none() {
        return Err(Error::format(format!("proxy URL '{}' has no host", raw)));
    }

    let credentials = if proxy_url.username().is_empty() && proxy_url.password().is_none() {
        None
    } else {
        let login = decode(proxy_url.username())?;
        let password = decode(proxy_url.password().unwrap_or(""))?;
        // cannot fail: the URL has a host
        let _ = proxy_url.set_username("");
        let _ = proxy_url.set_password(None);
        Some(BasicAuth::new(login, password))
    };

    Ok(ProxySpec {
        proxy_url: Some(proxy_url),
        credentials,
    })
}

fn decode(component: &str) -> Result<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| Error::format(format!("proxy credentials are not UTF-8: {}", e)))
}
