// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Connection layer behind the client
//!
//! reqwest fixes proxy and TLS settings when a `reqwest::Client` is built, so
//! [`ReqwestTransport`] keeps one client per route (proxy, TLS, redirect
//! policy) and shares its connection pool between requests on that route.
//! At most [`ROUTE_CACHE_CAPACITY`] clients are kept; the least recently used
//! one is dropped, along with its idle connections, to make room.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;

use super::cookie::CookieJar;
use super::request::{PreparedRequest, RedirectPolicy};
use super::response::TransportResponse;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::proxy::ProxySpec;
use crate::tls::{Fingerprint, SslOverride, TlsConfig, TlsSetting};

/// Maximum number of per-route clients a transport keeps
pub const ROUTE_CACHE_CAPACITY: usize = 16;

/// A pooled HTTP connection layer that a session owns
#[async_trait]
pub trait Transport: Send + Sync + Sized + 'static {
    /// Open a new transport
    async fn create(config: &ClientConfig) -> Result<Self>;

    /// Check if the transport was closed and can no longer send
    fn is_closed(&self) -> bool;

    /// Send one request. A closed transport answers with [`Error::Closed`].
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse>;

    /// Release pooled connections
    async fn close(&self);

    /// Handle to the cookie jar currently in use
    fn cookie_jar(&self) -> CookieJar;

    /// Install `jar`, returning the previous one
    fn replace_cookie_jar(&self, jar: CookieJar) -> CookieJar;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TlsKey {
    Config(TlsConfig),
    Disabled,
    Fingerprint(Fingerprint),
    // Address of the shared config; the cached entry keeps the Arc alive
    Preconfigured(usize),
}

impl From<&TlsSetting> for TlsKey {
    fn from(setting: &TlsSetting) -> Self {
        match setting {
            TlsSetting::Config(config) => TlsKey::Config(config.clone()),
            TlsSetting::Override(SslOverride::Disabled) => TlsKey::Disabled,
            TlsSetting::Override(SslOverride::Fingerprint(fp)) => TlsKey::Fingerprint(*fp),
            TlsSetting::Override(SslOverride::Preconfigured(config)) => {
                TlsKey::Preconfigured(Arc::as_ptr(config) as usize)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    proxy: ProxySpec,
    tls: TlsKey,
    redirect: RedirectPolicy,
}

struct Route {
    client: reqwest::Client,
    last_used: AtomicU64,
    _pinned: Option<Arc<rustls::ClientConfig>>,
}

/// Default transport backed by reqwest
pub struct ReqwestTransport {
    config: ClientConfig,
    default_headers: HeaderMap,
    routes: DashMap<RouteKey, Route>,
    clock: AtomicU64,
    cookie_jar: RwLock<CookieJar>,
    closed: AtomicBool,
}

impl ReqwestTransport {
    /// Create a transport; no connection is opened until the first request
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::Config(format!("invalid default header '{}': {}", name, e)))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| Error::Config(format!("invalid default header value: {}", e)))?;
            default_headers.append(name, value);
        }

        Ok(Self {
            config,
            default_headers,
            routes: DashMap::new(),
            clock: AtomicU64::new(0),
            cookie_jar: RwLock::new(CookieJar::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Number of distinct routes with a live client
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    async fn client_for(&self, request: &PreparedRequest) -> Result<reqwest::Client> {
        let key = RouteKey {
            proxy: request.proxy.clone(),
            tls: TlsKey::from(&request.tls),
            redirect: request.redirect,
        };
        if let Some(route) = self.routes.get(&key) {
            route.last_used.store(self.tick(), Ordering::Relaxed);
            return Ok(route.client.clone());
        }

        let client = self.build_client(&request.proxy, &request.tls, request.redirect).await?;
        tracing::debug!(proxy = %request.proxy, redirect = ?request.redirect, "built client for new route");

        let pinned = match &request.tls {
            TlsSetting::Override(SslOverride::Preconfigured(config)) => Some(config.clone()),
            _ => None,
        };
        // A concurrent request may have built the same route; keep the first
        let client = self
            .routes
            .entry(key)
            .or_insert(Route {
                client,
                last_used: AtomicU64::new(self.tick()),
                _pinned: pinned,
            })
            .client
            .clone();

        while self.routes.len() > ROUTE_CACHE_CAPACITY {
            self.evict_least_recent();
        }
        Ok(client)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn evict_least_recent(&self) {
        let oldest = self
            .routes
            .iter()
            .min_by_key(|entry| entry.value().last_used.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.routes.remove(&key);
            tracing::debug!(proxy = %key.proxy, redirect = ?key.redirect, "evicted least recently used route");
        }
    }

    async fn build_client(
        &self,
        proxy: &ProxySpec,
        tls: &TlsSetting,
        redirect: RedirectPolicy,
    ) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(&self.config.user_agent)
            .default_headers(self.default_headers.clone())
            .cookie_store(false) // cookies go through our jar
            .no_proxy()
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host)
            .pool_idle_timeout(self.config.pool_idle_timeout)
            .redirect(match redirect {
                RedirectPolicy::None => Policy::none(),
                RedirectPolicy::Limited(max) => Policy::limited(max),
            });

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(url) = &proxy.proxy_url {
            let mut reqwest_proxy = reqwest::Proxy::all(url.as_str())
                .map_err(|e| Error::format(format!("invalid proxy URL '{}': {}", url, e)))?;
            if let Some(auth) = &proxy.credentials {
                reqwest_proxy = reqwest_proxy.basic_auth(&auth.login, &auth.password);
            }
            builder = builder.proxy(reqwest_proxy);
        }

        builder = match tls {
            TlsSetting::Config(config) => {
                let loaded = config.load().await?;
                let mut builder = builder.danger_accept_invalid_certs(loaded.accept_invalid_certs);
                if let Some(roots) = loaded.roots {
                    builder = builder.tls_built_in_root_certs(false);
                    for root in roots {
                        builder = builder.add_root_certificate(root);
                    }
                }
                if let Some(identity) = loaded.identity {
                    builder = builder.identity(identity);
                }
                builder
            }
            TlsSetting::Override(SslOverride::Disabled) => builder.danger_accept_invalid_certs(true),
            TlsSetting::Override(SslOverride::Fingerprint(fp)) => {
                builder.use_preconfigured_tls(fp.client_config())
            }
            TlsSetting::Override(SslOverride::Preconfigured(config)) => {
                builder.use_preconfigured_tls(rustls::ClientConfig::clone(config))
            }
        };

        Ok(builder.build()?)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn create(config: &ClientConfig) -> Result<Self> {
        Self::new(config.clone())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let client = self.client_for(&request).await?;
        let jar = self.cookie_jar();

        let mut builder = client.request(request.method.clone(), request.url.clone());
        if !request.headers.contains_key(COOKIE) {
            if let Some(cookie_header) = jar.get_cookie_header(&request.url) {
                builder = builder.header(COOKIE, cookie_header);
            }
        }
        builder = builder.headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;

        let url = response.url().clone();
        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(value) = value.to_str() {
                jar.add_from_header(value, &url);
            }
        }

        tracing::trace!(url = %url, status = %response.status(), "response headers received");
        Ok(TransportResponse {
            status: response.status(),
            headers: response.headers().clone(),
            url,
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(Error::from))
                .boxed(),
        })
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let routes = self.routes.len();
            self.routes.clear();
            tracing::debug!(routes, "transport closed");
        }
    }

    fn cookie_jar(&self) -> CookieJar {
        self.cookie_jar.read().clone()
    }

    fn replace_cookie_jar(&self, jar: CookieJar) -> CookieJar {
        std::mem::replace(&mut *self.cookie_jar.write(), jar)
    }
}

impl Drop for ReqwestTransport {
    fn drop(&mut self) {
        if !self.is_closed() {
            tracing::debug!(routes = self.routes.len(), "transport dropped without close");
        }
    }
}
