// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request orchestration
//!
//! [`Client::request`] merges environment settings, resolves the proxy,
//! builds TLS settings, normalizes credentials, and then sends through the
//! session's transport with any per-request cookies overlaid.

use std::sync::Arc;

use reqwest::Method;
use url::Url;

use super::request::{PreparedRequest, RedirectPolicy, RequestOptions};
use super::response::Response;
use super::transport::{ReqwestTransport, Transport};
use crate::auth::normalize_auth;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::proxy::{
    merge_environment_settings, resolve_proxy, split_proxy_credentials, Environment,
    SystemEnvironment,
};
use crate::session::{Session, SessionStats};
use crate::tls::TlsSetting;

/// Sends per request when the transport keeps getting closed underneath it
const MAX_SEND_ATTEMPTS: usize = 3;

struct ClientInner<T: Transport> {
    session: Session<T>,
    environment: Arc<dyn Environment>,
}

/// HTTP client with a requests-style call surface.
///
/// Cloning is cheap and shares the session.
pub struct Client<T: Transport = ReqwestTransport> {
    inner: Arc<ClientInner<T>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Client<ReqwestTransport> {
    /// Create a client with default configuration reading the process
    /// environment
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }
}

impl Default for Client<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Client<T> {
    /// Create a client reading the process environment
    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_environment(config, SystemEnvironment::new())
    }

    /// Create a client reading settings from `environment`
    pub fn with_environment(config: ClientConfig, environment: impl Environment + 'static) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                session: Session::new(config),
                environment: Arc::new(environment),
            }),
        }
    }

    /// Get client configuration
    pub fn config(&self) -> &ClientConfig {
        self.inner.session.config()
    }

    /// Resolve everything about a request short of sending it
    pub fn prepare(&self, method: Method, url: &str, options: &RequestOptions) -> Result<PreparedRequest> {
        options.check_supported()?;

        let url = Url::parse(url).map_err(|e| Error::format(format!("invalid URL '{}': {}", url, e)))?;
        let config = self.config();
        let env = self.inner.environment.as_ref();

        let verify = options.verify.as_ref().unwrap_or(&config.verify);
        let (proxies, verify) =
            merge_environment_settings(env, config.trust_env, options.proxies.as_ref(), Some(verify));

        let mut proxy = match &options.proxy {
            Some(explicit) => split_proxy_credentials(explicit)?,
            None => resolve_proxy(&url, &proxies, env)?,
        };
        if let Some(proxy_auth) = &options.proxy_auth {
            proxy.credentials = Some(proxy_auth.clone());
        }

        let tls = TlsSetting::select(options.ssl_override()?, &verify, options.cert.as_ref());
        let auth = normalize_auth(options.auth.clone())?;

        let redirect = if options.allow_redirects.unwrap_or(true) {
            RedirectPolicy::Limited(options.max_redirects.unwrap_or(config.max_redirects))
        } else {
            RedirectPolicy::None
        };

        let mut prepared = PreparedRequest::new(method, url)
            .with_params(&options.params)
            .with_headers(&options.headers)?
            .with_body(options.data.as_ref(), options.json.as_ref())?
            .with_basic_auth(auth.as_ref())?;
        prepared.proxy = proxy;
        prepared.tls = tls;
        prepared.timeout = options.timeout;
        prepared.redirect = redirect;
        Ok(prepared)
    }

    /// Send a request.
    ///
    /// A transport closed while the request waits for the overlay lock, or
    /// before it goes out, is replaced and the request retried on the new one.
    pub async fn request(&self, method: Method, url: &str, options: RequestOptions) -> Result<Response> {
        let prepared = self.prepare(method, url, &options)?;
        let cookies = options.cookies.as_deref().filter(|cookies| !cookies.is_empty());
        let info = prepared.info();

        let mut attempt = 1;
        loop {
            let transport = self.inner.session.acquire().await?;

            // restored when dropped, on every exit path
            let _overlay = match cookies {
                Some(cookies) => Some(self.inner.session.overlay(transport.clone(), cookies).await),
                None => None,
            };
            let retry = attempt < MAX_SEND_ATTEMPTS;
            if transport.is_closed() && retry {
                tracing::debug!(url = %info.url, attempt, "transport closed while waiting, reacquiring");
                attempt += 1;
                continue;
            }

            tracing::debug!(method = %info.method, url = %info.url, proxy = %info.proxy, "sending request");
            match transport.send(prepared.clone()).await {
                Ok(response) => {
                    tracing::debug!(url = %info.url, status = %response.status, "response received");
                    return Ok(Response::new(response, info));
                }
                Err(Error::Closed) if retry => {
                    tracing::debug!(url = %info.url, attempt, "transport closed before send, reacquiring");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a GET request
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::GET, url, options).await
    }

    /// Send a POST request
    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::POST, url, options).await
    }

    /// Send a PUT request
    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::PUT, url, options).await
    }

    /// Send a PATCH request
    pub async fn patch(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::PATCH, url, options).await
    }

    /// Send a DELETE request
    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::DELETE, url, options).await
    }

    /// Send a HEAD request
    pub async fn head(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::HEAD, url, options).await
    }

    /// Send an OPTIONS request
    pub async fn options(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::OPTIONS, url, options).await
    }

    /// Send several requests concurrently; results keep the input order
    pub async fn request_all(&self, requests: Vec<(Method, String, RequestOptions)>) -> Vec<Result<Response>> {
        let futures: Vec<_> = requests
            .into_iter()
            .map(|(method, url, options)| async move { self.request(method, &url, options).await })
            .collect();
        futures::future::join_all(futures).await
    }

    /// The live transport, created if necessary
    pub async fn session(&self) -> Result<Arc<T>> {
        self.inner.session.acquire().await
    }

    /// Close the session; the next request opens a new one
    pub async fn close(&self) {
        self.inner.session.close().await
    }

    /// Get session statistics
    pub fn session_stats(&self) -> SessionStats {
        self.inner.session.stats()
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}
