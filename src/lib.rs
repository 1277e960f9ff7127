// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # simplereq - requests-style HTTP client over a pooled transport
//!
//! A thin facade over reqwest that behaves like classic command-line HTTP
//! tooling when it comes to proxies and certificates.
//!
//! ## Features
//!
//! - Environment proxies: `<scheme>_proxy`, `NO_PROXY`, CGI-safe `HTTP_PROXY`
//! - NO_PROXY matching: hostnames, domain suffixes, IPv4/IPv6, CIDR, wildcards, ports
//! - CA bundles from `REQUESTS_CA_BUNDLE` / `CURL_CA_BUNDLE`
//! - TLS: custom trust roots, client certificates, fingerprint pinning,
//!   preconfigured rustls configurations
//! - Basic-auth normalization
//! - Lazily created session that survives runtime restarts and explicit close
//! - Per-request cookies that never leak into the shared jar
//!
//! ## Example
//!
//! ```rust,no_run
//! use simplereq::{Client, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new();
//!
//!     let response = client
//!         .get("https://example.com", RequestOptions::new().param("q", "rust"))
//!         .await?;
//!     println!("{} {}", response.status(), response.text().await?);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod proxy;
pub mod session;
pub mod tls;

// Re-exports for convenience

// Client
pub use config::{ClientConfig, DEFAULT_USER_AGENT};
pub use http::{Client, RequestInfo, RequestOptions, Response};

// Transport
pub use http::{Cookie, CookieJar, PreparedRequest, ReqwestTransport, Transport, TransportResponse};

// Session
pub use session::{CookieOverlay, Session, SessionStats};

// Errors
pub use error::{Error, Result};

// Proxy
pub use proxy::{
    merge_environment_settings, resolve_proxy, should_bypass_proxies, Environment,
    HostNameMatcher, MapEnvironment, NoProxy, NoProxyEntry, ProxyMap, ProxySpec,
    SystemEnvironment, Verify,
};

// TLS
pub use tls::{build_tls_config, ClientIdentity, Fingerprint, SslOverride, TlsConfig, TlsSetting};

// Auth
pub use auth::{normalize_auth, BasicAuth, Credentials};

/// simplereq version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
