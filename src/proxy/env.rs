// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Environment proxy and CA-bundle settings
//!
//! Reads `<scheme>_proxy` variables the way curl and python-requests do:
//! lowercase names win over uppercase ones, `no_proxy` lands under the `no`
//! scheme, and `HTTP_PROXY` is ignored inside a CGI request
//! (`REQUEST_METHOD` set) because it can be injected through a `Proxy:`
//! request header.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// CA bundle variables, in precedence order
pub const CA_BUNDLE_VARS: [&str; 2] = ["REQUESTS_CA_BUNDLE", "CURL_CA_BUNDLE"];

/// Key of the proxy map entry that carries the NO_PROXY list
pub const NO_PROXY_KEY: &str = "no";

/// Source of process-level settings
pub trait Environment: Send + Sync {
    /// Read one variable
    fn var(&self, key: &str) -> Option<String>;

    /// All variables
    fn vars(&self) -> Vec<(String, String)>;

    /// Platform proxy-bypass rule for a bare hostname, if the platform has one
    fn proxy_bypass(&self, _host: &str) -> Option<bool> {
        None
    }
}

/// The real process environment.
///
/// No platform bypass database is read on any OS: Linux has none, and the
/// Windows registry / macOS SystemConfiguration rules would need FFI that this
/// crate does not carry. `proxy_bypass` defers to the predicate installed with
/// [`SystemEnvironment::with_bypass`], which is where such a lookup plugs in.
#[derive(Clone, Default)]
pub struct SystemEnvironment {
    bypass: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl SystemEnvironment {
    /// Create an environment backed by `std::env`
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a platform bypass predicate
    pub fn with_bypass<F>(mut self, bypass: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.bypass = Some(Arc::new(bypass));
        self
    }
}

impl fmt::Debug for SystemEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemEnvironment")
            .field("bypass", &self.bypass.is_some())
            .finish()
    }
}

impl Environment for SystemEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    fn proxy_bypass(&self, host: &str) -> Option<bool> {
        self.bypass.as_ref().map(|bypass| bypass(host))
    }
}

/// Fixed set of variables, used by tests and embedders that do not want the
/// process environment to leak in.
#[derive(Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
    bypass: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl MapEnvironment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Install a platform bypass predicate
    pub fn with_bypass<F>(mut self, bypass: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.bypass = Some(Arc::new(bypass));
        self
    }
}

impl fmt::Debug for MapEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapEnvironment")
            .field("vars", &self.vars)
            .field("bypass", &self.bypass.is_some())
            .finish()
    }
}

impl Environment for MapEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn proxy_bypass(&self, host: &str) -> Option<bool> {
        self.bypass.as_ref().map(|bypass| bypass(host))
    }
}

/// Scheme → proxy URL map. The `no` entry holds the NO_PROXY list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyMap(BTreeMap<String, String>);

impl ProxyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the proxy for a scheme (builder style)
    pub fn with(mut self, scheme: impl Into<String>, proxy: impl Into<String>) -> Self {
        self.insert(scheme, proxy);
        self
    }

    /// Set the NO_PROXY list (builder style)
    pub fn with_no_proxy(self, no_proxy: impl Into<String>) -> Self {
        self.with(NO_PROXY_KEY, no_proxy)
    }

    /// Set the proxy for a scheme
    pub fn insert(&mut self, scheme: impl Into<String>, proxy: impl Into<String>) {
        self.0.insert(scheme.into().to_ascii_lowercase(), proxy.into());
    }

    /// Proxy for a scheme
    pub fn get(&self, scheme: &str) -> Option<&str> {
        self.0.get(scheme).map(String::as_str)
    }

    /// The NO_PROXY list, if any
    pub fn no_proxy(&self) -> Option<&str> {
        self.get(NO_PROXY_KEY)
    }

    /// Overlay `other` on top of this map, entry by entry
    pub fn extend(&mut self, other: &ProxyMap) {
        for (scheme, proxy) in &other.0 {
            self.0.insert(scheme.clone(), proxy.clone());
        }
    }

    /// Iterate entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProxyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ProxyMap::new();
        for (scheme, proxy) in iter {
            map.insert(scheme, proxy);
        }
        map
    }
}

/// Certificate verification setting
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verify {
    /// Verify against the platform trust roots
    #[default]
    Enabled,
    /// Do not verify certificates or hostnames
    Disabled,
    /// Verify against this CA bundle only
    CaBundle(PathBuf),
}

impl From<bool> for Verify {
    fn from(verify: bool) -> Self {
        if verify {
            Verify::Enabled
        } else {
            Verify::Disabled
        }
    }
}

impl From<PathBuf> for Verify {
    fn from(path: PathBuf) -> Self {
        Verify::CaBundle(path)
    }
}

impl From<&str> for Verify {
    fn from(path: &str) -> Self {
        Verify::CaBundle(PathBuf::from(path))
    }
}

/// Collect `<scheme>_proxy` variables from the environment
pub fn environment_proxies(env: &dyn Environment) -> ProxyMap {
    let vars = env.vars();
    let mut proxies = ProxyMap::new();

    for (name, value) in &vars {
        if value.is_empty() {
            continue;
        }
        if let Some(scheme) = proxy_scheme(name) {
            proxies.insert(scheme, value.clone());
        }
    }

    // CGI: HTTP_PROXY may come from a client-controlled `Proxy:` header
    if env.var("REQUEST_METHOD").is_some() {
        proxies.0.remove("http");
    }

    // lowercase names take precedence
    for (name, value) in &vars {
        if !name.ends_with("_proxy") {
            continue;
        }
        if let Some(scheme) = proxy_scheme(name) {
            if value.is_empty() {
                proxies.0.remove(&scheme);
            } else {
                proxies.insert(scheme, value.clone());
            }
        }
    }

    proxies
}

fn proxy_scheme(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    let scheme = lower.strip_suffix("_proxy")?;
    if scheme.is_empty() {
        return None;
    }
    Some(scheme.to_string())
}

/// First CA bundle variable that is set
pub fn environment_ca_bundle(env: &dyn Environment) -> Option<PathBuf> {
    CA_BUNDLE_VARS
        .iter()
        .find_map(|key| env.var(key).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
}

/// Merge caller settings with the environment.
///
/// Explicit proxies win per scheme. The CA bundle from the environment only
/// replaces a verify setting that is unset or plain `Enabled`.
pub fn merge_environment_settings(
    env: &dyn Environment,
    trust_env: bool,
    proxies: Option<&ProxyMap>,
    verify: Option<&Verify>,
) -> (ProxyMap, Verify) {
    let mut merged = if trust_env {
        environment_proxies(env)
    } else {
        ProxyMap::new()
    };
    if let Some(explicit) = proxies {
        merged.extend(explicit);
    }

    let verify = match verify {
        None | Some(Verify::Enabled) => match trust_env.then(|| environment_ca_bundle(env)).flatten() {
            Some(bundle) => Verify::CaBundle(bundle),
            None => Verify::Enabled,
        },
        Some(other) => other.clone(),
    };

    tracing::trace!(proxies = ?merged, verify = ?verify, "merged environment settings");
    (merged, verify)
}
