// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Proxy resolution
//!
//! Environment merging, NO_PROXY parsing and matching, and per-request proxy
//! selection.

pub mod env;
mod host_list;
pub mod matcher;
mod resolver;

pub use env::{
    environment_ca_bundle, environment_proxies, merge_environment_settings, Environment,
    MapEnvironment, ProxyMap, SystemEnvironment, Verify,
};
pub use host_list::{parse_host_list, split_host_list, CacheStats, HostListCache, HOST_LIST_CACHE_CAPACITY};
pub use matcher::{HostNameMatcher, NoProxy, NoProxyEntry, PortRule};
pub use resolver::{resolve_proxy, should_bypass_proxies, split_proxy_credentials, ProxySpec};
