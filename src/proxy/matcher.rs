// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! NO_PROXY matching
//!
//! Follows curl's conventions: `.example.com` and `example.com` are the same
//! rule, a rule matches the host itself and any subdomain on a dot boundary,
//! a single trailing dot is insignificant, and `*` matches everything.
//! IP candidates are matched against CIDR networks; partial dotted-decimal
//! rules such as `192.168` or `10/8` are zero-padded into IPv4 networks.
//! IPv6 rules must be bracketed: `[fe80::]/64`, `[fe80::/64]`, `[::1]:8080`.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use lazy_static::lazy_static;
use regex::Regex;

use super::host_list::split_host_list;
use crate::error::{Error, Result};

lazy_static! {
    /// `[v6]:port` or `v4:port` with the port optional
    static ref HOST_PORT_RE: Regex =
        Regex::new(r"^(?:\[([0-9a-fA-F:]+)\](?::([0-9]+|\*))?|([0-9.]+)(?::([0-9]+|\*))?)$")
            .unwrap();

    /// `[v6]/len`, `[v6/len]`, `v4[/len]` or `*`, each with an optional `:port`
    static ref NETWORK_PORT_RE: Regex = Regex::new(
        r"^(?:(?:\[([0-9a-fA-F:]+)(/[0-9]+)?\](/[0-9]+)?|(\*))(?::([0-9]+|\*))?|(?:([0-9.]+(?:/[0-9]+)?)|(\*))(?::([0-9]+|\*))?)$"
    )
    .unwrap();

    /// Hostname-shaped token used for strict validation
    static ref HOST_TOKEN_RE: Regex =
        Regex::new(r"^\.?(\*|[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*\.?)(?::([0-9]+|\*))?$").unwrap();
}

/// Port clause of a NO_PROXY rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortRule {
    /// No port given: any port matches
    Any,
    /// `:*`
    Wildcard,
    /// `:8080`
    Exact(String),
}

impl PortRule {
    fn from_clause(clause: Option<&str>) -> Self {
        match clause {
            None | Some("") => PortRule::Any,
            Some("*") => PortRule::Wildcard,
            Some(port) => PortRule::Exact(port.to_string()),
        }
    }

    /// Check whether the candidate port satisfies this rule
    pub fn admits(&self, port: Option<&str>) -> bool {
        match self {
            PortRule::Any | PortRule::Wildcard => true,
            PortRule::Exact(expected) => port == Some(expected.as_str()),
        }
    }
}

impl fmt::Display for PortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRule::Any => Ok(()),
            PortRule::Wildcard => write!(f, ":*"),
            PortRule::Exact(port) => write!(f, ":{}", port),
        }
    }
}

/// Strip a single trailing dot: `example.com.` is `example.com`, but
/// `example.com..` keeps one dot.
pub fn remove_dot(host: &str) -> &str {
    host.strip_suffix('.').unwrap_or(host)
}

/// Rule used when the candidate is an IP address
#[derive(Debug, Clone, PartialEq, Eq)]
struct AddressRule {
    /// `None` is the `*` wildcard network
    network: Option<IpNet>,
    port: PortRule,
}

impl AddressRule {
    fn matches(&self, addr: &IpAddr, port: Option<&str>) -> bool {
        self.port.admits(port) && self.network.map_or(true, |net| net.contains(addr))
    }
}

/// Rule used when the candidate is a hostname
#[derive(Debug, Clone, PartialEq, Eq)]
struct HostRule {
    host: String,
    port: PortRule,
}

impl HostRule {
    fn parse(token: &str) -> Self {
        let (host, port) = match token.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (token, None),
        };
        let host = host.strip_prefix('.').unwrap_or(host);
        Self {
            host: remove_dot(host).to_ascii_lowercase(),
            port: PortRule::from_clause(port),
        }
    }

    fn matches(&self, hostname: &str, port: Option<&str>) -> bool {
        if !self.port.admits(port) || self.host.is_empty() {
            return false;
        }
        if self.host == "*" || self.host == hostname {
            return true;
        }
        hostname.len() > self.host.len()
            && hostname.ends_with(self.host.as_str())
            && hostname.as_bytes()[hostname.len() - self.host.len() - 1] == b'.'
    }
}

/// Parse `[v6/len]`, `[v6]/len`, `v4/len`, partial `v4` or `*`, each with an
/// optional port. Networks with host bits set are rejected.
fn parse_network_and_port(token: &str) -> Option<(Option<IpNet>, PortRule)> {
    let caps = NETWORK_PORT_RE.captures(token)?;
    let group = |i: usize| caps.get(i).map(|m| m.as_str());

    if let Some(addr) = group(1) {
        // exactly one of `[addr/len]` and `[addr]/len` must be present
        let prefix = match (group(2), group(3)) {
            (Some(p), None) | (None, Some(p)) => p,
            _ => return None,
        };
        let addr = Ipv6Addr::from_str(addr).ok()?;
        let len: u8 = prefix[1..].parse().ok()?;
        let net = Ipv6Net::new(addr, len).ok()?;
        if net.network() != addr {
            return None;
        }
        return Some((Some(IpNet::V6(net)), PortRule::from_clause(group(5))));
    }
    if group(4).is_some() {
        return Some((None, PortRule::from_clause(group(5))));
    }
    if let Some(spec) = group(6) {
        let (addr, prefix) = match spec.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (spec, None),
        };
        let addr = remove_dot(addr);
        let dots = addr.matches('.').count();
        if dots > 3 {
            return None;
        }
        let padded = format!("{}{}", addr, ".0".repeat(3 - dots));
        let addr = Ipv4Addr::from_str(&padded).ok()?;
        let len: u8 = match prefix {
            Some(prefix) => prefix.parse().ok()?,
            None => (8 * (dots + 1)) as u8,
        };
        let net = Ipv4Net::new(addr, len).ok()?;
        if net.network() != addr {
            return None;
        }
        return Some((Some(IpNet::V4(net)), PortRule::from_clause(group(8))));
    }
    if group(7).is_some() {
        return Some((None, PortRule::from_clause(group(8))));
    }
    None
}

/// Parse a bare `[v6]` or full dotted-quad `v4`, each with an optional port.
fn parse_address_and_port(token: &str) -> Option<(IpAddr, Option<&str>)> {
    let caps = HOST_PORT_RE.captures(token)?;
    if let Some(addr) = caps.get(1) {
        let addr = Ipv6Addr::from_str(addr.as_str()).ok()?;
        return Some((IpAddr::V6(addr), caps.get(2).map(|m| m.as_str())));
    }
    let addr = Ipv4Addr::from_str(caps.get(3)?.as_str()).ok()?;
    Some((IpAddr::V4(addr), caps.get(4).map(|m| m.as_str())))
}

fn parse_address_rule(token: &str) -> Option<AddressRule> {
    if let Some((network, port)) = parse_network_and_port(token) {
        return Some(AddressRule { network, port });
    }
    let (addr, port) = parse_address_and_port(token)?;
    Some(AddressRule {
        network: Some(IpNet::from(addr)),
        port: PortRule::from_clause(port),
    })
}

/// Interpret a candidate host as an IP address, accepting bracketed IPv6
/// with or without a port.
fn parse_candidate_addr(hostname: &str) -> Option<IpAddr> {
    IpAddr::from_str(hostname)
        .ok()
        .or_else(|| parse_address_and_port(hostname).map(|(addr, _)| addr))
}

/// One NO_PROXY token, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoProxyEntry {
    /// `example.com`, `.example.com`, `example.com:8080`
    HostSuffix { label: String, port: PortRule },
    /// `10.0.0.0/8`, `192.168`, `[fe80::]/64`, `[::1]:8080`
    IpNetwork { network: IpNet, port: PortRule },
    /// `*`, `*:443`
    Wildcard { port: PortRule },
}

impl NoProxyEntry {
    /// Classify a token, failing on anything that is neither an address rule
    /// nor a hostname rule.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if let Some(rule) = parse_address_rule(token) {
            return Ok(match rule.network {
                Some(network) => NoProxyEntry::IpNetwork {
                    network,
                    port: rule.port,
                },
                None => NoProxyEntry::Wildcard { port: rule.port },
            });
        }
        if HOST_TOKEN_RE.is_match(token) {
            let rule = HostRule::parse(token);
            return Ok(if rule.host == "*" {
                NoProxyEntry::Wildcard { port: rule.port }
            } else {
                NoProxyEntry::HostSuffix {
                    label: rule.host,
                    port: rule.port,
                }
            });
        }
        Err(Error::format(format!("invalid NO_PROXY entry '{}'", token)))
    }

    /// Port clause of this entry
    pub fn port(&self) -> &PortRule {
        match self {
            NoProxyEntry::HostSuffix { port, .. }
            | NoProxyEntry::IpNetwork { port, .. }
            | NoProxyEntry::Wildcard { port } => port,
        }
    }
}

impl FromStr for NoProxyEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NoProxyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoProxyEntry::HostSuffix { label, port } => write!(f, "{}{}", label, port),
            NoProxyEntry::IpNetwork {
                network: IpNet::V6(net),
                port,
            } => write!(f, "[{}]{}", net, port),
            NoProxyEntry::IpNetwork { network, port } => write!(f, "{}{}", network, port),
            NoProxyEntry::Wildcard { port } => write!(f, "*{}", port),
        }
    }
}

#[derive(Debug, Clone)]
struct TokenRule {
    address: Option<AddressRule>,
    host: HostRule,
}

/// Predicate over a NO_PROXY list.
///
/// Each token is interpreted both ways up front; which interpretation is used
/// depends on whether the candidate turns out to be an IP address. Tokens that
/// make no sense as an address rule are simply skipped for IP candidates.
#[derive(Debug, Clone, Default)]
pub struct HostNameMatcher {
    rules: Vec<TokenRule>,
}

impl HostNameMatcher {
    /// Build a matcher from raw tokens
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = tokens
            .into_iter()
            .map(|token| {
                let token = token.as_ref().trim();
                TokenRule {
                    address: parse_address_rule(token),
                    host: HostRule::parse(token),
                }
            })
            .collect();
        Self { rules }
    }

    /// Build a matcher from a raw NO_PROXY string, using the shared list cache
    pub fn from_no_proxy(no_proxy: &str) -> Self {
        Self::new(split_host_list(no_proxy).iter())
    }

    /// Check whether `(hostname, port)` bypasses the proxy
    pub fn matches(&self, hostname: &str, port: Option<&str>) -> bool {
        let hostname = remove_dot(hostname);
        match parse_candidate_addr(hostname) {
            Some(addr) => self
                .rules
                .iter()
                .filter_map(|rule| rule.address.as_ref())
                .any(|rule| rule.matches(&addr, port)),
            None => {
                let hostname = hostname.to_ascii_lowercase();
                self.rules
                    .iter()
                    .any(|rule| rule.host.matches(&hostname, port))
            }
        }
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A NO_PROXY list validated entry by entry
#[derive(Debug, Clone)]
pub struct NoProxy {
    entries: Vec<NoProxyEntry>,
    matcher: HostNameMatcher,
}

impl NoProxy {
    /// Parse a NO_PROXY string, rejecting malformed entries
    pub fn parse(raw: &str) -> Result<Self> {
        let tokens = split_host_list(raw);
        let entries = tokens
            .iter()
            .map(|token| NoProxyEntry::parse(token))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            entries,
            matcher: HostNameMatcher::new(tokens.iter()),
        })
    }

    /// Parsed entries in list order
    pub fn entries(&self) -> &[NoProxyEntry] {
        &self.entries
    }

    /// Check whether `(hostname, port)` bypasses the proxy
    pub fn matches(&self, hostname: &str, port: Option<&str>) -> bool {
        self.matcher.matches(hostname, port)
    }
}

impl FromStr for NoProxy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(host: &str, port: Option<&str>, tokens: &[&str]) -> bool {
        HostNameMatcher::new(tokens).matches(host, port)
    }

    const IPV4_TOKENS: [&str; 20] = [
        "192.168",
        "192.168.",
        "192.168.0",
        "192.168.0.",
        "192.168.0.0",
        "192.168.0.0.",
        "192.168/16",
        "192.168.0/16",
        "192.168./16",
        "192.168.0./16",
        "192.168.0.0/16",
        "192.168.0.0./16",
        "192.168/24",
        "192.168.0/24",
        "192.168./24",
        "192.168.0./24",
        "192.168.0.0/24",
        "192.168.0.0./24",
        ".192.168",
        ".192.168.",
    ];

    fn ipv4_cases() -> Vec<(&'static str, [bool; 20])> {
        const T: bool = true;
        const F: bool = false;
        let net_zero = [T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, T, F, F];
        let net_one = [T, T, T, T, F, F, T, T, T, T, T, T, T, T, T, T, T, T, F, F];
        let other_subnet = [T, T, F, F, F, F, T, T, T, T, T, T, F, F, F, F, F, F, F, F];
        let partial = [T, T, F, F, F, F, F, F, F, F, F, F, F, F, F, F, F, F, T, T];
        vec![
            ("192.168.0.0", net_zero),
            ("192.168.0.0.", net_zero),
            ("192.168.0.1", net_one),
            ("192.168.0.1.", net_one),
            ("192.168.1.0", other_subnet),
            ("192.168.1.0.", other_subnet),
            ("192.168", partial),
            ("192.168.", partial),
            ("hostname", [F; 20]),
        ]
    }

    /// Runs single tokens and every pair of tokens, with and without ports.
    fn check_table(candidate: &str, tokens: &[&str], expected: &[bool]) {
        let n = tokens.len();
        let mut lists: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        for i in 0..n {
            for j in (i + 1)..n {
                lists.push(vec![i, j]);
            }
        }

        for list in lists {
            let want = list.iter().any(|&i| expected[i]);
            let plain: Vec<String> = list.iter().map(|&i| tokens[i].to_string()).collect();
            let with_port: Vec<String> = plain.iter().map(|t| format!("{}:8080", t)).collect();
            let any_port: Vec<String> = plain.iter().map(|t| format!("{}:*", t)).collect();

            let m = HostNameMatcher::new(&plain);
            assert_eq!(m.matches(candidate, None), want, "{} vs {:?}", candidate, plain);
            assert_eq!(m.matches(candidate, Some("8080")), want, "{}:8080 vs {:?}", candidate, plain);

            let m = HostNameMatcher::new(&with_port);
            assert!(!m.matches(candidate, None), "{} vs {:?}", candidate, with_port);
            assert_eq!(m.matches(candidate, Some("8080")), want, "{}:8080 vs {:?}", candidate, with_port);
            assert!(!m.matches(candidate, Some("8081")), "{}:8081 vs {:?}", candidate, with_port);

            let m = HostNameMatcher::new(&any_port);
            assert_eq!(m.matches(candidate, None), want, "{} vs {:?}", candidate, any_port);
            assert_eq!(m.matches(candidate, Some("443")), want, "{}:443 vs {:?}", candidate, any_port);
        }
    }

    #[test]
    fn test_ipv4_network_table() {
        for (candidate, expected) in ipv4_cases() {
            check_table(candidate, &IPV4_TOKENS, &expected);
        }
    }

    #[test]
    fn test_ipv6_network_table() {
        let tokens = [
            "[::]/128",
            "[::/128]",
            "[::1]/128",
            "[::1/128]",
            "[::]/112",
            "[::/112]",
            "[fe80::]/64",
            "[fe80::/64]",
        ];
        check_table("[::1]", &tokens, &[false, false, true, true, true, true, false, false]);
        check_table("::1", &tokens, &[false, false, true, true, true, true, false, false]);
        check_table(
            "[fe80::1]",
            &tokens,
            &[false, false, false, false, false, false, true, true],
        );
    }

    #[test]
    fn test_wildcards() {
        for candidate in ["192.168.0.1", "[::1]", "[fe80::1]", "example.com", "localhost."] {
            assert!(matches(candidate, None, &["*"]), "{}", candidate);
            assert!(matches(candidate, None, &["*:*"]), "{}", candidate);
            assert!(matches(candidate, Some("80"), &["*:*"]), "{}", candidate);
            assert!(matches(candidate, Some("443"), &["*:443"]), "{}", candidate);
            assert!(!matches(candidate, Some("80"), &["*:443"]), "{}", candidate);
        }
    }

    #[test]
    fn test_cidr_scenarios() {
        assert!(matches("192.168.0.1", None, &["192.168.0.0/24"]));
        assert!(!matches("192.168.1.1", None, &["192.168.0.0/24"]));
        assert!(matches("[fe80::1]", None, &["[fe80::]/64"]));
        assert!(!matches("[::1]", None, &["[fe80::]/64"]));
        assert!(matches("10.1.2.3", None, &["10/8"]));
        assert!(!matches("11.1.2.3", None, &["10/8"]));
    }

    #[test]
    fn test_host_bits_set_is_skipped() {
        assert!(!matches("192.168.0.1", None, &["192.168.0.1/24"]));
        assert!(!matches("[::1]", None, &["[::1]/64"]));
    }

    #[test]
    fn test_bare_addresses() {
        assert!(matches("10.0.0.1", None, &["10.0.0.1"]));
        assert!(matches("10.0.0.1", Some("8080"), &["10.0.0.1:8080"]));
        assert!(!matches("10.0.0.1", Some("80"), &["10.0.0.1:8080"]));
        assert!(matches("[::1]", Some("8080"), &["[::1]:8080"]));
        assert!(matches("[::1]", Some("9"), &["[::1]:*"]));
        assert!(!matches("[::2]", None, &["[::1]"]));
    }

    #[test]
    fn test_domain_suffix_boundary() {
        assert!(matches("sub.example.com", None, &[".example.com"]));
        assert!(matches("example.com", None, &[".example.com"]));
        assert!(matches("a.b.example.com.", None, &["example.com."]));
        assert!(!matches("notexample.com", None, &[".example.com"]));
        assert!(!matches("notexample.com", None, &["example.com"]));
        assert!(!matches("example.com.evil", None, &["example.com"]));
    }

    #[test]
    fn test_host_ports() {
        assert!(matches("host", Some("8080"), &["host:8080"]));
        assert!(!matches("host", None, &["host:8080"]));
        assert!(!matches("host", Some("80"), &["host:8080"]));
        assert!(matches("host", None, &["host:*"]));
        assert!(matches("host", Some("1234"), &["host:*"]));
    }

    #[test]
    fn test_case_insensitive_hosts() {
        assert!(matches("API.Example.com", None, &["example.COM"]));
    }

    #[test]
    fn test_disjunction_is_order_independent() {
        let tokens = ["localhost", "10.0.0.0/8", ".internal", "[::1]"];
        let mut reversed = tokens;
        reversed.reverse();
        for candidate in ["localhost", "10.2.3.4", "db.internal", "[::1]", "example.com"] {
            assert_eq!(
                matches(candidate, None, &tokens),
                matches(candidate, None, &reversed),
                "{}",
                candidate
            );
        }
    }

    #[test]
    fn test_empty_list_never_matches() {
        let matcher = HostNameMatcher::new(Vec::<String>::new());
        assert!(matcher.is_empty());
        assert!(!matcher.matches("localhost", None));
        assert!(!matcher.matches("127.0.0.1", None));
    }

    #[test]
    fn test_from_no_proxy_string() {
        let matcher = HostNameMatcher::from_no_proxy("localhost, 127.0.0.0/8 .corp");
        assert_eq!(matcher.len(), 3);
        assert!(matcher.matches("127.0.0.1", None));
        assert!(matcher.matches("git.corp", Some("443")));
    }

    #[test]
    fn test_entry_classification() {
        assert_eq!(
            NoProxyEntry::parse(".example.com:8080").unwrap(),
            NoProxyEntry::HostSuffix {
                label: "example.com".to_string(),
                port: PortRule::Exact("8080".to_string()),
            }
        );
        assert_eq!(
            NoProxyEntry::parse("192.168").unwrap(),
            NoProxyEntry::IpNetwork {
                network: "192.168.0.0/16".parse().unwrap(),
                port: PortRule::Any,
            }
        );
        assert_eq!(
            NoProxyEntry::parse("[fe80::/64]:*").unwrap(),
            NoProxyEntry::IpNetwork {
                network: "fe80::/64".parse().unwrap(),
                port: PortRule::Wildcard,
            }
        );
        assert_eq!(
            NoProxyEntry::parse("*").unwrap(),
            NoProxyEntry::Wildcard { port: PortRule::Any }
        );
    }

    #[test]
    fn test_entry_rejects_malformed() {
        for token in ["[::1", "exa mple.com", "host:abc", "[fe80::]/64/64", "a..b"] {
            let err = NoProxyEntry::parse(token).unwrap_err();
            assert!(err.is_format(), "{}", token);
        }
    }

    #[test]
    fn test_no_proxy_parse() {
        let no_proxy = NoProxy::parse("localhost,[::1],10/8").unwrap();
        assert_eq!(no_proxy.entries().len(), 3);
        assert!(no_proxy.matches("10.9.9.9", None));
        assert_eq!(no_proxy.entries()[1].to_string(), "[::1/128]");

        assert!(NoProxy::parse("ok.example, bad:port").is_err());
    }
}
