//! Originating-address allow-list.
//!
//! # Responsibilities
//! - Hold the configured set of permitted addresses
//! - Decide membership for the address reported by the transport
//!
//! # Design Decisions
//! - IP entries compare by value, so `::ffff:127.0.0.1` matches `127.0.0.1`
//! - Hostname entries compare case-insensitively and are never resolved
//! - Anything unparsable or empty is simply not allowed

use std::collections::HashSet;
use std::net::IpAddr;

/// Set of originating addresses permitted past the gateway.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ips: HashSet<IpAddr>,
    hosts: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for address in addresses {
            let address = address.as_ref().trim();
            if address.is_empty() {
                continue;
            }
            match parse_ip(address) {
                Some(ip) => {
                    list.ips.insert(ip);
                }
                None => {
                    list.hosts.insert(address.to_ascii_lowercase());
                }
            }
        }
        list
    }

    /// True iff `address` is a member of the list.
    pub fn is_allowed(&self, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() {
            return false;
        }
        match parse_ip(address) {
            Some(ip) => self.ips.contains(&ip),
            None => self.hosts.contains(&address.to_ascii_lowercase()),
        }
    }

    pub fn len(&self) -> usize {
        self.ips.len() + self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_ip(address: &str) -> Option<IpAddr> {
    // Accept bracketed IPv6 as written in URLs.
    let bare = address
        .strip_prefix('[')
        .and_then(|a| a.strip_suffix(']'))
        .unwrap_or(address);
    bare.parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_loopback_entry() {
        let list = AllowList::new(["127.0.0.1"]);
        assert!(list.is_allowed("127.0.0.1"));
        assert!(!list.is_allowed("10.0.0.5"));
        assert!(!list.is_allowed("127.0.0.2"));
    }

    #[test]
    fn test_mapped_ipv6_matches_ipv4_entry() {
        let list = AllowList::new(["127.0.0.1"]);
        assert!(list.is_allowed("::ffff:127.0.0.1"));
        assert!(list.is_allowed("[::ffff:127.0.0.1]"));
    }

    #[test]
    fn test_ipv6_entries() {
        let list = AllowList::new(["::1"]);
        assert!(list.is_allowed("::1"));
        assert!(list.is_allowed("[::1]"));
        assert!(list.is_allowed("0:0:0:0:0:0:0:1"));
        assert!(!list.is_allowed("127.0.0.1"));
    }

    #[test]
    fn test_hostname_entries() {
        let list = AllowList::new(["Gateway.Internal"]);
        assert!(list.is_allowed("gateway.internal"));
        assert!(list.is_allowed("GATEWAY.INTERNAL"));
        assert!(!list.is_allowed("other.internal"));
    }

    #[test]
    fn test_unresolvable_or_garbage_is_denied() {
        let list = AllowList::new(["127.0.0.1", ""]);
        assert_eq!(list.len(), 1);
        assert!(!list.is_allowed(""));
        assert!(!list.is_allowed("   "));
        assert!(!list.is_allowed("127.0.0.1.evil"));
        assert!(!list.is_allowed("no-such-host.invalid"));
    }
}
