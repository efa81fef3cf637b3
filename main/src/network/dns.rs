//! Full name/address resolution is out of scope beyond the interface the
//! core needs: map a hostname or IP to a host's address.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use crate::host::host::HostId;

pub trait Dns: Send + Sync {
    fn register(&self, name: &str, ip: Ipv4Addr, host: HostId);
    fn resolve_name_to_address(&self, name: &str) -> Option<Ipv4Addr>;
    fn resolve_ip_to_host(&self, ip: Ipv4Addr) -> Option<HostId>;
}

#[derive(Default)]
struct StaticDnsTables {
    by_name: HashMap<String, Ipv4Addr>,
    by_ip: HashMap<Ipv4Addr, HostId>,
}

/// Registered once per host at setup time, then read concurrently by every
/// worker thread — interior-mutable behind one lock since registration and
/// lookups never need to be lock-free here (setup is single-threaded).
#[derive(Default)]
pub struct StaticDns {
    tables: Mutex<StaticDnsTables>,
}

impl StaticDns {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dns for StaticDns {
    fn register(&self, name: &str, ip: Ipv4Addr, host: HostId) {
        let mut tables = self.tables.lock().unwrap();
        tables.by_name.insert(name.to_string(), ip);
        tables.by_ip.insert(ip, host);
    }

    fn resolve_name_to_address(&self, name: &str) -> Option<Ipv4Addr> {
        self.tables.lock().unwrap().by_name.get(name).copied()
    }

    fn resolve_ip_to_host(&self, ip: Ipv4Addr) -> Option<HostId> {
        self.tables.lock().unwrap().by_ip.get(&ip).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let dns = StaticDns::new();
        let ip: Ipv4Addr = "10.0.0.1".parse().unwrap();
        dns.register("client", ip, HostId(3));

        assert_eq!(dns.resolve_name_to_address("client"), Some(ip));
        assert_eq!(dns.resolve_ip_to_host(ip), Some(HostId(3)));
        assert_eq!(dns.resolve_name_to_address("nope"), None);
    }
}
