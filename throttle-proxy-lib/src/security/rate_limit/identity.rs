use std::fmt;
use std::net::SocketAddr;

/// Rate limiting key derived from the peer address of a connection.
///
/// The port is stripped so that every connection from one host shares a
/// single bucket. Only the last `:`-delimited segment is removed, which keeps
/// bracketed IPv6 literals intact: `[::1]:54321` becomes `[::1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Build an identity from a raw `host:port` peer address.
    ///
    /// An address without any colon is used as-is.
    pub fn from_remote_addr(addr: &str) -> Self {
        match addr.rfind(':') {
            Some(idx) => Self(addr[..idx].to_string()),
            None => Self(addr.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identity without IPv6 brackets, suitable for `X-Forwarded-For`.
    pub fn ip(&self) -> &str {
        self.0
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(&self.0)
    }
}

impl From<SocketAddr> for ClientIdentity {
    fn from(addr: SocketAddr) -> Self {
        Self::from_remote_addr(&addr.to_string())
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ipv4_port() {
        let id = ClientIdentity::from_remote_addr("203.0.113.5:8080");
        assert_eq!(id.as_str(), "203.0.113.5");
        assert_eq!(id.ip(), "203.0.113.5");
    }

    #[test]
    fn strips_bracketed_ipv6_port() {
        let id = ClientIdentity::from_remote_addr("[::1]:54321");
        assert_eq!(id.as_str(), "[::1]");
        assert_eq!(id.ip(), "::1");
    }

    #[test]
    fn address_without_colon_is_kept() {
        let id = ClientIdentity::from_remote_addr("unix-socket");
        assert_eq!(id.as_str(), "unix-socket");
    }

    #[test]
    fn only_last_segment_is_removed() {
        let id = ClientIdentity::from_remote_addr("[2001:db8::7]:443");
        assert_eq!(id.as_str(), "[2001:db8::7]");
    }

    #[test]
    fn from_socket_addr() {
        let v4: SocketAddr = "198.51.100.7:1234".parse().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(ClientIdentity::from(v4).as_str(), "198.51.100.7");

        let v6: SocketAddr = "[::1]:54321".parse().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(ClientIdentity::from(v6).as_str(), "[::1]");
    }

    #[test]
    fn same_host_different_ports_collapse() {
        let a = ClientIdentity::from_remote_addr("10.0.0.1:1000");
        let b = ClientIdentity::from_remote_addr("10.0.0.1:2000");
        assert_eq!(a, b);
    }
}
