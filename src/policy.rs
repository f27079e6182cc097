//! Security policy hooks.
//!
//! Deployments decide who may connect and which frames reach the
//! application; the stack only defines the callback contract. Both hooks are
//! synchronous and must answer immediately — consult asynchronously
//! maintained data, never suspend.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

/// Frame classification exposed to the rate-check hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Information transfer
    I,
    /// Supervisory acknowledgement
    S,
    /// Unnumbered control
    U,
}

/// Metadata about a decoded frame, handed to [`SecurityPolicy::allow_frame`].
#[derive(Debug, Clone)]
pub struct FrameMeta {
    /// Peer address, when the transport knows one
    pub peer: Option<SocketAddr>,
    /// Frame kind
    pub kind: FrameKind,
    /// Raw ASDU type identifier (I-frames)
    pub type_id: Option<u8>,
    /// Total frame length on the wire
    pub length: usize,
}

/// Admission policy consulted by the server and by every session.
///
/// `allow_connection` runs once per accepted socket, before a session is
/// created. `allow_frame` runs before any decoded frame is dispatched to the
/// application. A rejection closes the session with a policy violation.
pub trait SecurityPolicy: Send + Sync {
    /// Whether `peer` may open a session. Default: accept.
    fn allow_connection(&self, _peer: SocketAddr) -> bool {
        true
    }

    /// Whether a frame may be processed. Default: accept.
    fn allow_frame(&self, _meta: &FrameMeta) -> bool {
        true
    }
}

/// Policy accepting every connection and frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SecurityPolicy for AllowAll {}

/// Source-address allowlist.
#[derive(Debug, Clone)]
pub struct IpAllowlist {
    allowed: HashSet<IpAddr>,
}

impl IpAllowlist {
    /// Build an allowlist from the given addresses.
    pub fn new(allowed: impl IntoIterator<Item = IpAddr>) -> Self {
        Self { allowed: allowed.into_iter().collect() }
    }
}

impl SecurityPolicy for IpAllowlist {
    fn allow_connection(&self, peer: SocketAddr) -> bool {
        self.allowed.contains(&peer.ip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(ip: &str) -> SocketAddr {
        format!("{ip}:2404").parse().unwrap()
    }

    #[test]
    fn test_allow_all() {
        let policy = AllowAll;
        assert!(policy.allow_connection(addr("10.0.0.1")));
        let meta =
            FrameMeta { peer: Some(addr("10.0.0.1")), kind: FrameKind::I, type_id: Some(1), length: 16 };
        assert!(policy.allow_frame(&meta));
    }

    #[test]
    fn test_ip_allowlist() {
        let policy = IpAllowlist::new(["192.168.1.10".parse().unwrap()]);
        assert!(policy.allow_connection(addr("192.168.1.10")));
        assert!(!policy.allow_connection(addr("192.168.1.11")));
        // port is irrelevant
        assert!(policy.allow_connection("192.168.1.10:9999".parse().unwrap()));
    }

    #[test]
    fn test_allowlist_passes_frames() {
        let policy = IpAllowlist::new(["192.168.1.10".parse().unwrap()]);
        let meta = FrameMeta { peer: None, kind: FrameKind::S, type_id: None, length: 6 };
        assert!(policy.allow_frame(&meta));
    }
}
