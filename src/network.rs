// LAN address discovery for the viewer URL

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use tracing::debug;

/// Any routable address works: connecting a UDP socket sends nothing, it only
/// makes the kernel pick the outgoing interface.
const PROBE_ADDR: ([u8; 4], u16) = ([192, 0, 2, 1], 9);

/// Private IPv4 address of the interface this host routes from, if any.
pub fn lan_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).ok()?;

    if let Err(e) = socket.connect(SocketAddr::from(PROBE_ADDR)) {
        debug!("LAN address probe failed: {}", e);
        return None;
    }

    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if is_lan_address(ip) => Some(ip),
        other => {
            debug!("Outgoing address {} is not a private LAN address", other);
            None
        }
    }
}

/// 10.0.0.0/8, 172.16.0.0/12 or 192.168.0.0/16
pub fn is_lan_address(ip: Ipv4Addr) -> bool {
    ip.is_private() && !ip.is_loopback()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_ranges() {
        assert!(is_lan_address(Ipv4Addr::new(10, 1, 2, 3)));
        assert!(is_lan_address(Ipv4Addr::new(172, 16, 0, 1)));
        assert!(is_lan_address(Ipv4Addr::new(172, 31, 255, 254)));
        assert!(is_lan_address(Ipv4Addr::new(192, 168, 1, 20)));
    }

    #[test]
    fn test_public_and_loopback_rejected() {
        assert!(!is_lan_address(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(!is_lan_address(Ipv4Addr::new(172, 32, 0, 1)));
        assert!(!is_lan_address(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!is_lan_address(Ipv4Addr::new(169, 254, 1, 1)));
    }

    #[test]
    fn test_discovery_only_reports_lan_addresses() {
        if let Some(ip) = lan_ipv4() {
            assert!(is_lan_address(ip));
        }
    }
}
