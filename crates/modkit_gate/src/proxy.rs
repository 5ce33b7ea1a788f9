//! Trusted-proxy client-IP extraction.

use std::net::IpAddr;

/// Private-network and common load-balancer ranges trusted to set
/// `X-Forwarded-For`.
pub fn default_trusted_prefixes() -> Vec<(IpAddr, u8)> {
    vec![
        ("10.0.0.0".parse().unwrap(), 8),
        ("172.16.0.0".parse().unwrap(), 12),
        ("192.168.0.0".parse().unwrap(), 16),
        ("127.0.0.0".parse().unwrap(), 8),
        ("::1".parse().unwrap(), 128),
    ]
}

pub fn is_trusted(ip: IpAddr, trusted: &[(IpAddr, u8)]) -> bool {
    trusted.iter().any(|(prefix, bits)| in_subnet(ip, *prefix, *bits))
}

fn in_subnet(ip: IpAddr, prefix: IpAddr, bits: u8) -> bool {
    match (ip, prefix) {
        (IpAddr::V4(ip), IpAddr::V4(prefix)) => {
            let mask = if bits == 0 { 0 } else { u32::MAX << (32 - bits) };
            (u32::from(ip) & mask) == (u32::from(prefix) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(prefix)) => {
            let mask = if bits == 0 { 0u128 } else { u128::MAX << (128 - bits) };
            (u128::from(ip) & mask) == (u128::from(prefix) & mask)
        }
        _ => false,
    }
}

/// Resolves the effective client IP: only consults
/// `X-Forwarded-For` when the direct peer is trusted, then walks the list
/// right-to-left picking the rightmost entry that is itself untrusted.
/// Falls back to the direct peer otherwise.
pub fn client_ip(peer: IpAddr, forwarded_for: Option<&str>, trusted: &[(IpAddr, u8)]) -> IpAddr {
    if !is_trusted(peer, trusted) {
        return peer;
    }
    let Some(header) = forwarded_for else { return peer };

    for candidate in header.split(',').rev() {
        let candidate = candidate.trim();
        if let Ok(ip) = candidate.parse::<IpAddr>() {
            if !is_trusted(ip, trusted) {
                return ip;
            }
        }
    }
    peer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrusted_peer_is_used_directly() {
        let trusted = default_trusted_prefixes();
        let peer: IpAddr = "203.0.113.5".parse().unwrap();
        assert_eq!(client_ip(peer, Some("198.51.100.9"), &trusted), peer);
    }

    #[test]
    fn trusted_peer_defers_to_forwarded_header() {
        let trusted = default_trusted_prefixes();
        let peer: IpAddr = "10.0.0.5".parse().unwrap();
        let resolved = client_ip(peer, Some("198.51.100.9, 10.0.0.5"), &trusted);
        assert_eq!(resolved, "198.51.100.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn all_forwarded_entries_trusted_falls_back_to_peer() {
        let trusted = default_trusted_prefixes();
        let peer: IpAddr = "10.0.0.5".parse().unwrap();
        let resolved = client_ip(peer, Some("10.0.0.1, 10.0.0.5"), &trusted);
        assert_eq!(resolved, peer);
    }

    #[test]
    fn ipv4_subnet_match_respects_prefix_length() {
        let trusted = vec![("192.168.0.0".parse().unwrap(), 16)];
        assert!(is_trusted("192.168.5.9".parse().unwrap(), &trusted));
        assert!(!is_trusted("192.169.5.9".parse().unwrap(), &trusted));
    }
}
