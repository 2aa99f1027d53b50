//! Server address selection.
//!
//! # Gateway derivation (for beginners)
//!
//! The deployed listener runs on the network's gateway machine, and the
//! handheld is never told that address.  Instead the client guesses it from
//! its own address:
//!
//! ```text
//! own address      10 . 0 . 1 . 55
//! split            [10, 0, 1, 55]
//! replace first    [ 1, 0, 1, 55]
//! write reversed   55 . 1 . 0 . 1
//! ```
//!
//! The handheld's network stack reports its address with the byte order
//! swapped, so on that device the reversal undoes the swap and the result is
//! the `.1` host of the client's own /24.  On other hosts the same arithmetic
//! is kept for wire compatibility, and [`TargetPolicy::Fixed`] is the escape
//! hatch.

use std::net::{Ipv4Addr, SocketAddrV4};

/// Octet written into the derived address by default.
pub const DEFAULT_GATEWAY_OCTET: u8 = 1;

/// How the server address is chosen for a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPolicy {
    /// Derive the address from the client's own IPv4 address.
    Gateway { octet: u8 },
    /// Use a configured address as-is.
    Fixed { host: Ipv4Addr },
}

impl Default for TargetPolicy {
    fn default() -> Self {
        TargetPolicy::Gateway {
            octet: DEFAULT_GATEWAY_OCTET,
        }
    }
}

impl TargetPolicy {
    /// Returns `true` when the policy needs the client's own address.
    pub fn needs_local_address(&self) -> bool {
        matches!(self, TargetPolicy::Gateway { .. })
    }

    /// Resolves the socket address for `port`.
    ///
    /// `local` is only consulted by [`TargetPolicy::Gateway`].
    pub fn resolve(&self, local: Ipv4Addr, port: u16) -> SocketAddrV4 {
        let host = match *self {
            TargetPolicy::Gateway { octet } => derive_gateway(local, octet),
            TargetPolicy::Fixed { host } => host,
        };
        SocketAddrV4::new(host, port)
    }
}

/// Reverses the octets of `local` after replacing its first octet with
/// `octet`.
pub fn derive_gateway(local: Ipv4Addr, octet: u8) -> Ipv4Addr {
    let [_, b, c, d] = local.octets();
    Ipv4Addr::new(d, c, b, octet)
}
