//! Datagram tagging types shared by the engine and its drivers.
//!
//! The sans-I/O engine never touches a socket; every inbound datagram is
//! handed to it as a [`TaggedBytesMut`] carrying the payload together with a
//! [`TransportContext`] (who sent it, where it arrived) and the receive time.
//! Outbound packets come back out of the engine in the same shape.

use bytes::BytesMut;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Instant;

/// Type of transport protocol. mDNS itself is UDP-only; the protocol field of
/// a service record (`_tcp`/`_udp`) describes the advertised service, not
/// this transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportProtocol {
    /// UDP
    #[default]
    UDP,
    /// TCP
    TCP,
}

/// Addressing context for a single datagram.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportContext {
    /// Local socket address, either IPv4 or IPv6
    pub local_addr: SocketAddr,
    /// Peer socket address, either IPv4 or IPv6
    pub peer_addr: SocketAddr,
    /// Type of transport protocol, either UDP or TCP
    pub transport_protocol: TransportProtocol,
}

impl Default for TransportContext {
    fn default() -> Self {
        Self {
            local_addr: SocketAddr::from_str("0.0.0.0:0").unwrap(),
            peer_addr: SocketAddr::from_str("0.0.0.0:0").unwrap(),
            transport_protocol: TransportProtocol::UDP,
        }
    }
}

/// A generic transmit with [`TransportContext`].
pub struct TransportMessage<T> {
    /// Received/Sent time
    pub now: Instant,
    /// A transport context with local and peer address
    pub transport: TransportContext,
    /// Message body with generic type
    pub message: T,
}

/// BytesMut type transmit with [`TransportContext`].
pub type TaggedBytesMut = TransportMessage<BytesMut>;
