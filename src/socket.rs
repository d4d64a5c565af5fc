//! Multicast socket setup.
//!
//! [`MulticastSocket`] builds a UDP socket configured for the mDNS group:
//! bound to port 5353 with address and port reuse, non-blocking, and joined
//! to 224.0.0.251. The result is a plain `std::net::UdpSocket`, ready to be
//! handed to `tokio::net::UdpSocket::from_std`.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::proto::{MDNS_MULTICAST_IPV4, MDNS_PORT};

/// Builder for the mDNS multicast socket.
///
/// # Example
///
/// ```rust,ignore
/// use zeroconf_sd::MulticastSocket;
///
/// let std_socket = MulticastSocket::new().into_std()?;
/// let socket = tokio::net::UdpSocket::from_std(std_socket)?;
/// ```
#[derive(Default, Debug, Clone)]
pub struct MulticastSocket {
    bind_ipv4: Option<Ipv4Addr>,
    bind_port: Option<u16>,
    interface: Option<Ipv4Addr>,
    disable_loopback: bool,
}

impl MulticastSocket {
    pub fn new() -> Self {
        MulticastSocket::default()
    }

    /// Override the local address to bind. By default the multicast group
    /// address is bound on Linux and `0.0.0.0` elsewhere.
    pub fn with_bind_ipv4(mut self, bind_ipv4: Ipv4Addr) -> Self {
        self.bind_ipv4 = Some(bind_ipv4);
        self
    }

    /// Override the local port. Defaults to 5353; binding another port
    /// means responders will not see this socket's queries as mDNS.
    pub fn with_bind_port(mut self, bind_port: u16) -> Self {
        self.bind_port = Some(bind_port);
        self
    }

    /// Join the multicast group on one specific interface instead of
    /// `INADDR_ANY`.
    pub fn with_interface(mut self, interface: Ipv4Addr) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Stop the socket from receiving its own multicast traffic. Loopback
    /// stays on by default so a scanner finds services published by the
    /// same host.
    pub fn without_loopback(mut self) -> Self {
        self.disable_loopback = true;
        self
    }

    /// Build the configured socket: `SO_REUSEADDR` (and `SO_REUSEPORT`
    /// where available), non-blocking, bound, and joined to 224.0.0.251.
    pub fn into_std(self) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

        // Several resolvers may share the mDNS port on one host.
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;

        let bind_ip = if let Some(bind_ipv4) = self.bind_ipv4 {
            IpAddr::V4(bind_ipv4)
        } else if cfg!(target_os = "linux") {
            IpAddr::V4(MDNS_MULTICAST_IPV4)
        } else {
            // Binding the group address only works on Linux; macOS and
            // Windows need the wildcard.
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        let bind_port = self.bind_port.unwrap_or(MDNS_PORT);
        socket.bind(&SocketAddr::new(bind_ip, bind_port).into())?;

        let iface = self.interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        socket.join_multicast_v4(&MDNS_MULTICAST_IPV4, &iface)?;
        socket.set_multicast_loop_v4(!self.disable_loopback)?;

        Ok(socket.into())
    }
}
