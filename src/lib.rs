//! # zeroconf-sd
//!
//! Zero-configuration service discovery (DNS-SD over mDNS) for Rust.
//!
//! This crate discovers and publishes services on the local network the way
//! Bonjour and Avahi do: PTR records enumerate instances of a service type,
//! SRV and TXT records carry host, port and metadata, and A/AAAA records
//! carry addresses. Everything runs over multicast UDP on 224.0.0.251:5353.
//!
//! ## Two APIs
//!
//! - [`Zeroconf`]: an async client driven by a background tokio task. Start
//!   a scan, subscribe to events, read snapshots. This is the API most
//!   applications want.
//! - [`Engine`]: the underlying sans-I/O protocol state machine,
//!   implementing the [`sansio::Protocol`] trait. Use it directly to embed
//!   discovery in a different runtime or event loop.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use zeroconf_sd::{EventKind, Zeroconf, ZeroconfConfig};
//!
//! # async fn run() -> zeroconf_sd::Result<()> {
//! let zeroconf = Zeroconf::new(ZeroconfConfig::default());
//! zeroconf.on(EventKind::Resolved, |event| {
//!     println!("resolved: {event}");
//! });
//!
//! // Browse for HTTP servers: _http._tcp.local.
//! zeroconf.scan("http", "tcp", "local.");
//! # Ok(())
//! # }
//! ```
//!
//! Publishing works the same way:
//!
//! ```rust,no_run
//! use zeroconf_sd::{ServiceRegistration, Zeroconf, ZeroconfConfig};
//!
//! # fn run(zeroconf: &Zeroconf) -> zeroconf_sd::Result<()> {
//! zeroconf.publish(
//!     ServiceRegistration::new("http", "My Web Server", 8080)
//!         .with_txt_value("path", "/admin"),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving the engine yourself
//!
//! The sans-I/O [`Engine`] performs no I/O: the caller reads packets from
//! the network and feeds them to `handle_read()`, sends packets returned by
//! `poll_write()`, calls `handle_timeout()` when `poll_timeout()` expires,
//! and drains `poll_event()`. [`MulticastSocket`] builds a correctly
//! configured socket for it. See the [`Engine`] docs for the full
//! event-loop pattern.
//!
//! ## Record lifecycle
//!
//! A discovered instance starts out announced (seen in a PTR answer),
//! becomes resolved once its host, port and at least one address are known,
//! and is removed when a goodbye (TTL 0) arrives. State only moves
//! forward; a partial answer never demotes a resolved record.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub(crate) mod bus;
pub(crate) mod client;
pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod message;
pub(crate) mod proto;
pub(crate) mod record;
pub(crate) mod socket;
pub(crate) mod table;
pub(crate) mod transport;

pub use bus::{Event, EventKind, Subscription};
pub use client::Zeroconf;
pub use config::ZeroconfConfig;
pub use error::{Error, Result};
pub use proto::{Engine, MDNS_DEST_ADDR, MDNS_MULTICAST_IPV4, MDNS_PORT, SessionState};
pub use record::{RecordState, ServiceRecord, ServiceRegistration, TxtValue};
pub use socket::MulticastSocket;
pub use transport::{TaggedBytesMut, TransportContext, TransportMessage, TransportProtocol};
