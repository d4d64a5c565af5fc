//! Tokio driver for the sans-I/O engine.
//!
//! [`Zeroconf`] owns a background task that runs the [`Engine`] event
//! loop: it opens the multicast socket on demand, pumps packets in and
//! out, fires due timeouts and dispatches engine events to subscribed
//! callbacks.
//!
//! # Example
//!
//! ```rust,no_run
//! use zeroconf_sd::{EventKind, Zeroconf, ZeroconfConfig};
//!
//! # async fn run() -> zeroconf_sd::Result<()> {
//! let zeroconf = Zeroconf::new(ZeroconfConfig::default());
//! zeroconf.on(EventKind::Resolved, |event| {
//!     println!("{event}");
//! });
//! zeroconf.scan("http", "tcp", "local.");
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bytes::BytesMut;
use sansio::Protocol;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::bus::{Event, EventBus, EventKind, Subscription};
use crate::config::ZeroconfConfig;
use crate::error::{Error, Result};
use crate::proto::Engine;
use crate::record::{ServiceRecord, ServiceRegistration};
use crate::socket::MulticastSocket;
use crate::table::ServiceTable;
use crate::transport::{TaggedBytesMut, TransportContext, TransportMessage, TransportProtocol};

enum Command {
    Scan {
        service_type: String,
        protocol: String,
        domain: String,
    },
    Stop,
    Publish(ServiceRegistration),
    Unpublish(String),
    Shutdown,
}

/// Async zeroconf client.
///
/// Cheap accessors ([`get_services`](Self::get_services) and friends) read
/// shared snapshots directly; everything that touches the network is
/// forwarded to the background task and reported through events.
///
/// Dropping the handle shuts the background task down; published services
/// say goodbye on the way out. Call [`shutdown`](Self::shutdown) instead
/// to wait for that to finish.
pub struct Zeroconf {
    cmd_tx: mpsc::UnboundedSender<Command>,
    task: Option<tokio::task::JoinHandle<()>>,
    services: Arc<ServiceTable>,
    published: Arc<ServiceTable>,
    bus: Arc<EventBus>,
    listeners_attached: Arc<AtomicBool>,
}

impl Zeroconf {
    /// Spawn the client on the current tokio runtime. No socket is opened
    /// until the first scan or publish.
    pub fn new(config: ZeroconfConfig) -> Self {
        let engine = Engine::new(config);
        let services = engine.services();
        let published = engine.published();
        let bus = Arc::new(EventBus::new());
        // Engine-to-bus forwarding is in place from the start; a fresh
        // handle dispatches events without further setup.
        let listeners_attached = Arc::new(AtomicBool::new(true));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_loop(
            engine,
            cmd_rx,
            Arc::clone(&bus),
            Arc::clone(&listeners_attached),
        ));

        Self {
            cmd_tx,
            task: Some(task),
            services,
            published,
            bus,
            listeners_attached,
        }
    }

    /// Re-attach event dispatch after [`detach_listeners`](Self::detach_listeners).
    /// Listeners are attached on construction, so this is only needed to
    /// undo a detach.
    ///
    /// # Errors
    ///
    /// Attaching while already attached returns
    /// [`Error::ErrListenersAlreadyInstalled`] and also reports it on the
    /// error channel; the existing wiring stays intact.
    pub fn attach_listeners(&self) -> Result<()> {
        if self.listeners_attached.swap(true, Ordering::SeqCst) {
            let err = Error::ErrListenersAlreadyInstalled;
            self.bus.emit(&Event::Error(err.clone()));
            return Err(err);
        }
        Ok(())
    }

    /// Detach listeners; events are dropped until the next attach. A
    /// no-op when not attached.
    pub fn detach_listeners(&self) {
        self.listeners_attached.store(false, Ordering::SeqCst);
    }

    /// Subscribe a callback to one event channel. Callbacks run on the
    /// background task; keep them short.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, callback)
    }

    /// Remove a callback. Idempotent.
    pub fn off(&self, subscription: Subscription) {
        self.bus.unsubscribe(subscription);
    }

    /// Start scanning for a service type. A running scan is implicitly
    /// stopped and its results cleared first.
    pub fn scan(&self, service_type: &str, protocol: &str, domain: &str) {
        self.send(Command::Scan {
            service_type: service_type.to_owned(),
            protocol: protocol.to_owned(),
            domain: domain.to_owned(),
        });
    }

    /// Stop the current scan.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Publish a service on the local network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrMissingServiceName`] for a registration with an
    /// empty instance label. Later failures (socket errors and the like)
    /// are reported on the error channel.
    pub fn publish(&self, registration: ServiceRegistration) -> Result<()> {
        if registration.name.is_empty() {
            return Err(Error::ErrMissingServiceName);
        }
        self.send(Command::Publish(registration));
        Ok(())
    }

    /// Withdraw a published service by instance label.
    pub fn unpublish(&self, name: &str) {
        self.send(Command::Unpublish(name.to_owned()));
    }

    /// Snapshot of discovered services, sorted by instance label.
    pub fn get_services(&self) -> Vec<ServiceRecord> {
        self.services.snapshot()
    }

    /// Snapshot of locally published services, sorted by instance label.
    pub fn get_published_services(&self) -> Vec<ServiceRecord> {
        self.published.snapshot()
    }

    /// Shut the client down and wait for goodbyes to go out.
    pub async fn shutdown(mut self) {
        self.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, cmd: Command) {
        // Failure means the background task is gone; there is nobody left
        // to act on the command.
        let _ = self.cmd_tx.send(cmd);
    }
}

impl Drop for Zeroconf {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }
}

async fn run_loop(
    mut engine: Engine,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    bus: Arc<EventBus>,
    listeners_attached: Arc<AtomicBool>,
) {
    let mut socket: Option<UdpSocket> = None;
    let mut buf = vec![0u8; 2048];

    loop {
        flush_writes(&mut engine, &mut socket).await;
        dispatch_events(&mut engine, &bus, &listeners_attached);
        maybe_close_socket(&engine, &mut socket);

        let deadline = engine.poll_timeout();
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let now = Instant::now();
                match cmd {
                    Some(Command::Scan { service_type, protocol, domain }) => {
                        engine.scan(&service_type, &protocol, &domain, now);
                    }
                    Some(Command::Stop) => engine.stop(now),
                    Some(Command::Publish(registration)) => {
                        // The handle validates registrations before sending
                        // them over.
                        if let Err(err) = engine.publish(registration, now) {
                            log::warn!("publish rejected: {err}");
                        }
                    }
                    Some(Command::Unpublish(name)) => engine.unpublish(&name, now),
                    Some(Command::Shutdown) | None => break,
                }
            }
            received = recv_from_opt(socket.as_ref(), &mut buf) => {
                match received {
                    Ok((n, peer_addr)) => {
                        let message = read_message(&buf[..n], peer_addr, socket.as_ref());
                        if let Err(err) = engine.handle_read(message) {
                            log::warn!("engine rejected packet: {err}");
                        }
                    }
                    Err(err) => {
                        socket = None;
                        engine.handle_transport_error(err.into());
                    }
                }
            }
            _ = sleep_until_opt(deadline) => {
                if let Err(err) = engine.handle_timeout(Instant::now()) {
                    log::warn!("timeout handling failed: {err}");
                }
            }
        }
    }

    // Withdraw everything still published, push the goodbyes out, then
    // deliver the final events.
    let now = Instant::now();
    for record in engine.published_services() {
        engine.unpublish(&record.name, now);
    }
    engine.stop(now);
    flush_writes(&mut engine, &mut socket).await;
    dispatch_events(&mut engine, &bus, &listeners_attached);
    if let Err(err) = engine.close() {
        log::warn!("engine close failed: {err}");
    }
    flush_writes(&mut engine, &mut socket).await;
}

// Sends everything the engine has queued, opening the socket on first
// use. Send failures are fed back into the engine as transport errors.
async fn flush_writes(engine: &mut Engine, socket: &mut Option<UdpSocket>) {
    while let Some(packet) = engine.poll_write() {
        if socket.is_none() {
            match open_socket() {
                Ok(sock) => *socket = Some(sock),
                Err(err) => {
                    // Drain the queue; every packet would fail the same way.
                    while engine.poll_write().is_some() {}
                    engine.handle_transport_error(err);
                    return;
                }
            }
        }
        let sent = match socket.as_ref() {
            Some(sock) => sock.send_to(&packet.message, packet.transport.peer_addr).await,
            None => return,
        };
        if let Err(err) = sent {
            *socket = None;
            while engine.poll_write().is_some() {}
            engine.handle_transport_error(err.into());
            return;
        }
    }
}

fn open_socket() -> Result<UdpSocket> {
    let std_socket = MulticastSocket::new().into_std()?;
    log::debug!("opened mDNS socket on {:?}", std_socket.local_addr());
    Ok(UdpSocket::from_std(std_socket)?)
}

fn dispatch_events(engine: &mut Engine, bus: &EventBus, listeners_attached: &AtomicBool) {
    while let Some(event) = engine.poll_event() {
        if !listeners_attached.load(Ordering::SeqCst) {
            if let Event::Error(err) = &event {
                log::error!("discovery error with no listeners attached: {err}");
            }
            continue;
        }
        if event.kind() == EventKind::Error && !bus.has_subscribers(EventKind::Error) {
            log::error!("unhandled discovery error: {event}");
            continue;
        }
        bus.emit(&event);
    }
}

// The socket is only held while there is something to do with it.
fn maybe_close_socket(engine: &Engine, socket: &mut Option<UdpSocket>) {
    if socket.is_some()
        && engine.state() != crate::proto::SessionState::Scanning
        && engine.published_services().is_empty()
    {
        log::debug!("closing idle mDNS socket");
        *socket = None;
    }
}

async fn recv_from_opt(
    socket: Option<&UdpSocket>,
    buf: &mut [u8],
) -> std::io::Result<(usize, SocketAddr)> {
    match socket {
        Some(socket) => socket.recv_from(buf).await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

fn read_message(buf: &[u8], peer_addr: SocketAddr, socket: Option<&UdpSocket>) -> TaggedBytesMut {
    let local_addr = socket
        .and_then(|s| s.local_addr().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
    TransportMessage {
        now: Instant::now(),
        transport: TransportContext {
            local_addr,
            peer_addr,
            transport_protocol: TransportProtocol::UDP,
        },
        message: BytesMut::from(buf),
    }
}
