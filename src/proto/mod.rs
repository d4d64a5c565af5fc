//! Sans-I/O DNS-SD engine.
//!
//! [`Engine`] holds all protocol state for discovering and publishing
//! services but performs no I/O of its own. It implements the
//! [`sansio::Protocol`] trait; the caller is responsible for:
//!
//! 1. **Network I/O**: reading and writing UDP packets on 224.0.0.251:5353
//! 2. **Timing**: calling `handle_timeout()` when `poll_timeout()` expires
//! 3. **Event processing**: draining events from `poll_event()`
//!
//! The tokio driver in [`crate::client`] does exactly this; drive the
//! engine directly only when embedding it in a different runtime.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//!
//! use sansio::Protocol;
//! use zeroconf_sd::{Engine, ZeroconfConfig};
//!
//! let mut engine = Engine::new(ZeroconfConfig::default());
//! engine.scan("http", "tcp", "local.", Instant::now());
//!
//! // The PTR query is now queued for the multicast group.
//! while let Some(packet) = engine.poll_write() {
//!     println!("send {} bytes to {}", packet.message.len(), packet.transport.peer_addr);
//! }
//! ```

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;

use crate::bus::Event;
use crate::config::ZeroconfConfig;
use crate::error::{Error, Result};
use crate::message::header::Header;
use crate::message::name::Name;
use crate::message::question::Question;
use crate::message::resource::a::AResource;
use crate::message::resource::aaaa::AaaaResource;
use crate::message::resource::ptr::PtrResource;
use crate::message::resource::srv::SrvResource;
use crate::message::resource::txt::TxtResource;
use crate::message::resource::{Resource, ResourceBody, ResourceHeader};
use crate::message::{DNSCLASS_INET, DnsType, Message};
use crate::record::{ServiceRecord, ServiceRegistration, split_instance};
use crate::table::ServiceTable;
use crate::transport::{TaggedBytesMut, TransportContext, TransportMessage, TransportProtocol};

/// The mDNS multicast group address (224.0.0.251).
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The standard mDNS port (5353).
pub const MDNS_PORT: u16 = 5353;

/// mDNS multicast destination address (224.0.0.251:5353). All queries and
/// responses go here.
pub const MDNS_DEST_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), MDNS_PORT);

/// Discovery session state.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No scan in progress.
    #[default]
    Idle,
    /// A scan is in progress and queries are being repeated.
    Scanning,
    /// The transport failed; the session is dead until the next scan.
    Failed,
}

// An active scan for one service type.
#[derive(Debug, Clone)]
struct Session {
    // Full type name with trailing dot, e.g. "_http._tcp.local.".
    type_name: String,
    service_type: String,
    protocol: String,
    domain: String,
    // Current re-query interval; doubles up to the configured cap and
    // resets when a matching response arrives.
    interval: Duration,
    next_query: Instant,
}

// A bounded attempt to resolve an announced instance by querying its
// SRV/TXT/A records directly.
#[derive(Debug, Clone)]
struct Probe {
    instance: String,
    full_name: String,
    next_retry: Instant,
    attempts_left: u32,
}

/// Sans-I/O DNS-SD engine: scans for service instances, resolves them and
/// answers queries for locally published services.
///
/// All methods that take a `now` argument are driven by the caller's
/// clock, so the engine can be tested without sleeping.
pub struct Engine {
    config: ZeroconfConfig,

    state: SessionState,
    session: Option<Session>,
    probes: Vec<Probe>,

    // Discovered instances, keyed by instance label.
    services: Arc<ServiceTable>,
    // Locally published instances, keyed by instance label.
    published: Arc<ServiceTable>,
    registrations: HashMap<String, ServiceRegistration>,
    next_announce: Option<Instant>,

    write_outs: VecDeque<TaggedBytesMut>,
    event_outs: VecDeque<Event>,
    next_timeout: Option<Instant>,

    malformed_packets: u64,
    closed: bool,
}

impl Engine {
    pub fn new(config: ZeroconfConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            session: None,
            probes: Vec::new(),
            services: Arc::new(ServiceTable::new()),
            published: Arc::new(ServiceTable::new()),
            registrations: HashMap::new(),
            next_announce: None,
            write_outs: VecDeque::new(),
            event_outs: VecDeque::new(),
            next_timeout: None,
            malformed_packets: 0,
            closed: false,
        }
    }

    /// Start scanning for a service type, e.g. `scan("http", "tcp",
    /// "local.", now)`.
    ///
    /// Starting a scan while one is running implicitly stops the old one
    /// first. The service table is cleared either way, so stale instances
    /// from a previous scan never leak into the new one.
    pub fn scan(&mut self, service_type: &str, protocol: &str, domain: &str, now: Instant) {
        if self.state == SessionState::Scanning {
            self.event_outs.push_back(Event::Stop);
        }
        self.services.clear();
        self.probes.clear();
        self.event_outs.push_back(Event::Update);

        let type_name = crate::record::service_type_name(service_type, protocol, domain);
        log::debug!("scanning for {type_name}");
        self.session = Some(Session {
            type_name: type_name.clone(),
            service_type: service_type.trim_start_matches('_').to_owned(),
            protocol: protocol.trim_start_matches('_').to_owned(),
            domain: domain.to_owned(),
            interval: self.config.query_interval,
            next_query: now + self.config.query_interval,
        });
        self.state = SessionState::Scanning;
        self.event_outs.push_back(Event::Start);

        self.send_ptr_query(&type_name, now);
        self.update_next_timeout();
    }

    /// Stop the current scan. Discovered records stay in the table until
    /// the next scan clears it. A no-op unless a scan is running.
    pub fn stop(&mut self, _now: Instant) {
        if self.state != SessionState::Scanning {
            return;
        }
        self.session = None;
        self.probes.clear();
        self.state = SessionState::Idle;
        self.event_outs.push_back(Event::Stop);
        self.update_next_timeout();
    }

    /// Publish a service. The registration is announced immediately and
    /// re-announced periodically, and the engine answers matching queries
    /// until [`unpublish`](Self::unpublish).
    ///
    /// Publishing a registration whose instance label is already published
    /// replaces it.
    pub fn publish(&mut self, registration: ServiceRegistration, now: Instant) -> Result<()> {
        if registration.name.is_empty() {
            return Err(Error::ErrMissingServiceName);
        }

        let record = self.published_record(&registration);
        log::debug!("publishing {}", record.full_name());
        self.queue_service_message(&registration, self.config.response_ttl, now);
        self.published.upsert(record.clone());
        self.registrations
            .insert(registration.name.clone(), registration);
        self.event_outs.push_back(Event::Published(record));

        if self.next_announce.is_none() {
            self.next_announce = Some(now + self.config.announce_interval);
        }
        self.update_next_timeout();
        Ok(())
    }

    /// Withdraw a published service by instance label. A goodbye (TTL 0)
    /// announcement is queued so peers drop the instance promptly.
    /// Unpublishing a name that is not published does nothing.
    pub fn unpublish(&mut self, name: &str, now: Instant) {
        let Some(registration) = self.registrations.remove(name) else {
            log::trace!("unpublish of unknown service {name}");
            return;
        };
        log::debug!("unpublishing {}", registration.full_name());
        self.queue_service_message(&registration, 0, now);
        if let Some(record) = self.published.remove(name) {
            self.event_outs.push_back(Event::Unpublished(record));
        }
        if self.registrations.is_empty() {
            self.next_announce = None;
        }
        self.update_next_timeout();
    }

    /// Report a transport failure into the engine. A running scan moves to
    /// [`SessionState::Failed`] and stops querying; an error event is
    /// emitted either way.
    pub fn handle_transport_error(&mut self, err: Error) {
        log::warn!("transport failure: {err}");
        self.event_outs.push_back(Event::Error(err));
        if self.state == SessionState::Scanning {
            self.state = SessionState::Failed;
            self.session = None;
            self.probes.clear();
            self.update_next_timeout();
        }
    }

    /// Shared handle to the table of discovered services.
    pub(crate) fn services(&self) -> Arc<ServiceTable> {
        Arc::clone(&self.services)
    }

    /// Shared handle to the table of locally published services.
    pub(crate) fn published(&self) -> Arc<ServiceTable> {
        Arc::clone(&self.published)
    }

    /// Snapshot of discovered services, sorted by instance label.
    pub fn discovered_services(&self) -> Vec<ServiceRecord> {
        self.services.snapshot()
    }

    /// Snapshot of locally published services, sorted by instance label.
    pub fn published_services(&self) -> Vec<ServiceRecord> {
        self.published.snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of inbound packets dropped as unparseable.
    pub fn malformed_packet_count(&self) -> u64 {
        self.malformed_packets
    }

    fn published_record(&self, registration: &ServiceRegistration) -> ServiceRecord {
        let mut record = ServiceRecord::new(
            &registration.name,
            registration.service_type.trim_start_matches('_'),
            registration.protocol.trim_start_matches('_'),
            &registration.domain,
        );
        record.host = Some(self.host_name(registration));
        record.port = Some(registration.port);
        record.addresses = self.config.local_addrs.clone();
        record.txt = registration.normalized_txt();
        record.state = crate::record::RecordState::Resolved;
        record
    }

    fn host_name(&self, registration: &ServiceRegistration) -> String {
        match &self.config.host_name {
            Some(host) => {
                if host.ends_with('.') {
                    host.clone()
                } else {
                    format!("{host}.")
                }
            }
            None => format!("{}.local.", registration.name),
        }
    }

    fn queue_packet(&mut self, raw: Vec<u8>, now: Instant) {
        self.write_outs.push_back(TransportMessage {
            now,
            transport: TransportContext {
                local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
                peer_addr: MDNS_DEST_ADDR,
                transport_protocol: TransportProtocol::UDP,
            },
            message: BytesMut::from(&raw[..]),
        });
    }

    fn send_ptr_query(&mut self, type_name: &str, now: Instant) {
        self.send_query(&[(type_name.to_owned(), DnsType::Ptr)], now);
    }

    fn send_query(&mut self, questions: &[(String, DnsType)], now: Instant) {
        let mut msg = Message::default();
        for (name, typ) in questions {
            let name = match Name::new(name) {
                Ok(n) => n,
                Err(err) => {
                    log::warn!("skipping unpackable query name {name}: {err}");
                    continue;
                }
            };
            msg.questions.push(Question {
                name,
                typ: *typ,
                class: DNSCLASS_INET,
            });
        }
        if msg.questions.is_empty() {
            return;
        }
        match msg.pack() {
            Ok(raw) => {
                log::trace!("queuing query with {} questions", msg.questions.len());
                self.queue_packet(raw, now);
            }
            Err(err) => log::error!("failed to pack query: {err}"),
        }
    }

    // Queue the announcement bundle for one registration: an authoritative
    // response with PTR, SRV and TXT answers plus A/AAAA additionals. A TTL
    // of zero turns the bundle into a goodbye.
    fn queue_service_message(&mut self, registration: &ServiceRegistration, ttl: u32, now: Instant) {
        match self.build_service_message(registration, ttl) {
            Ok(raw) => self.queue_packet(raw, now),
            Err(err) => log::error!(
                "failed to pack announcement for {}: {err}",
                registration.full_name()
            ),
        }
    }

    fn build_service_message(
        &self,
        registration: &ServiceRegistration,
        ttl: u32,
    ) -> Result<Vec<u8>> {
        let type_name = Name::new(&registration.type_name())?;
        let full_name = Name::new(&registration.full_name())?;
        let host = Name::new(&self.host_name(registration))?;

        let header = |name: Name| ResourceHeader {
            name,
            class: DNSCLASS_INET,
            ttl,
            ..Default::default()
        };

        let txt = registration
            .normalized_txt()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let mut msg = Message {
            header: Header {
                response: true,
                authoritative: true,
                ..Default::default()
            },
            answers: vec![
                Resource {
                    header: header(type_name),
                    body: Some(ResourceBody::Ptr(PtrResource {
                        ptr: full_name.clone(),
                    })),
                },
                Resource {
                    header: header(full_name.clone()),
                    body: Some(ResourceBody::Srv(SrvResource {
                        priority: 0,
                        weight: 0,
                        port: registration.port,
                        target: host.clone(),
                    })),
                },
                Resource {
                    header: header(full_name),
                    body: Some(ResourceBody::Txt(TxtResource { txt })),
                },
            ],
            ..Default::default()
        };

        for addr in &self.config.local_addrs {
            let body = match addr {
                IpAddr::V4(ip) => ResourceBody::A(AResource { a: ip.octets() }),
                IpAddr::V6(ip) => ResourceBody::Aaaa(AaaaResource { aaaa: ip.octets() }),
            };
            msg.additionals.push(Resource {
                header: header(host.clone()),
                body: Some(body),
            });
        }

        msg.pack()
    }

    fn process_message(&mut self, msg: &TaggedBytesMut) {
        let mut parsed = Message::default();
        if let Err(err) = parsed.unpack(&msg.message) {
            // Multicast groups carry plenty of traffic from unrelated or
            // broken stacks. Drop quietly and keep count.
            self.malformed_packets += 1;
            log::debug!("dropping malformed packet from {}: {err}", msg.transport.peer_addr);
            return;
        }

        if parsed.header.response {
            self.process_response(&parsed, msg.now);
        } else {
            self.process_query(&parsed, msg.now);
        }
    }

    // Ingest a response into the service table. Records are classified in
    // three passes (PTR, then SRV/TXT, then addresses) so a bundle parsed
    // in any section order still resolves in one packet.
    fn process_response(&mut self, msg: &Message, now: Instant) {
        let Some(session) = self.session.clone() else {
            return;
        };

        let records: Vec<&Resource> = msg
            .answers
            .iter()
            .chain(msg.authorities.iter())
            .chain(msg.additionals.iter())
            .collect();

        let mut changed = false;
        let mut matched_session = false;

        for resource in &records {
            let Some(ResourceBody::Ptr(ptr)) = &resource.body else {
                continue;
            };
            if !resource
                .header
                .name
                .data
                .eq_ignore_ascii_case(&session.type_name)
            {
                continue;
            }
            matched_session = true;

            // PTR answers without an extractable instance label are
            // dropped.
            let Some(instance) = split_instance(&ptr.ptr.data, &session.type_name) else {
                log::debug!("ignoring nameless PTR answer {}", ptr.ptr.data);
                continue;
            };

            if resource.header.ttl == 0 {
                if self.services.remove(&instance).is_some() {
                    log::debug!("goodbye from {instance}");
                    self.probes.retain(|p| p.instance != instance);
                    self.event_outs.push_back(Event::Remove(instance));
                    changed = true;
                }
                continue;
            }

            if self.services.get(&instance).is_none() {
                let record = ServiceRecord::new(
                    &instance,
                    &session.service_type,
                    &session.protocol,
                    &session.domain,
                );
                log::debug!("found {}", record.full_name());
                self.probes.push(Probe {
                    instance: instance.clone(),
                    full_name: record.full_name(),
                    next_retry: now + self.config.probe_interval,
                    attempts_left: self.config.probe_attempts,
                });
                self.services.upsert(record.clone());
                self.event_outs.push_back(Event::Found(record));
                changed = true;
            }
        }

        for resource in &records {
            match &resource.body {
                Some(ResourceBody::Srv(srv)) => {
                    let Some(instance) =
                        split_instance(&resource.header.name.data, &session.type_name)
                    else {
                        continue;
                    };
                    let Some(mut record) = self.services.get(&instance) else {
                        continue;
                    };
                    if record.host.as_deref() != Some(&srv.target.data)
                        || record.port != Some(srv.port)
                    {
                        record.host = Some(srv.target.data.clone());
                        record.port = Some(srv.port);
                        changed = self.commit(record) || changed;
                    }
                }
                Some(ResourceBody::Txt(txt)) => {
                    let Some(instance) =
                        split_instance(&resource.header.name.data, &session.type_name)
                    else {
                        continue;
                    };
                    let Some(mut record) = self.services.get(&instance) else {
                        continue;
                    };
                    let pairs = parse_txt(&txt.txt);
                    if record.txt != pairs {
                        record.txt = pairs;
                        changed = self.commit(record) || changed;
                    }
                }
                _ => {}
            }
        }

        for resource in &records {
            let addr = match &resource.body {
                Some(ResourceBody::A(a)) => IpAddr::V4(a.a.into()),
                Some(ResourceBody::Aaaa(aaaa)) => IpAddr::V6(aaaa.aaaa.into()),
                _ => continue,
            };
            let host = &resource.header.name.data;
            for mut record in self.services.snapshot() {
                let matches = record
                    .host
                    .as_deref()
                    .is_some_and(|h| h.eq_ignore_ascii_case(host));
                if matches && record.add_address(addr) {
                    changed = self.commit(record) || changed;
                }
            }
        }

        if matched_session {
            // The type is alive on this network; fall back to the fast
            // query cadence, with the next query one initial interval out.
            if let Some(session) = &mut self.session {
                session.interval = self.config.query_interval;
                session.next_query = now + self.config.query_interval;
            }
            self.update_next_timeout();
        }
        if changed {
            self.event_outs.push_back(Event::Update);
        }
    }

    // Write an updated record back, promoting it to resolved when it has
    // crossed the threshold. A refinement of an already resolved record
    // emits resolved again. Returns true, as every commit is a change.
    fn commit(&mut self, mut record: ServiceRecord) -> bool {
        if record.state == crate::record::RecordState::Announced && record.is_resolved() {
            record.state = crate::record::RecordState::Resolved;
            log::debug!("resolved {}", record.full_name());
            self.probes.retain(|p| p.instance != record.name);
            self.services.upsert(record.clone());
            self.event_outs.push_back(Event::Resolved(record));
        } else if record.state == crate::record::RecordState::Resolved {
            self.services.upsert(record.clone());
            self.event_outs.push_back(Event::Resolved(record));
        } else {
            self.services.upsert(record);
        }
        true
    }

    // Answer questions that match locally published services. Responses
    // always go to the multicast group so every cache on the segment is
    // refreshed.
    fn process_query(&mut self, msg: &Message, now: Instant) {
        if self.registrations.is_empty() {
            return;
        }

        let mut names_to_answer: Vec<String> = Vec::new();
        for question in &msg.questions {
            let qname = &question.name.data;
            for registration in self.registrations.values() {
                let matches = match question.typ {
                    DnsType::Ptr => qname.eq_ignore_ascii_case(&registration.type_name()),
                    DnsType::Srv | DnsType::Txt => {
                        qname.eq_ignore_ascii_case(&registration.full_name())
                    }
                    DnsType::A | DnsType::Aaaa => {
                        qname.eq_ignore_ascii_case(&self.host_name(registration))
                    }
                    DnsType::All => {
                        qname.eq_ignore_ascii_case(&registration.type_name())
                            || qname.eq_ignore_ascii_case(&registration.full_name())
                    }
                    _ => false,
                };
                if matches && !names_to_answer.contains(&registration.name) {
                    names_to_answer.push(registration.name.clone());
                }
            }
        }

        for name in names_to_answer {
            if let Some(registration) = self.registrations.get(&name).cloned() {
                log::trace!("answering query for {}", registration.full_name());
                self.queue_service_message(&registration, self.config.response_ttl, now);
            }
        }
    }

    fn fire_session_query(&mut self, now: Instant) {
        let Some(session) = &mut self.session else {
            return;
        };
        if session.next_query > now {
            return;
        }
        session.interval = (session.interval * 2).min(self.config.max_query_interval);
        session.next_query = now + session.interval;
        let type_name = session.type_name.clone();
        self.send_ptr_query(&type_name, now);
    }

    fn fire_probes(&mut self, now: Instant) {
        let mut due: Vec<(String, String)> = Vec::new();
        for probe in &mut self.probes {
            if probe.next_retry > now {
                continue;
            }
            due.push((probe.instance.clone(), probe.full_name.clone()));
            probe.attempts_left = probe.attempts_left.saturating_sub(1);
            probe.next_retry = now + self.config.probe_interval;
        }
        // An exhausted probe is dropped; the instance stays announced.
        self.probes.retain(|p| {
            if p.attempts_left == 0 {
                log::debug!("giving up resolving {}", p.full_name);
                false
            } else {
                true
            }
        });
        for (instance, full_name) in due {
            let mut questions = vec![
                (full_name.clone(), DnsType::Srv),
                (full_name, DnsType::Txt),
            ];
            // Once the SRV target is known, chase its address too.
            if let Some(host) = self.services.get(&instance).and_then(|r| r.host) {
                questions.push((host, DnsType::A));
            }
            self.send_query(&questions, now);
        }
    }

    fn fire_announcements(&mut self, now: Instant) {
        let Some(next_announce) = self.next_announce else {
            return;
        };
        if next_announce > now {
            return;
        }
        for registration in self.registrations.values().cloned().collect::<Vec<_>>() {
            self.queue_service_message(&registration, self.config.response_ttl, now);
        }
        self.next_announce = Some(now + self.config.announce_interval);
    }

    fn update_next_timeout(&mut self) {
        let mut next = self.session.as_ref().map(|s| s.next_query);
        for probe in &self.probes {
            next = Some(match next {
                Some(t) => t.min(probe.next_retry),
                None => probe.next_retry,
            });
        }
        if let Some(announce) = self.next_announce {
            next = Some(match next {
                Some(t) => t.min(announce),
                None => announce,
            });
        }
        self.next_timeout = next;
    }
}

// TXT rdata strings are key=value pairs; a string without '=' is a bare
// key with an empty value. Later duplicates win.
fn parse_txt(strings: &[String]) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for s in strings {
        match s.split_once('=') {
            Some((k, v)) => pairs.insert(k.to_owned(), v.to_owned()),
            None => pairs.insert(s.clone(), String::new()),
        };
    }
    pairs
}

impl sansio::Protocol<TaggedBytesMut, (), ()> for Engine {
    type Rout = ();
    type Wout = TaggedBytesMut;
    type Eout = Event;
    type Error = Error;
    type Time = Instant;

    /// Process an incoming mDNS packet.
    ///
    /// Unparseable packets are counted and dropped without an event;
    /// multicast segments are noisy and a broken peer must not be able to
    /// fail a scan.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrEngineClosed`] once the engine is closed.
    fn handle_read(&mut self, msg: TaggedBytesMut) -> Result<()> {
        if self.closed {
            return Err(Error::ErrEngineClosed);
        }
        self.process_message(&msg);
        Ok(())
    }

    /// The engine has no read outputs; everything is delivered as events.
    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    /// Writes are initiated through [`scan`](Engine::scan) and
    /// [`publish`](Engine::publish), not through this interface.
    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    /// Get the next packet to send. Drain until `None`; each packet goes
    /// to `packet.transport.peer_addr` (the multicast group).
    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.write_outs.pop_front()
    }

    /// External events are not used.
    fn handle_event(&mut self, _evt: ()) -> Result<()> {
        Ok(())
    }

    /// Get the next pending [`Event`]. Drain until `None` after every
    /// `handle_read`, `handle_timeout` or operation call.
    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.event_outs.pop_front()
    }

    /// Run scheduled work that has come due: scan re-queries with
    /// exponential backoff, resolution probes and periodic
    /// re-announcements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrEngineClosed`] once the engine is closed.
    fn handle_timeout(&mut self, now: Self::Time) -> Result<()> {
        if self.closed {
            return Err(Error::ErrEngineClosed);
        }
        self.fire_session_query(now);
        self.fire_probes(now);
        self.fire_announcements(now);
        self.update_next_timeout();
        Ok(())
    }

    /// The deadline at which [`handle_timeout`](Engine::handle_timeout)
    /// should next be called, or `None` when nothing is scheduled.
    fn poll_timeout(&mut self) -> Option<Self::Time> {
        self.next_timeout
    }

    /// Close the engine. Queues goodbyes for everything still published,
    /// then drops all remaining state. The goodbye packets stay available
    /// through [`poll_write`](Engine::poll_write).
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let registrations: Vec<ServiceRegistration> =
            self.registrations.values().cloned().collect();
        for registration in registrations {
            self.queue_service_message(&registration, 0, Instant::now());
        }
        self.closed = true;
        self.session = None;
        self.probes.clear();
        self.registrations.clear();
        self.published.clear();
        self.event_outs.clear();
        self.next_announce = None;
        self.next_timeout = None;
        Ok(())
    }
}

#[cfg(test)]
mod engine_test;
