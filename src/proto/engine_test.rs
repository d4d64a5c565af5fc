use std::time::Duration;

use sansio::Protocol;

use super::*;
use crate::bus::EventKind;
use crate::message::header::Header;
use crate::record::RecordState;

fn tag(raw: Vec<u8>, now: Instant) -> TaggedBytesMut {
    TransportMessage {
        now,
        transport: TransportContext {
            local_addr: "0.0.0.0:5353".parse().unwrap(),
            peer_addr: "192.168.1.9:5353".parse().unwrap(),
            transport_protocol: TransportProtocol::UDP,
        },
        message: BytesMut::from(&raw[..]),
    }
}

fn drain_events(engine: &mut Engine) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = engine.poll_event() {
        events.push(event);
    }
    events
}

fn drain_writes(engine: &mut Engine) -> Vec<TaggedBytesMut> {
    let mut writes = Vec::new();
    while let Some(write) = engine.poll_write() {
        writes.push(write);
    }
    writes
}

fn parse(packet: &TaggedBytesMut) -> Message {
    let mut msg = Message::default();
    msg.unpack(&packet.message).unwrap();
    msg
}

fn answer(name: &str, ttl: u32, body: ResourceBody) -> Resource {
    Resource {
        header: ResourceHeader {
            name: Name::new(name).unwrap(),
            class: DNSCLASS_INET,
            ttl,
            ..Default::default()
        },
        body: Some(body),
    }
}

// A full DNS-SD announcement bundle for one instance of _http._tcp.local.
fn bundle(instance: &str, host: &str, port: u16, ttl: u32) -> Vec<u8> {
    let full = format!("{instance}._http._tcp.local.");
    let mut msg = Message {
        header: Header {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answers: vec![
            answer(
                "_http._tcp.local.",
                ttl,
                ResourceBody::Ptr(PtrResource {
                    ptr: Name::new(&full).unwrap(),
                }),
            ),
            answer(
                &full,
                ttl,
                ResourceBody::Srv(SrvResource {
                    priority: 0,
                    weight: 0,
                    port,
                    target: Name::new(host).unwrap(),
                }),
            ),
            answer(
                &full,
                ttl,
                ResourceBody::Txt(TxtResource {
                    txt: vec!["path=/print".to_owned()],
                }),
            ),
        ],
        additionals: vec![answer(
            host,
            ttl,
            ResourceBody::A(AResource { a: [192, 168, 1, 9] }),
        )],
        ..Default::default()
    };
    msg.pack().unwrap()
}

#[test]
fn test_scan_queues_ptr_query() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);

    assert_eq!(engine.state(), SessionState::Scanning);
    let events: Vec<EventKind> = drain_events(&mut engine).iter().map(Event::kind).collect();
    assert_eq!(events, vec![EventKind::Update, EventKind::Start]);

    let writes = drain_writes(&mut engine);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].transport.peer_addr, MDNS_DEST_ADDR);

    let query = parse(&writes[0]);
    assert!(!query.header.response);
    assert_eq!(query.questions.len(), 1);
    assert_eq!(query.questions[0].typ, DnsType::Ptr);
    assert_eq!(query.questions[0].name.data, "_http._tcp.local.");
}

#[test]
fn test_rescan_implicitly_stops() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    engine
        .handle_read(tag(bundle("printer", "printer.local.", 631, 120), now))
        .unwrap();
    assert_eq!(engine.discovered_services().len(), 1);
    drain_events(&mut engine);

    engine.scan("ipp", "tcp", "local.", now);
    let events: Vec<EventKind> = drain_events(&mut engine).iter().map(Event::kind).collect();
    assert_eq!(
        events,
        vec![EventKind::Stop, EventKind::Update, EventKind::Start]
    );
    assert!(engine.discovered_services().is_empty());
}

#[test]
fn test_full_bundle_resolves_in_one_packet() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);
    drain_writes(&mut engine);

    engine
        .handle_read(tag(bundle("Office Printer", "printer.local.", 631, 120), now))
        .unwrap();

    let events: Vec<EventKind> = drain_events(&mut engine).iter().map(Event::kind).collect();
    assert_eq!(
        events,
        vec![EventKind::Found, EventKind::Resolved, EventKind::Update]
    );

    let services = engine.discovered_services();
    assert_eq!(services.len(), 1);
    let record = &services[0];
    assert_eq!(record.name, "Office Printer");
    assert_eq!(record.state, RecordState::Resolved);
    assert_eq!(record.host.as_deref(), Some("printer.local."));
    assert_eq!(record.port, Some(631));
    assert_eq!(record.addresses, vec!["192.168.1.9".parse::<IpAddr>().unwrap()]);
    assert_eq!(record.txt["path"], "/print");
}

#[test]
fn test_refinement_re_emits_resolved() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    engine
        .handle_read(tag(bundle("printer", "printer.local.", 631, 120), now))
        .unwrap();
    drain_events(&mut engine);

    // Re-delivering identical data changes nothing and stays quiet.
    engine
        .handle_read(tag(bundle("printer", "printer.local.", 631, 120), now))
        .unwrap();
    assert!(engine.poll_event().is_none());

    // A changed TXT record refines the resolved instance.
    let mut msg = Message {
        header: Header {
            response: true,
            ..Default::default()
        },
        answers: vec![answer(
            "printer._http._tcp.local.",
            120,
            ResourceBody::Txt(TxtResource {
                txt: vec!["path=/ipp".to_owned()],
            }),
        )],
        ..Default::default()
    };
    engine.handle_read(tag(msg.pack().unwrap(), now)).unwrap();

    let events: Vec<EventKind> = drain_events(&mut engine).iter().map(Event::kind).collect();
    assert_eq!(events, vec![EventKind::Resolved, EventKind::Update]);
    assert_eq!(engine.discovered_services()[0].txt["path"], "/ipp");
}

#[test]
fn test_partial_then_complete_resolution() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    // PTR only: announced, not resolved.
    let mut msg = Message {
        header: Header {
            response: true,
            ..Default::default()
        },
        answers: vec![answer(
            "_http._tcp.local.",
            120,
            ResourceBody::Ptr(PtrResource {
                ptr: Name::new("printer._http._tcp.local.").unwrap(),
            }),
        )],
        ..Default::default()
    };
    engine.handle_read(tag(msg.pack().unwrap(), now)).unwrap();

    let events: Vec<EventKind> = drain_events(&mut engine).iter().map(Event::kind).collect();
    assert_eq!(events, vec![EventKind::Found, EventKind::Update]);
    assert_eq!(
        engine.discovered_services()[0].state,
        RecordState::Announced
    );

    // SRV and address arrive later; the record crosses the threshold.
    let mut msg = Message {
        header: Header {
            response: true,
            ..Default::default()
        },
        answers: vec![
            answer(
                "printer._http._tcp.local.",
                120,
                ResourceBody::Srv(SrvResource {
                    priority: 0,
                    weight: 0,
                    port: 631,
                    target: Name::new("printer.local.").unwrap(),
                }),
            ),
            answer(
                "printer.local.",
                120,
                ResourceBody::A(AResource { a: [10, 0, 0, 2] }),
            ),
        ],
        ..Default::default()
    };
    engine.handle_read(tag(msg.pack().unwrap(), now)).unwrap();

    let events: Vec<EventKind> = drain_events(&mut engine).iter().map(Event::kind).collect();
    assert_eq!(events, vec![EventKind::Resolved, EventKind::Update]);
    assert_eq!(engine.discovered_services()[0].state, RecordState::Resolved);
}

#[test]
fn test_goodbye_removes_instance() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    engine
        .handle_read(tag(bundle("printer", "printer.local.", 631, 120), now))
        .unwrap();
    drain_events(&mut engine);

    engine
        .handle_read(tag(bundle("printer", "printer.local.", 631, 0), now))
        .unwrap();

    let events = drain_events(&mut engine);
    assert_eq!(events[0], Event::Remove("printer".to_owned()));
    assert_eq!(events[1], Event::Update);
    assert!(engine.discovered_services().is_empty());
}

#[test]
fn test_goodbye_for_unknown_instance_is_silent() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    engine
        .handle_read(tag(bundle("ghost", "ghost.local.", 1, 0), now))
        .unwrap();
    assert!(drain_events(&mut engine).is_empty());
}

#[test]
fn test_foreign_type_ignored() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("ipp", "tcp", "local.", now);
    drain_events(&mut engine);

    // An _http bundle while scanning for _ipp.
    engine
        .handle_read(tag(bundle("printer", "printer.local.", 631, 120), now))
        .unwrap();
    assert!(drain_events(&mut engine).is_empty());
    assert!(engine.discovered_services().is_empty());
}

#[test]
fn test_multibyte_instance_label_resolves() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    // Instance labels are arbitrary bytes on the wire; a label whose
    // lowercase form has a different UTF-8 length must survive intact.
    engine
        .handle_read(tag(bundle("ẞé-Drucker", "drucker.local.", 631, 120), now))
        .unwrap();

    let services = engine.discovered_services();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "ẞé-Drucker");
    assert_eq!(services[0].state, RecordState::Resolved);
}

#[test]
fn test_nameless_ptr_ignored() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    // A PTR answer pointing at the bare type name carries no instance
    // label.
    let mut msg = Message {
        header: Header {
            response: true,
            ..Default::default()
        },
        answers: vec![answer(
            "_http._tcp.local.",
            120,
            ResourceBody::Ptr(PtrResource {
                ptr: Name::new("_http._tcp.local.").unwrap(),
            }),
        )],
        ..Default::default()
    };
    engine.handle_read(tag(msg.pack().unwrap(), now)).unwrap();
    assert!(drain_events(&mut engine).is_empty());
    assert!(engine.discovered_services().is_empty());
}

#[test]
fn test_stop_twice_emits_single_stop() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    engine.stop(now);
    let events: Vec<EventKind> = drain_events(&mut engine).iter().map(Event::kind).collect();
    assert_eq!(events, vec![EventKind::Stop]);
    assert_eq!(engine.state(), SessionState::Idle);

    engine.stop(now);
    assert!(engine.poll_event().is_none());
}

#[test]
fn test_query_backoff_doubles_and_resets() {
    let config = ZeroconfConfig::default()
        .with_query_interval(Duration::from_secs(1))
        .with_max_query_interval(Duration::from_secs(4));
    let mut engine = Engine::new(config);
    let start = Instant::now();
    engine.scan("http", "tcp", "local.", start);
    drain_writes(&mut engine);

    // First re-query is due one interval in; after it fires, the interval
    // doubles.
    let t1 = engine.poll_timeout().unwrap();
    assert_eq!(t1, start + Duration::from_secs(1));
    engine.handle_timeout(t1).unwrap();
    assert_eq!(drain_writes(&mut engine).len(), 1);

    let t2 = engine.poll_timeout().unwrap();
    assert_eq!(t2, t1 + Duration::from_secs(2));
    engine.handle_timeout(t2).unwrap();

    // Doubling caps at max_query_interval.
    let t3 = engine.poll_timeout().unwrap();
    assert_eq!(t3, t2 + Duration::from_secs(4));
    engine.handle_timeout(t3).unwrap();
    let t4 = engine.poll_timeout().unwrap();
    assert_eq!(t4, t3 + Duration::from_secs(4));

    // A matching response resets the cadence; the next query comes one
    // initial interval after the response, then backs off again.
    engine
        .handle_read(tag(bundle("printer", "printer.local.", 631, 120), t3))
        .unwrap();
    drain_events(&mut engine);
    let t5 = engine.poll_timeout().unwrap();
    assert_eq!(t5, t3 + Duration::from_secs(1));
    engine.handle_timeout(t5).unwrap();
    let t6 = engine.poll_timeout().unwrap();
    assert_eq!(t6, t5 + Duration::from_secs(2));
}

#[test]
fn test_probes_are_bounded() {
    let config = ZeroconfConfig::default()
        .with_probe_interval(Duration::from_millis(100))
        .with_probe_attempts(2)
        .with_query_interval(Duration::from_secs(3600));
    let mut engine = Engine::new(config);
    let start = Instant::now();
    engine.scan("http", "tcp", "local.", start);
    drain_writes(&mut engine);

    // Announce without SRV/TXT so the instance stays unresolved.
    let mut msg = Message {
        header: Header {
            response: true,
            ..Default::default()
        },
        answers: vec![answer(
            "_http._tcp.local.",
            120,
            ResourceBody::Ptr(PtrResource {
                ptr: Name::new("printer._http._tcp.local.").unwrap(),
            }),
        )],
        ..Default::default()
    };
    engine.handle_read(tag(msg.pack().unwrap(), start)).unwrap();
    drain_events(&mut engine);

    // First probe fires one probe interval after the announcement.
    let deadline = engine.poll_timeout().unwrap();
    assert_eq!(deadline, start + Duration::from_millis(100));
    engine.handle_timeout(deadline).unwrap();

    let writes = drain_writes(&mut engine);
    assert_eq!(writes.len(), 1);
    let probe = parse(&writes[0]);
    assert_eq!(probe.questions.len(), 2);
    assert_eq!(probe.questions[0].typ, DnsType::Srv);
    assert_eq!(probe.questions[1].typ, DnsType::Txt);
    assert_eq!(probe.questions[0].name.data, "printer._http._tcp.local.");

    // Second and last attempt.
    let deadline = engine.poll_timeout().unwrap();
    engine.handle_timeout(deadline).unwrap();
    assert_eq!(drain_writes(&mut engine).len(), 1);

    // Attempts exhausted: no more probe traffic is scheduled, and the
    // instance stays in the table as announced.
    engine
        .handle_timeout(deadline + Duration::from_secs(1))
        .unwrap();
    assert!(engine.poll_write().is_none());
    assert_eq!(
        engine.discovered_services()[0].state,
        RecordState::Announced
    );
}

#[test]
fn test_publish_announces_and_answers() {
    let config = ZeroconfConfig::default()
        .with_host_name("myhost.local.")
        .with_local_addr("10.1.2.3".parse().unwrap());
    let mut engine = Engine::new(config);
    let now = Instant::now();

    let registration = ServiceRegistration::new("http", "My Server", 8080)
        .with_txt_value("path", "/admin");
    engine.publish(registration, now).unwrap();

    let events = drain_events(&mut engine);
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Published(record) => {
            assert_eq!(record.name, "My Server");
            assert_eq!(record.port, Some(8080));
            assert_eq!(record.host.as_deref(), Some("myhost.local."));
        }
        other => panic!("expected Published, got {other:?}"),
    }

    let writes = drain_writes(&mut engine);
    assert_eq!(writes.len(), 1);
    let announce = parse(&writes[0]);
    assert!(announce.header.response);
    assert!(announce.header.authoritative);
    assert_eq!(announce.answers.len(), 3);
    assert_eq!(announce.additionals.len(), 1);
    assert!(announce.answers.iter().all(|a| a.header.ttl == 120));

    // A PTR question for the type gets the full bundle in response.
    let mut query = Message {
        questions: vec![Question {
            name: Name::new("_http._tcp.local.").unwrap(),
            typ: DnsType::Ptr,
            class: DNSCLASS_INET,
        }],
        ..Default::default()
    };
    engine.handle_read(tag(query.pack().unwrap(), now)).unwrap();
    let writes = drain_writes(&mut engine);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].transport.peer_addr, MDNS_DEST_ADDR);
    let reply = parse(&writes[0]);
    assert_eq!(reply.answers.len(), 3);

    // An SRV question for the instance also gets answered.
    let mut query = Message {
        questions: vec![Question {
            name: Name::new("My Server._http._tcp.local.").unwrap(),
            typ: DnsType::Srv,
            class: DNSCLASS_INET,
        }],
        ..Default::default()
    };
    engine.handle_read(tag(query.pack().unwrap(), now)).unwrap();
    assert_eq!(drain_writes(&mut engine).len(), 1);

    // A question for an unrelated type is ignored.
    let mut query = Message {
        questions: vec![Question {
            name: Name::new("_ipp._tcp.local.").unwrap(),
            typ: DnsType::Ptr,
            class: DNSCLASS_INET,
        }],
        ..Default::default()
    };
    engine.handle_read(tag(query.pack().unwrap(), now)).unwrap();
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_publish_requires_name() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let registration = ServiceRegistration::new("http", "", 8080);
    assert_eq!(
        engine.publish(registration, Instant::now()),
        Err(Error::ErrMissingServiceName)
    );
    assert!(engine.poll_event().is_none());
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_unpublish_sends_goodbye() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine
        .publish(ServiceRegistration::new("http", "server", 8080), now)
        .unwrap();
    drain_events(&mut engine);
    drain_writes(&mut engine);

    engine.unpublish("server", now);
    let events = drain_events(&mut engine);
    assert!(matches!(events[0], Event::Unpublished(_)));
    assert!(engine.published_services().is_empty());

    let writes = drain_writes(&mut engine);
    assert_eq!(writes.len(), 1);
    let goodbye = parse(&writes[0]);
    assert!(goodbye.answers.iter().all(|a| a.header.ttl == 0));

    // Unpublishing again is a silent no-op.
    engine.unpublish("server", now);
    assert!(engine.poll_event().is_none());
    assert!(engine.poll_write().is_none());
}

#[test]
fn test_republish_replaces() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine
        .publish(ServiceRegistration::new("http", "server", 8080), now)
        .unwrap();
    engine
        .publish(ServiceRegistration::new("http", "server", 9090), now)
        .unwrap();

    let published = engine.published_services();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].port, Some(9090));
}

#[test]
fn test_malformed_packet_counted_not_fatal() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    engine.handle_read(tag(vec![0xFF, 0x00, 0x01], now)).unwrap();
    assert_eq!(engine.malformed_packet_count(), 1);
    assert!(drain_events(&mut engine).is_empty());

    // The scan keeps working afterwards.
    engine
        .handle_read(tag(bundle("printer", "printer.local.", 631, 120), now))
        .unwrap();
    assert!(!drain_events(&mut engine).is_empty());
}

#[test]
fn test_transport_error_fails_session() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine.scan("http", "tcp", "local.", now);
    drain_events(&mut engine);

    engine.handle_transport_error(Error::ErrTransport("socket gone".to_owned()));
    assert_eq!(engine.state(), SessionState::Failed);
    let events = drain_events(&mut engine);
    assert_eq!(
        events,
        vec![Event::Error(Error::ErrTransport("socket gone".to_owned()))]
    );

    // Stopping a failed session does nothing further.
    engine.stop(now);
    assert_eq!(engine.state(), SessionState::Failed);
    assert!(drain_events(&mut engine).is_empty());

    // A fresh scan recovers.
    engine.scan("http", "tcp", "local.", now);
    assert_eq!(engine.state(), SessionState::Scanning);
}

#[test]
fn test_close_queues_goodbyes() {
    let mut engine = Engine::new(ZeroconfConfig::default());
    let now = Instant::now();
    engine
        .publish(ServiceRegistration::new("http", "server", 8080), now)
        .unwrap();
    drain_writes(&mut engine);

    engine.close().unwrap();
    let writes = drain_writes(&mut engine);
    assert_eq!(writes.len(), 1);
    assert!(parse(&writes[0]).answers.iter().all(|a| a.header.ttl == 0));

    assert_eq!(
        engine.handle_read(tag(vec![], now)),
        Err(Error::ErrEngineClosed)
    );
    assert_eq!(engine.handle_timeout(now), Err(Error::ErrEngineClosed));
    assert!(engine.poll_timeout().is_none());
}
