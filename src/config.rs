use std::net::IpAddr;
use std::time::Duration;

/// Interval between the first repeated queries of a scan.
pub(crate) const DEFAULT_QUERY_INTERVAL: Duration = Duration::from_secs(1);

/// Cap on the exponential query backoff.
pub(crate) const DEFAULT_MAX_QUERY_INTERVAL: Duration = Duration::from_secs(60);

/// Interval between resolution probes for an announced but unresolved
/// instance.
pub(crate) const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// How many resolution probes are sent before giving up on an instance.
pub(crate) const DEFAULT_PROBE_ATTEMPTS: u32 = 3;

/// Interval between unsolicited re-announcements of published services.
pub(crate) const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(60);

/// TTL, in seconds, on records in outgoing responses.
pub(crate) const DEFAULT_RESPONSE_TTL: u32 = 120;

/// Engine configuration. The defaults suit almost all uses.
#[derive(Clone, Debug)]
pub struct ZeroconfConfig {
    /// Initial interval between repeated queries while scanning. Backs off
    /// exponentially to `max_query_interval` and resets when a matching
    /// response arrives.
    pub query_interval: Duration,
    pub max_query_interval: Duration,

    /// Interval between targeted SRV/TXT/A probes for instances that were
    /// announced but have not resolved.
    pub probe_interval: Duration,
    /// Probes sent per instance before resolution is abandoned. The
    /// instance stays in the table as announced.
    pub probe_attempts: u32,

    /// Interval between unsolicited announcements of published services.
    pub announce_interval: Duration,
    /// TTL on records in responses and announcements, in seconds.
    pub response_ttl: u32,

    /// Host name to advertise in SRV records for published services. When
    /// unset, `<instance>.local.` is used.
    pub host_name: Option<String>,
    /// Addresses to advertise in A/AAAA records for published services.
    pub local_addrs: Vec<IpAddr>,
}

impl Default for ZeroconfConfig {
    fn default() -> Self {
        ZeroconfConfig {
            query_interval: DEFAULT_QUERY_INTERVAL,
            max_query_interval: DEFAULT_MAX_QUERY_INTERVAL,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            announce_interval: DEFAULT_ANNOUNCE_INTERVAL,
            response_ttl: DEFAULT_RESPONSE_TTL,
            host_name: None,
            local_addrs: vec![],
        }
    }
}

impl ZeroconfConfig {
    pub fn new() -> Self {
        ZeroconfConfig::default()
    }

    pub fn with_query_interval(mut self, interval: Duration) -> Self {
        self.query_interval = interval;
        self
    }

    pub fn with_max_query_interval(mut self, interval: Duration) -> Self {
        self.max_query_interval = interval;
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_probe_attempts(mut self, attempts: u32) -> Self {
        self.probe_attempts = attempts;
        self
    }

    pub fn with_announce_interval(mut self, interval: Duration) -> Self {
        self.announce_interval = interval;
        self
    }

    pub fn with_response_ttl(mut self, ttl: u32) -> Self {
        self.response_ttl = ttl;
        self
    }

    pub fn with_host_name(mut self, host_name: &str) -> Self {
        self.host_name = Some(host_name.to_owned());
        self
    }

    pub fn with_local_addr(mut self, addr: IpAddr) -> Self {
        self.local_addrs.push(addr);
        self
    }
}
