use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// Resolution state of a discovered service.
///
/// A record only ever moves forward: `Announced` to `Resolved` to
/// `Removed`. A later partial answer never demotes a resolved record.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecordState {
    /// The instance was seen in a PTR answer but is not fully resolved yet.
    #[default]
    Announced,
    /// Host, port and at least one address are known.
    Resolved,
    /// The instance said goodbye (TTL 0) and is gone.
    Removed,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RecordState::Announced => "announced",
            RecordState::Resolved => "resolved",
            RecordState::Removed => "removed",
        };
        write!(f, "{s}")
    }
}

/// A discovered service instance, accumulated across answers.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Instance label, e.g. `"Office Printer"`.
    pub name: String,
    /// Service type without underscores, e.g. `"http"`.
    pub service_type: String,
    /// Transport label, `"tcp"` or `"udp"`.
    pub protocol: String,
    /// Discovery domain, normally `"local."`.
    pub domain: String,
    /// Target host from the SRV record, once seen.
    pub host: Option<String>,
    /// Port from the SRV record, once seen.
    pub port: Option<u16>,
    /// Addresses from A and AAAA records, in arrival order, deduplicated.
    pub addresses: Vec<IpAddr>,
    /// Key/value metadata from the TXT record.
    pub txt: HashMap<String, String>,
    pub state: RecordState,
}

impl ServiceRecord {
    pub(crate) fn new(name: &str, service_type: &str, protocol: &str, domain: &str) -> Self {
        ServiceRecord {
            name: name.to_owned(),
            service_type: service_type.to_owned(),
            protocol: protocol.to_owned(),
            domain: domain.to_owned(),
            ..Default::default()
        }
    }

    /// The full instance name, e.g. `"Office Printer._http._tcp.local."`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.name, self.type_name())
    }

    /// The service type name, e.g. `"_http._tcp.local."`.
    pub fn type_name(&self) -> String {
        service_type_name(&self.service_type, &self.protocol, &self.domain)
    }

    pub fn is_resolved(&self) -> bool {
        self.host.is_some() && self.port.is_some() && !self.addresses.is_empty()
    }

    pub(crate) fn add_address(&mut self, addr: IpAddr) -> bool {
        if self.addresses.contains(&addr) {
            return false;
        }
        self.addresses.push(addr);
        true
    }
}

impl fmt::Display for ServiceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name(), self.state)
    }
}

/// A TXT metadata value. Non-string values are carried through and
/// flattened to their string form on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxtValue {
    String(String),
    Bool(bool),
    Int(i64),
}

impl fmt::Display for TxtValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxtValue::String(s) => write!(f, "{s}"),
            TxtValue::Bool(b) => write!(f, "{b}"),
            TxtValue::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for TxtValue {
    fn from(v: &str) -> Self {
        TxtValue::String(v.to_owned())
    }
}

impl From<String> for TxtValue {
    fn from(v: String) -> Self {
        TxtValue::String(v)
    }
}

impl From<bool> for TxtValue {
    fn from(v: bool) -> Self {
        TxtValue::Bool(v)
    }
}

impl From<i64> for TxtValue {
    fn from(v: i64) -> Self {
        TxtValue::Int(v)
    }
}

/// Description of a service to publish.
///
/// # Example
///
/// ```
/// use zeroconf_sd::ServiceRegistration;
///
/// let reg = ServiceRegistration::new("http", "My Web Server", 8080)
///     .with_txt_value("path", "/admin")
///     .with_txt_value("secure", true);
/// ```
#[derive(Clone, Debug)]
pub struct ServiceRegistration {
    pub(crate) service_type: String,
    pub(crate) protocol: String,
    pub(crate) domain: String,
    pub(crate) name: String,
    pub(crate) port: u16,
    pub(crate) txt: Vec<(String, TxtValue)>,
}

impl ServiceRegistration {
    pub fn new(service_type: &str, name: &str, port: u16) -> Self {
        ServiceRegistration {
            service_type: service_type.to_owned(),
            protocol: "tcp".to_owned(),
            domain: "local.".to_owned(),
            name: name.to_owned(),
            port,
            txt: vec![],
        }
    }

    pub fn with_protocol(mut self, protocol: &str) -> Self {
        protocol.clone_into(&mut self.protocol);
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        domain.clone_into(&mut self.domain);
        self
    }

    pub fn with_txt_value<V: Into<TxtValue>>(mut self, key: &str, value: V) -> Self {
        self.txt.push((key.to_owned(), value.into()));
        self
    }

    /// TXT pairs flattened to their wire form, last write per key wins.
    pub(crate) fn normalized_txt(&self) -> HashMap<String, String> {
        self.txt
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    pub(crate) fn type_name(&self) -> String {
        service_type_name(&self.service_type, &self.protocol, &self.domain)
    }

    pub(crate) fn full_name(&self) -> String {
        format!("{}.{}", self.name, self.type_name())
    }
}

// Name helpers. Service types and protocols are accepted with or without
// their underscore prefix, and domains with or without the trailing dot.

pub(crate) fn service_type_name(service_type: &str, protocol: &str, domain: &str) -> String {
    let ty = service_type.strip_prefix('_').unwrap_or(service_type);
    let proto = protocol.strip_prefix('_').unwrap_or(protocol);
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    format!("_{ty}._{proto}.{domain}.")
}

// split_instance extracts the instance label out of a full instance name,
// if the name belongs to type_name. DNS names compare case-insensitively
// for ASCII only; matching is byte-wise so the label length always indexes
// a character boundary, whatever bytes a peer put in the label.
pub(crate) fn split_instance(full_name: &str, type_name: &str) -> Option<String> {
    let suffix = format!(".{type_name}");
    let label_len = full_name.len().checked_sub(suffix.len())?;
    if !full_name.as_bytes()[label_len..].eq_ignore_ascii_case(suffix.as_bytes()) {
        return None;
    }
    if label_len == 0 {
        return None;
    }
    full_name.get(..label_len).map(str::to_owned)
}
