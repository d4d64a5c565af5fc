
pub(crate) mod header;
pub(crate) mod name;
pub(crate) mod packer;
pub(crate) mod question;
pub(crate) mod resource;

use std::collections::HashMap;
use std::fmt;

use header::*;
use packer::*;
use question::*;
use resource::*;

use crate::error::{Error, Result};

// A packet carrying more records than this in any one section is treated
// as malformed. Real mDNS traffic stays far below it.
pub(crate) const MAX_SECTION_RECORDS: usize = 32;

// Message formats

// A DnsType is a type of DNS request and response.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum DnsType {
    // ResourceHeader.Type and question.Type
    A = 1,
    Ptr = 12,
    Txt = 16,
    Aaaa = 28,
    Srv = 33,

    // question.Type
    All = 255,

    #[default]
    Unsupported = 0,
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            12 => DnsType::Ptr,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            255 => DnsType::All,
            _ => DnsType::Unsupported,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DnsType::A => "A",
            DnsType::Ptr => "PTR",
            DnsType::Txt => "TXT",
            DnsType::Aaaa => "AAAA",
            DnsType::Srv => "SRV",
            DnsType::All => "ALL",
            DnsType::Unsupported => "Unsupported",
        };
        write!(f, "{s}")
    }
}

impl DnsType {
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, *self as u16)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (t, o) = unpack_uint16(msg, off)?;
        *self = DnsType::from(t);
        Ok(o)
    }
}

// A DnsClass is a DNS class. mDNS only ever uses IN, but responses may set
// the cache-flush bit on top of it.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct DnsClass(pub(crate) u16);

// ResourceHeader.Class and question.Class
pub(crate) const DNSCLASS_INET: DnsClass = DnsClass(1);

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DNSCLASS_INET => write!(f, "ClassINET"),
            _ => write!(f, "{}", self.0),
        }
    }
}

impl DnsClass {
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, self.0)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (c, o) = unpack_uint16(msg, off)?;
        *self = DnsClass(c);
        Ok(o)
    }

    // is_inet ignores the mDNS cache-flush bit when checking the class.
    pub(crate) fn is_inet(&self) -> bool {
        self.0 & 0x7FFF == DNSCLASS_INET.0
    }
}

// An OpCode is a DNS operation code.
pub(crate) type OpCode = u16;

// An RCode is a DNS response status code.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum RCode {
    // Message.Rcode
    #[default]
    Success = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
    Unsupported = 255,
}

impl From<u8> for RCode {
    fn from(v: u8) -> Self {
        match v {
            0 => RCode::Success,
            1 => RCode::FormatError,
            2 => RCode::ServerFailure,
            3 => RCode::NameError,
            4 => RCode::NotImplemented,
            5 => RCode::Refused,
            _ => RCode::Unsupported,
        }
    }
}

impl fmt::Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RCode::Success => "RCodeSuccess",
            RCode::FormatError => "RCodeFormatError",
            RCode::ServerFailure => "RCodeServerFailure",
            RCode::NameError => "RCodeNameError",
            RCode::NotImplemented => "RCodeNotImplemented",
            RCode::Refused => "RCodeRefused",
            RCode::Unsupported => "RCodeUnsupported",
        };
        write!(f, "{s}")
    }
}

pub(crate) const HEADER_BIT_QR: u16 = 1 << 15; // query/response (response=1)
pub(crate) const HEADER_BIT_AA: u16 = 1 << 10; // authoritative
pub(crate) const HEADER_BIT_TC: u16 = 1 << 9; // truncated
pub(crate) const HEADER_BIT_RD: u16 = 1 << 8; // recursion desired
pub(crate) const HEADER_BIT_RA: u16 = 1 << 7; // recursion available

// Message is a representation of a DNS message.
#[derive(Default, Debug, Clone)]
pub(crate) struct Message {
    pub(crate) header: Header,
    pub(crate) questions: Vec<Question>,
    pub(crate) answers: Vec<Resource>,
    pub(crate) authorities: Vec<Resource>,
    pub(crate) additionals: Vec<Resource>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.Message{{Header: {}, Questions: {}, Answers: {}, Authorities: {}, Additionals: {}}}",
            self.header,
            self.questions.len(),
            self.answers.len(),
            self.authorities.len(),
            self.additionals.len(),
        )
    }
}

impl Message {
    // pack serializes the message into wire format, compressing names where
    // repeated suffixes allow it.
    pub(crate) fn pack(&mut self) -> Result<Vec<u8>> {
        if self.questions.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyQuestions);
        }
        if self.answers.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAnswers);
        }
        if self.authorities.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAuthorities);
        }
        if self.additionals.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAdditionals);
        }

        let (id, bits) = self.header.pack();
        let h = HeaderInternal {
            id,
            bits,
            questions: self.questions.len() as u16,
            answers: self.answers.len() as u16,
            authorities: self.authorities.len() as u16,
            additionals: self.additionals.len() as u16,
        };

        let mut msg = h.pack(vec![]);

        // The starting capacity doesn't matter too much, but most DNS
        // responses will be <= 512 bytes as it is the limit for DNS over UDP.
        msg.reserve(512 - msg.len());

        // RFC 1035 allows (but does not require) compression for packing. RFC
        // 1035 requires unpacking implementations to support compression, so
        // unconditionally enabling it is fine.
        //
        // DNS lookups are typically done over UDP, and RFC 1035 states that
        // UDP DNS messages can be a maximum of 512 bytes long. Without
        // compression, many DNS response messages can exceed this limit, so
        // enabling compression will help ensure compliance.
        let mut compression = Some(HashMap::new());

        for question in &self.questions {
            msg = question.pack(msg, &mut compression, 0)?;
        }
        for answer in &mut self.answers {
            msg = answer.pack(msg, &mut compression, 0)?;
        }
        for authority in &mut self.authorities {
            msg = authority.pack(msg, &mut compression, 0)?;
        }
        for additional in &mut self.additionals {
            msg = additional.pack(msg, &mut compression, 0)?;
        }

        Ok(msg)
    }

    // unpack parses a full message out of msg.
    pub(crate) fn unpack(&mut self, msg: &[u8]) -> Result<()> {
        let mut h = HeaderInternal::default();
        let mut off = h.unpack(msg, 0)?;
        self.header = Header::from_internal(&h);

        let counts = [h.questions, h.answers, h.authorities, h.additionals];
        if counts.iter().any(|&c| c as usize > MAX_SECTION_RECORDS) {
            return Err(Error::ErrResourceLen);
        }

        self.questions = Vec::with_capacity(h.questions as usize);
        for _ in 0..h.questions {
            let (q, o) = Question::unpack(msg, off)?;
            self.questions.push(q);
            off = o;
        }

        self.answers = Self::unpack_section(msg, &mut off, h.answers)?;
        self.authorities = Self::unpack_section(msg, &mut off, h.authorities)?;
        self.additionals = Self::unpack_section(msg, &mut off, h.additionals)?;

        Ok(())
    }

    fn unpack_section(msg: &[u8], off: &mut usize, count: u16) -> Result<Vec<Resource>> {
        let mut section = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut r = Resource::default();
            *off = r.unpack(msg, *off)?;
            section.push(r);
        }
        Ok(section)
    }
}
