pub(crate) mod a;
pub(crate) mod aaaa;
pub(crate) mod ptr;
pub(crate) mod srv;
pub(crate) mod txt;

use std::collections::HashMap;
use std::fmt;

use a::*;
use aaaa::*;
use ptr::*;
use srv::*;
use txt::*;

use super::name::*;
use super::packer::*;
use super::*;
use crate::error::{Error, Result};

// A Resource is a DNS resource record.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resource {
    pub(crate) header: ResourceHeader,
    pub(crate) body: Option<ResourceBody>,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.Resource{{Header: {}, Body: {}}}",
            self.header,
            if let Some(body) = &self.body {
                body.to_string()
            } else {
                "None".to_owned()
            }
        )
    }
}

impl Resource {
    // pack appends the wire format of the Resource to msg.
    pub(crate) fn pack(
        &mut self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        let body = self.body.as_ref().ok_or(Error::ErrNilResourceBody)?;
        self.header.typ = body.real_type();
        let (mut msg, len_off) = self.header.pack(msg, compression, compression_off)?;
        let pre_len = msg.len();
        msg = body.pack(msg, compression, compression_off)?;
        self.header.fix_len(&mut msg, len_off, pre_len)?;
        Ok(msg)
    }

    // unpack parses a resource record at off. Record types outside the
    // DNS-SD subset are kept header-only (body None) and their rdata is
    // skipped, so foreign records in a packet never fail the parse.
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let off = self.header.unpack(msg, off)?;
        let length = self.header.length as usize;
        if off + length > msg.len() {
            return Err(Error::ErrResourceLen);
        }
        self.body = ResourceBody::unpack(self.header.typ, msg, off, length)?;
        Ok(off + length)
    }
}

/// Header common to every DNS resource record: name, type, class, TTL and
/// the rdata length.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub(crate) struct ResourceHeader {
    /// The domain name this record pertains to.
    pub(crate) name: Name,

    /// Record type; set automatically from the body during packing.
    pub(crate) typ: DnsType,

    /// Network class, almost always [`DNSCLASS_INET`]. mDNS responses may
    /// set the top (cache-flush) bit, which carries no meaning here.
    pub(crate) class: DnsClass,

    /// Time to live in seconds. A TTL of zero is a goodbye: the record is
    /// being withdrawn.
    pub(crate) ttl: u32,

    /// Length of the rdata; set automatically during packing.
    pub(crate) length: u16,
}

impl fmt::Display for ResourceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.ResourceHeader{{Name: {}, Type: {}, Class: {}, TTL: {}, Length: {}}}",
            self.name, self.typ, self.class, self.ttl, self.length,
        )
    }
}

impl ResourceHeader {
    // pack appends the wire format of the header to msg and returns the
    // offset of the Length field so it can be fixed up after the body.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<(Vec<u8>, usize)> {
        msg = self.name.pack(msg, compression, compression_off)?;
        msg = self.typ.pack(msg);
        msg = self.class.pack(msg);
        msg = pack_uint32(msg, self.ttl);
        let len_off = msg.len();
        msg = pack_uint16(msg, self.length);
        Ok((msg, len_off))
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let new_off = self.name.unpack(msg, off)?;
        let new_off = self.typ.unpack(msg, new_off)?;
        let new_off = self.class.unpack(msg, new_off)?;
        let (ttl, new_off) = unpack_uint32(msg, new_off)?;
        self.ttl = ttl;
        let (l, new_off) = unpack_uint16(msg, new_off)?;
        self.length = l;
        Ok(new_off)
    }

    // fix_len updates a packed ResourceHeader to include the length of the
    // body, once the body has been packed after it.
    pub(crate) fn fix_len(&mut self, msg: &mut [u8], len_off: usize, pre_len: usize) -> Result<()> {
        if msg.len() < pre_len || msg.len() > pre_len + u16::MAX as usize {
            return Err(Error::ErrResTooLong);
        }
        let con_len = msg.len() - pre_len;
        msg[len_off] = ((con_len >> 8) & 0xFF) as u8;
        msg[len_off + 1] = (con_len & 0xFF) as u8;
        self.length = con_len as u16;
        Ok(())
    }
}

// A ResourceBody is a DNS resource record minus the header. Only the record
// types DNS-SD actually uses are modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResourceBody {
    A(AResource),
    Aaaa(AaaaResource),
    Ptr(PtrResource),
    Srv(SrvResource),
    Txt(TxtResource),
}

impl fmt::Display for ResourceBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceBody::A(rb) => rb.fmt(f),
            ResourceBody::Aaaa(rb) => rb.fmt(f),
            ResourceBody::Ptr(rb) => rb.fmt(f),
            ResourceBody::Srv(rb) => rb.fmt(f),
            ResourceBody::Txt(rb) => rb.fmt(f),
        }
    }
}

impl ResourceBody {
    // real_type returns the actual type of the resource, used to fill in
    // the header Type field.
    pub(crate) fn real_type(&self) -> DnsType {
        match self {
            ResourceBody::A(_) => DnsType::A,
            ResourceBody::Aaaa(_) => DnsType::Aaaa,
            ResourceBody::Ptr(_) => DnsType::Ptr,
            ResourceBody::Srv(_) => DnsType::Srv,
            ResourceBody::Txt(_) => DnsType::Txt,
        }
    }

    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        match self {
            ResourceBody::A(rb) => rb.pack(msg),
            ResourceBody::Aaaa(rb) => rb.pack(msg),
            ResourceBody::Ptr(rb) => rb.pack(msg, compression, compression_off),
            ResourceBody::Srv(rb) => rb.pack(msg),
            ResourceBody::Txt(rb) => rb.pack(msg),
        }
    }

    // unpack parses the rdata for typ, or returns None for unmodeled types.
    pub(crate) fn unpack(
        typ: DnsType,
        msg: &[u8],
        off: usize,
        length: usize,
    ) -> Result<Option<Self>> {
        let rb = match typ {
            DnsType::A => ResourceBody::A(AResource::unpack(msg, off, length)?),
            DnsType::Aaaa => ResourceBody::Aaaa(AaaaResource::unpack(msg, off, length)?),
            DnsType::Ptr => ResourceBody::Ptr(PtrResource::unpack(msg, off, length)?),
            DnsType::Srv => ResourceBody::Srv(SrvResource::unpack(msg, off, length)?),
            DnsType::Txt => ResourceBody::Txt(TxtResource::unpack(msg, off, length)?),
            _ => return Ok(None),
        };
        Ok(Some(rb))
    }
}
