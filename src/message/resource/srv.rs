use std::fmt;

use super::super::name::*;
use super::super::packer::*;
use crate::error::Result;

// An SrvResource is a service locator record body: priority, weight, port
// and the target host name. The target is packed without compression, per
// RFC 2782.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct SrvResource {
    pub(crate) priority: u16,
    pub(crate) weight: u16,
    pub(crate) port: u16,
    pub(crate) target: Name,
}

impl fmt::Display for SrvResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.SRVResource{{Priority: {}, Weight: {}, Port: {}, Target: {}}}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

impl SrvResource {
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Result<Vec<u8>> {
        msg = pack_uint16(msg, self.priority);
        msg = pack_uint16(msg, self.weight);
        msg = pack_uint16(msg, self.port);
        self.target.pack(msg, &mut None, 0)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize, _length: usize) -> Result<Self> {
        let (priority, off) = unpack_uint16(msg, off)?;
        let (weight, off) = unpack_uint16(msg, off)?;
        let (port, off) = unpack_uint16(msg, off)?;
        let mut target = Name::default();
        target.unpack(msg, off)?;
        Ok(SrvResource {
            priority,
            weight,
            port,
            target,
        })
    }
}
