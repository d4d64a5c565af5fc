use std::fmt;
use std::net::Ipv6Addr;

use crate::error::{Error, Result};

// An AaaaResource is an IPv6 host address record body.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AaaaResource {
    pub(crate) aaaa: [u8; 16],
}

impl fmt::Display for AaaaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.AAAAResource{{AAAA: {}}}",
            Ipv6Addr::from(self.aaaa)
        )
    }
}

impl AaaaResource {
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Result<Vec<u8>> {
        msg.extend_from_slice(&self.aaaa);
        Ok(msg)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize, length: usize) -> Result<Self> {
        if length != 16 || off + 16 > msg.len() {
            return Err(Error::ErrResourceLen);
        }
        let mut aaaa = [0u8; 16];
        aaaa.copy_from_slice(&msg[off..off + 16]);
        Ok(AaaaResource { aaaa })
    }
}
