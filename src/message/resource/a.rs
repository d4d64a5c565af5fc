use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{Error, Result};

// An AResource is an IPv4 host address record body.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AResource {
    pub(crate) a: [u8; 4],
}

impl fmt::Display for AResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnsmessage.AResource{{A: {}}}", Ipv4Addr::from(self.a))
    }
}

impl AResource {
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Result<Vec<u8>> {
        msg.extend_from_slice(&self.a);
        Ok(msg)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize, length: usize) -> Result<Self> {
        if length != 4 || off + 4 > msg.len() {
            return Err(Error::ErrResourceLen);
        }
        let mut a = [0u8; 4];
        a.copy_from_slice(&msg[off..off + 4]);
        Ok(AResource { a })
    }
}
