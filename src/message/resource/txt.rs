use std::fmt;

use super::super::packer::*;
use crate::error::{Error, Result};

// A TxtResource is a text record body: a sequence of character-strings.
// DNS-SD uses them as `key=value` metadata pairs.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct TxtResource {
    pub(crate) txt: Vec<String>,
}

impl fmt::Display for TxtResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnsmessage.TXTResource{{TXT: {:?}}}", self.txt)
    }
}

impl TxtResource {
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Result<Vec<u8>> {
        if self.txt.is_empty() {
            // rdata must not be empty; an empty TXT packs one zero-length
            // string.
            msg.push(0);
            return Ok(msg);
        }
        for s in &self.txt {
            msg = pack_str(msg, s)?;
        }
        Ok(msg)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize, length: usize) -> Result<Self> {
        let end = off + length;
        if end > msg.len() {
            return Err(Error::ErrResourceLen);
        }
        let mut txt = Vec::new();
        let mut curr = off;
        while curr < end {
            let (s, next) = unpack_str(msg, curr)?;
            if next > end {
                return Err(Error::ErrCalcLen);
            }
            if !s.is_empty() {
                txt.push(s);
            }
            curr = next;
        }
        Ok(TxtResource { txt })
    }
}
