use std::collections::HashMap;
use std::fmt;

use super::super::name::*;
use crate::error::Result;

// A PtrResource is a pointer record body. In DNS-SD it maps a service type
// name (e.g. `_http._tcp.local.`) to a service instance name.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct PtrResource {
    pub(crate) ptr: Name,
}

impl fmt::Display for PtrResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnsmessage.PTRResource{{PTR: {}}}", self.ptr)
    }
}

impl PtrResource {
    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        self.ptr.pack(msg, compression, compression_off)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize, _length: usize) -> Result<Self> {
        let mut ptr = Name::default();
        ptr.unpack(msg, off)?;
        Ok(PtrResource { ptr })
    }
}
