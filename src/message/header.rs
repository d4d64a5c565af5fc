use std::fmt;

use super::packer::*;
use super::{HEADER_BIT_AA, HEADER_BIT_QR, HEADER_BIT_RA, HEADER_BIT_RD, HEADER_BIT_TC};
use super::{OpCode, RCode};
use crate::error::Result;

// Header is the decomposed form of the 12-byte DNS message header.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) id: u16,
    pub(crate) response: bool,
    pub(crate) op_code: OpCode,
    pub(crate) authoritative: bool,
    pub(crate) truncated: bool,
    pub(crate) recursion_desired: bool,
    pub(crate) recursion_available: bool,
    pub(crate) rcode: RCode,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.Header{{ID: {}, Response: {}, OpCode: {}, Authoritative: {}, Truncated: {}, RecursionDesired: {}, RecursionAvailable: {}, RCode: {}}}",
            self.id,
            self.response,
            self.op_code,
            self.authoritative,
            self.truncated,
            self.recursion_desired,
            self.recursion_available,
            self.rcode
        )
    }
}

impl Header {
    // pack flattens the header flags into the (id, bits) pair used on the
    // wire.
    pub(crate) fn pack(&self) -> (u16, u16) {
        let mut bits = (self.op_code << 11) | self.rcode as u16;
        if self.recursion_available {
            bits |= HEADER_BIT_RA;
        }
        if self.recursion_desired {
            bits |= HEADER_BIT_RD;
        }
        if self.truncated {
            bits |= HEADER_BIT_TC;
        }
        if self.authoritative {
            bits |= HEADER_BIT_AA;
        }
        if self.response {
            bits |= HEADER_BIT_QR;
        }
        (self.id, bits)
    }

    pub(crate) fn from_internal(h: &HeaderInternal) -> Self {
        Header {
            id: h.id,
            response: h.bits & HEADER_BIT_QR != 0,
            op_code: (h.bits >> 11) & 0x0F,
            authoritative: h.bits & HEADER_BIT_AA != 0,
            truncated: h.bits & HEADER_BIT_TC != 0,
            recursion_desired: h.bits & HEADER_BIT_RD != 0,
            recursion_available: h.bits & HEADER_BIT_RA != 0,
            rcode: RCode::from((h.bits & 0x0F) as u8),
        }
    }
}

// HeaderInternal is the wire layout: id, packed flag bits, and the four
// section counts.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub(crate) struct HeaderInternal {
    pub(crate) id: u16,
    pub(crate) bits: u16,
    pub(crate) questions: u16,
    pub(crate) answers: u16,
    pub(crate) authorities: u16,
    pub(crate) additionals: u16,
}

impl HeaderInternal {
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Vec<u8> {
        msg = pack_uint16(msg, self.id);
        msg = pack_uint16(msg, self.bits);
        msg = pack_uint16(msg, self.questions);
        msg = pack_uint16(msg, self.answers);
        msg = pack_uint16(msg, self.authorities);
        pack_uint16(msg, self.additionals)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (id, off) = unpack_uint16(msg, off)?;
        self.id = id;
        let (bits, off) = unpack_uint16(msg, off)?;
        self.bits = bits;
        let (questions, off) = unpack_uint16(msg, off)?;
        self.questions = questions;
        let (answers, off) = unpack_uint16(msg, off)?;
        self.answers = answers;
        let (authorities, off) = unpack_uint16(msg, off)?;
        self.authorities = authorities;
        let (additionals, off) = unpack_uint16(msg, off)?;
        self.additionals = additionals;
        Ok(off)
    }
}
