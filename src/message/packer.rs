use crate::error::{Error, Result};

// Primitive pack/unpack helpers. Packing appends to the message buffer and
// returns the extended buffer; unpacking returns the value plus the offset
// just past it, so calls chain by threading the offset through.

pub(crate) fn pack_uint16(mut msg: Vec<u8>, v: u16) -> Vec<u8> {
    msg.extend_from_slice(&v.to_be_bytes());
    msg
}

pub(crate) fn unpack_uint16(msg: &[u8], off: usize) -> Result<(u16, usize)> {
    if off + 2 > msg.len() {
        return Err(Error::ErrBaseLen);
    }
    Ok((u16::from_be_bytes([msg[off], msg[off + 1]]), off + 2))
}

pub(crate) fn pack_uint32(mut msg: Vec<u8>, v: u32) -> Vec<u8> {
    msg.extend_from_slice(&v.to_be_bytes());
    msg
}

pub(crate) fn unpack_uint32(msg: &[u8], off: usize) -> Result<(u32, usize)> {
    if off + 4 > msg.len() {
        return Err(Error::ErrBaseLen);
    }
    Ok((
        u32::from_be_bytes([msg[off], msg[off + 1], msg[off + 2], msg[off + 3]]),
        off + 4,
    ))
}

// A DNS character-string: one length octet followed by up to 255 bytes.
// Used by TXT rdata.

pub(crate) fn pack_str(mut msg: Vec<u8>, s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    if bytes.len() > 255 {
        return Err(Error::ErrStringTooLong);
    }
    msg.push(bytes.len() as u8);
    msg.extend_from_slice(bytes);
    Ok(msg)
}

pub(crate) fn unpack_str(msg: &[u8], off: usize) -> Result<(String, usize)> {
    if off >= msg.len() {
        return Err(Error::ErrBaseLen);
    }
    let len = msg[off] as usize;
    let begin = off + 1;
    if begin + len > msg.len() {
        return Err(Error::ErrCalcLen);
    }
    let s = String::from_utf8_lossy(&msg[begin..begin + len]).into_owned();
    Ok((s, begin + len))
}
