use std::collections::HashMap;
use std::fmt;

use super::packer::*;
use crate::error::{Error, Result};

// Maximum presentation-format length of a name, including the trailing dot.
const MAX_NAME_LEN: usize = 255;

// Maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

// Cap on compression pointer hops while unpacking, so a pointer loop in a
// hostile packet terminates.
const MAX_COMPRESSION_POINTERS: usize = 10;

/// A DNS domain name in presentation format, always stored with a trailing
/// dot (e.g. `"_http._tcp.local."`).
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Name {
    pub(crate) data: String,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl Name {
    pub(crate) fn new(data: &str) -> Result<Self> {
        let data = if data.ends_with('.') {
            data.to_owned()
        } else {
            format!("{data}.")
        };
        if data.len() > MAX_NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }
        Ok(Name { data })
    }

    // pack appends the wire format of the name to msg.
    //
    // When a compression map is supplied, any suffix of the name that was
    // already packed is replaced by a two-byte pointer, and newly packed
    // suffixes are recorded. compression_off is subtracted from absolute
    // buffer offsets so pointers are relative to the start of the DNS message.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        let data = if self.data.ends_with('.') {
            self.data.clone()
        } else {
            format!("{}.", self.data)
        };
        if data.len() > MAX_NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }

        // Root name packs to a single zero octet.
        if data == "." {
            msg.push(0);
            return Ok(msg);
        }

        let bytes = data.as_bytes();
        let mut begin = 0usize;
        for i in 0..bytes.len() {
            if bytes[i] != b'.' {
                continue;
            }
            let label_len = i - begin;
            if label_len == 0 {
                return Err(Error::ErrZeroSegLen);
            }
            if label_len > MAX_LABEL_LEN {
                return Err(Error::ErrSegTooLong);
            }

            if let Some(map) = compression {
                let suffix = &data[begin..];
                if let Some(&ptr) = map.get(suffix) {
                    return Ok(pack_uint16(msg, 0xC000 | ptr as u16));
                }
                let off = msg.len() - compression_off;
                // Pointers only reach the first 14 bits of offset space.
                if off < 0x3FFF {
                    map.insert(suffix.to_owned(), off);
                }
            }

            msg.push(label_len as u8);
            msg.extend_from_slice(&bytes[begin..i]);
            begin = i + 1;
        }

        msg.push(0);
        Ok(msg)
    }

    // unpack parses a wire-format name at off, following compression
    // pointers. Returns the offset just past the name in the original byte
    // stream (the position after the first pointer, if any was followed).
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let mut curr = off;
        let mut new_off = None;
        let mut pointers = 0usize;
        let mut data = String::new();

        loop {
            if curr >= msg.len() {
                return Err(Error::ErrBaseLen);
            }
            let c = msg[curr] as usize;
            match c & 0xC0 {
                0x00 => {
                    if c == 0 {
                        // Terminating zero octet.
                        curr += 1;
                        break;
                    }
                    if curr + 1 + c > msg.len() {
                        return Err(Error::ErrCalcLen);
                    }
                    data.push_str(&String::from_utf8_lossy(&msg[curr + 1..curr + 1 + c]));
                    data.push('.');
                    curr += 1 + c;
                }
                0xC0 => {
                    if curr + 2 > msg.len() {
                        return Err(Error::ErrInvalidPtr);
                    }
                    if new_off.is_none() {
                        new_off = Some(curr + 2);
                    }
                    pointers += 1;
                    if pointers > MAX_COMPRESSION_POINTERS {
                        return Err(Error::ErrTooManyPointers);
                    }
                    curr = ((c ^ 0xC0) << 8) | msg[curr + 1] as usize;
                }
                // 0x40 and 0x80 prefixes are reserved.
                _ => return Err(Error::ErrReserved),
            }
        }

        if data.is_empty() {
            data.push('.');
        }
        if data.len() > MAX_NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }
        self.data = data;
        Ok(new_off.unwrap_or(curr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_normalizes_trailing_dot() {
        assert_eq!(Name::new("printer.local").unwrap().data, "printer.local.");
        assert_eq!(Name::new("printer.local.").unwrap().data, "printer.local.");
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let name = Name::new("_http._tcp.local.").unwrap();
        let msg = name.pack(vec![], &mut None, 0).unwrap();
        let mut parsed = Name::default();
        let off = parsed.unpack(&msg, 0).unwrap();
        assert_eq!(parsed, name);
        assert_eq!(off, msg.len());
    }

    #[test]
    fn test_pack_root() {
        let name = Name::new(".").unwrap();
        let msg = name.pack(vec![], &mut None, 0).unwrap();
        assert_eq!(msg, vec![0]);
    }

    #[test]
    fn test_compression_shares_suffix() {
        let mut compression = Some(HashMap::new());
        let a = Name::new("alpha._http._tcp.local.").unwrap();
        let b = Name::new("beta._http._tcp.local.").unwrap();

        let msg = a.pack(vec![], &mut compression, 0).unwrap();
        let uncompressed_len = msg.len();
        let msg = b.pack(msg, &mut compression, 0).unwrap();

        // beta's suffix packs as a pointer: one label + 2 pointer bytes.
        assert!(msg.len() < uncompressed_len * 2);

        let mut parsed = Name::default();
        let off = parsed.unpack(&msg, uncompressed_len).unwrap();
        assert_eq!(parsed.data, "beta._http._tcp.local.");
        assert_eq!(off, msg.len());
    }

    #[test]
    fn test_pointer_loop_detected() {
        // A pointer that points at itself.
        let msg = vec![0xC0, 0x00];
        let mut parsed = Name::default();
        assert_eq!(parsed.unpack(&msg, 0), Err(Error::ErrTooManyPointers));
    }

    #[test]
    fn test_label_too_long() {
        let label = "x".repeat(64);
        let name = Name::new(&format!("{label}.local.")).unwrap();
        assert_eq!(name.pack(vec![], &mut None, 0), Err(Error::ErrSegTooLong));
    }

    #[test]
    fn test_truncated_name() {
        // Label claims 5 bytes but the buffer ends early.
        let msg = vec![5, b'a', b'b'];
        let mut parsed = Name::default();
        assert_eq!(parsed.unpack(&msg, 0), Err(Error::ErrCalcLen));
    }
}
