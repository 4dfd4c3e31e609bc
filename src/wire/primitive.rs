use std::borrow::ToOwned;
use std::str;

use bytes::{BufMut, ByteOrder, BytesMut};
use nom::{be_i16, be_i32};

use errors::{ErrorKind, Result};

/// Primitive write helpers layered on top of `bytes::BufMut`'s own
/// generic `put_i16::<T>`/`put_i32::<T>`/etc (those already give us C2's
/// fixed-width integers — see their use throughout `protocol::fetch` and
/// `protocol::message` in the teacher crate). This trait adds the two
/// variable-length encodings Kafka layers on top: nullable strings and
/// nullable byte arrays.
pub trait WriteExt: BufMut {
    fn put_str<T: ByteOrder, S: AsRef<str>>(&mut self, s: Option<S>) -> Result<()>;

    fn put_bytes<T: ByteOrder, B: AsRef<[u8]>>(&mut self, b: Option<B>) -> Result<()>;
}

impl WriteExt for BytesMut {
    fn put_str<T: ByteOrder, S: AsRef<str>>(&mut self, s: Option<S>) -> Result<()> {
        match s {
            None => self.put_i16::<T>(-1),
            Some(s) => {
                let s = s.as_ref();
                if s.len() > i16::max_value() as usize {
                    bail!(ErrorKind::InvalidArg(format!("string of {} bytes exceeds i16 length", s.len())));
                }
                self.put_i16::<T>(s.len() as i16);
                self.put_slice(s.as_bytes());
            }
        }
        Ok(())
    }

    fn put_bytes<T: ByteOrder, B: AsRef<[u8]>>(&mut self, b: Option<B>) -> Result<()> {
        match b {
            None => self.put_i32::<T>(-1),
            Some(b) => {
                let b = b.as_ref();
                if b.len() > i32::max_value() as usize {
                    bail!(ErrorKind::InvalidArg(format!("byte array of {} bytes exceeds i32 length", b.len())));
                }
                self.put_i32::<T>(b.len() as i32);
                self.put_slice(b);
            }
        }
        Ok(())
    }
}

/// `i16`-length string that fails (rather than returning `None`) on a null
/// or empty length. Used where the wire format documents the field as
/// mandatory (group ids, topic names, member ids).
named!(pub parse_string<String>,
    do_parse!(
        len: be_i16
     >> s: cond_reduce!(len >= 0, map!(map_res!(take!(len), str::from_utf8), ToOwned::to_owned))
     >> (s)
    )
);

/// `i16`-length string where `-1` decodes to `None`, matching the teacher's
/// `parse_str`.
named!(pub parse_string_opt<Option<String>>,
    do_parse!(
        len: be_i16
     >> s: cond!(len >= 0, map!(map_res!(take!(len), str::from_utf8), ToOwned::to_owned))
     >> (s)
    )
);

/// `i32`-length byte array where `-1` decodes to `None`.
named!(pub parse_bytes<Option<Vec<u8>>>,
    do_parse!(
        len: be_i32
     >> b: cond!(len >= 0, map!(take!(len), |b: &[u8]| b.to_vec()))
     >> (b)
    )
);

/// `i32` array-count header, as used to prefix every Kafka array field.
named!(pub parse_array_count<i32>, call!(be_i32));
