use bytes::{BigEndian, BufMut, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};

/// A token returned by `WireWriter::reserve`. Must be passed back to
/// `WireWriter::patch` exactly once; the writer does not track outstanding
/// reservations itself (sending with an unpatched reservation is a
/// programmer error, not a recoverable one — see spec C3 invariants).
#[derive(Debug, Clone, Copy)]
pub struct Reservation(usize);

/// Append-only write buffer with deferred length back-patching.
///
/// `reserve()` writes a 4-byte placeholder and returns a token addressing
/// it; the caller writes the elements covered by the reservation, then
/// calls `patch()` with the final count (or size). This is the same
/// pattern the teacher's `MessageSetEncoder::encode_message` inlines by
/// hand (`let size_off = buf.len(); buf.put_i32::<T>(0); ... T::write_i32(&mut
/// buf[size_off..], size as i32)`), generalized into a reusable token so a
/// reservation can't be forgotten.
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn with_capacity(cap: usize) -> Self {
        WireWriter { buf: BytesMut::with_capacity(cap) }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..]
    }

    pub fn reserve(&mut self) -> Reservation {
        let at = self.buf.len();
        self.buf.put_i32::<BigEndian>(0);
        Reservation(at)
    }

    /// Patch a reservation with its final `i32` value (a count or a byte length).
    pub fn patch(&mut self, token: Reservation, value: i32) {
        BigEndian::write_i32(&mut self.buf[token.0..token.0 + 4], value);
    }

    /// Write `items` as a Kafka array: a reserved `i32` count, then one
    /// call to `f` per element, with the count patched in once every
    /// element has been written. Mirrors `BufMut::put_array` in the
    /// teacher's `fetch.rs`/`message.rs`, but exposed as a method here so
    /// non-`BufMut` writers (this one) can use the same idiom.
    pub fn write_array<T, F>(&mut self, items: &[T], mut f: F) -> Result<()>
        where F: FnMut(&mut WireWriter, &T) -> Result<()>
    {
        let token = self.reserve();
        let mut count: i32 = 0;
        for item in items {
            f(self, item)?;
            count += 1;
        }
        self.patch(token, count);
        Ok(())
    }

    pub fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

/// Cursor-based reader with bounds-checked primitive decoders, used
/// directly by tests that exercise the primitive codec (C2) in isolation;
/// the per-API response decoders in `protocol::*` use `nom` instead,
/// following the teacher's established idiom for parsing whole replies.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        WireReader { buf: buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            bail!(ErrorKind::BadMsg(format!("expected {} more bytes, have {}", n, self.remaining())));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    /// `i16` length-prefixed string; `-1` decodes to `None`.
    pub fn read_str(&mut self) -> Result<Option<String>> {
        let len = self.read_i16()?;
        if len < 0 {
            return Ok(None);
        }
        let bytes = self.take(len as usize)?;
        let s = String::from_utf8(bytes.to_vec())
            .map_err(|e| ErrorKind::BadMsg(format!("invalid utf8 string: {}", e)))?;
        Ok(Some(s))
    }

    /// `i32` length-prefixed byte array; `-1` decodes to `None`.
    pub fn read_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        Ok(Some(self.take(len as usize)?.to_vec()))
    }
}
