//! C1/C2 — the wire buffer and primitive codec.
//!
//! Everything above this module encodes and decodes against `BytesMut`
//! (writer side) and `&[u8]` via `nom` combinators (reader side), following
//! the same conventions `protocol::fetch`/`protocol::message` use in the
//! teacher crate: big-endian fixed-width integers, `i16`-length strings,
//! `i32`-length byte arrays, `-1` as the null sentinel for both.

mod buffer;
mod primitive;

pub use self::buffer::{Reservation, WireWriter};
pub use self::primitive::{parse_array_count, parse_bytes, parse_string, parse_string_opt,
                          WriteExt};
