//! Byte-aligned base-128 varints, compatible with Go's `encoding/binary`
//! `Uvarint`/`Varint`.

use crate::bitstream::Reader;
use crate::error::{Error, Result};
use unsigned_varint::{decode, encode};

pub const MAX_VARINT_LEN64: usize = 10;

pub fn encode_uvarint(number: u64, buf: &mut [u8; MAX_VARINT_LEN64]) -> &[u8] {
    encode::u64(number, buf)
}

pub fn encode_varint(number: i64, buf: &mut [u8; MAX_VARINT_LEN64]) -> &[u8] {
    encode::u64(zigzag(number), buf)
}

/// Decodes an unsigned varint from the front of `input`, returning it with
/// the bytes that follow it.
///
/// Padded encodings such as `80 00` are accepted, as `binary.Uvarint` does.
pub fn decode_uvarint(input: &[u8]) -> Result<(u64, &[u8])> {
    let mut number = 0_u64;
    for (i, b) in input.iter().take(MAX_VARINT_LEN64).enumerate() {
        // the tenth byte only has room for the top bit of a u64
        if i == MAX_VARINT_LEN64 - 1 && *b > 1 {
            return Err(Error::Overflow);
        }
        number |= u64::from(b & 0x7f) << (7 * i);
        if decode::is_last(*b) {
            return Ok((number, &input[i + 1..]));
        }
    }

    if input.len() >= MAX_VARINT_LEN64 {
        Err(Error::Overflow)
    } else {
        Err(Error::Truncated)
    }
}

pub fn decode_varint(input: &[u8]) -> Result<(i64, &[u8])> {
    decode_uvarint(input).map(|(ux, rest)| (unzigzag(ux), rest))
}

pub(crate) fn read_uvarint(r: &mut Reader) -> Result<u64> {
    let mut buf = encode::u64_buffer();
    for i in 0..buf.len() {
        buf[i] = r.read_byte()?;
        if decode::is_last(buf[i]) {
            return decode_uvarint(&buf[..=i]).map(|(number, _)| number);
        }
    }
    Err(Error::Overflow)
}

pub(crate) fn read_varint(r: &mut Reader) -> Result<i64> {
    read_uvarint(r).map(unzigzag)
}

#[inline]
fn zigzag(number: i64) -> u64 {
    let ux = (number as u64) << 1;
    if number < 0 {
        !ux
    } else {
        ux
    }
}

#[inline]
fn unzigzag(ux: u64) -> i64 {
    let x = (ux >> 1) as i64;
    if ux & 1 != 0 {
        !x
    } else {
        x
    }
}
