use crate::error::{Error, Result};
use bytes::{BufMut, BytesMut};
use std::borrow::Borrow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bit {
    Zero,
    One,
}

impl From<bool> for Bit {
    fn from(b: bool) -> Self {
        if b {
            Self::One
        } else {
            Self::Zero
        }
    }
}

impl From<Bit> for bool {
    fn from(b: Bit) -> Self {
        match b {
            Bit::One => true,
            Bit::Zero => false,
        }
    }
}

/// Returns a mask of the `nbits` least significant bits.
#[inline]
pub(crate) fn mask(nbits: u8) -> u64 {
    if nbits >= 64 {
        u64::MAX
    } else {
        (1_u64 << nbits) - 1
    }
}

/// Append-only bit sink backed by a byte buffer.
///
/// Bits are packed most significant first. Every byte except the last one is
/// full, and the last one is never left entirely empty.
#[derive(Debug, Clone, Default)]
pub struct BitStream {
    pub(crate) data: BytesMut,
    pub(crate) count: u8, // how many bits are still free in the last byte
}

impl AsRef<[u8]> for BitStream {
    fn as_ref(&self) -> &[u8] {
        self.data.borrow()
    }
}

impl BitStream {
    pub fn new() -> Self {
        Self {
            data: BytesMut::new(),
            count: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            count: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        self.as_ref()
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    pub fn write_bit(&mut self, bit: impl Into<Bit>) {
        if self.count == 0 {
            self.data.put_u8(0);
            self.count = 8;
        }

        let i = self.data.len() - 1;
        if bool::from(bit.into()) {
            self.data[i] |= 1 << (self.count - 1);
        }

        self.count -= 1;
    }

    pub fn write_byte(&mut self, b: u8) {
        if self.count == 0 {
            self.data.put_u8(b);
            return;
        }

        // Fill the free low bits of the last byte, carry the rest over.
        let i = self.data.len() - 1;
        self.data[i] |= b >> (8 - self.count);
        self.data.put_u8(b << self.count);
    }

    pub fn write_bytes(&mut self, bs: &[u8]) {
        if self.count == 0 {
            self.data.put_slice(bs);
            return;
        }

        for b in bs {
            self.write_byte(*b);
        }
    }

    /// Writes the `nbits` least significant bits of `u`, most significant first.
    /// Fields wider than 64 bits are zero-extended.
    pub fn write_bits(&mut self, u: u64, mut nbits: u8) {
        while nbits > 64 {
            self.write_bit(Bit::Zero);
            nbits -= 1;
        }
        if nbits == 0 {
            return;
        }

        let mut u = u << (64 - nbits);
        while nbits >= 8 {
            self.write_byte((u >> 56) as u8);
            u <<= 8;
            nbits -= 8;
        }

        while nbits > 0 {
            self.write_bit((u >> 63) == 1);
            u <<= 1;
            nbits -= 1;
        }
    }
}

/// Forward-only bit reader over a borrowed byte slice.
#[derive(Debug, Clone, Default)]
pub struct Reader<'a> {
    stream: &'a [u8],
    stream_offset: usize,
    buffer: u64,
    valid: u8,
}

impl<'a> Reader<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self {
            stream,
            ..Default::default()
        }
    }

    /// Number of bits not consumed yet, including any trailing padding.
    pub fn remaining_bits(&self) -> usize {
        self.valid as usize + (self.stream.len() - self.stream_offset) * 8
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.read_bits(8).map(|u| u as u8)
    }

    pub fn read_bit(&mut self) -> Result<Bit> {
        if self.valid == 0 && !self.load_next_buffer(1) {
            return Err(Error::Truncated);
        }

        self.read_bit_fast().ok_or(Error::Truncated)
    }

    pub fn read_bits(&mut self, nbits: u8) -> Result<u64> {
        if nbits > 64 {
            return Err(Error::FieldTooWide(nbits));
        }
        if nbits == 0 {
            return Ok(0);
        }

        if self.valid == 0 && !self.load_next_buffer(nbits) {
            return Err(Error::Truncated);
        }

        if let Some(v) = self.read_bits_fast(nbits) {
            return Ok(v);
        }

        // The field straddles two buffer loads.
        let nbits = nbits - self.valid;
        let v = (self.buffer & mask(self.valid)) << nbits;
        self.valid = 0;

        if !self.load_next_buffer(nbits) || nbits > self.valid {
            return Err(Error::Truncated);
        }

        let v = v | ((self.buffer >> (self.valid - nbits)) & mask(nbits));
        self.valid -= nbits;

        Ok(v)
    }

    fn read_bits_fast(&mut self, nbits: u8) -> Option<u64> {
        if nbits > self.valid {
            return None;
        }

        self.valid -= nbits;
        Some((self.buffer >> self.valid) & mask(nbits))
    }

    fn read_bit_fast(&mut self) -> Option<Bit> {
        if self.valid == 0 {
            return None;
        }

        self.valid -= 1;
        let bitmask = 1_u64 << self.valid;

        Some((self.buffer & bitmask != 0).into())
    }

    fn load_next_buffer(&mut self, nbits: u8) -> bool {
        let len = self.stream.len();
        if self.stream_offset >= len {
            return false;
        }

        if self.stream_offset + 8 < len {
            let mut word = [0_u8; 8];
            word.copy_from_slice(&self.stream[self.stream_offset..self.stream_offset + 8]);
            self.buffer = u64::from_be_bytes(word);
            self.stream_offset += 8;
            self.valid = 64;
            return true;
        }

        let nbytes = (nbits as usize / 8 + 1)
            .min(len - self.stream_offset)
            .min(8);

        let mut buffer = 0_u64;
        for i in 0..nbytes {
            buffer |= (self.stream[self.stream_offset + i] as u64) << (8 * (nbytes - i - 1));
        }

        self.buffer = buffer;
        self.stream_offset += nbytes;
        self.valid = (nbytes * 8) as u8;

        true
    }
}
