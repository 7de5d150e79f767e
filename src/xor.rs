//! The XOR chunk: delta-of-delta timestamps and XOR-compressed float values.
//!
//! Layout, bit-exact with Prometheus' `chunkenc` XOR chunks:
//!
//! ```text
//! [count u16 BE][varint t0][f64 v0][uvarint t1-t0][value1]([varbit_ts dod][value])*
//! ```
//!
//! A value is `0` when unchanged, `10` followed by the meaningful bits when
//! the previous leading/trailing zero window still covers the XOR, or `11`
//! followed by a 5-bit leading zero count, a 6-bit meaningful bit count and
//! the meaningful bits when a new window is opened.

use crate::bitstream::{mask, Bit, BitStream, Reader};
use crate::chunk::{Appender, Chunk, ChunkIterator, Encoding, Sample, CHUNK_HEADER_SIZE};
use crate::error::{Error, Result};
use crate::varbit::{put_varbit_ts, read_varbit_ts};
use crate::varint::{encode_uvarint, encode_varint, read_uvarint, read_varint, MAX_VARINT_LEN64};
use bytes::BytesMut;
use tracing::{debug, trace};

const CHUNK_COMPACT_CAPACITY_THRESHOLD: usize = 32;

/// Marks the zero window as not opened yet.
const UNSET_LEADING: u8 = 0xff;

/// Rolling state carried from one sample to the next.
#[derive(Debug, Clone, Copy)]
struct XORState {
    t: i64,
    t_delta: u64,
    v: f64,
    leading: u8,
    trailing: u8,
}

impl Default for XORState {
    fn default() -> Self {
        Self {
            t: i64::MIN,
            t_delta: 0,
            v: 0.0,
            leading: UNSET_LEADING,
            trailing: 0,
        }
    }
}

fn read_num_samples(data: &[u8]) -> u16 {
    match data {
        [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
        _ => 0,
    }
}

#[derive(Debug, Clone)]
pub struct XORChunk {
    b: BitStream,
    limit: u16,
}

impl Default for XORChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl XORChunk {
    pub fn new() -> Self {
        let mut b = BitStream::with_capacity(128);
        b.write_bytes(&0_u16.to_be_bytes());

        Self {
            b,
            limit: u16::MAX,
        }
    }

    /// Creates an empty chunk that refuses samples past `limit`.
    pub fn with_sample_limit(limit: u16) -> Self {
        Self {
            limit,
            ..Self::new()
        }
    }

    /// Wraps previously encoded chunk bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < CHUNK_HEADER_SIZE {
            return Err(Error::Truncated);
        }

        Ok(Self {
            b: BitStream {
                data: BytesMut::from(data),
                count: 0,
            },
            limit: u16::MAX,
        })
    }

    /// Caps the number of samples appenders may bring the chunk to. Samples
    /// already in the chunk are kept even when they exceed it.
    pub fn set_sample_limit(&mut self, limit: u16) {
        self.limit = limit;
    }

    pub fn sample_limit(&self) -> u16 {
        self.limit
    }

    pub fn from_samples<I, S>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Sample>,
    {
        let mut chunk = Self::new();
        let mut a = chunk.xor_appender()?;
        for s in samples {
            let s = s.into();
            a.append(s.t, s.v)?;
        }
        Ok(chunk)
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.b.to_vec()
    }

    pub fn xor_iterator(&self) -> XORIterator<'_> {
        XORIterator::new(self.b.as_ref())
    }

    pub fn samples(&self) -> Samples<'_> {
        Samples {
            it: self.xor_iterator(),
            done: false,
        }
    }

    /// Returns an appender positioned after the last sample.
    ///
    /// The existing samples are replayed to rebuild the appender state, so
    /// this fails if the chunk does not decode.
    pub fn xor_appender(&mut self) -> Result<XORAppender<'_>> {
        let mut it = self.xor_iterator();
        while it.next()? {}

        let state = it.state;
        let num_read = it.num_read;
        let padding = it.br.remaining_bits();

        if padding > 0 {
            trace!(samples = num_read, padding, "resuming appender on existing chunk");
            let len = self.b.data.len() - padding / 8;
            self.b.data.truncate(len);
            self.b.count = (padding % 8) as u8;
            if self.b.count > 0 {
                self.b.data[len - 1] &= !(mask(self.b.count) as u8);
            }
        }

        Ok(XORAppender {
            b: &mut self.b,
            state,
            limit: self.limit,
        })
    }
}

impl Chunk for XORChunk {
    fn bytes(&self) -> &[u8] {
        self.b.as_ref()
    }

    fn encoding(&self) -> Encoding {
        Encoding::XOR
    }

    fn num_samples(&self) -> usize {
        read_num_samples(self.b.as_ref()) as usize
    }

    fn compact(&mut self) {
        let l = self.b.data.len();
        if self.b.data.capacity() > l + CHUNK_COMPACT_CAPACITY_THRESHOLD {
            self.b.data = BytesMut::from(&self.b.data[..]);
        }
    }

    fn appender(&mut self) -> Result<Box<dyn Appender + '_>> {
        Ok(Box::new(self.xor_appender()?))
    }

    fn iterator(&self) -> Box<dyn ChunkIterator + '_> {
        Box::new(self.xor_iterator())
    }
}

pub struct XORAppender<'a> {
    b: &'a mut BitStream,
    state: XORState,
    limit: u16,
}

impl<'a> XORAppender<'a> {
    fn write_v_delta(&mut self, v: f64) {
        let v_delta = v.to_bits() ^ self.state.v.to_bits();

        if v_delta == 0 {
            self.b.write_bit(Bit::Zero);
            return;
        }
        self.b.write_bit(Bit::One);

        // the leading zero count field is only 5 bits wide
        let leading = (v_delta.leading_zeros() as u8).min(31);
        let trailing = v_delta.trailing_zeros() as u8;

        let XORState {
            leading: prev_leading,
            trailing: prev_trailing,
            ..
        } = self.state;

        if prev_leading != UNSET_LEADING && leading >= prev_leading && trailing >= prev_trailing {
            self.b.write_bit(Bit::Zero);
            self.b
                .write_bits(v_delta >> prev_trailing, 64 - prev_leading - prev_trailing);
            return;
        }

        self.state.leading = leading;
        self.state.trailing = trailing;

        self.b.write_bit(Bit::One);
        self.b.write_bits(leading as u64, 5);

        // 64 meaningful bits wrap to 0 in the 6-bit field
        let sigbits = 64 - leading - trailing;
        self.b.write_bits(sigbits as u64, 6);
        self.b.write_bits(v_delta >> trailing, sigbits);
    }
}

impl<'a> Appender for XORAppender<'a> {
    fn append(&mut self, t: i64, v: f64) -> Result<()> {
        let n = read_num_samples(self.b.as_ref());

        if n >= self.limit {
            debug!(limit = self.limit, "chunk is full, rejecting sample");
            return Err(Error::LimitExceeded(self.limit));
        }

        if n > 0 && t <= self.state.t {
            debug!(t, prev = self.state.t, "rejecting out of order sample");
            return Err(Error::OutOfOrder {
                t,
                prev: self.state.t,
            });
        }

        let mut buf = [0_u8; MAX_VARINT_LEN64];
        match n {
            0 => {
                self.b.write_bytes(encode_varint(t, &mut buf));
                self.b.write_bits(v.to_bits(), 64);
            }
            1 => {
                let t_delta = t.wrapping_sub(self.state.t) as u64;
                self.b.write_bytes(encode_uvarint(t_delta, &mut buf));
                self.write_v_delta(v);
                self.state.t_delta = t_delta;
            }
            _ => {
                let t_delta = t.wrapping_sub(self.state.t) as u64;
                let dod = t_delta.wrapping_sub(self.state.t_delta) as i64;
                put_varbit_ts(self.b, dod);
                self.write_v_delta(v);
                self.state.t_delta = t_delta;
            }
        }

        self.state.t = t;
        self.state.v = v;
        self.b.data[..CHUNK_HEADER_SIZE].copy_from_slice(&(n + 1).to_be_bytes());

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct XORIterator<'a> {
    br: Reader<'a>,
    num_total: u16,
    num_read: u16,
    state: XORState,
    err: Option<Error>,
}

impl<'a> XORIterator<'a> {
    /// Iterates over the encoded chunk `data`, header included.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            br: Reader::new(data.get(CHUNK_HEADER_SIZE..).unwrap_or_default()),
            num_total: read_num_samples(data),
            num_read: 0,
            state: XORState::default(),
            err: (data.len() < CHUNK_HEADER_SIZE).then_some(Error::Truncated),
        }
    }

    pub fn sample(&self) -> Sample {
        Sample::new(self.state.t, self.state.v)
    }

    fn read_sample(&mut self) -> Result<()> {
        if self.num_read == 0 {
            self.state.t = read_varint(&mut self.br)?;
            self.state.v = f64::from_bits(self.br.read_bits(64)?);
            return Ok(());
        }

        if self.num_read == 1 {
            self.state.t_delta = read_uvarint(&mut self.br)?;
        } else {
            let dod = read_varbit_ts(&mut self.br)?;
            self.state.t_delta = (self.state.t_delta as i64).wrapping_add(dod) as u64;
        }
        self.state.t = self.state.t.wrapping_add(self.state.t_delta as i64);

        self.read_value()
    }

    fn read_value(&mut self) -> Result<()> {
        if self.br.read_bit()? == Bit::Zero {
            return Ok(());
        }

        if self.br.read_bit()? == Bit::One {
            let leading = self.br.read_bits(5)? as u8;
            let mbits = match self.br.read_bits(6)? as u8 {
                0 => 64,
                n => n,
            };
            self.state.trailing = 64_u8
                .checked_sub(leading + mbits)
                .ok_or(Error::Corrupted("value window is wider than 64 bits"))?;
            self.state.leading = leading;
        } else if self.state.leading == UNSET_LEADING {
            // a reused window that was never opened spans all 64 bits
            self.state.leading = 0;
            self.state.trailing = 0;
        }

        let mbits = 64 - self.state.leading - self.state.trailing;
        let bits = self.br.read_bits(mbits)?;
        self.state.v = f64::from_bits(self.state.v.to_bits() ^ (bits << self.state.trailing));

        Ok(())
    }
}

impl<'a> ChunkIterator for XORIterator<'a> {
    fn next(&mut self) -> Result<bool> {
        if let Some(e) = self.err {
            return Err(e);
        }

        if self.num_read == self.num_total {
            return Ok(false);
        }

        match self.read_sample() {
            Ok(()) => {
                self.num_read += 1;
                Ok(true)
            }
            Err(e) => {
                debug!(
                    read = self.num_read,
                    total = self.num_total,
                    error = %e,
                    "chunk iteration failed"
                );
                self.err = Some(e);
                Err(e)
            }
        }
    }

    fn seek(&mut self, t: i64) -> Result<bool> {
        while self.num_read == 0 || t > self.state.t {
            if !self.next()? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn at(&self) -> (i64, f64) {
        (self.state.t, self.state.v)
    }
}

/// Standard iterator over the samples of a chunk, ending after the first
/// error.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    it: XORIterator<'a>,
    done: bool,
}

impl<'a> Iterator for Samples<'a> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match ChunkIterator::next(&mut self.it) {
            Ok(true) => Some(Ok(self.it.sample())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
