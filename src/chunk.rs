use crate::error::Result;
use std::fmt;

/// Number of bytes in front of every chunk payload holding the sample count.
pub const CHUNK_HEADER_SIZE: usize = 2;

/// Chunk encodings, numbered as they are on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    None = 0,
    XOR = 1,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::None => f.write_str("none"),
            Encoding::XOR => f.write_str("XOR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub t: i64,
    pub v: f64,
}

impl Sample {
    pub fn new(t: i64, v: f64) -> Self {
        Self { t, v }
    }
}

impl From<(i64, f64)> for Sample {
    fn from((t, v): (i64, f64)) -> Self {
        Self { t, v }
    }
}

pub trait Appender {
    /// Adds a sample at the tail of the chunk. On error nothing is written.
    fn append(&mut self, t: i64, v: f64) -> Result<()>;
}

/// Forward-only cursor over the samples of a chunk.
pub trait ChunkIterator {
    /// Advances to the next sample. Returns `Ok(false)` once every sample has
    /// been read.
    fn next(&mut self) -> Result<bool>;

    /// Advances to the first sample with a timestamp at or after `t`.
    fn seek(&mut self, t: i64) -> Result<bool>;

    /// The current sample. Only meaningful after `next` or `seek` returned
    /// `Ok(true)`.
    fn at(&self) -> (i64, f64);
}

pub trait Chunk {
    fn bytes(&self) -> &[u8];

    fn encoding(&self) -> Encoding;

    fn num_samples(&self) -> usize;

    fn compact(&mut self);

    fn appender(&mut self) -> Result<Box<dyn Appender + '_>>;

    fn iterator(&self) -> Box<dyn ChunkIterator + '_>;
}
