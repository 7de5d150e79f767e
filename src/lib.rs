//! Compressed chunks of `(timestamp, value)` samples, wire compatible with the
//! [XOR chunk encoding](https://github.com/prometheus/prometheus/blob/0876d57aea9636898835c7a179760a6cd72a290d/tsdb/chunkenc/xor.go)
//!
//! A chunk is written sample by sample through an `Appender` and read back
//! in the same order through an iterator. Timestamps are stored as
//! deltas-of-deltas, values as the XOR against the previous value.
//!
//! The building blocks are public too: a `bitstream`, byte-aligned `varint`s
//! and the bucketed `varbit` integers.
//!
//! # Example
//!
//! ```
//! use xorchunk::{Appender, Chunk, ChunkIterator, XORChunk};
//!
//! fn main() -> xorchunk::Result<()> {
//!     let mut chunk = XORChunk::new();
//!     {
//!         let mut appender = chunk.appender()?;
//!         appender.append(1_i64, 2.0)?;
//!         appender.append(2_i64, 3.0)?;
//!         appender.append(3_i64, 4.0)?;
//!     }
//!     assert_eq!(chunk.num_samples(), 3);
//!
//!     let mut it = chunk.iterator();
//!     while it.next()? {
//!         let (ts, val) = it.at();
//!         assert_eq!(ts as f64 + 1.0, val);
//!     }
//!     Ok(())
//! }
//! ```

pub mod bitstream;
pub mod chunk;
pub mod error;
pub mod varbit;
pub mod varint;
pub mod xor;

pub use chunk::{Appender, Chunk, ChunkIterator, Encoding, Sample};
pub use error::{Error, Result};
pub use xor::{Samples, XORAppender, XORChunk, XORIterator};
