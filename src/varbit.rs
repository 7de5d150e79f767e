//! Bucketed variable-bit-width integers.
//!
//! A value is written as a prefix of one-bits closed by a zero-bit, selecting
//! a bucket, followed by the value in exactly that bucket's width. The last
//! bucket of a table is the escape hatch: its prefix is all ones with no
//! closing zero, and it carries the full 64 bits.
//!
//! Signed values use two's complement truncated to the bucket width. A bucket
//! of width `w` holds `-(2^(w-1) - 1) ..= 2^(w-1)`, and the reader
//! sign-extends anything above `2^(w-1)`.

use crate::bitstream::{mask, Bit, BitStream, Reader};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bucket {
    prefix: u64,
    prefix_len: u8,
    width: u8,
}

const fn bucket(prefix: u64, prefix_len: u8, width: u8) -> Bucket {
    Bucket {
        prefix,
        prefix_len,
        width,
    }
}

// Indexed by the number of leading one-bits in the prefix.
const INT_BUCKETS: [Bucket; 9] = [
    bucket(0b0, 1, 0),
    bucket(0b10, 2, 3),
    bucket(0b110, 3, 6),
    bucket(0b1110, 4, 9),
    bucket(0b11110, 5, 12),
    bucket(0b111110, 6, 18),
    bucket(0b1111110, 7, 25),
    bucket(0b11111110, 8, 56),
    bucket(0b11111111, 8, 64),
];

const TS_BUCKETS: [Bucket; 5] = [
    bucket(0b0, 1, 0),
    bucket(0b10, 2, 14),
    bucket(0b110, 3, 17),
    bucket(0b1110, 4, 20),
    bucket(0b1111, 4, 64),
];

fn fits_signed(x: i64, width: u8) -> bool {
    match width {
        0 => x == 0,
        64 => true,
        w => -((1_i64 << (w - 1)) - 1) <= x && x <= 1_i64 << (w - 1),
    }
}

fn fits_unsigned(x: u64, width: u8) -> bool {
    width >= 64 || x < 1_u64 << width
}

fn select(table: &[Bucket], fits: impl Fn(u8) -> bool) -> &Bucket {
    let escape = &table[table.len() - 1];
    table.iter().find(|b| fits(b.width)).unwrap_or(escape)
}

fn put(b: &mut BitStream, bits: u64, bucket: &Bucket) {
    b.write_bits(bucket.prefix, bucket.prefix_len);
    b.write_bits(bits & mask(bucket.width), bucket.width);
}

fn read_bucket<'t>(r: &mut Reader, table: &'t [Bucket]) -> Result<&'t Bucket> {
    let max_ones = table.len() - 1;
    let mut ones = 0;
    while ones < max_ones {
        if r.read_bit()? == Bit::Zero {
            break;
        }
        ones += 1;
    }
    Ok(&table[ones])
}

fn read_signed(r: &mut Reader, table: &[Bucket]) -> Result<i64> {
    let width = read_bucket(r, table)?.width;
    let bits = r.read_bits(width)?;
    if width > 0 && width < 64 && bits > 1 << (width - 1) {
        return Ok(bits as i64 - (1_i64 << width));
    }
    Ok(bits as i64)
}

pub fn put_varbit_int(b: &mut BitStream, x: i64) {
    put(b, x as u64, select(&INT_BUCKETS, |w| fits_signed(x, w)));
}

pub fn read_varbit_int(r: &mut Reader) -> Result<i64> {
    read_signed(r, &INT_BUCKETS)
}

pub fn put_varbit_uint(b: &mut BitStream, x: u64) {
    put(b, x, select(&INT_BUCKETS, |w| fits_unsigned(x, w)));
}

pub fn read_varbit_uint(r: &mut Reader) -> Result<u64> {
    let width = read_bucket(r, &INT_BUCKETS)?.width;
    r.read_bits(width)
}

/// Writes a timestamp delta-of-delta. A zero costs a single bit.
pub fn put_varbit_ts(b: &mut BitStream, dod: i64) {
    put(b, dod as u64, select(&TS_BUCKETS, |w| fits_signed(dod, w)));
}

pub fn read_varbit_ts(r: &mut Reader) -> Result<i64> {
    read_signed(r, &TS_BUCKETS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rand::{Rng, SeedableRng};

    const INT_BOUNDARIES: [i64; 33] = [
        i64::MIN,
        -36028797018963968,
        -36028797018963967,
        -16777216,
        -16777215,
        -131072,
        -131071,
        -2048,
        -2047,
        -256,
        -255,
        -32,
        -31,
        -4,
        -3,
        -1,
        0,
        1,
        4,
        5,
        32,
        33,
        256,
        257,
        2048,
        2049,
        131072,
        131073,
        16777216,
        16777217,
        36028797018963968,
        36028797018963969,
        i64::MAX,
    ];

    const UINT_BOUNDARIES: [u64; 21] = [
        0,
        1,
        7,
        8,
        63,
        64,
        511,
        512,
        4095,
        4096,
        262143,
        262144,
        33554431,
        33554432,
        (1 << 32) - 1,
        1 << 32,
        72057594037927935,
        72057594037927936,
        u64::MAX - 1,
        u64::MAX,
        1 << 63,
    ];

    fn encode_int(x: i64) -> Vec<u8> {
        let mut b = BitStream::new();
        put_varbit_int(&mut b, x);
        b.to_vec()
    }

    fn encode_uint(x: u64) -> Vec<u8> {
        let mut b = BitStream::new();
        put_varbit_uint(&mut b, x);
        b.to_vec()
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode_int(0), [0x00]);
        assert_eq!(encode_int(1), [0x88]);
        assert_eq!(encode_int(-1), [0xb8]);
        assert_eq!(encode_int(4), [0xa0]);
        assert_eq!(encode_int(-3), [0xa8]);
        assert_eq!(encode_int(5), [0xc2, 0x80]);
        assert_eq!(encode_int(i64::MIN), [0xff, 0x80, 0, 0, 0, 0, 0, 0, 0]);

        assert_eq!(encode_uint(0), [0x00]);
        assert_eq!(encode_uint(7), [0xb8]);
        assert_eq!(encode_uint(8), [0xc4, 0x00]);
        assert_eq!(encode_uint(u64::MAX), [0xff; 9]);
    }

    #[test]
    fn test_bucket_sizes() {
        // prefix plus payload, in bits, at each side of every boundary
        let bits = |x: i64| {
            let mut b = BitStream::new();
            put_varbit_int(&mut b, x);
            b.data.len() * 8 - b.count as usize
        };
        assert_eq!(bits(0), 1);
        assert_eq!(bits(-3), 5);
        assert_eq!(bits(4), 5);
        assert_eq!(bits(-4), 9);
        assert_eq!(bits(5), 9);
        assert_eq!(bits(2048), 17);
        assert_eq!(bits(2049), 24);
        assert_eq!(bits(36028797018963968), 64);
        assert_eq!(bits(36028797018963969), 72);
    }

    #[test]
    fn test_int_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut numbers = INT_BOUNDARIES.to_vec();
        numbers.extend((0..200).map(|_| rng.gen::<i64>() >> rng.gen_range(0..64_u32)));

        let mut b = BitStream::new();
        for x in &numbers {
            put_varbit_int(&mut b, *x);
        }

        let mut r = Reader::new(b.as_ref());
        for x in numbers {
            assert_eq!(read_varbit_int(&mut r).unwrap(), x);
        }
    }

    #[test]
    fn test_uint_roundtrip() {
        let mut b = BitStream::new();
        for x in UINT_BOUNDARIES {
            put_varbit_uint(&mut b, x);
        }

        let mut r = Reader::new(b.as_ref());
        for x in UINT_BOUNDARIES {
            assert_eq!(read_varbit_uint(&mut r).unwrap(), x);
        }
    }

    #[test]
    fn test_ts_roundtrip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut numbers = vec![
            0,
            -8191,
            8192,
            -8192,
            8193,
            -65535,
            65536,
            -524287,
            524288,
            524289,
            i64::MAX,
            i64::MIN,
        ];
        numbers.extend((0..200).map(|_| rng.gen_range(-1_000_000..1_000_000)));

        let mut b = BitStream::new();
        for x in &numbers {
            put_varbit_ts(&mut b, *x);
        }

        let mut r = Reader::new(b.as_ref());
        for x in numbers {
            assert_eq!(read_varbit_ts(&mut r).unwrap(), x);
        }
    }

    #[test]
    fn test_ts_zero_is_one_bit() {
        let mut b = BitStream::new();
        for _ in 0..8 {
            put_varbit_ts(&mut b, 0);
        }
        assert_eq!(b.bytes(), &[0x00]);
        assert_eq!(b.count, 0);
    }

    #[test]
    fn test_truncated() {
        // escape prefix without its payload
        let mut r = Reader::new(&[0xff]);
        assert_eq!(read_varbit_int(&mut r), Err(Error::Truncated));

        // prefix cut short
        let mut r = Reader::new(&[]);
        assert_eq!(read_varbit_uint(&mut r), Err(Error::Truncated));

        let encoded = encode_int(-16777215);
        let mut r = Reader::new(&encoded[..encoded.len() - 1]);
        assert_eq!(read_varbit_int(&mut r), Err(Error::Truncated));
    }
}
