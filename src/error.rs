use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("out of order sample: timestamp {t} is not after {prev}")]
    OutOfOrder { t: i64, prev: i64 },
    #[error("end of stream before the last field was complete")]
    Truncated,
    #[error("varint overflows 64 bits")]
    Overflow,
    #[error("cannot read a {0} bit field, at most 64 fit")]
    FieldTooWide(u8),
    #[error("chunk already holds {0} samples")]
    LimitExceeded(u16),
    #[error("corrupted chunk: {0}")]
    Corrupted(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
