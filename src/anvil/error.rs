use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseChunkError {
    #[error("palette index {index} is out of range for a palette of {len} entries")]
    MalformedPalette { index: u32, len: usize },
    #[error("missing block name in palette entry {0}")]
    MissingPaletteName(usize),
    #[error("property value of \"{0}\" is not a string")]
    BadPropertyValue(String),
    #[error("unsupported chunk schema: {0}")]
    UnsupportedSchema(&'static str),
    #[error("{words} longs cannot hold {entries} entries of {bits} bits")]
    CorruptBitStream {
        words: usize,
        bits: u32,
        entries: usize,
    },
    #[error("tag `{tag}` has {found} entries, expected {expected}")]
    BadArrayLength {
        tag: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("section Y {y} is outside of the {max} section slots")]
    OutOfRangeSection { y: i64, max: usize },
    #[error("chunk decode timed out after {0:?}")]
    TimedOut(Duration),
    #[error("decode worker disconnected")]
    WorkerDisconnected,
}
