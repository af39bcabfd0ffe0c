use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Knobs for decoding a single chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Number of section slots in a decoded chunk. `None` picks the height of
    /// the detected schema: 24 for 1.18+ chunks, 16 for Anvil, 8 for the
    /// 128-tall Alpha column.
    pub max_sections: Option<usize>,
    /// Biome reported where the data has none, or an unknown numeric id.
    pub fallback_biome: Arc<str>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_sections: None,
            fallback_biome: Arc::from("minecraft:plains"),
        }
    }
}

/// Knobs for [`BatchDecoder`](crate::anvil::BatchDecoder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub workers: NonZeroUsize,
    /// A chunk that takes longer than this to decode is reported as
    /// [`ParseChunkError::TimedOut`](crate::anvil::ParseChunkError::TimedOut).
    pub chunk_timeout: Option<Duration>,
    pub decode: DecodeConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            chunk_timeout: None,
            decode: DecodeConfig::default(),
        }
    }
}
