//! Decoding of saved chunk columns into uniform, per-voxel arrays.
//!
//! Every on-disk layout from the 128-tall Alpha column up to the 1.18+
//! root-level sections is read from an already parsed NBT tree and turned
//! into the same [`Chunk`](anvil::Chunk) shape.

pub mod anvil;
pub mod config;
pub mod legacy;
pub mod nbt;

pub use valence_nbt;

pub mod prelude {
    use super::*;

    pub use anvil::{
        decode_chunk, BatchDecoder, BlockState, Chunk, ChunkDecoder, ChunkPos, ParseChunkError,
        Schema, Section,
    };
    pub use config::{BatchConfig, DecodeConfig};
    pub use legacy::LegacyTables;
    pub use nbt::CompoundExt;
}
