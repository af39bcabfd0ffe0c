use std::collections::BTreeMap;
use std::sync::Arc;

use valence_nbt::Compound;

use super::error::ParseChunkError;
use super::palette::{resolve_biome_palette, resolve_block_palette, BlockState, Paletted, AIR};
use super::parsing::Schema;
use crate::config::DecodeConfig;
use crate::legacy::LegacyTables;
use crate::nbt::{nibble, CompoundExt};

pub const SECTION_BLOCKS: usize = 16 * 16 * 16;
pub const SECTION_BIOMES: usize = 4 * 4 * 4;
const NIBBLE_BYTES: usize = SECTION_BLOCKS / 2;

/// The game never writes block states narrower than this. Data packed at the
/// exact palette width is accepted as well.
pub const BLOCK_MIN_BITS: u32 = 4;
pub const BIOME_MIN_BITS: u32 = 1;

static NO_PROPERTIES: BTreeMap<String, String> = BTreeMap::new();

/// What a decode call may borrow: the id tables and the configuration.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub tables: &'a LegacyTables,
    pub config: &'a DecodeConfig,
}

/// Index of a voxel inside a section: x fastest, then z, then y.
#[inline]
pub const fn block_index(x: usize, y: usize, z: usize) -> usize {
    x + z * 16 + y * 256
}

/// Index of the 4×4×4 biome cell containing a voxel.
#[inline]
pub const fn biome_index(x: usize, y: usize, z: usize) -> usize {
    (x >> 2) + (z >> 2) * 4 + (y >> 2) * 16
}

fn local_index(x: usize, y: usize, z: usize) -> Option<usize> {
    (x < 16 && y < 16 && z < 16).then(|| block_index(x, y, z))
}

/// A decoded 16×16×16 section. Every array is fully populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    y: i32,
    legacy_ids: Box<[u16]>,
    legacy_data: Box<[u8]>,
    blocks: Paletted<BlockState>,
    sky_light: Box<[u8]>,
    block_light: Box<[u8]>,
    biomes: Paletted<Arc<str>>,
}

impl Section {
    /// An all-air section with no light.
    pub fn empty(y: i32, biome: Arc<str>) -> Self {
        Self {
            y,
            legacy_ids: vec![0; SECTION_BLOCKS].into_boxed_slice(),
            legacy_data: vec![0; SECTION_BLOCKS].into_boxed_slice(),
            blocks: Paletted::filled(BlockState::air(), SECTION_BLOCKS),
            sky_light: vec![0; SECTION_BLOCKS].into_boxed_slice(),
            block_light: vec![0; SECTION_BLOCKS].into_boxed_slice(),
            biomes: Paletted::filled(biome, SECTION_BIOMES),
        }
    }

    /// Builds a section from numeric ids, resolving names through `tables`.
    /// All slices hold one entry per voxel in [`block_index`] order.
    pub(crate) fn from_legacy(
        y: i32,
        ids: Vec<u16>,
        data: Vec<u8>,
        sky_light: Vec<u8>,
        block_light: Vec<u8>,
        ctx: &DecodeContext,
    ) -> Self {
        debug_assert_eq!(ids.len(), SECTION_BLOCKS);

        let blocks = Paletted::from_values(ids.iter().copied())
            .map_palette(|&id| legacy_state(id, ctx.tables));

        Self {
            y,
            legacy_ids: ids.into_boxed_slice(),
            legacy_data: data.into_boxed_slice(),
            blocks,
            sky_light: sky_light.into_boxed_slice(),
            block_light: block_light.into_boxed_slice(),
            biomes: Paletted::filled(ctx.config.fallback_biome.clone(), SECTION_BIOMES),
        }
    }

    /// Section Y as stored in the save, i.e. world Y divided by 16.
    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn blocks(&self) -> &Paletted<BlockState> {
        &self.blocks
    }

    pub fn biomes(&self) -> &Paletted<Arc<str>> {
        &self.biomes
    }

    pub(crate) fn set_biomes(&mut self, biomes: Paletted<Arc<str>>) {
        debug_assert_eq!(biomes.len(), SECTION_BIOMES);
        self.biomes = biomes;
    }

    pub fn block_state(&self, x: usize, y: usize, z: usize) -> Option<&BlockState> {
        self.blocks.get(local_index(x, y, z)?)
    }

    pub fn block_name(&self, x: usize, y: usize, z: usize) -> Option<&str> {
        self.block_state(x, y, z).map(BlockState::name)
    }

    pub fn block_properties(&self, x: usize, y: usize, z: usize) -> Option<&BTreeMap<String, String>> {
        self.block_state(x, y, z).map(BlockState::properties)
    }

    pub fn legacy_id(&self, x: usize, y: usize, z: usize) -> Option<u16> {
        Some(self.legacy_ids[local_index(x, y, z)?])
    }

    pub fn legacy_data(&self, x: usize, y: usize, z: usize) -> Option<u8> {
        Some(self.legacy_data[local_index(x, y, z)?])
    }

    pub fn sky_light(&self, x: usize, y: usize, z: usize) -> Option<u8> {
        Some(self.sky_light[local_index(x, y, z)?])
    }

    pub fn block_light(&self, x: usize, y: usize, z: usize) -> Option<u8> {
        Some(self.block_light[local_index(x, y, z)?])
    }

    pub fn biome(&self, x: usize, y: usize, z: usize) -> Option<&str> {
        local_index(x, y, z)?;
        self.biomes.get(biome_index(x, y, z)).map(|b| &**b)
    }

    /// Replaces the block at a position. The legacy id and data arrays keep
    /// whatever was decoded.
    pub fn set_block_state(&mut self, x: usize, y: usize, z: usize, state: BlockState) -> bool {
        let Some(i) = local_index(x, y, z) else {
            return false;
        };
        self.blocks.set(i, state);
        true
    }

    /// Renames the block at a position, keeping its properties.
    pub fn set_block_name(&mut self, x: usize, y: usize, z: usize, name: &str) -> bool {
        let Some(state) = self.block_state(x, y, z) else {
            return false;
        };
        let state = state.clone().with_name(name);
        self.set_block_state(x, y, z, state)
    }

    /// `true` if every voxel is some kind of air.
    pub fn is_empty(&self) -> bool {
        self.blocks.palette().iter().all(BlockState::is_air)
    }
}

fn legacy_state(id: u16, tables: &LegacyTables) -> BlockState {
    match tables.block_name(id) {
        Some(name) => BlockState::from_interned(name.clone()),
        None => BlockState::new(&format!("legacy:{id}")),
    }
}

/// Reads a nibble array of one section, zero-filled when absent.
fn nibbles(tag: &Compound, key: &'static str) -> Result<Vec<u8>, ParseChunkError> {
    match tag.byte_array(key) {
        None => Ok(vec![0; SECTION_BLOCKS]),
        Some(bytes) if bytes.len() == NIBBLE_BYTES => {
            Ok((0..SECTION_BLOCKS).map(|i| nibble(bytes, i)).collect())
        }
        Some(bytes) => Err(ParseChunkError::BadArrayLength {
            tag: key,
            expected: NIBBLE_BYTES,
            found: bytes.len(),
        }),
    }
}

fn optional_array<'a>(
    tag: &'a Compound,
    key: &'static str,
    expected: usize,
) -> Result<Option<&'a [i8]>, ParseChunkError> {
    match tag.byte_array(key) {
        Some(bytes) if bytes.len() != expected => Err(ParseChunkError::BadArrayLength {
            tag: key,
            expected,
            found: bytes.len(),
        }),
        bytes => Ok(bytes),
    }
}

/// Decodes one section compound.
///
/// `section_y` is the section's own `Y` (world Y / 16). The block layout is
/// picked from the fields present: `Blocks` for the pre-1.13 numeric format,
/// `Palette` + `BlockStates` for 1.13–1.17, `block_states` for 1.18 and
/// later. A section with none of them is air.
pub fn decode_section(
    tag: &Compound,
    schema: Schema,
    section_y: i32,
    ctx: &DecodeContext,
) -> Result<Section, ParseChunkError> {
    let sky_light = nibbles(tag, "SkyLight")?;
    let block_light = nibbles(tag, "BlockLight")?;

    let mut section = match schema {
        Schema::Alpha => {
            return Err(ParseChunkError::UnsupportedSchema(
                "alpha chunks have no section list",
            ))
        }
        Schema::Anvil => {
            if let Some(blocks) = optional_array(tag, "Blocks", SECTION_BLOCKS)? {
                let add = optional_array(tag, "Add", NIBBLE_BYTES)?;
                let data = optional_array(tag, "Data", NIBBLE_BYTES)?;

                let ids = (0..SECTION_BLOCKS)
                    .map(|i| {
                        let high = add.map_or(0, |add| u16::from(nibble(add, i)));
                        u16::from(blocks[i] as u8) | (high << 8)
                    })
                    .collect();
                let data = match data {
                    Some(data) => (0..SECTION_BLOCKS).map(|i| nibble(data, i)).collect(),
                    None => vec![0; SECTION_BLOCKS],
                };

                return Ok(Section::from_legacy(
                    section_y,
                    ids,
                    data,
                    sky_light,
                    block_light,
                    ctx,
                ));
            }

            match tag.compound_list("Palette") {
                Some(palette) => paletted_section(
                    section_y,
                    resolve_block_palette(palette)?,
                    tag.long_array("BlockStates"),
                    ctx,
                )?,
                None => Section::empty(section_y, ctx.config.fallback_biome.clone()),
            }
        }
        Schema::Modern => {
            let mut section = match tag.compound("block_states") {
                Some(states) => match states.compound_list("palette") {
                    Some(palette) => paletted_section(
                        section_y,
                        resolve_block_palette(palette)?,
                        states.long_array("data"),
                        ctx,
                    )?,
                    None => Section::empty(section_y, ctx.config.fallback_biome.clone()),
                },
                None => Section::empty(section_y, ctx.config.fallback_biome.clone()),
            };

            if let Some(biomes) = tag.compound("biomes") {
                if let Some(palette) = biomes.string_list("palette") {
                    section.set_biomes(Paletted::from_packed(
                        resolve_biome_palette(palette)?,
                        biomes.long_array("data"),
                        SECTION_BIOMES,
                        BIOME_MIN_BITS,
                    )?);
                }
            }

            section
        }
    };

    section.sky_light = sky_light.into_boxed_slice();
    section.block_light = block_light.into_boxed_slice();
    Ok(section)
}

fn paletted_section(
    section_y: i32,
    palette: Vec<BlockState>,
    data: Option<&[i64]>,
    ctx: &DecodeContext,
) -> Result<Section, ParseChunkError> {
    let blocks = Paletted::from_packed(palette, data, SECTION_BLOCKS, BLOCK_MIN_BITS)?;

    let id_by_palette: Vec<u16> = blocks
        .palette()
        .iter()
        .map(|state| ctx.tables.block_id(state.name()).unwrap_or(0))
        .collect();
    let legacy_ids = blocks
        .indices()
        .iter()
        .map(|&i| id_by_palette[usize::from(i)])
        .collect();

    Ok(Section {
        y: section_y,
        legacy_ids,
        legacy_data: vec![0; SECTION_BLOCKS].into_boxed_slice(),
        blocks,
        sky_light: vec![0; SECTION_BLOCKS].into_boxed_slice(),
        block_light: vec![0; SECTION_BLOCKS].into_boxed_slice(),
        biomes: Paletted::filled(ctx.config.fallback_biome.clone(), SECTION_BIOMES),
    })
}

/// Placeholder answers for positions outside any decoded section.
pub(crate) fn default_properties() -> &'static BTreeMap<String, String> {
    &NO_PROPERTIES
}

pub(crate) fn default_state() -> &'static BlockState {
    &AIR
}
