use std::collections::BTreeMap;
use std::sync::Arc;

use valence_nbt::Compound;

use super::error::ParseChunkError;
use super::palette::{BlockState, Paletted};
use super::section::{
    decode_section, default_properties, default_state, DecodeContext, Section, SECTION_BIOMES,
    SECTION_BLOCKS,
};
use super::ChunkPos;
use crate::config::DecodeConfig;
use crate::legacy::LegacyTables;
use crate::nbt::{nibble, CompoundExt};

/// The three chunk layouts the game has written over the years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Schema {
    /// Alpha/McRegion: one 128-tall column of byte arrays under `Level`.
    ///
    /// The column has no sections on disk. It is read straight from the
    /// column arrays and stored in eight 16-tall section slots, so lookups by
    /// world Y answer exactly as the flat column would.
    Alpha,
    /// Anvil before 1.18: a `Level` wrapper holding `Sections`.
    Anvil,
    /// 1.18 and later: fields at the root, lowercase `sections`.
    Modern,
}

impl Schema {
    /// Detects the layout and returns the compound holding the chunk fields.
    pub fn detect(root: &Compound) -> Result<(Self, &Compound), ParseChunkError> {
        if let Some(level) = root.compound("Level") {
            let schema = if level.compound_list("Sections").is_none()
                && level.byte_array("Blocks").is_some()
            {
                Self::Alpha
            } else {
                Self::Anvil
            };
            return Ok((schema, level));
        }

        if root.compound_list("sections").is_some() || root.int("xPos").is_some() {
            return Ok((Self::Modern, root));
        }

        Err(ParseChunkError::UnsupportedSchema(
            "no `Level` compound and no root-level chunk fields",
        ))
    }

    /// Section slots for a chunk of this layout when not configured.
    pub fn default_sections(self) -> usize {
        match self {
            Self::Alpha => ALPHA_HEIGHT / 16,
            Self::Anvil => 16,
            Self::Modern => 24,
        }
    }

    /// Lowest section Y when the chunk does not say.
    fn default_min_section(self) -> i32 {
        match self {
            Self::Modern => -4,
            _ => 0,
        }
    }
}

const ALPHA_HEIGHT: usize = 128;
const ALPHA_BLOCKS: usize = ALPHA_HEIGHT * 16 * 16;

/// Maps a section Y to its slot: `section_y - min_section_y`, which is
/// `section_y + abs(min_section_y)` for worlds reaching below zero.
pub fn section_slot(section_y: i64, min_section_y: i32, slots: usize) -> Option<usize> {
    let slot = section_y.checked_sub(i64::from(min_section_y))?;
    usize::try_from(slot).ok().filter(|&s| s < slots)
}

/// Pre-1.18 biomes stored once per chunk rather than per section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnBiomes {
    /// One biome per column, indexed `x + z * 16`.
    Flat(Paletted<Arc<str>>),
    /// One biome per 4×4×4 cell from the bottom of the world up, indexed
    /// `cx + cz * 4 + cy * 16`.
    Volume(Paletted<Arc<str>>),
}

impl ColumnBiomes {
    fn read(
        level: &Compound,
        ctx: &DecodeContext,
    ) -> Result<Option<Self>, ParseChunkError> {
        let name = |id: i32| {
            ctx.tables
                .biome_name(id)
                .cloned()
                .unwrap_or_else(|| ctx.config.fallback_biome.clone())
        };

        if let Some(bytes) = level.byte_array("Biomes") {
            if bytes.len() != 256 {
                return Err(ParseChunkError::BadArrayLength {
                    tag: "Biomes",
                    expected: 256,
                    found: bytes.len(),
                });
            }
            let ids = Paletted::from_values(bytes.iter().map(|&b| i32::from(b as u8)));
            return Ok(Some(Self::Flat(ids.map_palette(|&id| name(id)))));
        }

        let Some(ints) = level.int_array("Biomes") else {
            return Ok(None);
        };
        let ids = Paletted::from_values(ints.iter().copied());

        match ints.len() {
            0 => Ok(None),
            256 => Ok(Some(Self::Flat(ids.map_palette(|&id| name(id))))),
            n if n >= 1024 && n % 16 == 0 => {
                Ok(Some(Self::Volume(ids.map_palette(|&id| name(id)))))
            }
            n => Err(ParseChunkError::BadArrayLength {
                tag: "Biomes",
                expected: 1024,
                found: n,
            }),
        }
    }

    /// The 64 cells of the section in slot `slot`.
    fn section_cells(&self, slot: usize, fallback: &Arc<str>) -> Paletted<Arc<str>> {
        Paletted::from_values((0..SECTION_BIOMES).map(|i| {
            let (cx, cz, cy) = (i % 4, i / 4 % 4, i / 16);
            let biome = match self {
                Self::Flat(flat) => flat.get(cx * 4 + cz * 4 * 16),
                Self::Volume(volume) => volume.get((slot * 4 + cy) * 16 + cz * 4 + cx),
            };
            biome.unwrap_or(fallback).clone()
        }))
    }
}

/// A decoded chunk column.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pos: ChunkPos,
    schema: Schema,
    data_version: Option<i32>,
    status: Option<String>,
    min_section_y: i32,
    sections: Vec<Option<Section>>,
    column_biomes: Option<ColumnBiomes>,
    block_entities: BTreeMap<(u8, i32, u8), Compound>,
    fallback_biome: Arc<str>,
}

impl Chunk {
    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn data_version(&self) -> Option<i32> {
        self.data_version
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Section Y of slot 0.
    pub fn min_section_y(&self) -> i32 {
        self.min_section_y
    }

    pub fn sections(&self) -> &[Option<Section>] {
        &self.sections
    }

    pub fn section(&self, slot: usize) -> Option<&Section> {
        self.sections.get(slot)?.as_ref()
    }

    pub fn column_biomes(&self) -> Option<&ColumnBiomes> {
        self.column_biomes.as_ref()
    }

    /// Lowest world Y covered by the section slots, clamped to the `i32`
    /// range.
    pub fn min_y(&self) -> i32 {
        self.min_section_y.saturating_mul(16)
    }

    /// Total height in blocks covered by the section slots.
    pub fn height(&self) -> usize {
        self.sections.len() * 16
    }

    /// Slot of the section containing world `y`.
    pub fn section_index(&self, y: i32) -> Option<usize> {
        section_slot(
            i64::from(y.div_euclid(16)),
            self.min_section_y,
            self.sections.len(),
        )
    }

    /// Slot plus section-local coordinates, or `None` outside the chunk.
    fn locate(&self, x: i32, y: i32, z: i32) -> Option<(usize, usize, usize, usize)> {
        if !(0..16).contains(&x) || !(0..16).contains(&z) {
            return None;
        }
        let slot = self.section_index(y)?;
        Some((slot, x as usize, y.rem_euclid(16) as usize, z as usize))
    }

    fn section_at(&self, x: i32, y: i32, z: i32) -> Option<(&Section, usize, usize, usize)> {
        let (slot, x, y, z) = self.locate(x, y, z)?;
        Some((self.section(slot)?, x, y, z))
    }

    /// Block state at chunk-local `x`/`z` and world `y`. Air outside the
    /// chunk or in a missing section.
    pub fn get_block_state(&self, x: i32, y: i32, z: i32) -> &BlockState {
        self.section_at(x, y, z)
            .and_then(|(s, x, y, z)| s.block_state(x, y, z))
            .unwrap_or(default_state())
    }

    pub fn get_block_name(&self, x: i32, y: i32, z: i32) -> &str {
        self.get_block_state(x, y, z).name()
    }

    pub fn get_block_properties(&self, x: i32, y: i32, z: i32) -> &BTreeMap<String, String> {
        self.section_at(x, y, z)
            .and_then(|(s, x, y, z)| s.block_properties(x, y, z))
            .unwrap_or(default_properties())
    }

    pub fn get_legacy_id(&self, x: i32, y: i32, z: i32) -> u16 {
        self.section_at(x, y, z)
            .and_then(|(s, x, y, z)| s.legacy_id(x, y, z))
            .unwrap_or(0)
    }

    pub fn get_legacy_data(&self, x: i32, y: i32, z: i32) -> u8 {
        self.section_at(x, y, z)
            .and_then(|(s, x, y, z)| s.legacy_data(x, y, z))
            .unwrap_or(0)
    }

    pub fn get_sky_light(&self, x: i32, y: i32, z: i32) -> u8 {
        self.section_at(x, y, z)
            .and_then(|(s, x, y, z)| s.sky_light(x, y, z))
            .unwrap_or(0)
    }

    pub fn get_block_light(&self, x: i32, y: i32, z: i32) -> u8 {
        self.section_at(x, y, z)
            .and_then(|(s, x, y, z)| s.block_light(x, y, z))
            .unwrap_or(0)
    }

    /// Biome at chunk-local `x`/`z` and world `y`. Flat legacy biome data is
    /// consulted at full column resolution.
    pub fn get_biome(&self, x: i32, y: i32, z: i32) -> &str {
        if !(0..16).contains(&x) || !(0..16).contains(&z) {
            return &self.fallback_biome;
        }
        let (lx, lz) = (x as usize, z as usize);

        if let Some(ColumnBiomes::Flat(flat)) = &self.column_biomes {
            if self.section_index(y).is_some() {
                if let Some(biome) = flat.get(lx + lz * 16) {
                    return biome;
                }
            }
        }

        if let Some((section, sx, sy, sz)) = self.section_at(x, y, z) {
            if let Some(biome) = section.biome(sx, sy, sz) {
                return biome;
            }
        }

        if let Some(ColumnBiomes::Volume(volume)) = &self.column_biomes {
            let layer = (i64::from(y) - i64::from(self.min_section_y) * 16).div_euclid(4);
            if let Ok(layer) = usize::try_from(layer) {
                if let Some(biome) = volume.get(layer * 16 + (lz >> 2) * 4 + (lx >> 2)) {
                    return biome;
                }
            }
        }

        &self.fallback_biome
    }

    /// Replaces a block. A missing section is created as air first. Returns
    /// `false` when the position is outside the chunk's section slots.
    pub fn set_block_state(&mut self, x: i32, y: i32, z: i32, state: BlockState) -> bool {
        let Some((slot, x, y, z)) = self.locate(x, y, z) else {
            return false;
        };
        self.section_mut_or_empty(slot).set_block_state(x, y, z, state)
    }

    /// Renames a block, keeping its properties.
    pub fn set_block_name(&mut self, x: i32, y: i32, z: i32, name: &str) -> bool {
        let Some((slot, x, y, z)) = self.locate(x, y, z) else {
            return false;
        };
        self.section_mut_or_empty(slot).set_block_name(x, y, z, name)
    }

    fn section_mut_or_empty(&mut self, slot: usize) -> &mut Section {
        let section_y = self.min_section_y.saturating_add(slot as i32);
        let fallback = self.fallback_biome.clone();
        self.sections[slot].get_or_insert_with(|| Section::empty(section_y, fallback))
    }

    /// Block entity at chunk-local `x`/`z` and world `y`.
    pub fn block_entity(&self, x: i32, y: i32, z: i32) -> Option<&Compound> {
        let x = u8::try_from(x).ok().filter(|&x| x < 16)?;
        let z = u8::try_from(z).ok().filter(|&z| z < 16)?;
        self.block_entities.get(&(x, y, z))
    }

    pub fn block_entities(&self) -> &BTreeMap<(u8, i32, u8), Compound> {
        &self.block_entities
    }
}

/// Decodes chunk root compounds with a fixed set of tables and settings.
#[derive(Debug, Clone)]
pub struct ChunkDecoder<'a> {
    tables: &'a LegacyTables,
    config: DecodeConfig,
}

impl Default for ChunkDecoder<'static> {
    fn default() -> Self {
        Self::new(LegacyTables::vanilla(), DecodeConfig::default())
    }
}

impl<'a> ChunkDecoder<'a> {
    pub fn new(tables: &'a LegacyTables, config: DecodeConfig) -> Self {
        Self { tables, config }
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decodes one chunk. The result depends only on `root`, the tables and
    /// the configuration.
    ///
    /// A section whose Y falls outside the section slots is skipped. Any
    /// other structural problem fails the whole chunk.
    pub fn decode(&self, root: &Compound) -> Result<Chunk, ParseChunkError> {
        let (schema, level) = Schema::detect(root)?;
        let ctx = DecodeContext {
            tables: self.tables,
            config: &self.config,
        };

        let pos = ChunkPos::new(level.int("xPos").unwrap_or(0), level.int("zPos").unwrap_or(0));
        let slots = self
            .config
            .max_sections
            .unwrap_or_else(|| schema.default_sections());
        let min_section_y = match schema {
            Schema::Modern => level.int("yPos").unwrap_or(schema.default_min_section()),
            _ => schema.default_min_section(),
        };

        tracing::debug!(?schema, x = pos.x, z = pos.z, min_section_y, "decoding chunk");

        let mut sections = vec![None; slots];
        let mut column_biomes = None;

        match schema {
            Schema::Alpha => decode_alpha(level, &ctx, &mut sections)?,
            Schema::Anvil | Schema::Modern => {
                let key = if schema == Schema::Modern {
                    "sections"
                } else {
                    "Sections"
                };

                for tag in level.compound_list(key).unwrap_or_default() {
                    let Some(section_y) = tag.int_like("Y") else {
                        tracing::debug!(x = pos.x, z = pos.z, "skipping section without Y");
                        continue;
                    };
                    let located = section_slot(section_y, min_section_y, slots)
                        .zip(i32::try_from(section_y).ok());
                    let Some((slot, y)) = located else {
                        let err = ParseChunkError::OutOfRangeSection {
                            y: section_y,
                            max: slots,
                        };
                        tracing::debug!(x = pos.x, z = pos.z, "skipping section: {err}");
                        continue;
                    };
                    sections[slot] = Some(decode_section(tag, schema, y, &ctx)?);
                }

                if schema == Schema::Anvil {
                    column_biomes = ColumnBiomes::read(level, &ctx)?;
                    if let Some(biomes) = &column_biomes {
                        for (slot, section) in sections.iter_mut().enumerate() {
                            if let Some(section) = section {
                                section.set_biomes(
                                    biomes.section_cells(slot, &self.config.fallback_biome),
                                );
                            }
                        }
                    }
                }
            }
        }

        let entities_key = if schema == Schema::Modern {
            "block_entities"
        } else {
            "TileEntities"
        };
        let block_entities = read_block_entities(level.compound_list(entities_key).unwrap_or_default());

        Ok(Chunk {
            pos,
            schema,
            data_version: root.int("DataVersion"),
            status: level.string("Status").map(str::to_owned),
            min_section_y,
            sections,
            column_biomes,
            block_entities,
            fallback_biome: self.config.fallback_biome.clone(),
        })
    }
}

/// Decodes with the vanilla tables and default settings.
pub fn decode_chunk(root: &Compound) -> Result<Chunk, ParseChunkError> {
    ChunkDecoder::default().decode(root)
}

/// Splits the single 128-tall Alpha column into section slots. The column
/// arrays are indexed `y + z * 128 + x * 2048`.
fn decode_alpha(
    level: &Compound,
    ctx: &DecodeContext,
    sections: &mut [Option<Section>],
) -> Result<(), ParseChunkError> {
    let column = |key: &'static str, expected: usize| match level.byte_array(key) {
        Some(bytes) if bytes.len() != expected => Err(ParseChunkError::BadArrayLength {
            tag: key,
            expected,
            found: bytes.len(),
        }),
        bytes => Ok(bytes),
    };

    let Some(blocks) = column("Blocks", ALPHA_BLOCKS)? else {
        return Err(ParseChunkError::UnsupportedSchema("alpha chunk without `Blocks`"));
    };
    let data = column("Data", ALPHA_BLOCKS / 2)?;
    let sky_light = column("SkyLight", ALPHA_BLOCKS / 2)?;
    let block_light = column("BlockLight", ALPHA_BLOCKS / 2)?;

    let read_nibbles = |array: Option<&[i8]>, base: usize| -> Vec<u8> {
        match array {
            Some(array) => (0..SECTION_BLOCKS)
                .map(|i| nibble(array, alpha_index(base, i)))
                .collect(),
            None => vec![0; SECTION_BLOCKS],
        }
    };

    for section_y in 0..ALPHA_HEIGHT / 16 {
        let Some(slot) = sections.get_mut(section_y) else {
            let err = ParseChunkError::OutOfRangeSection {
                y: section_y as i64,
                max: sections.len(),
            };
            tracing::debug!("skipping alpha section: {err}");
            continue;
        };

        let base = section_y * 16;
        let ids = (0..SECTION_BLOCKS)
            .map(|i| u16::from(blocks[alpha_index(base, i)] as u8))
            .collect();

        *slot = Some(Section::from_legacy(
            section_y as i32,
            ids,
            read_nibbles(data, base),
            read_nibbles(sky_light, base),
            read_nibbles(block_light, base),
            ctx,
        ));
    }

    Ok(())
}

/// Column index of section-local voxel `i` in a section starting at `base_y`.
#[inline]
fn alpha_index(base_y: usize, i: usize) -> usize {
    let (x, z, y) = (i % 16, i / 16 % 16, i / 256);
    (base_y + y) + z * ALPHA_HEIGHT + x * ALPHA_HEIGHT * 16
}

fn read_block_entities(list: &[Compound]) -> BTreeMap<(u8, i32, u8), Compound> {
    let mut entities = BTreeMap::new();

    for comp in list {
        let (Some(x), Some(y), Some(z)) = (comp.int("x"), comp.int("y"), comp.int("z")) else {
            tracing::debug!("skipping block entity without a position");
            continue;
        };

        let mut comp = comp.clone();
        comp.remove("keepPacked");

        entities.insert((x.rem_euclid(16) as u8, y, z.rem_euclid(16) as u8), comp);
    }

    entities
}
