use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use once_cell::sync::Lazy;
use valence_nbt::{Compound, Value};

use super::error::ParseChunkError;
use super::packed::{bits_for_palette, PackedArray};
use crate::legacy::{ident_path, namespaced};
use crate::nbt::CompoundExt;

pub(crate) static AIR: Lazy<BlockState> = Lazy::new(|| BlockState::new("minecraft:air"));

/// A block name plus its property map, e.g.
/// `minecraft:oak_stairs[facing=north,half=bottom]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState {
    name: Arc<str>,
    properties: BTreeMap<String, String>,
}

impl BlockState {
    /// A state with no properties. `name` gets the `minecraft:` namespace if
    /// it has none.
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(namespaced(name)),
            properties: BTreeMap::new(),
        }
    }

    pub(crate) fn from_interned(name: Arc<str>) -> Self {
        Self {
            name,
            properties: BTreeMap::new(),
        }
    }

    pub fn air() -> Self {
        AIR.clone()
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Arc::from(namespaced(name));
        self
    }

    /// Namespaced id, e.g. `minecraft:stone`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id without its namespace, e.g. `stone`.
    pub fn path(&self) -> &str {
        ident_path(&self.name)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_air(&self) -> bool {
        matches!(self.path(), "air" | "cave_air" | "void_air")
    }
}

/// Resolves the `Palette` / `block_states.palette` list of a section.
pub fn resolve_block_palette(records: &[Compound]) -> Result<Vec<BlockState>, ParseChunkError> {
    if records.is_empty() {
        return Err(ParseChunkError::MalformedPalette { index: 0, len: 0 });
    }

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let Some(name) = record.string("Name") else {
                return Err(ParseChunkError::MissingPaletteName(i));
            };

            let mut state = BlockState::new(name);

            if let Some(properties) = record.compound("Properties") {
                for (key, value) in properties.iter() {
                    let Value::String(value) = value else {
                        return Err(ParseChunkError::BadPropertyValue(key.clone()));
                    };
                    state.properties.insert(key.clone(), value.clone());
                }
            }

            Ok(state)
        })
        .collect()
}

/// Resolves a 1.18+ biome palette.
pub fn resolve_biome_palette(names: &[String]) -> Result<Vec<Arc<str>>, ParseChunkError> {
    if names.is_empty() {
        return Err(ParseChunkError::MalformedPalette { index: 0, len: 0 });
    }

    Ok(names.iter().map(|n| Arc::from(namespaced(n))).collect())
}

/// A dense array stored as a local palette plus one index per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paletted<T> {
    palette: Vec<T>,
    indices: Box<[u16]>,
}

impl<T: Clone + Eq + Hash> Paletted<T> {
    /// `len` copies of `value`.
    pub fn filled(value: T, len: usize) -> Self {
        Self {
            palette: vec![value],
            indices: vec![0; len].into_boxed_slice(),
        }
    }

    /// Builds from one value per entry, interning values in first-seen order.
    pub fn from_values<I: IntoIterator<Item = T>>(values: I) -> Self {
        let mut palette = Vec::new();
        let mut lookup = HashMap::new();
        let indices = values
            .into_iter()
            .map(|value| {
                *lookup.entry(value).or_insert_with_key(|value| {
                    palette.push(value.clone());
                    (palette.len() - 1) as u16
                })
            })
            .collect();

        Self { palette, indices }
    }

    /// Decodes `len` packed palette indices.
    ///
    /// A palette with a single entry needs no data and fills uniformly. With
    /// more entries `data` must be present and its length must match one of
    /// the two packing layouts, either at the exact width
    /// `max(ceil(log2(palette.len())), 1)` or at that width raised to
    /// `min_bits`. The exact width is tried first.
    pub fn from_packed(
        palette: Vec<T>,
        data: Option<&[i64]>,
        len: usize,
        min_bits: u32,
    ) -> Result<Self, ParseChunkError> {
        match palette.len() {
            0 => Err(ParseChunkError::MalformedPalette { index: 0, len: 0 }),
            1 => Ok(Self {
                palette,
                indices: vec![0; len].into_boxed_slice(),
            }),
            palette_len => {
                let words = data.unwrap_or_default();
                let exact = bits_for_palette(palette_len, 1);
                let floored = bits_for_palette(palette_len, min_bits);

                let packed = match PackedArray::new(words, exact, len) {
                    Ok(packed) => packed,
                    Err(_) if floored != exact => PackedArray::new(words, floored, len)?,
                    Err(err) => return Err(err),
                };

                let indices = packed
                    .iter()
                    .map(|index| match u16::try_from(index) {
                        Ok(i) if (i as usize) < palette_len => Ok(i),
                        _ => Err(ParseChunkError::MalformedPalette {
                            index,
                            len: palette_len,
                        }),
                    })
                    .collect::<Result<_, _>>()?;

                Ok(Self { palette, indices })
            }
        }
    }

    /// Transforms every palette entry, keeping the indices.
    pub fn map_palette<U, F: FnMut(&T) -> U>(self, f: F) -> Paletted<U> {
        Paletted {
            palette: self.palette.iter().map(f).collect(),
            indices: self.indices,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.indices
            .get(index)
            .map(|&i| &self.palette[usize::from(i)])
    }

    /// Overwrites one entry, adding `value` to the palette if needed.
    pub fn set(&mut self, index: usize, value: T) {
        if index >= self.indices.len() {
            return;
        }
        let palette_index = match self.palette.iter().position(|v| *v == value) {
            Some(i) => i,
            None => {
                self.palette.push(value);
                self.palette.len() - 1
            }
        };
        self.indices[index] = palette_index as u16;
    }

    pub fn palette(&self) -> &[T] {
        &self.palette
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.indices
            .iter()
            .map(|&i| &self.palette[usize::from(i)])
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use valence_nbt::{compound, List};

    use super::super::packed::{pack, PackingMode};
    use super::*;

    #[test]
    fn block_palette_keeps_order_and_properties() {
        let records = vec![
            compound! { "Name" => "minecraft:air" },
            compound! {
                "Name" => "oak_stairs",
                "Properties" => compound! {
                    "facing" => "north",
                    "half" => "bottom",
                },
            },
        ];

        let palette = resolve_block_palette(&records).unwrap();
        assert_eq!(palette.len(), 2);
        assert!(palette[0].is_air());
        assert_eq!(palette[1].name(), "minecraft:oak_stairs");
        assert_eq!(palette[1].path(), "oak_stairs");
        assert_eq!(palette[1].property("facing"), Some("north"));
        assert_eq!(palette[1].property("half"), Some("bottom"));
    }

    #[test]
    fn block_palette_errors() {
        assert_matches!(
            resolve_block_palette(&[]),
            Err(ParseChunkError::MalformedPalette { index: 0, len: 0 })
        );
        assert_matches!(
            resolve_block_palette(&[compound! { "Name" => "stone" }, compound! {}]),
            Err(ParseChunkError::MissingPaletteName(1))
        );
        assert_matches!(
            resolve_block_palette(&[compound! {
                "Name" => "stone",
                "Properties" => compound! { "lit" => 1_i8 },
            }]),
            Err(ParseChunkError::BadPropertyValue(key)) if key == "lit"
        );
    }

    #[test]
    fn biome_palette_is_namespaced() {
        let palette =
            resolve_biome_palette(&["plains".to_owned(), "minecraft:desert".to_owned()]).unwrap();
        assert_eq!(&*palette[0], "minecraft:plains");
        assert_eq!(&*palette[1], "minecraft:desert");
        assert!(resolve_biome_palette(&[]).is_err());
    }

    #[test]
    fn single_entry_palette_fills_without_data() {
        let stone = BlockState::new("stone");
        let section = Paletted::from_packed(vec![stone.clone()], None, 4096, 4).unwrap();
        assert_eq!(section.len(), 4096);
        assert!(section.iter().all(|s| *s == stone));
    }

    #[test]
    fn multi_entry_palette_without_data_is_corrupt() {
        let palette = vec![BlockState::air(), BlockState::new("stone")];
        assert_matches!(
            Paletted::from_packed(palette, None, 4096, 4),
            Err(ParseChunkError::CorruptBitStream { words: 0, .. })
        );
    }

    #[test]
    fn exact_and_floored_widths_are_both_accepted() {
        let palette = vec![BlockState::air(), BlockState::new("stone")];
        let indices: Vec<u32> = (0..4096).map(|i| i % 2).collect();

        for bits in [1, 4] {
            let data = pack(&indices, bits, PackingMode::Continuous);
            let blocks = Paletted::from_packed(palette.clone(), Some(&data), 4096, 4).unwrap();
            assert_eq!(blocks.indices()[0], 0, "bits={bits}");
            assert_eq!(blocks.indices()[1], 1, "bits={bits}");
            assert_eq!(blocks.indices()[4095], 1, "bits={bits}");
        }

        // Five entries: 3 bits exact, padded layout.
        let palette: Vec<u8> = (0..5).collect();
        let indices: Vec<u32> = (0..4096).map(|i| i % 5).collect();
        let data = pack(&indices, 3, PackingMode::Padded);
        let values = Paletted::from_packed(palette, Some(&data), 4096, 4).unwrap();
        assert_eq!(values.get(4094), Some(&4));
    }

    #[test]
    fn width_that_fits_neither_layout_reports_the_floor() {
        let palette = vec![BlockState::air(), BlockState::new("stone")];
        assert_matches!(
            Paletted::from_packed(palette, Some(&[0; 10]), 4096, 4),
            Err(ParseChunkError::CorruptBitStream { words: 10, bits: 4, entries: 4096 })
        );
    }

    #[test]
    fn out_of_range_index_is_malformed() {
        // Three entries need 2 bits; index 3 does not exist.
        let data = pack(&[0, 1, 2, 3], 2, PackingMode::Continuous);
        let palette = vec![1_u8, 2, 3];
        assert_matches!(
            Paletted::from_packed(palette, Some(&data), 4, 1),
            Err(ParseChunkError::MalformedPalette { index: 3, len: 3 })
        );
    }

    #[test]
    fn set_extends_palette() {
        let mut blocks = Paletted::filled(BlockState::air(), 8);
        blocks.set(3, BlockState::new("stone"));
        blocks.set(4, BlockState::new("stone"));
        blocks.set(100, BlockState::new("dirt"));
        assert_eq!(blocks.palette().len(), 2);
        assert_eq!(blocks.get(3).map(BlockState::name), Some("minecraft:stone"));
        assert_eq!(blocks.indices()[4], 1);
        assert!(blocks.get(0).is_some_and(BlockState::is_air));
    }

    #[test]
    fn from_values_interns_in_first_seen_order() {
        let values = Paletted::from_values([5_u8, 7, 5, 9, 7]);
        assert_eq!(values.palette(), &[5, 7, 9]);
        assert_eq!(values.indices(), &[0, 1, 0, 2, 1]);
    }

    #[test]
    fn non_compound_properties_are_ignored() {
        let record = compound! {
            "Name" => "stone",
            "Properties" => List::End,
        };
        let palette = resolve_block_palette(&[record]).unwrap();
        assert!(palette[0].properties().is_empty());
    }
}
