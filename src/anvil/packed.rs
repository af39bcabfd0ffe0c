//! Fixed-width integers packed into 64-bit words.
//!
//! The game has used two layouts under the same tag names. Before 1.16 an
//! entry could straddle two longs ([`PackingMode::Continuous`]); from 1.16 on
//! every long holds `64 / bits` whole entries and the leftover high bits are
//! wasted ([`PackingMode::Padded`]). The data version does not reliably tell
//! them apart, so the layout is inferred from the number of longs.

use super::error::ParseChunkError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackingMode {
    /// Entries are laid end to end and may span a word boundary.
    Continuous,
    /// Entries never span a word boundary.
    Padded,
}

impl PackingMode {
    /// Picks the layout that matches `word_count` longs holding `entries`
    /// values of `bits` bits each. When both layouts need the same number of
    /// longs (`bits` divides 64) they are bit-identical and Continuous wins.
    pub fn detect(word_count: usize, bits: u32, entries: usize) -> Option<Self> {
        if word_count == continuous_len(bits, entries) {
            Some(Self::Continuous)
        } else if word_count == padded_len(bits, entries) {
            Some(Self::Padded)
        } else {
            None
        }
    }
}

/// Number of longs needed when entries may span words.
pub const fn continuous_len(bits: u32, entries: usize) -> usize {
    (entries * bits as usize).div_ceil(64)
}

/// Number of longs needed when entries never span words.
pub const fn padded_len(bits: u32, entries: usize) -> usize {
    entries.div_ceil(64 / bits as usize)
}

/// Returns the minimum number of bits needed to represent the integer `n`.
pub const fn bit_width(n: usize) -> u32 {
    usize::BITS - n.leading_zeros()
}

/// Bits per entry for a palette of `palette_len` entries, never below
/// `min_bits`.
pub fn bits_for_palette(palette_len: usize, min_bits: u32) -> u32 {
    bit_width(palette_len.saturating_sub(1)).max(min_bits)
}

/// Reads entry `index` from `words`.
///
/// `index` must be below the entry count the words were validated against.
#[inline]
pub fn get(words: &[i64], bits: u32, index: usize, mode: PackingMode) -> u32 {
    debug_assert!((1..=32).contains(&bits));
    let mask = (1_u64 << bits) - 1;

    let value = match mode {
        PackingMode::Continuous => {
            let bit_index = index * bits as usize;
            let word = bit_index / 64;
            let offset = (bit_index % 64) as u32;

            let mut value = (words[word] as u64) >> offset;
            if offset + bits > 64 {
                value |= (words[word + 1] as u64) << (64 - offset);
            }
            value
        }
        PackingMode::Padded => {
            let per_word = 64 / bits as usize;
            let word = index / per_word;
            let offset = (index % per_word) as u32 * bits;
            (words[word] as u64) >> offset
        }
    };

    (value & mask) as u32
}

/// A validated view over a packed long array.
#[derive(Clone, Copy, Debug)]
pub struct PackedArray<'a> {
    words: &'a [i64],
    bits: u32,
    len: usize,
    mode: PackingMode,
}

impl<'a> PackedArray<'a> {
    /// Validates that `words` can hold `len` entries of `bits` bits in one of
    /// the two layouts.
    pub fn new(words: &'a [i64], bits: u32, len: usize) -> Result<Self, ParseChunkError> {
        let corrupt = ParseChunkError::CorruptBitStream {
            words: words.len(),
            bits,
            entries: len,
        };

        if !(1..=32).contains(&bits) || words.is_empty() {
            return Err(corrupt);
        }

        let Some(mode) = PackingMode::detect(words.len(), bits, len) else {
            return Err(corrupt);
        };

        Ok(Self {
            words,
            bits,
            len,
            mode,
        })
    }

    pub fn mode(&self) -> PackingMode {
        self.mode
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        (index < self.len).then(|| get(self.words, self.bits, index, self.mode))
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len).map(|i| get(self.words, self.bits, i, self.mode))
    }
}

/// Packs `values` into longs using the given layout. Values wider than
/// `bits` are truncated.
pub fn pack(values: &[u32], bits: u32, mode: PackingMode) -> Vec<i64> {
    let mask = (1_u64 << bits) - 1;

    match mode {
        PackingMode::Continuous => {
            let mut words = vec![0_u64; continuous_len(bits, values.len())];
            for (i, &v) in values.iter().enumerate() {
                let v = u64::from(v) & mask;
                let bit_index = i * bits as usize;
                let word = bit_index / 64;
                let offset = (bit_index % 64) as u32;

                words[word] |= v << offset;
                if offset + bits > 64 {
                    words[word + 1] |= v >> (64 - offset);
                }
            }
            words.into_iter().map(|w| w as i64).collect()
        }
        PackingMode::Padded => {
            let per_word = 64 / bits as usize;
            let mut words = vec![0_u64; padded_len(bits, values.len())];
            for (i, &v) in values.iter().enumerate() {
                let offset = (i % per_word) as u32 * bits;
                words[i / per_word] |= (u64::from(v) & mask) << offset;
            }
            words.into_iter().map(|w| w as i64).collect()
        }
    }
}
