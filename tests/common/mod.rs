#![allow(dead_code)]

use ubgs_anvil::anvil::packed::{pack, PackingMode};
use valence_nbt::{compound, Compound, List, Value};

/// Packs one nibble per voxel, low nibble first.
pub fn nibbles(len: usize, value: impl Fn(usize) -> u8) -> Vec<i8> {
    (0..len / 2)
        .map(|b| ((value(b * 2) & 0xF) | ((value(b * 2 + 1) & 0xF) << 4)) as i8)
        .collect()
}

pub fn palette_entry(name: &str) -> Compound {
    compound! { "Name" => name }
}

/// A 1.18+ section with the given block palette and indices, packed at the
/// given layout.
pub fn modern_section(y: i8, names: &[&str], indices: Option<(&[u32], u32, PackingMode)>) -> Compound {
    let mut block_states = compound! {
        "palette" => List::Compound(names.iter().map(|n| palette_entry(n)).collect()),
    };
    if let Some((indices, bits, mode)) = indices {
        block_states.insert("data", Value::LongArray(pack(indices, bits, mode)));
    }

    compound! {
        "Y" => y,
        "block_states" => block_states,
        "biomes" => compound! {
            "palette" => List::String(vec!["minecraft:plains".to_owned()]),
        },
    }
}

pub fn modern_chunk(x: i32, z: i32, y_pos: i32, sections: Vec<Compound>) -> Compound {
    compound! {
        "DataVersion" => 3218,
        "xPos" => x,
        "zPos" => z,
        "yPos" => y_pos,
        "Status" => "minecraft:full",
        "sections" => List::Compound(sections),
        "block_entities" => List::Compound(vec![]),
    }
}

pub fn anvil_chunk(x: i32, z: i32, level: Compound) -> Compound {
    let mut level = level;
    level.insert("xPos", x);
    level.insert("zPos", z);
    compound! {
        "DataVersion" => 1343,
        "Level" => level,
    }
}
