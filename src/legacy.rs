//! Numeric block and biome ids used before the 1.13 flattening.
//!
//! The tables are read-only. [`LegacyTables::vanilla`] builds the vanilla set
//! once per process and hands out a shared reference, which decoders borrow
//! for the duration of a decode call.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Block names indexed by pre-flattening numeric id. Names are the 1.12
/// registry names.
const VANILLA_BLOCKS: [&str; 256] = [
    "air", "stone", "grass", "dirt", "cobblestone", "planks", "sapling", "bedrock",
    "flowing_water", "water", "flowing_lava", "lava", "sand", "gravel", "gold_ore", "iron_ore",
    "coal_ore", "log", "leaves", "sponge", "glass", "lapis_ore", "lapis_block", "dispenser",
    "sandstone", "noteblock", "bed", "golden_rail", "detector_rail", "sticky_piston", "web",
    "tallgrass", "deadbush", "piston", "piston_head", "wool", "piston_extension",
    "yellow_flower", "red_flower", "brown_mushroom", "red_mushroom", "gold_block",
    "iron_block", "double_stone_slab", "stone_slab", "brick_block", "tnt", "bookshelf",
    "mossy_cobblestone", "obsidian", "torch", "fire", "mob_spawner", "oak_stairs", "chest",
    "redstone_wire", "diamond_ore", "diamond_block", "crafting_table", "wheat", "farmland",
    "furnace", "lit_furnace", "standing_sign", "wooden_door", "ladder", "rail", "stone_stairs",
    "wall_sign", "lever", "stone_pressure_plate", "iron_door", "wooden_pressure_plate",
    "redstone_ore", "lit_redstone_ore", "unlit_redstone_torch", "redstone_torch",
    "stone_button", "snow_layer", "ice", "snow", "cactus", "clay", "reeds", "jukebox", "fence",
    "pumpkin", "netherrack", "soul_sand", "glowstone", "portal", "lit_pumpkin", "cake",
    "unpowered_repeater", "powered_repeater", "stained_glass", "trapdoor", "monster_egg",
    "stonebrick", "brown_mushroom_block", "red_mushroom_block", "iron_bars", "glass_pane",
    "melon_block", "pumpkin_stem", "melon_stem", "vine", "fence_gate", "brick_stairs",
    "stone_brick_stairs", "mycelium", "waterlily", "nether_brick", "nether_brick_fence",
    "nether_brick_stairs", "nether_wart", "enchanting_table", "brewing_stand", "cauldron",
    "end_portal", "end_portal_frame", "end_stone", "dragon_egg", "redstone_lamp",
    "lit_redstone_lamp", "double_wooden_slab", "wooden_slab", "cocoa", "sandstone_stairs",
    "emerald_ore", "ender_chest", "tripwire_hook", "tripwire", "emerald_block",
    "spruce_stairs", "birch_stairs", "jungle_stairs", "command_block", "beacon",
    "cobblestone_wall", "flower_pot", "carrots", "potatoes", "wooden_button", "skull", "anvil",
    "trapped_chest", "light_weighted_pressure_plate", "heavy_weighted_pressure_plate",
    "unpowered_comparator", "powered_comparator", "daylight_detector", "redstone_block",
    "quartz_ore", "hopper", "quartz_block", "quartz_stairs", "activator_rail", "dropper",
    "stained_hardened_clay", "stained_glass_pane", "leaves2", "log2", "acacia_stairs",
    "dark_oak_stairs", "slime", "barrier", "iron_trapdoor", "prismarine", "sea_lantern",
    "hay_block", "carpet", "hardened_clay", "coal_block", "packed_ice", "double_plant",
    "standing_banner", "wall_banner", "daylight_detector_inverted", "red_sandstone",
    "red_sandstone_stairs", "double_stone_slab2", "stone_slab2", "spruce_fence_gate",
    "birch_fence_gate", "jungle_fence_gate", "dark_oak_fence_gate", "acacia_fence_gate",
    "spruce_fence", "birch_fence", "jungle_fence", "dark_oak_fence", "acacia_fence",
    "spruce_door", "birch_door", "jungle_door", "acacia_door", "dark_oak_door", "end_rod",
    "chorus_plant", "chorus_flower", "purpur_block", "purpur_pillar", "purpur_stairs",
    "purpur_double_slab", "purpur_slab", "end_bricks", "beetroots", "grass_path",
    "end_gateway", "repeating_command_block", "chain_command_block", "frosted_ice", "magma",
    "nether_wart_block", "red_nether_brick", "bone_block", "structure_void", "observer",
    "white_shulker_box", "orange_shulker_box", "magenta_shulker_box",
    "light_blue_shulker_box", "yellow_shulker_box", "lime_shulker_box", "pink_shulker_box",
    "gray_shulker_box", "silver_shulker_box", "cyan_shulker_box", "purple_shulker_box",
    "blue_shulker_box", "brown_shulker_box", "green_shulker_box", "red_shulker_box",
    "black_shulker_box", "white_glazed_terracotta", "orange_glazed_terracotta",
    "magenta_glazed_terracotta", "light_blue_glazed_terracotta", "yellow_glazed_terracotta",
    "lime_glazed_terracotta", "pink_glazed_terracotta", "gray_glazed_terracotta",
    "silver_glazed_terracotta", "cyan_glazed_terracotta", "purple_glazed_terracotta",
    "blue_glazed_terracotta", "brown_glazed_terracotta", "green_glazed_terracotta",
    "red_glazed_terracotta", "black_glazed_terracotta", "concrete", "concrete_powder", "",
    "", "structure_block",
];

/// Biome names by numeric id as stored in 1.2–1.17 `Biomes` arrays.
const VANILLA_BIOMES: &[(i32, &str)] = &[
    (0, "ocean"),
    (1, "plains"),
    (2, "desert"),
    (3, "mountains"),
    (4, "forest"),
    (5, "taiga"),
    (6, "swamp"),
    (7, "river"),
    (8, "nether_wastes"),
    (9, "the_end"),
    (10, "frozen_ocean"),
    (11, "frozen_river"),
    (12, "snowy_tundra"),
    (13, "snowy_mountains"),
    (14, "mushroom_fields"),
    (15, "mushroom_field_shore"),
    (16, "beach"),
    (17, "desert_hills"),
    (18, "wooded_hills"),
    (19, "taiga_hills"),
    (20, "mountain_edge"),
    (21, "jungle"),
    (22, "jungle_hills"),
    (23, "jungle_edge"),
    (24, "deep_ocean"),
    (25, "stone_shore"),
    (26, "snowy_beach"),
    (27, "birch_forest"),
    (28, "birch_forest_hills"),
    (29, "dark_forest"),
    (30, "snowy_taiga"),
    (31, "snowy_taiga_hills"),
    (32, "giant_tree_taiga"),
    (33, "giant_tree_taiga_hills"),
    (34, "wooded_mountains"),
    (35, "savanna"),
    (36, "savanna_plateau"),
    (37, "badlands"),
    (38, "wooded_badlands_plateau"),
    (39, "badlands_plateau"),
    (40, "small_end_islands"),
    (41, "end_midlands"),
    (42, "end_highlands"),
    (43, "end_barrens"),
    (44, "warm_ocean"),
    (45, "lukewarm_ocean"),
    (46, "cold_ocean"),
    (47, "deep_warm_ocean"),
    (48, "deep_lukewarm_ocean"),
    (49, "deep_cold_ocean"),
    (50, "deep_frozen_ocean"),
    (127, "the_void"),
    (129, "sunflower_plains"),
    (130, "desert_lakes"),
    (131, "gravelly_mountains"),
    (132, "flower_forest"),
    (133, "taiga_mountains"),
    (134, "swamp_hills"),
    (140, "ice_spikes"),
    (149, "modified_jungle"),
    (151, "modified_jungle_edge"),
    (155, "tall_birch_forest"),
    (156, "tall_birch_hills"),
    (157, "dark_forest_hills"),
    (158, "snowy_taiga_mountains"),
    (160, "giant_spruce_taiga"),
    (161, "giant_spruce_taiga_hills"),
    (162, "modified_gravelly_mountains"),
    (163, "shattered_savanna"),
    (164, "shattered_savanna_plateau"),
    (165, "eroded_badlands"),
    (166, "modified_wooded_badlands_plateau"),
    (167, "modified_badlands_plateau"),
    (168, "bamboo_jungle"),
    (169, "bamboo_jungle_hills"),
    (170, "soul_sand_valley"),
    (171, "crimson_forest"),
    (172, "warped_forest"),
    (173, "basalt_deltas"),
    (174, "dripstone_caves"),
    (175, "lush_caves"),
];

static VANILLA: Lazy<Arc<LegacyTables>> = Lazy::new(|| {
    Arc::new(LegacyTables::new(
        VANILLA_BLOCKS
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(id, name)| (id as u16, namespaced(name))),
        VANILLA_BIOMES
            .iter()
            .map(|&(id, name)| (id, namespaced(name))),
    ))
});

/// Lookup tables for numeric ids.
#[derive(Debug, Clone, Default)]
pub struct LegacyTables {
    blocks: HashMap<u16, Arc<str>>,
    block_ids: HashMap<Arc<str>, u16>,
    biomes: HashMap<i32, Arc<str>>,
}

impl LegacyTables {
    pub fn new<B, I>(blocks: B, biomes: I) -> Self
    where
        B: IntoIterator<Item = (u16, String)>,
        I: IntoIterator<Item = (i32, String)>,
    {
        let blocks: HashMap<u16, Arc<str>> = blocks
            .into_iter()
            .map(|(id, name)| (id, Arc::from(name)))
            .collect();
        let block_ids = blocks
            .iter()
            .map(|(&id, name)| (name.clone(), id))
            .collect();

        Self {
            blocks,
            block_ids,
            biomes: biomes
                .into_iter()
                .map(|(id, name)| (id, Arc::from(name)))
                .collect(),
        }
    }

    /// The vanilla tables, built on first use.
    pub fn vanilla() -> &'static LegacyTables {
        &VANILLA
    }

    /// The same vanilla tables, as a handle for threads that outlive a borrow.
    pub fn shared_vanilla() -> Arc<LegacyTables> {
        Arc::clone(&VANILLA)
    }

    pub fn block_name(&self, id: u16) -> Option<&Arc<str>> {
        self.blocks.get(&id)
    }

    /// Reverse lookup used to give paletted sections a numeric id.
    pub fn block_id(&self, name: &str) -> Option<u16> {
        self.block_ids.get(name).copied()
    }

    pub fn biome_name(&self, id: i32) -> Option<&Arc<str>> {
        self.biomes.get(&id)
    }
}

/// Prefixes `minecraft:` unless the id already names a namespace.
pub fn namespaced(name: &str) -> String {
    if name.contains(':') {
        name.to_owned()
    } else {
        format!("minecraft:{name}")
    }
}

/// Gets the path part of a resource identifier.
pub fn ident_path(ident: &str) -> &str {
    match ident.rsplit_once(':') {
        Some((_, after)) => after,
        None => ident,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanilla_block_ids() {
        let tables = LegacyTables::vanilla();
        assert_eq!(tables.block_name(0).map(|n| &**n), Some("minecraft:air"));
        assert_eq!(tables.block_name(1).map(|n| &**n), Some("minecraft:stone"));
        assert_eq!(tables.block_name(35).map(|n| &**n), Some("minecraft:wool"));
        assert_eq!(tables.block_name(95).map(|n| &**n), Some("minecraft:stained_glass"));
        assert_eq!(tables.block_name(218).map(|n| &**n), Some("minecraft:observer"));
        assert_eq!(
            tables.block_name(234).map(|n| &**n),
            Some("minecraft:black_shulker_box")
        );
        assert_eq!(
            tables.block_name(250).map(|n| &**n),
            Some("minecraft:black_glazed_terracotta")
        );
        assert_eq!(tables.block_name(252).map(|n| &**n), Some("minecraft:concrete_powder"));
        assert_eq!(tables.block_name(253), None);
        assert_eq!(tables.block_name(255).map(|n| &**n), Some("minecraft:structure_block"));
        assert_eq!(tables.block_name(4000), None);
    }

    #[test]
    fn reverse_lookup() {
        let tables = LegacyTables::vanilla();
        assert_eq!(tables.block_id("minecraft:stone"), Some(1));
        assert_eq!(tables.block_id("minecraft:hopper"), Some(154));
        assert_eq!(tables.block_id("minecraft:deepslate"), None);
    }

    #[test]
    fn vanilla_biomes() {
        let tables = LegacyTables::vanilla();
        assert_eq!(tables.biome_name(1).map(|n| &**n), Some("minecraft:plains"));
        assert_eq!(tables.biome_name(24).map(|n| &**n), Some("minecraft:deep_ocean"));
        assert_eq!(tables.biome_name(140).map(|n| &**n), Some("minecraft:ice_spikes"));
        assert_eq!(tables.biome_name(-1), None);
    }

    #[test]
    fn namespacing() {
        assert_eq!(namespaced("stone"), "minecraft:stone");
        assert_eq!(namespaced("mod:thing"), "mod:thing");
        assert_eq!(ident_path("minecraft:stone"), "stone");
        assert_eq!(ident_path("stone"), "stone");
    }
}
