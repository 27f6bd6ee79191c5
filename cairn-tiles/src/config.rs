//! Tile geometry.
//!
//! A tile of height `H` owns `2^H` leaves plus every interior node whose
//! addition those leaves trigger, so tile `id` spans the node range
//! `[mmr_index(id * 2^H), mmr_index((id + 1) * 2^H))`. All geometry is a
//! pure function of `(tile_height, id)` and lives here.

use cairn_core::{Error, Hash, Result};
use cairn_mmr::index::{leaf_index, mmr_index};

/// Configuration for a tiled log.
///
/// The field width and hash size are pinned to 32 bytes; the only free
/// parameter is the tile height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    tile_height: u8,
}

impl TileConfig {
    /// Width of one storage field in bytes, equal to the hash size.
    pub const FIELD_WIDTH: usize = Hash::SIZE;

    /// Ancestor-peak slots per tile: the most peaks a 2^64-bounded MMR
    /// can have.
    pub const PEAK_SLOTS: usize = 64;

    /// Byte offset of the node-slot region (header field + peak slots).
    pub const NODES_START: usize = Self::FIELD_WIDTH * (1 + Self::PEAK_SLOTS);

    /// Create a config, validating `tile_height` fits the index domain.
    pub fn new(tile_height: u8) -> Result<Self> {
        if tile_height > 63 {
            return Err(Error::invalid_config(format!(
                "tile height {} exceeds 63",
                tile_height
            )));
        }
        Ok(Self { tile_height })
    }

    /// The configured tile height.
    pub fn tile_height(&self) -> u8 {
        self.tile_height
    }

    /// Leaves held by one full tile.
    pub fn leaves_per_tile(&self) -> u64 {
        1u64 << self.tile_height
    }

    /// First MMR index owned by tile `id`.
    pub fn first_index(&self, id: u64) -> u64 {
        mmr_index(id * self.leaves_per_tile())
    }

    /// MMR index of tile `id`'s last leaf when full.
    pub fn last_leaf_index(&self, id: u64) -> u64 {
        mmr_index((id + 1) * self.leaves_per_tile() - 1)
    }

    /// Node slots tile `id` holds when full: its leaves plus the interior
    /// nodes that rise before the next tile's first leaf.
    pub fn node_capacity(&self, id: u64) -> u64 {
        self.first_index(id + 1) - self.first_index(id)
    }

    /// Full byte size of tile `id`'s image.
    pub fn max_tile_bytes(&self, id: u64) -> usize {
        Self::NODES_START + self.node_capacity(id) as usize * Self::FIELD_WIDTH
    }

    /// Id of the tile physically holding node `i`.
    ///
    /// Interior nodes live in the tile of the leaf whose addition created
    /// them, so routing goes through the owning leaf index.
    pub fn tile_index_of(&self, i: u64) -> u64 {
        leaf_index(i) / self.leaves_per_tile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_oversized_height() {
        assert!(TileConfig::new(64).is_err());
        assert!(TileConfig::new(63).is_ok());
        assert!(TileConfig::new(0).is_ok());
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(TileConfig::FIELD_WIDTH, 32);
        assert_eq!(TileConfig::NODES_START, 32 + 64 * 32);
    }

    #[test]
    fn test_geometry_height_one() {
        let cfg = TileConfig::new(1).unwrap();
        assert_eq!(cfg.leaves_per_tile(), 2);
        assert_eq!(cfg.first_index(0), 0);
        assert_eq!(cfg.first_index(1), 3);
        assert_eq!(cfg.first_index(2), 7);
        assert_eq!(cfg.first_index(4), 15);
        assert_eq!(cfg.last_leaf_index(0), 1);
        assert_eq!(cfg.last_leaf_index(4), 16);
        // Tile 3 closes the 8-leaf peak, so it carries extra risers.
        assert_eq!(cfg.node_capacity(0), 3);
        assert_eq!(cfg.node_capacity(1), 4);
        assert_eq!(cfg.node_capacity(3), 5);
    }

    #[test]
    fn test_tile_index_of_covers_all_nodes() {
        // Every node routes to the tile whose range contains it.
        for h in 0u8..4 {
            let cfg = TileConfig::new(h).unwrap();
            for i in 0..500u64 {
                let id = cfg.tile_index_of(i);
                assert!(cfg.first_index(id) <= i, "node {} tile {}", i, id);
                assert!(i < cfg.first_index(id + 1), "node {} tile {}", i, id);
            }
        }
    }

    #[test]
    fn test_capacity_sums_to_range() {
        let cfg = TileConfig::new(2).unwrap();
        let mut total = 0u64;
        for id in 0..32u64 {
            total += cfg.node_capacity(id);
        }
        assert_eq!(total, cfg.first_index(32));
    }
}
