//! The tile: a fixed-shape slice of the MMR node array.
//!
//! Byte layout of a tile image (fields are 32 bytes wide):
//!
//! ```text
//! offset        length          content
//! 0             16              zero (reserved)
//! 16            8               tile_height (big-endian u64)
//! 24            8               id (big-endian u64)
//! 32            64 * 32         ancestor peak slots (unused slots zero)
//! 32 + 64*32    n * 32          node hashes, packed by (i - first_index)
//! ```
//!
//! Besides its own node range, a tile carries the peaks of the MMR state
//! just before its first node. Those are exactly the nodes an inclusion
//! path starting inside the tile can reach before leaving it, which makes
//! a single tile self-contained for proving any node it owns.

use std::collections::HashMap;

use cairn_core::{Error, Hash, Result};
use cairn_mmr::index::{index_height, peaks};
use cairn_mmr::{add_leaf_hash, NodeAdder};

use crate::config::TileConfig;

const FIELD: usize = TileConfig::FIELD_WIDTH;

/// An in-memory tile.
///
/// Owns a fully-allocated work buffer so appends never reallocate; the
/// persisted image is the buffer cropped to [`Tile::used_bytes`].
#[derive(Clone, Debug)]
pub struct Tile {
    cfg: TileConfig,
    id: u64,
    first_index: u64,
    last_leaf_index: u64,
    next_index: u64,
    data: Vec<u8>,
    ancestor_peaks: HashMap<u64, Hash>,
}

impl Tile {
    /// Create the empty first tile.
    pub fn new(cfg: TileConfig) -> Self {
        let mut data = vec![0u8; cfg.max_tile_bytes(0)];
        write_header(&mut data, cfg.tile_height(), 0);
        Self {
            cfg,
            id: 0,
            first_index: 0,
            last_leaf_index: cfg.last_leaf_index(0),
            next_index: 0,
            data,
            ancestor_peaks: HashMap::new(),
        }
    }

    /// Create the empty successor of a full `parent`, seeding the peak
    /// slots from the parent's closing peak stack.
    pub fn create(cfg: TileConfig, parent: &Tile) -> Result<Self> {
        let id = parent.id + 1;
        let first_index = cfg.first_index(id);
        if parent.next_index != first_index {
            return Err(Error::invariant_violated(format!(
                "tile {} spawned from unfilled tile {} (next {}, want {})",
                id, parent.id, parent.next_index, first_index
            )));
        }

        let mut data = vec![0u8; cfg.max_tile_bytes(id)];
        write_header(&mut data, cfg.tile_height(), id);

        let stack = parent.next_peak_stack();
        data[FIELD..FIELD + stack.len()].copy_from_slice(&stack);

        let ancestor_peaks = read_ancestor_peaks(cfg, id, &data);
        Ok(Self {
            cfg,
            id,
            first_index,
            last_leaf_index: cfg.last_leaf_index(id),
            next_index: first_index,
            data,
            ancestor_peaks,
        })
    }

    /// Load a tile from its persisted image.
    ///
    /// The image is copied into a fully-allocated work buffer so further
    /// appends need no reallocation.
    pub fn load(cfg: TileConfig, image: &[u8]) -> Result<Self> {
        if image.len() < TileConfig::NODES_START + FIELD {
            return Err(Error::storage(format!(
                "tile image truncated at {} bytes",
                image.len()
            )));
        }
        let node_bytes = image.len() - TileConfig::NODES_START;
        if node_bytes % FIELD != 0 {
            return Err(Error::storage(format!(
                "tile image has ragged node region of {} bytes",
                node_bytes
            )));
        }

        let stored_height = read_header_word(image, 0);
        let id = read_header_word(image, 1);
        if stored_height != u64::from(cfg.tile_height()) {
            return Err(Error::tile_height_mismatch(
                stored_height,
                u64::from(cfg.tile_height()),
            ));
        }

        let node_count = (node_bytes / FIELD) as u64;
        if node_count > cfg.node_capacity(id) {
            return Err(Error::storage(format!(
                "tile {} image holds {} nodes, capacity {}",
                id,
                node_count,
                cfg.node_capacity(id)
            )));
        }

        let first_index = cfg.first_index(id);
        let mut data = vec![0u8; cfg.max_tile_bytes(id)];
        data[..image.len()].copy_from_slice(image);

        let ancestor_peaks = read_ancestor_peaks(cfg, id, &data);
        Ok(Self {
            cfg,
            id,
            first_index,
            last_leaf_index: cfg.last_leaf_index(id),
            next_index: first_index + node_count,
            data,
            ancestor_peaks,
        })
    }

    /// Tile identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// First MMR index this tile owns.
    pub fn first_index(&self) -> u64 {
        self.first_index
    }

    /// MMR index of this tile's last leaf when full.
    pub fn last_leaf_index(&self) -> u64 {
        self.last_leaf_index
    }

    /// Next free MMR index.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Whether the tile holds no nodes. Empty tiles are never persisted.
    pub fn is_empty(&self) -> bool {
        self.next_index == self.first_index
    }

    /// Nodes currently held.
    pub fn node_count(&self) -> u64 {
        self.next_index - self.first_index
    }

    /// The carried ancestor peaks, keyed by MMR index.
    pub fn ancestor_peaks(&self) -> &HashMap<u64, Hash> {
        &self.ancestor_peaks
    }

    /// The configuration this tile was shaped by.
    pub fn config(&self) -> TileConfig {
        self.cfg
    }

    /// Bytes of the persistable image: header, peak slots, and the nodes
    /// appended so far. Zero for an empty tile.
    pub fn used_bytes(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            TileConfig::NODES_START + self.node_count() as usize * FIELD
        }
    }

    /// The croppable image for persistence.
    pub fn image(&self) -> &[u8] {
        &self.data[..self.used_bytes()]
    }

    /// Add a leaf hash, along with every interior node it completes.
    ///
    /// Fails with `TileFull` once all of the tile's leaf slots are taken;
    /// interior risers that follow the final leaf always fit by
    /// construction.
    pub fn append_leaf(&mut self, f: Hash) -> Result<u64> {
        if self.next_index > self.last_leaf_index {
            return Err(Error::tile_full(self.id));
        }
        add_leaf_hash(self, f)
    }

    /// Read the node at MMR index `i`: from the node slots if owned, from
    /// the ancestor peak map if it precedes the tile.
    pub fn get(&self, i: u64) -> Result<Hash> {
        if i < self.first_index {
            return self.ancestor_peaks.get(&i).copied().ok_or_else(|| {
                Error::index_out_of_range(i, format!("tile {}: not a carried ancestor peak", self.id))
            });
        }
        if i >= self.next_index {
            return Err(Error::index_out_of_range(
                i,
                format!("tile {} next index is {}", self.id, self.next_index),
            ));
        }
        let start = TileConfig::NODES_START + (i - self.first_index) as usize * FIELD;
        Ok(Hash::from_slice(&self.data[start..start + FIELD]).expect("slot is hash-sized"))
    }

    /// The peak stack seeding this tile's successor.
    ///
    /// Tile ids are leaf indices of an MMR one tile-height up, so the
    /// carried-peak arithmetic is the leaf arithmetic of that smaller
    /// range: `popcount(id)` peaks are carried here, `trailing_zeros(id+1)`
    /// of them merge under this tile's closing peak and are discarded, and
    /// the closing peak (this tile's last node) is pushed.
    ///
    /// # Panics
    ///
    /// Panics if the tile holds no nodes; only a closed (full) tile has a
    /// peak stack to hand on.
    pub fn next_peak_stack(&self) -> Vec<u8> {
        assert!(!self.is_empty(), "empty tile has no peak stack");
        let carried = u64::from(self.id.count_ones());
        let discard = u64::from((self.id + 1).trailing_zeros());
        let keep = (carried - discard) as usize;

        let mut stack = Vec::with_capacity((keep + 1) * FIELD);
        stack.extend_from_slice(&self.data[FIELD..FIELD + keep * FIELD]);

        let last = TileConfig::NODES_START + (self.node_count() as usize - 1) * FIELD;
        stack.extend_from_slice(&self.data[last..last + FIELD]);
        stack
    }
}

impl NodeAdder for Tile {
    fn append(&mut self, node: Hash) -> Result<u64> {
        let slot = self.next_index - self.first_index;
        if slot >= self.cfg.node_capacity(self.id) {
            return Err(Error::invariant_violated(format!(
                "tile {} node region overflow at slot {}",
                self.id, slot
            )));
        }
        let start = TileConfig::NODES_START + slot as usize * FIELD;
        self.data[start..start + FIELD].copy_from_slice(node.as_bytes());
        self.next_index += 1;
        Ok(self.next_index)
    }

    fn get(&self, i: u64) -> Result<Hash> {
        Tile::get(self, i)
    }
}

fn write_header(data: &mut [u8], tile_height: u8, id: u64) {
    data[FIELD - 16..FIELD - 8].copy_from_slice(&u64::from(tile_height).to_be_bytes());
    data[FIELD - 8..FIELD].copy_from_slice(&id.to_be_bytes());
}

/// Header words sit at the tail of the first field: word 0 is the tile
/// height, word 1 the id.
fn read_header_word(data: &[u8], word: usize) -> u64 {
    let start = FIELD - 16 + word * 8;
    u64::from_be_bytes(data[start..start + 8].try_into().expect("8-byte header word"))
}

/// Build the ancestor-peak map from the peak-slot region.
///
/// The qualifying peaks of `MMR(first_index - 1)` are those of height at
/// least `tile_height - 1`: an inclusion path ending below that height
/// never leaves the tile, so shorter peaks are not retained. Slots are
/// assigned in peak order (descending height).
fn read_ancestor_peaks(cfg: TileConfig, id: u64, data: &[u8]) -> HashMap<u64, Hash> {
    let mut map = HashMap::new();
    if id == 0 {
        return map;
    }
    let first_index = cfg.first_index(id);
    let mut rank = 0usize;
    for p in peaks(first_index - 1) {
        if index_height(p) + 1 < u32::from(cfg.tile_height()) {
            continue;
        }
        let start = FIELD + rank * FIELD;
        let value = Hash::from_slice(&data[start..start + FIELD]).expect("slot is hash-sized");
        map.insert(p, value);
        rank += 1;
    }
    map
}
