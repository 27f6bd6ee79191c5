//! The tile log: batch append, node reads and proof helpers.
//!
//! `TileLog` orchestrates appends across tile boundaries with the
//! commit/create discipline, answers node reads through a last-touched
//! tile cache, and builds inclusion and consistency proofs by walking the
//! algebra's paths against stored tiles.

use rayon::prelude::*;
use tracing::debug;

use cairn_core::{Error, Hash, Result};
use cairn_mmr::index::{
    complete_mmr, consistency_proof_paths, inclusion_proof_path, mmr_index, peaks,
};
use cairn_mmr::{ConsistencyProof, InclusionProof};

use crate::config::TileConfig;
use crate::provider::TileProvider;
use crate::store::TileStore;
use crate::tile::Tile;

/// Outcome of a batch append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Id of the head tile after the batch.
    pub head_id: u64,
    /// Next free MMR index after the batch.
    pub next_index: u64,
    /// Tiles written to the provider by this batch.
    pub tiles_committed: u64,
}

/// Append-only tiled MMR log over a [`TileProvider`].
pub struct TileLog<P> {
    store: TileStore<P>,
    last_touched: Option<Tile>,
}

impl<P: TileProvider> TileLog<P> {
    /// Create a log over a provider.
    pub fn new(cfg: TileConfig, provider: P) -> Self {
        Self {
            store: TileStore::new(cfg, provider),
            last_touched: None,
        }
    }

    /// The log's configuration.
    pub fn config(&self) -> TileConfig {
        self.store.config()
    }

    /// The underlying tile store.
    pub fn store(&self) -> &TileStore<P> {
        &self.store
    }

    /// Append a batch of leaf hashes.
    ///
    /// Tiles filled mid-batch are committed and become durable
    /// immediately; the open head tile is committed once at the end. A
    /// commit failure aborts the batch with the open tile discarded — the
    /// log on disk stays consistent at the last committed tile.
    pub fn append(&mut self, leaves: &[Hash]) -> Result<AppendReceipt> {
        let (mut adder, mut version) = self.store.head()?;
        if leaves.is_empty() {
            return Ok(AppendReceipt {
                head_id: adder.id(),
                next_index: adder.next_index(),
                tiles_committed: 0,
            });
        }

        let mut committed = 0u64;
        for &leaf in leaves {
            match adder.append_leaf(leaf) {
                Ok(_) => {}
                Err(e) if e.is_tile_full() => {
                    self.store.commit(&adder, version)?;
                    committed += 1;
                    adder = self.store.create(&adder)?;
                    version = None;
                    match adder.append_leaf(leaf) {
                        Ok(_) => {}
                        Err(e) if e.is_tile_full() => {
                            return Err(Error::invariant_violated(format!(
                                "fresh tile {} reported full",
                                adder.id()
                            )));
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }

        self.store.commit(&adder, version)?;
        committed += 1;

        let receipt = AppendReceipt {
            head_id: adder.id(),
            next_index: adder.next_index(),
            tiles_committed: committed,
        };
        debug!(
            leaves = leaves.len(),
            head = receipt.head_id,
            next = receipt.next_index,
            "appended batch"
        );
        self.last_touched = Some(adder);
        Ok(receipt)
    }

    /// Read the node at MMR index `i`.
    ///
    /// Proof access patterns are tile-local, so the last-touched tile
    /// answers most reads; on a miss the owning tile is fetched and
    /// becomes the new cache entry.
    pub fn get(&mut self, i: u64) -> Result<Hash> {
        if let Some(tile) = &self.last_touched {
            if let Ok(value) = tile.get(i) {
                return Ok(value);
            }
        }
        let tid = self.store.config().tile_index_of(i);
        let (tile, _) = self.store.get(tid)?;
        let value = tile.get(i);
        self.last_touched = Some(tile);
        value
    }

    /// Accumulator of `MMR(c)`: the peak values in descending height
    /// order.
    pub fn accumulator(&mut self, c: u64) -> Result<Vec<Hash>> {
        require_complete(c)?;
        peaks(c).iter().map(|&p| self.get(p)).collect()
    }

    /// Build an inclusion proof for node `i` against the complete state
    /// `c`.
    pub fn inclusion_proof(&mut self, i: u64, c: u64) -> Result<InclusionProof> {
        require_complete(c)?;
        if i > c {
            return Err(Error::invalid_proof(format!(
                "node {} is past MMR({})",
                i, c
            )));
        }
        let siblings = inclusion_proof_path(i, c)
            .iter()
            .map(|&s| self.get(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(InclusionProof {
            index: i,
            against: c,
            siblings,
        })
    }

    /// Build inclusion proofs for many nodes against one complete state.
    ///
    /// Reads go straight through the store (no shared cache), so larger
    /// batches parallelize across tiles.
    pub fn inclusion_proofs(&self, indices: &[u64], c: u64) -> Result<Vec<InclusionProof>>
    where
        P: Sync,
    {
        require_complete(c)?;

        let build = |&i: &u64| -> Result<InclusionProof> {
            if i > c {
                return Err(Error::invalid_proof(format!(
                    "node {} is past MMR({})",
                    i, c
                )));
            }
            let mut cursor = Cursor::new(&self.store);
            let siblings = inclusion_proof_path(i, c)
                .iter()
                .map(|&s| cursor.get(s))
                .collect::<Result<Vec<_>>>()?;
            Ok(InclusionProof {
                index: i,
                against: c,
                siblings,
            })
        };

        // Small batches skip the thread overhead.
        if indices.len() < 16 {
            indices.iter().map(build).collect()
        } else {
            indices.par_iter().map(build).collect()
        }
    }

    /// Build a consistency proof between two complete states.
    pub fn consistency_proof(&mut self, from: u64, to: u64) -> Result<ConsistencyProof> {
        require_complete(from)?;
        require_complete(to)?;
        if to < from {
            return Err(Error::invalid_proof(format!(
                "from {} is past to {}",
                from, to
            )));
        }
        let paths = consistency_proof_paths(from, to)
            .iter()
            .map(|path| path.iter().map(|&s| self.get(s)).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;
        Ok(ConsistencyProof { from, to, paths })
    }

    /// Enumerate node hashes for MMR indices `first..=last`.
    ///
    /// Reads tiles through the store, bypassing the last-touched cache;
    /// call again to restart.
    pub fn enumerate_nodes(&self, first: u64, last: u64) -> NodeRange<'_, P> {
        NodeRange {
            cursor: Cursor::new(&self.store),
            next: first,
            last,
            done: first > last,
        }
    }

    /// Enumerate leaf hashes for leaf indices `first_leaf..=last_leaf`.
    pub fn enumerate_leaves(&self, first_leaf: u64, last_leaf: u64) -> LeafRange<'_, P> {
        LeafRange {
            cursor: Cursor::new(&self.store),
            next: first_leaf,
            last: last_leaf,
            done: first_leaf > last_leaf,
        }
    }
}

fn require_complete(c: u64) -> Result<()> {
    if complete_mmr(c) != c {
        return Err(Error::invalid_proof(format!(
            "MMR({}) is not complete",
            c
        )));
    }
    Ok(())
}

/// Store-backed node reader with a one-tile cache.
struct Cursor<'a, P> {
    store: &'a TileStore<P>,
    tile: Option<Tile>,
}

impl<'a, P: TileProvider> Cursor<'a, P> {
    fn new(store: &'a TileStore<P>) -> Self {
        Self { store, tile: None }
    }

    fn get(&mut self, i: u64) -> Result<Hash> {
        if let Some(tile) = &self.tile {
            if let Ok(value) = tile.get(i) {
                return Ok(value);
            }
        }
        let tid = self.store.config().tile_index_of(i);
        let (tile, _) = self.store.get(tid)?;
        let value = tile.get(i);
        self.tile = Some(tile);
        value
    }
}

/// Lazy ascending sequence of node hashes. See
/// [`TileLog::enumerate_nodes`].
pub struct NodeRange<'a, P> {
    cursor: Cursor<'a, P>,
    next: u64,
    last: u64,
    done: bool,
}

impl<P: TileProvider> Iterator for NodeRange<'_, P> {
    type Item = Result<Hash>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.cursor.get(self.next);
        if item.is_err() || self.next == self.last {
            self.done = true;
        }
        self.next += 1;
        Some(item)
    }
}

/// Lazy ascending sequence of leaf hashes. See
/// [`TileLog::enumerate_leaves`].
pub struct LeafRange<'a, P> {
    cursor: Cursor<'a, P>,
    next: u64,
    last: u64,
    done: bool,
}

impl<P: TileProvider> Iterator for LeafRange<'_, P> {
    type Item = Result<Hash>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.cursor.get(mmr_index(self.next));
        if item.is_err() || self.next == self.last {
            self.done = true;
        }
        self.next += 1;
        Some(item)
    }
}
