//! The tile store: typed CRUD over a provider.
//!
//! Thin layer translating between in-memory [`Tile`]s and provider byte
//! images. `Empty` is recovered here (an empty store has an implicit
//! empty tile 0); everything else propagates.

use tracing::debug;

use cairn_core::Result;

use crate::config::TileConfig;
use crate::provider::{TileProvider, Version};
use crate::tile::Tile;

/// Tile-level store over a [`TileProvider`].
pub struct TileStore<P> {
    cfg: TileConfig,
    provider: P,
}

impl<P: TileProvider> TileStore<P> {
    /// Create a store.
    pub fn new(cfg: TileConfig, provider: P) -> Self {
        Self { cfg, provider }
    }

    /// The store's configuration.
    pub fn config(&self) -> TileConfig {
        self.cfg
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Load the head (highest-id) tile.
    ///
    /// An empty store yields a fresh empty tile 0 with no version: the
    /// log's append path is uniform from the very first leaf.
    pub fn head(&self) -> Result<(Tile, Option<Version>)> {
        match self.provider.read_head() {
            Ok((image, version)) => Ok((Tile::load(self.cfg, &image)?, Some(version))),
            Err(e) if e.is_empty_store() => Ok((Tile::new(self.cfg), None)),
            Err(e) => Err(e),
        }
    }

    /// Load a tile by id.
    pub fn get(&self, id: u64) -> Result<(Tile, Version)> {
        let (image, version) = self.provider.read_tile(id)?;
        Ok((Tile::load(self.cfg, &image)?, version))
    }

    /// Create the in-memory successor of a full tile. No I/O happens
    /// until the successor is committed.
    pub fn create(&self, parent: &Tile) -> Result<Tile> {
        Tile::create(self.cfg, parent)
    }

    /// Persist a tile: create when no version was observed, replace
    /// otherwise. Empty tiles are skipped without I/O.
    pub fn commit(&self, tile: &Tile, version: Option<Version>) -> Result<()> {
        if tile.is_empty() {
            return Ok(());
        }
        let image = tile.image();
        match version {
            None => self.provider.create_tile(tile.id(), image)?,
            Some(v) => self.provider.replace_tile(tile.id(), v, image)?,
        }
        debug!(
            id = tile.id(),
            nodes = tile.node_count(),
            replace = version.is_some(),
            "committed tile"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::hash;

    use crate::provider::MemoryProvider;

    fn store(h: u8) -> TileStore<MemoryProvider> {
        TileStore::new(TileConfig::new(h).unwrap(), MemoryProvider::new())
    }

    #[test]
    fn test_head_of_empty_store() {
        let store = store(1);
        let (tile, version) = store.head().unwrap();
        assert_eq!(tile.id(), 0);
        assert!(tile.is_empty());
        assert!(version.is_none());
    }

    #[test]
    fn test_commit_skips_empty_tile() {
        let store = store(1);
        let (tile, version) = store.head().unwrap();
        store.commit(&tile, version).unwrap();
        assert_eq!(store.provider().tile_count(), 0);
    }

    #[test]
    fn test_commit_and_reload() {
        let store = store(1);
        let (mut tile, version) = store.head().unwrap();
        tile.append_leaf(hash(b"a")).unwrap();
        store.commit(&tile, version).unwrap();

        let (loaded, v) = store.get(0).unwrap();
        assert_eq!(v, 0);
        assert_eq!(loaded.node_count(), 1);
        assert_eq!(loaded.get(0).unwrap(), tile.get(0).unwrap());
    }

    #[test]
    fn test_commit_replace_bumps_version() {
        let store = store(1);
        let (mut tile, version) = store.head().unwrap();
        tile.append_leaf(hash(b"a")).unwrap();
        store.commit(&tile, version).unwrap();

        let (mut tile, version) = store.head().unwrap();
        tile.append_leaf(hash(b"b")).unwrap();
        store.commit(&tile, Some(version.unwrap())).unwrap();

        assert_eq!(store.provider().version(0), Some(1));
    }

    #[test]
    fn test_stale_commit_is_refused() {
        let store = store(1);
        let (mut tile, _) = store.head().unwrap();
        tile.append_leaf(hash(b"a")).unwrap();
        store.commit(&tile, None).unwrap();

        // Two writers load the same state.
        let (mut w1, v1) = store.get(0).unwrap();
        let (mut w2, v2) = store.get(0).unwrap();
        w1.append_leaf(hash(b"b1")).unwrap();
        w2.append_leaf(hash(b"b2")).unwrap();

        store.commit(&w1, Some(v1)).unwrap();
        let err = store.commit(&w2, Some(v2)).unwrap_err();
        assert!(err.is_changed());
    }
}
