//! Storage provider contract and bundled realizations.
//!
//! A provider maps tile ids to persisted byte images under optimistic
//! concurrency: every read returns a version token, and a replace must
//! present the token it read. Two writers racing to extend the same tile
//! see one succeed; the loser receives `Changed` and rebases.
//!
//! A relational single-table store (conditional update on `(id, version)`)
//! is the expected production realization. The bundled providers cover
//! tests, tooling and embedded use.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use cairn_core::{Error, Result};

/// Opaque optimistic-concurrency token. Starts at 0 on create and
/// increments on every replace.
pub type Version = u64;

/// Tile-image storage with compare-and-swap semantics.
pub trait TileProvider {
    /// Read a tile image and its current version.
    fn read_tile(&self, id: u64) -> Result<(Vec<u8>, Version)>;

    /// Read the image and version of the highest-id tile.
    fn read_head(&self) -> Result<(Vec<u8>, Version)>;

    /// Store a new tile. Fails with `Exists` if the id is present.
    fn create_tile(&self, id: u64, image: &[u8]) -> Result<()>;

    /// Replace a tile at the given version. Fails with `Changed` if the
    /// stored version differs.
    fn replace_tile(&self, id: u64, version: Version, image: &[u8]) -> Result<()>;
}

/// Providers hand out shared access, so a borrowed provider is itself a
/// provider; this is what lets several writers race over one store.
impl<P: TileProvider + ?Sized> TileProvider for &P {
    fn read_tile(&self, id: u64) -> Result<(Vec<u8>, Version)> {
        (**self).read_tile(id)
    }

    fn read_head(&self) -> Result<(Vec<u8>, Version)> {
        (**self).read_head()
    }

    fn create_tile(&self, id: u64, image: &[u8]) -> Result<()> {
        (**self).create_tile(id, image)
    }

    fn replace_tile(&self, id: u64, version: Version, image: &[u8]) -> Result<()> {
        (**self).replace_tile(id, version, image)
    }
}

// ============================================================================
// In-memory provider
// ============================================================================

/// In-memory provider (for testing and benchmarks).
#[derive(Default)]
pub struct MemoryProvider {
    tiles: RwLock<BTreeMap<u64, (Vec<u8>, Version)>>,
}

impl MemoryProvider {
    /// Create a new empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.read().len()
    }

    /// Current version of a tile, if present.
    pub fn version(&self, id: u64) -> Option<Version> {
        self.tiles.read().get(&id).map(|(_, v)| *v)
    }
}

impl TileProvider for MemoryProvider {
    fn read_tile(&self, id: u64) -> Result<(Vec<u8>, Version)> {
        self.tiles
            .read()
            .get(&id)
            .map(|(bytes, v)| (bytes.clone(), *v))
            .ok_or_else(|| Error::tile_not_found(id))
    }

    fn read_head(&self) -> Result<(Vec<u8>, Version)> {
        self.tiles
            .read()
            .last_key_value()
            .map(|(_, (bytes, v))| (bytes.clone(), *v))
            .ok_or_else(Error::empty)
    }

    fn create_tile(&self, id: u64, image: &[u8]) -> Result<()> {
        let mut tiles = self.tiles.write();
        if tiles.contains_key(&id) {
            return Err(Error::tile_exists(id));
        }
        tiles.insert(id, (image.to_vec(), 0));
        Ok(())
    }

    fn replace_tile(&self, id: u64, version: Version, image: &[u8]) -> Result<()> {
        let mut tiles = self.tiles.write();
        let entry = tiles.get_mut(&id).ok_or_else(|| Error::tile_not_found(id))?;
        if entry.1 != version {
            return Err(Error::version_changed(id, version));
        }
        *entry = (image.to_vec(), version + 1);
        Ok(())
    }
}

// ============================================================================
// Filesystem provider
// ============================================================================

/// Filesystem provider: one image file per tile plus a JSON manifest of
/// version counters.
///
/// Image writes go through a temp file and rename. The manifest is the
/// commit point for versions; a single process arbitrates the
/// compare-and-swap through the in-process lock.
pub struct FsProvider {
    root: PathBuf,
    versions: RwLock<BTreeMap<u64, Version>>,
}

const MANIFEST: &str = "manifest.json";

impl FsProvider {
    /// Open or create a provider rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let manifest = root.join(MANIFEST);
        let versions = if manifest.exists() {
            serde_json::from_slice(&fs::read(&manifest)?)?
        } else {
            BTreeMap::new()
        };
        info!(path = %root.display(), tiles = versions.len(), "opened tile store");

        Ok(Self {
            root,
            versions: RwLock::new(versions),
        })
    }

    /// Open under a temporary directory (for testing).
    pub fn open_temp() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().to_path_buf();
        // Keep the temp dir alive by forgetting it (won't be cleaned up on drop)
        std::mem::forget(dir);
        Self::open(path)
    }

    fn tile_path(&self, id: u64) -> PathBuf {
        self.root.join(format!("{:016x}.tile", id))
    }

    fn write_image(&self, id: u64, image: &[u8]) -> Result<()> {
        let tmp = self.root.join(format!("{:016x}.tile.tmp", id));
        fs::write(&tmp, image)?;
        fs::rename(&tmp, self.tile_path(id))?;
        Ok(())
    }

    fn persist_manifest(&self, versions: &BTreeMap<u64, Version>) -> Result<()> {
        let tmp = self.root.join("manifest.json.tmp");
        fs::write(&tmp, serde_json::to_vec(versions)?)?;
        fs::rename(&tmp, self.root.join(MANIFEST))?;
        Ok(())
    }
}

impl TileProvider for FsProvider {
    fn read_tile(&self, id: u64) -> Result<(Vec<u8>, Version)> {
        let versions = self.versions.read();
        let version = *versions.get(&id).ok_or_else(|| Error::tile_not_found(id))?;
        let bytes = fs::read(self.tile_path(id))?;
        Ok((bytes, version))
    }

    fn read_head(&self) -> Result<(Vec<u8>, Version)> {
        let id = {
            let versions = self.versions.read();
            *versions.keys().next_back().ok_or_else(Error::empty)?
        };
        self.read_tile(id)
    }

    fn create_tile(&self, id: u64, image: &[u8]) -> Result<()> {
        let mut versions = self.versions.write();
        if versions.contains_key(&id) {
            return Err(Error::tile_exists(id));
        }
        self.write_image(id, image)?;
        versions.insert(id, 0);
        self.persist_manifest(&versions)?;
        debug!(id, bytes = image.len(), "created tile");
        Ok(())
    }

    fn replace_tile(&self, id: u64, version: Version, image: &[u8]) -> Result<()> {
        let mut versions = self.versions.write();
        let current = versions.get_mut(&id).ok_or_else(|| Error::tile_not_found(id))?;
        if *current != version {
            return Err(Error::version_changed(id, version));
        }
        self.write_image(id, image)?;
        *current = version + 1;
        self.persist_manifest(&versions)?;
        debug!(id, version = version + 1, bytes = image.len(), "replaced tile");
        Ok(())
    }
}
