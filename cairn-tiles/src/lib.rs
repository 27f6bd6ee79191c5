//! Tiled physical layout for the cairn MMR log.
//!
//! The MMR node array is cut into fixed-shape *tiles*: tile `id` owns the
//! `2^H` leaves starting at leaf `id * 2^H` plus every interior node their
//! addition completes, and carries the accumulator peaks preceding it so
//! any of its nodes can be proven from the tile alone. Tiles are the unit
//! of persistence and of optimistic concurrency.
//!
//! - [`config`] - tile geometry
//! - [`tile`] - the in-memory tile and its byte image
//! - [`provider`] - the versioned storage contract, with in-memory and
//!   filesystem realizations
//! - [`store`] - typed CRUD over a provider
//! - [`log`] - batch append, node reads, enumeration and proof building
//!
//! # Example
//!
//! ```rust
//! use cairn_core::hash;
//! use cairn_tiles::{MemoryProvider, TileConfig, TileLog};
//!
//! let cfg = TileConfig::new(1).unwrap();
//! let mut log = TileLog::new(cfg, MemoryProvider::new());
//!
//! let leaves: Vec<_> = (0u64..6).map(|n| hash(&n.to_be_bytes())).collect();
//! let receipt = log.append(&leaves).unwrap();
//! assert_eq!(receipt.head_id, 2);
//!
//! // Prove the first leaf against the final complete state.
//! let c = receipt.next_index - 1;
//! let proof = log.inclusion_proof(0, c).unwrap();
//! let accumulator = log.accumulator(c).unwrap();
//! assert!(proof.verify(&leaves[0], &accumulator).unwrap());
//! ```

pub mod config;
pub mod log;
pub mod provider;
pub mod store;
pub mod tile;

pub use config::TileConfig;
pub use log::{AppendReceipt, LeafRange, NodeRange, TileLog};
pub use provider::{FsProvider, MemoryProvider, TileProvider, Version};
pub use store::TileStore;
pub use tile::Tile;
