//! Merkle Mountain Range index algebra and proofs.
//!
//! An MMR is an append-only authenticated structure: a sequence of perfect
//! binary trees ("mountains") of strictly decreasing height. This crate
//! holds the pure layer of cairn:
//!
//! - [`index`] - the node-positioning algebra over 64-bit indices
//! - [`add`] - the two-method adder capability and the add-leaf-hash
//!   procedure that drives it
//! - [`proof`] - inclusion and consistency proof replay
//!
//! Everything here is independent of how nodes are stored; the tile layer
//! builds on these same functions.
//!
//! # Example
//!
//! ```rust
//! use cairn_core::hash;
//! use cairn_mmr::{InclusionProof, MemAdder, NodeAdder};
//! use cairn_mmr::index::{inclusion_proof_path, peaks};
//!
//! let mut adder = MemAdder::new();
//! for word in ["cumulus", "stratus", "cirrus"] {
//!     adder.add_leaf(hash(word.as_bytes())).unwrap();
//! }
//!
//! // Prove the first leaf against the final state.
//! let c = adder.size() - 1;
//! let proof = InclusionProof {
//!     index: 0,
//!     against: c,
//!     siblings: inclusion_proof_path(0, c)
//!         .iter()
//!         .map(|&s| adder.get(s).unwrap())
//!         .collect(),
//! };
//! let accumulator: Vec<_> = peaks(c).iter().map(|&p| adder.get(p).unwrap()).collect();
//! assert!(proof.verify(&adder.get(0).unwrap(), &accumulator).unwrap());
//! ```

pub mod add;
pub mod index;
pub mod proof;

#[cfg(test)]
mod proptest;

pub use add::{add_leaf_hash, MemAdder, NodeAdder};
pub use proof::{consistent_roots, included_root, ConsistencyProof, InclusionProof};
