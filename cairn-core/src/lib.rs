//! Cairn Core - Fundamental types for the cairn tiled MMR log.
//!
//! This crate provides the types shared by every layer of the system:
//!
//! - [`crypto`] - SHA-256 hashing, including the position-bound interior
//!   node hash
//! - [`error`] - Structured errors with stable codes
//!
//! # Example
//!
//! ```rust
//! use cairn_core::{hash, hash_parent};
//!
//! let left = hash(b"first entry");
//! let right = hash(b"second entry");
//!
//! // The parent of nodes 0 and 1 lands at node index 2.
//! let parent = hash_parent(2, &left, &right);
//! assert_ne!(parent, hash_parent(5, &left, &right));
//! ```

pub mod crypto;
pub mod error;

// Re-exports for convenience
pub use crypto::{hash, hash_parent, Hash};
pub use error::{Error, ErrorCode, Result};
