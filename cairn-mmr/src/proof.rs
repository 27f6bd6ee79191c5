//! Inclusion and consistency proof machinery.
//!
//! Proofs are plain ordered lists of hashes. The verifier holds the node
//! index, the node value, and a (signed) accumulator for the state being
//! proven against; nothing else about the log is needed.

use serde::{Deserialize, Serialize};

use cairn_core::{hash_parent, Error, Hash, Result};

use crate::index::{index_height, leaf_count, peak_covering, peaks};

/// Replay `proof` against the value of node `i`, returning the root it
/// climbs to.
///
/// Each step mirrors the path-building height dance: a right child hashes
/// under the parent at `i + 1`, a left child under the parent one whole
/// subtree ahead. The input may be an interior node; that is what lets
/// inclusion replays compose into consistency proofs.
pub fn included_root(i: u64, value: &Hash, proof: &[Hash]) -> Hash {
    let mut root = *value;
    let mut i = i;
    let mut g = index_height(i);
    for sibling in proof {
        if index_height(i + 1) > g {
            // right child: parent is the next node
            i += 1;
            root = hash_parent(i, sibling, &root);
        } else {
            // left child: parent follows the sibling subtree
            i += 2u64 << g;
            root = hash_parent(i, &root, sibling);
        }
        g += 1;
    }
    root
}

/// Replay one inclusion proof per old peak and collapse the results.
///
/// Adjacent old peaks that hash together under one new peak replay to the
/// same root; duplicates are dropped so the output lines up with the new
/// accumulator. The result is the descending-height prefix of the new
/// accumulator that the old state pins down.
pub fn consistent_roots(
    from: u64,
    acc_from: &[Hash],
    proofs: &[Vec<Hash>],
) -> Result<Vec<Hash>> {
    let old_peaks = peaks(from);
    if acc_from.len() != old_peaks.len() {
        return Err(Error::invalid_proof(format!(
            "accumulator holds {} peaks, MMR({}) has {}",
            acc_from.len(),
            from,
            old_peaks.len()
        )));
    }
    if proofs.len() != old_peaks.len() {
        return Err(Error::invalid_proof(format!(
            "{} proof paths for {} old peaks",
            proofs.len(),
            old_peaks.len()
        )));
    }

    let mut roots: Vec<Hash> = Vec::with_capacity(old_peaks.len());
    for (k, &p) in old_peaks.iter().enumerate() {
        let root = included_root(p, &acc_from[k], &proofs[k]);
        if roots.last() != Some(&root) {
            roots.push(root);
        }
    }
    Ok(roots)
}

/// Self-describing inclusion proof payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Node index being proven (leaf or interior).
    pub index: u64,
    /// Complete-MMR index the proof reaches into.
    pub against: u64,
    /// Sibling values along the climb, in replay order.
    pub siblings: Vec<Hash>,
}

impl InclusionProof {
    /// Root reached by replaying this proof against `value`.
    pub fn root(&self, value: &Hash) -> Hash {
        included_root(self.index, value, &self.siblings)
    }

    /// Verify against the accumulator of `MMR(against)`.
    ///
    /// `accumulator` is the descending-height peak list; the replayed root
    /// must equal the peak covering `index`.
    pub fn verify(&self, value: &Hash, accumulator: &[Hash]) -> Result<bool> {
        let expected = peaks(self.against).len();
        if accumulator.len() != expected {
            return Err(Error::invalid_proof(format!(
                "accumulator holds {} peaks, MMR({}) has {}",
                accumulator.len(),
                self.against,
                expected
            )));
        }
        let (rank, _) = peak_covering(self.against, self.index).ok_or_else(|| {
            Error::invalid_proof(format!(
                "node {} is past MMR({})",
                self.index, self.against
            ))
        })?;
        Ok(self.root(value) == accumulator[rank])
    }
}

/// Self-describing consistency proof payload.
///
/// Relates two complete states: replaying each peak of `MMR(from)` along
/// its path must land on a prefix of `MMR(to)`'s accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyProof {
    /// The earlier complete-MMR index.
    pub from: u64,
    /// The later complete-MMR index.
    pub to: u64,
    /// One sibling path per peak of `MMR(from)`, in accumulator order.
    pub paths: Vec<Vec<Hash>>,
}

impl ConsistencyProof {
    /// Verify that `acc_to` extends `acc_from`.
    pub fn verify(&self, acc_from: &[Hash], acc_to: &[Hash]) -> Result<bool> {
        if self.to < self.from {
            return Err(Error::invalid_proof(format!(
                "from {} is past to {}",
                self.from, self.to
            )));
        }
        let new_peaks = peaks(self.to).len();
        if acc_to.len() != new_peaks {
            return Err(Error::invalid_proof(format!(
                "accumulator holds {} peaks, MMR({}) has {}",
                acc_to.len(),
                self.to,
                new_peaks
            )));
        }
        let roots = consistent_roots(self.from, acc_from, &self.paths)?;
        if roots.is_empty() || roots.len() > acc_to.len() {
            return Ok(false);
        }
        Ok(roots == acc_to[..roots.len()])
    }

    /// Number of old peaks this proof must carry paths for.
    pub fn expected_paths(&self) -> usize {
        leaf_count(self.from).count_ones() as usize
    }
}
