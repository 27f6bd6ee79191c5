//! Property-based tests for the MMR algebra and proof machinery.
//!
//! Tests invariants of the index algebra and of proof replay under
//! arbitrary leaf sequences.

use proptest::prelude::*;

use cairn_core::{hash, Hash};

use crate::add::{MemAdder, NodeAdder};
use crate::index::{
    complete_mmr, consistency_proof_paths, inclusion_proof_path, index_height, leaf_count,
    leaf_index, mmr_index, peaks,
};
use crate::proof::{consistent_roots, included_root, InclusionProof};

// ============================================================================
// Arbitrary Implementations
// ============================================================================

/// Generate arbitrary hash values (simulating leaf data).
fn arb_hash() -> impl Strategy<Value = Hash> {
    prop::array::uniform32(any::<u8>()).prop_map(Hash::from_bytes)
}

/// Generate a vector of arbitrary hashes.
fn arb_hashes(max_count: usize) -> impl Strategy<Value = Vec<Hash>> {
    prop::collection::vec(arb_hash(), 1..max_count)
}

fn build(leaves: &[Hash]) -> MemAdder {
    let mut adder = MemAdder::new();
    for &leaf in leaves {
        adder.add_leaf(leaf).expect("add should succeed");
    }
    adder
}

fn accumulator(adder: &MemAdder, c: u64) -> Vec<Hash> {
    peaks(c).iter().map(|&p| adder.get(p).unwrap()).collect()
}

// ============================================================================
// Property Tests: Index Algebra
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// leaf_count inverts mmr_index.
    #[test]
    fn prop_leaf_count_inverts_mmr_index(e in 0u64..1_000_000) {
        prop_assert_eq!(leaf_count(mmr_index(e)), e + 1);
    }

    /// Leaves have height zero and leaf_index resolves them to themselves.
    #[test]
    fn prop_leaves_are_height_zero(e in 0u64..1_000_000) {
        let i = mmr_index(e);
        prop_assert_eq!(index_height(i), 0);
        prop_assert_eq!(leaf_index(i), e);
    }

    /// Peak count equals popcount of the leaf count, indices strictly
    /// ascend, heights strictly descend.
    #[test]
    fn prop_peaks_shape(e in 0u64..100_000) {
        let c = complete_mmr(mmr_index(e));
        let ps = peaks(c);
        prop_assert_eq!(ps.len(), leaf_count(c).count_ones() as usize);
        for w in ps.windows(2) {
            prop_assert!(w[0] < w[1]);
            prop_assert!(index_height(w[0]) > index_height(w[1]));
        }
        prop_assert_eq!(*ps.last().unwrap(), c);
    }

    /// complete_mmr is idempotent and never moves backwards.
    #[test]
    fn prop_complete_mmr_idempotent(i in 0u64..1_000_000) {
        let c = complete_mmr(i);
        prop_assert!(c >= i);
        prop_assert_eq!(complete_mmr(c), c);
    }
}

// ============================================================================
// Property Tests: Inclusion Proofs
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Every node replays to the covering peak of the final state.
    #[test]
    fn prop_all_nodes_provable(leaves in arb_hashes(150)) {
        let adder = build(&leaves);
        let c = adder.size() - 1;
        let acc = accumulator(&adder, c);

        for i in 0..adder.size() {
            let proof = InclusionProof {
                index: i,
                against: c,
                siblings: inclusion_proof_path(i, c)
                    .iter()
                    .map(|&s| adder.get(s).unwrap())
                    .collect(),
            };
            prop_assert!(proof.verify(&adder.get(i).unwrap(), &acc).unwrap());
        }
    }

    /// Proof length is logarithmic in the node count.
    #[test]
    fn prop_proof_size_logarithmic(leaves in arb_hashes(300)) {
        let adder = build(&leaves);
        let c = adder.size() - 1;
        let bound = 64 - adder.size().leading_zeros() as usize + 1;
        for e in 0..leaves.len() as u64 {
            prop_assert!(inclusion_proof_path(mmr_index(e), c).len() <= bound);
        }
    }

    /// A tampered sibling breaks the replay.
    #[test]
    fn prop_tampered_sibling_fails(leaves in arb_hashes(60), victim in any::<prop::sample::Index>()) {
        let adder = build(&leaves);
        let c = adder.size() - 1;
        let i = mmr_index(victim.index(leaves.len()) as u64);

        let mut siblings: Vec<Hash> = inclusion_proof_path(i, c)
            .iter()
            .map(|&s| adder.get(s).unwrap())
            .collect();
        prop_assume!(!siblings.is_empty());
        siblings[0] = hash(b"tampered");

        let proof = InclusionProof { index: i, against: c, siblings };
        prop_assert!(!proof.verify(&adder.get(i).unwrap(), &accumulator(&adder, c)).unwrap());
    }
}

// ============================================================================
// Property Tests: Consistency Proofs
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Growing a log keeps every earlier complete state consistent.
    #[test]
    fn prop_growth_is_consistent(
        leaves in arb_hashes(120),
        cut in any::<prop::sample::Index>()
    ) {
        let adder = build(&leaves);
        let to = adder.size() - 1;
        let from = complete_mmr(cut.index(adder.size() as usize) as u64);
        prop_assume!(from <= to);

        let paths: Vec<Vec<Hash>> = consistency_proof_paths(from, to)
            .iter()
            .map(|p| p.iter().map(|&s| adder.get(s).unwrap()).collect())
            .collect();

        let roots = consistent_roots(from, &accumulator(&adder, from), &paths).unwrap();
        let acc_to = accumulator(&adder, to);
        prop_assert!(!roots.is_empty());
        prop_assert_eq!(&roots[..], &acc_to[..roots.len()]);
    }

    /// Divergent histories are never consistent.
    #[test]
    fn prop_divergent_history_inconsistent(
        leaves in arb_hashes(60),
        poison in arb_hash(),
        cut in any::<prop::sample::Index>()
    ) {
        prop_assume!(leaves.len() >= 2);
        let honest = build(&leaves);

        let k = 1 + cut.index(leaves.len() - 1);
        let mut forked_leaves = leaves[..k].to_vec();
        prop_assume!(forked_leaves[k - 1] != poison);
        forked_leaves[k - 1] = poison;
        let forked = build(&forked_leaves);

        let from = forked.size() - 1;
        let to = honest.size() - 1;

        let paths: Vec<Vec<Hash>> = consistency_proof_paths(from, to)
            .iter()
            .map(|p| p.iter().map(|&s| honest.get(s).unwrap()).collect())
            .collect();

        let roots = consistent_roots(from, &accumulator(&forked, from), &paths).unwrap();
        let acc_to = accumulator(&honest, to);
        prop_assert!(roots.len() > acc_to.len() || roots[..] != acc_to[..roots.len()]);
    }

    /// Replaying an interior node composes: the included root of a peak of
    /// an earlier state equals the included root reached leaf-first.
    #[test]
    fn prop_interior_replay_composes(leaves in arb_hashes(100)) {
        let adder = build(&leaves);
        let to = adder.size() - 1;
        for &p in &peaks(complete_mmr(to / 2).min(to)) {
            let path: Vec<Hash> = inclusion_proof_path(p, to)
                .iter()
                .map(|&s| adder.get(s).unwrap())
                .collect();
            let root = included_root(p, &adder.get(p).unwrap(), &path);
            let (rank, _) = crate::index::peak_covering(to, p).unwrap();
            prop_assert_eq!(root, accumulator(&adder, to)[rank]);
        }
    }
}
