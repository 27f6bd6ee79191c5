//! Tiled MMR log example: append leaves across tiles and prove them.
//!
//! The log is an append-only MMR stored as fixed-shape tiles; it provides:
//! - O(1) amortized append
//! - O(log n) inclusion proofs against any complete state
//! - O(log n) consistency proofs between any two complete states
//!
//! Run with: cargo run --example tile_log

use cairn_core::hash;
use cairn_tiles::{MemoryProvider, TileConfig, TileLog};

fn main() -> anyhow::Result<()> {
    // A tile height of 2 means four leaves per tile.
    let cfg = TileConfig::new(2)?;
    let mut log = TileLog::new(cfg, MemoryProvider::new());

    println!("=== Tiled MMR Log Demo ===\n");

    // Append some leaves (hashes of data).
    let data_items = [
        "event-1", "event-2", "event-3", "event-4", "event-5", "event-6", "event-7", "event-8",
        "event-9", "event-10",
    ];
    let leaves: Vec<_> = data_items.iter().map(|item| hash(item.as_bytes())).collect();
    let receipt = log.append(&leaves)?;

    println!("Appended {} leaves in one batch", leaves.len());
    println!("  Head tile id: {}", receipt.head_id);
    println!("  Next MMR index: {}", receipt.next_index);
    println!("  Tiles committed: {}", receipt.tiles_committed);

    // The accumulator is the peak list of the final complete state.
    let state = receipt.next_index - 1;
    let accumulator = log.accumulator(state)?;
    println!("\nAccumulator of MMR({}):", state);
    for (rank, peak) in accumulator.iter().enumerate() {
        println!("  peak[{}] = {:?}", rank, peak);
    }

    // Generate and verify inclusion proofs.
    println!("\n=== Inclusion Proofs ===\n");

    for (e, item) in data_items.iter().enumerate() {
        let i = cairn_mmr::index::mmr_index(e as u64);
        let proof = log.inclusion_proof(i, state)?;
        let is_valid = proof.verify(&leaves[e], &accumulator)?;

        println!(
            "Proof for '{}' (node {}): {} siblings, valid: {}",
            item,
            i,
            proof.siblings.len(),
            is_valid
        );
    }

    // A consistency proof relates an earlier checkpoint to the head.
    println!("\n=== Consistency Proof ===\n");

    let checkpoint = cairn_mmr::index::complete_mmr(6);
    let proof = log.consistency_proof(checkpoint, state)?;
    let acc_then = log.accumulator(checkpoint)?;
    println!(
        "MMR({}) -> MMR({}): {} peak paths, valid: {}",
        checkpoint,
        state,
        proof.paths.len(),
        proof.verify(&acc_then, &accumulator)?
    );

    // Demonstrate proof portability.
    println!("\n=== Proof Portability ===\n");

    let proof = log.inclusion_proof(0, state)?;
    let serialized = serde_json::to_string(&proof)?;
    println!("Serialized proof size: {} bytes", serialized.len());
    println!("Anyone holding the signed accumulator can verify it offline");

    Ok(())
}
