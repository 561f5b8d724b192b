//! Cargo test wrapper for random property-based testing
//!
//! Runs the random-action checker in-process over a fixed set of seeds.
//! For manual testing with custom parameters, use the binary directly:
//!
//!   cargo build --release --bin test_sprintdesk
//!   ./target/release/test_sprintdesk random-actions --seed 42 --verbose
//!   ./target/release/test_sprintdesk random-actions --seed 42 --store markdown
//!   ./target/release/test_sprintdesk random-actions --seed-from-entropy --iters 10

use sprintdesk::action_generator::check_sequence;
use sprintdesk::storage::{Storage, DATA_DIR};
use sprintdesk::store::MemoryStore;

const SEEDS: [u64; 6] = [0, 1, 7, 42, 1234, 987_654_321];

/// Dump the action log when a sequence fails
fn run_or_report<F>(seed: u64, run: F)
where
    F: FnOnce(&mut Vec<String>) -> anyhow::Result<sprintdesk::action_generator::SequenceReport>,
{
    let mut log = Vec::new();
    match run(&mut log) {
        Ok(report) => {
            println!(
                "seed {}: {} actions, {} created, {} cancelled, {} rejected",
                seed, report.actions, report.created, report.cancelled, report.rejected
            );
        }
        Err(e) => {
            for line in &log {
                println!("{}", line);
            }
            panic!("Seed {} failed: {:#}", seed, e);
        }
    }
}

#[test]
fn test_random_actions_memory_store() {
    for seed in SEEDS {
        run_or_report(seed, |log| {
            check_sequence(MemoryStore::with_prefix("rnd"), "rnd", seed, 80, |line| {
                log.push(line)
            })
        });
    }
}

#[test]
fn test_random_actions_markdown_store() {
    for seed in SEEDS {
        run_or_report(seed, |log| {
            let dir = tempfile::tempdir()?;
            let storage = Storage::init(dir.path().join(DATA_DIR), Some("rnd".to_string()), None)?;
            check_sequence(storage, "rnd", seed, 40, |line| log.push(line))
        });
    }
}

#[test]
fn test_random_actions_hit_every_outcome() {
    let mut created = 0;
    let mut cancelled = 0;
    let mut rejected = 0;
    for seed in 0..20 {
        let report = check_sequence(MemoryStore::with_prefix("rnd"), "rnd", seed, 60, |_| {})
            .unwrap_or_else(|e| panic!("Seed {} failed: {:#}", seed, e));
        created += report.created;
        cancelled += report.cancelled;
        rejected += report.rejected;
    }
    assert!(created > 0);
    assert!(cancelled > 0);
    assert!(rejected > 0);
}
