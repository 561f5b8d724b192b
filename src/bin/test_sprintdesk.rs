//! Test toolkit for sprintdesk
//!
//! This binary provides testing utilities for the sprintdesk issue board.
//!
//! Usage:
//!   test_sprintdesk random-actions [OPTIONS]
//!   test_sprintdesk --help

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::RngCore;
use sprintdesk::action_generator::{check_sequence, SequenceReport};
use sprintdesk::storage::{Storage, DATA_DIR};
use sprintdesk::store::MemoryStore;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const PREFIX: &str = "rnd";

/// Logger that buffers output and can dump on failure
#[derive(Clone)]
struct Logger {
    buffer: Arc<Mutex<Vec<String>>>,
    verbose: bool,
}

impl Logger {
    fn new(verbose: bool) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            verbose,
        }
    }

    /// Print immediately when verbose, otherwise keep for a failure dump
    fn action(&self, msg: String) {
        if self.verbose {
            println!("{}", msg);
        } else if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push(msg);
        }
    }

    /// Dump all buffered output to stdout
    fn dump(&self) {
        if let Ok(buffer) = self.buffer.lock() {
            for msg in buffer.iter() {
                println!("{}", msg);
            }
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "test_sprintdesk")]
#[command(about = "Test toolkit for sprintdesk")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Random property-based testing of the issue service
    #[command(name = "random-actions")]
    RandomActions {
        /// Seed for deterministic RNG
        #[arg(long)]
        seed: Option<u64>,

        /// Use entropy for random seed (non-deterministic)
        #[arg(long)]
        seed_from_entropy: bool,

        /// Number of iterations to run (each with a different seed)
        /// Mutually exclusive with --seconds
        #[arg(long, default_value = "1", conflicts_with = "seconds")]
        iters: usize,

        /// Run stress test for specified number of seconds
        /// Mutually exclusive with --iters
        #[arg(long, conflicts_with = "iters")]
        seconds: Option<u64>,

        /// Number of actions to generate per iteration
        #[arg(long, default_value = "40")]
        actions_per_iter: usize,

        /// Backend to test: memory or markdown
        #[arg(long, default_value = "memory")]
        store: StoreKind,

        /// Print every action and its outcome
        #[arg(long, short)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum StoreKind {
    Memory,
    Markdown,
}

impl StoreKind {
    fn flag(self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Markdown => "markdown",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::RandomActions {
            seed,
            seed_from_entropy,
            iters,
            seconds,
            actions_per_iter,
            store,
            verbose,
        } => run_random_actions(
            seed,
            seed_from_entropy,
            iters,
            seconds,
            actions_per_iter,
            store,
            verbose,
        ),
    }
}

/// When to stop iterating
enum Budget {
    Iterations(usize),
    Deadline(Instant),
}

impl Budget {
    fn exhausted(&self, done: usize) -> bool {
        match self {
            Budget::Iterations(n) => done >= *n,
            Budget::Deadline(at) => Instant::now() >= *at,
        }
    }
}

fn run_random_actions(
    seed: Option<u64>,
    seed_from_entropy: bool,
    iters: usize,
    seconds: Option<u64>,
    actions_per_iter: usize,
    store: StoreKind,
    verbose: bool,
) -> Result<()> {
    // Sample entropy once; everything after this is deterministic
    let base_seed = if seed_from_entropy {
        let entropy_seed = rand::thread_rng().next_u64();
        println!("entropy seed {} (pass --seed {} to repeat)", entropy_seed, entropy_seed);
        entropy_seed
    } else {
        seed.unwrap_or(42u64)
    };

    let start_time = Instant::now();
    let budget = match seconds {
        Some(secs) => Budget::Deadline(start_time + Duration::from_secs(secs)),
        None => Budget::Iterations(iters),
    };
    // A lone iteration replays the given seed exactly
    let single = iters == 1 && seconds.is_none();

    let mut totals = SequenceReport::default();
    let mut iter = 0usize;
    while !budget.exhausted(iter) {
        iter += 1;
        let iter_seed = if single {
            base_seed
        } else {
            base_seed.wrapping_add(iter as u64)
        };

        let logger = Logger::new(verbose);
        match run_test(iter_seed, actions_per_iter, store, &logger) {
            Ok(report) => {
                println!(
                    "[{}] seed {} ({:?}): {} actions, {} created, {} cancelled, {} rejected",
                    iter,
                    iter_seed,
                    store,
                    report.actions,
                    report.created,
                    report.cancelled,
                    report.rejected
                );
                totals.absorb(&report);
            }
            Err(e) => {
                logger.dump();
                eprintln!("[{}] seed {} FAILED: {:?}", iter, iter_seed, e);
                eprintln!(
                    "reproduce with: test_sprintdesk random-actions --seed {} --store {} --actions-per-iter {} --verbose",
                    iter_seed,
                    store.flag(),
                    actions_per_iter
                );
                std::process::exit(1);
            }
        }
    }

    println!(
        "{} iterations passed in {:.1}s: {} actions, {} created, {} cancelled, {} rejected",
        iter,
        start_time.elapsed().as_secs_f64(),
        totals.actions,
        totals.created,
        totals.cancelled,
        totals.rejected
    );

    Ok(())
}

fn run_test(
    seed: u64,
    num_actions: usize,
    store: StoreKind,
    logger: &Logger,
) -> Result<SequenceReport> {
    let log = |line: String| logger.action(line);
    match store {
        StoreKind::Memory => check_sequence(
            MemoryStore::with_prefix(PREFIX),
            PREFIX,
            seed,
            num_actions,
            log,
        ),
        StoreKind::Markdown => {
            let temp_dir = tempfile::tempdir()?;
            let storage = Storage::init(
                temp_dir.path().join(DATA_DIR),
                Some(PREFIX.to_string()),
                None,
            )?;
            logger.action(format!("Data directory: {}", storage.data_dir().display()));
            check_sequence(storage, PREFIX, seed, num_actions, log)
        }
    }
}
