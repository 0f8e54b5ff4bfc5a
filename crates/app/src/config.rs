//! Configuration for the binxfer application.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including randomized defaults that are reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using intelligent defaults.
//! All defaults are printed so runs are reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

/// Complete configuration for a transfer run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Files ===
    /// Channel staging file the sender writes and the receiver reads
    pub channel_file: PathBuf,

    /// Output file for the reassembled logical stream
    pub output_file: PathBuf,

    // === Bundle ===
    /// Seed for bundle generation (and randomized defaults)
    pub seed: u64,

    /// Number of sub-binaries to generate
    pub sub_count: u32,

    /// Minimum generated blob size in bytes
    pub min_size: usize,

    /// Maximum generated blob size in bytes
    pub max_size: usize,

    // === Fault injection ===
    /// Flip one byte of the staged stream at this offset before reception
    pub flip_offset: Option<u64>,

    /// Skip invalid chunks instead of aborting (damage is then reported by
    /// whole-blob verification)
    pub skip_bad: bool,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If no arguments provided, generates randomized defaults using a time-based seed.
    /// If --seed is provided, uses that seed for all randomness (fully deterministic).
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut channel_file: Option<PathBuf> = None;
        let mut output_file: Option<PathBuf> = None;
        let mut seed: Option<u64> = None;
        let mut sub_count: Option<u32> = None;
        let mut min_size: Option<usize> = None;
        let mut max_size: Option<usize> = None;
        let mut flip_offset: Option<u64> = None;
        let mut skip_bad = false;
        let mut print_config = false;
        let mut print_metrics = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--channel" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--channel requires a path".to_string());
                    }
                    channel_file = Some(PathBuf::from(&args[i]));
                }
                "--out" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--out requires a path".to_string());
                    }
                    output_file = Some(PathBuf::from(&args[i]));
                }
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--count" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--count requires a number".to_string());
                    }
                    sub_count = Some(args[i].parse().map_err(|_| "invalid count")?);
                }
                "--min-size" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--min-size requires a number".to_string());
                    }
                    min_size = Some(args[i].parse().map_err(|_| "invalid min-size")?);
                }
                "--max-size" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--max-size requires a number".to_string());
                    }
                    max_size = Some(args[i].parse().map_err(|_| "invalid max-size")?);
                }
                "--flip" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--flip requires a byte offset".to_string());
                    }
                    flip_offset = Some(args[i].parse().map_err(|_| "invalid flip offset")?);
                }
                "--skip-bad" => {
                    skip_bad = true;
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-metrics" => {
                    print_metrics = false;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        // Determine seed (explicit or time-based)
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_millis() as u64
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let config = Config {
            channel_file: channel_file.unwrap_or_else(|| PathBuf::from("./b_device.bin")),
            output_file: output_file.unwrap_or_else(|| PathBuf::from("./received.bin")),
            seed,
            sub_count: sub_count.unwrap_or_else(|| rng.gen_range(2..=6)),
            min_size: min_size.unwrap_or(1),
            max_size: max_size.unwrap_or_else(|| rng.gen_range(2048..=65536)),
            flip_offset,
            skip_bad,
            print_config,
            print_metrics,
        };

        if config.sub_count == 0 {
            return Err("--count must be at least 1".to_string());
        }
        if config.min_size > config.max_size {
            return Err(format!(
                "min-size {} exceeds max-size {}",
                config.min_size, config.max_size
            ));
        }
        if config.max_size > u32::MAX as usize {
            return Err("max-size exceeds the 32-bit blob size field".to_string());
        }

        Ok(config)
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Channel file: {:?}", self.channel_file.to_str().unwrap());
        println!("Output file:  {:?}", self.output_file.to_str().unwrap());
        println!();
        println!("Seed: {}", self.seed);
        println!("Sub-binaries: {}", self.sub_count);
        println!("Blob size: {} - {} bytes", self.min_size, self.max_size);
        println!();
        println!("=== Fault Injection ===");
        match self.flip_offset {
            Some(offset) => println!("Flip byte at offset: {}", offset),
            None => println!("Flip byte: (none)"),
        }
        println!("Bad-chunk policy: {}", if self.skip_bad { "skip" } else { "abort" });
        println!();
    }
}

fn print_help() {
    println!("binxfer: chunked multi-blob transfer with two-level integrity checking");
    println!();
    println!("USAGE:");
    println!("    binxfer [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --channel <PATH>    Channel staging file (default: ./b_device.bin)");
    println!("    --out <PATH>        Reassembled output file (default: ./received.bin)");
    println!("    --seed <N>          Random seed for determinism");
    println!();
    println!("    --count <N>         Sub-binaries to generate (default: random 2-6)");
    println!("    --min-size <N>      Minimum blob size (default: 1)");
    println!("    --max-size <N>      Maximum blob size (default: random 2048-65536)");
    println!();
    println!("    --flip <OFFSET>     Flip one byte of the staged stream before reception");
    println!("    --skip-bad          Skip invalid chunks instead of aborting");
    println!();
    println!("    --print-config      Print resolved configuration");
    println!("    --no-metrics        Don't print metrics summary");
    println!("    --help, -h          Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    binxfer                          # Run with random defaults");
    println!("    binxfer --seed 42                # Deterministic run");
    println!("    binxfer --flip 500               # Corrupt the stream, watch it abort");
    println!("    binxfer --flip 500 --skip-bad    # Corrupt, skip, fail verification");
    println!();
}
