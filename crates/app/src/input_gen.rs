//! Sample bundle generation for testing.
//!
//! The tool transfers a generated bundle of sub-binaries, so runs need no
//! input files and are reproducible from a seed.
//!
//! # Design
//!
//! Generated blobs mix fill classes so both the chunk stream and the
//! checksums see varied data:
//! - Constant-byte fills (firmware-image-like, easy to eyeball in a hex dump)
//! - Repeating short patterns
//! - Random bytes

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generate a bundle of sub-binaries with sizes in `[min_size, max_size]`.
///
/// Deterministic for a given seed and parameters.
pub fn generate_bundle(seed: u64, count: u32, min_size: usize, max_size: usize) -> Vec<Vec<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut bundle = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let size = rng.gen_range(min_size..=max_size);
        bundle.push(generate_blob(&mut rng, size));
    }

    bundle
}

/// Generate one blob of exactly `size` bytes.
fn generate_blob(rng: &mut ChaCha8Rng, size: usize) -> Vec<u8> {
    let mut blob = Vec::with_capacity(size);

    let fill_type: u8 = rng.gen_range(0..10);
    match fill_type {
        // 40% constant byte
        0..=3 => {
            let byte_value: u8 = rng.gen();
            blob.extend(std::iter::repeat(byte_value).take(size));
        }

        // 30% repeating short pattern
        4..=6 => {
            let pattern = generate_pattern(rng);
            for i in 0..size {
                blob.push(pattern[i % pattern.len()]);
            }
        }

        // 30% random bytes
        _ => {
            for _ in 0..size {
                blob.push(rng.gen());
            }
        }
    }

    blob
}

/// Generate a small repeating pattern.
fn generate_pattern(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let pattern_len = rng.gen_range(4..=32);
    (0..pattern_len).map(|_| rng.gen()).collect()
}
