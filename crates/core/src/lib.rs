//! binxfer-core: Chunked multi-blob transfer with two-level integrity checking
//!
//! This library provides the core components for a point-to-point system that:
//! - Describes a bundle of variable-length binary blobs with a fixed header region
//! - Slices each blob into fixed-size framed chunks for an ordered byte channel
//! - Validates framing and a per-chunk checksum on receive
//! - Reassembles the logical stream and re-verifies every blob independently
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `crc`: the wire checksum (a deliberately non-standard CRC-32 variant)
//! - `descriptor`: main and per-blob descriptors, layout, and bounds limits
//! - `frame`: the fixed-size chunk unit, bit-packed header, and encoder
//! - `transmit`: sender-side serialization onto a byte sink
//! - `receive`: chunk validation and stream reassembly with explicit policy
//! - `verify`: whole-blob checksum verification after reassembly
//! - `metrics`: observable system behavior
//!
//! # Design Principles
//!
//! - **No panics**: all errors are structured and recoverable
//! - **Bounded memory**: descriptor counts and stream sizes are capped before allocation
//! - **Explicit assumptions**: the channel must be ordered and lossless; within
//!   that assumption, desynchronization is a detected error, and what happens
//!   to a bad chunk is a configured policy, not an accident
//! - **Observable**: metrics for understanding behavior end to end

pub mod crc;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod receive;
pub mod transmit;
pub mod verify;

// Re-export commonly used types
pub use error::{Error, Result};
