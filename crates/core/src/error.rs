//! Error types for the binxfer system.
//!
//! All operations return structured errors rather than panicking.
//! This enables graceful shutdown and clear error reporting.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Descriptor: parsing or validating the header region
/// - Frame: chunk-level framing, length, or checksum problems
/// - Verify: sub-binary checksum mismatch after reassembly
/// - TruncatedInput: source exhausted before the expected byte count
/// - I/O: file system operations
#[derive(Debug, Error)]
pub enum Error {
    /// Descriptor region error (e.g., bad watermark, oversized count)
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Chunk framing error (e.g., bad sentinel, checksum mismatch)
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Sub-binary verification error
    #[error("verify error: {0}")]
    Verify(#[from] VerifyError),

    /// Source exhausted before the expected byte count was reached.
    /// Unrecoverable: there is no retransmission channel.
    #[error("truncated input: expected {expected} bytes, got {got}")]
    TruncatedInput { expected: u64, got: u64 },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Descriptor region errors.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Watermark field doesn't match the expected magic
    #[error("invalid watermark: expected {expected:#010x}, got {actual:#010x}")]
    BadWatermark { expected: u32, actual: u32 },

    /// Buffer is too short to contain a descriptor
    #[error("descriptor too short: need at least {required} bytes, got {actual}")]
    Truncated { required: usize, actual: usize },

    /// Declared sub-binary count exceeds the configured maximum.
    /// Checked before any per-descriptor allocation happens.
    #[error("sub-binary count {count} exceeds maximum {max}")]
    TooManySubBinaries { count: u32, max: u32 },

    /// Declared stream length exceeds the configured maximum
    #[error("stream length {bytes} exceeds maximum {max}")]
    StreamTooLarge { bytes: u64, max: u64 },

    /// A sub-binary's start offset doesn't match the layout implied by the
    /// preceding sizes (offsets must be contiguous and 4-byte aligned)
    #[error("sub-binary {index} start offset {actual} doesn't match expected {expected}")]
    BadOffset {
        index: usize,
        expected: u64,
        actual: u32,
    },

    /// A sub-binary is too large for its 32-bit size field
    #[error("sub-binary {index} is {size} bytes, exceeding the u32 size field")]
    BlobTooLarge { index: usize, size: usize },
}

/// Chunk framing errors.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Start or end sentinel byte is wrong — the stream is desynchronized
    #[error("bad frame marker: expected {expected:#04x}, got {actual:#04x}")]
    BadMarker { expected: u8, actual: u8 },

    /// Buffer is too short to contain a full chunk unit
    #[error("chunk unit too short: need {required} bytes, got {actual}")]
    UnitTooShort { required: usize, actual: usize },

    /// Packed payload length is outside the valid range for the data region
    #[error("payload length {len} outside valid range [{min}, {max}]")]
    LengthOutOfRange { len: usize, min: usize, max: usize },

    /// Chunk checksum doesn't match the payload region
    #[error("chunk checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Embedded intra-blob offset disagrees with the receive cursor.
    /// Indicates a dropped or reordered unit on what must be an ordered,
    /// lossless channel.
    #[error("intra-blob offset {actual} doesn't match expected cursor {expected}")]
    OffsetMismatch { expected: u32, actual: u32 },

    /// Chunk carries more content than remains in the current sub-binary
    #[error("chunk content {got} bytes overruns the {remaining} bytes left in the sub-binary")]
    BlobOverrun { remaining: u32, got: usize },

    /// A chunk arrived after the expected payload byte count was reached
    #[error("chunk received after transfer completed")]
    UnexpectedChunk,
}

/// Sub-binary verification errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Recomputed whole-blob checksum doesn't match its descriptor.
    /// Reported per-index so the damaged blob can be identified.
    #[error("sub-binary {index} checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        index: usize,
        expected: u32,
        actual: u32,
    },

    /// Descriptor's offset/size range falls outside the reassembled stream
    #[error("sub-binary {index} range [{start}, {end}) exceeds stream length {len}")]
    RangeOutOfBounds {
        index: usize,
        start: u64,
        end: u64,
        len: u64,
    },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
