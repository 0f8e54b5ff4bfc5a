//! Chunk framing: the fixed-size transport unit and its encoder.
//!
//! Every chunk occupies exactly [`CHUNK_SIZE`] bytes on the wire; fixed size
//! makes stream framing implicit (no separators).
//!
//! # Chunk Format
//!
//! ```text
//! +--------------------+
//! | start (1)          |  0x02
//! +--------------------+
//! | header (2)         |  u16 LE, bits: (msg_id % 64) << 10 | payload_len
//! +--------------------+
//! | data (1018)        |  [intra-blob offset (4)][content][zero padding]
//! +--------------------+
//! | checksum (2)       |  u16 LE, low 16 bits of the CRC variant over
//! |                    |  the first payload_len data bytes
//! +--------------------+
//! | end (1)            |  0x03
//! +--------------------+
//! ```
//!
//! `payload_len` counts the 4-byte offset prefix plus the content, so a chunk
//! carries at most `1018 - 4 = 1014` content bytes and `payload_len` is
//! always in `[5, 1018]`. The message id increments once per chunk across the
//! entire transfer (not per blob) and wraps at 64 because only 6 bits are
//! stored. No chunk spans two sub-binaries.

use crate::crc;
use crate::error::{FrameError, Result};

/// Total size of one chunk on the wire.
pub const CHUNK_SIZE: usize = 1024;

/// Size of the data region: everything but the six framing bytes
/// (start 1 + header 2 + checksum 2 + end 1).
pub const DATA_SIZE: usize = CHUNK_SIZE - 6;

/// Size of the intra-blob offset prefix at the head of the data region.
pub const OFFSET_PREFIX_SIZE: usize = 4;

/// Content bytes a single chunk can carry.
pub const CONTENT_CAPACITY: usize = DATA_SIZE - OFFSET_PREFIX_SIZE;

/// Smallest valid payload length: the offset prefix plus one content byte.
pub const MIN_PAYLOAD_LEN: usize = OFFSET_PREFIX_SIZE + 1;

/// Start-of-message sentinel.
pub const START_OF_MESSAGE: u8 = 0x02;

/// End-of-message sentinel.
pub const END_OF_MESSAGE: u8 = 0x03;

/// Message ids wrap here: only 6 bits are stored in the packed header.
pub const MSG_ID_MODULUS: u16 = 64;

/// Number of chunks needed to carry `size` content bytes.
pub fn chunks_for(size: usize) -> usize {
    (size + CONTENT_CAPACITY - 1) / CONTENT_CAPACITY
}

/// The bit-packed 16-bit chunk header.
///
/// High 6 bits: message id (modulo 64). Low 10 bits: payload length
/// (offset prefix + content). An explicit accessor pair keeps the packing
/// and the wraparound behavior in one place and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedHeader(u16);

impl PackedHeader {
    /// Pack a message id and payload length. The id is reduced modulo 64;
    /// the length must already fit in 10 bits.
    pub fn pack(msg_id: u16, payload_len: u16) -> Self {
        Self(((msg_id % MSG_ID_MODULUS) << 10) | (payload_len & 0x03FF))
    }

    /// Rebuild from the raw wire value.
    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw wire value.
    pub fn raw(self) -> u16 {
        self.0
    }

    /// Message id, already reduced modulo 64.
    pub fn msg_id(self) -> u16 {
        self.0 >> 10
    }

    /// Payload length: offset prefix + content bytes.
    pub fn payload_len(self) -> u16 {
        self.0 & 0x03FF
    }
}

/// One framed transport unit carrying a slice of a single sub-binary.
///
/// Chunks are transient: produced, serialized, and discarded by the sender;
/// consumed, validated, and discarded by the receiver (only the content
/// persists in the reassembly stream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Message id as stored on the wire (already modulo 64)
    pub msg_id: u16,

    /// Byte position of this chunk's content within its sub-binary
    pub intra_blob_offset: u32,

    /// Content slice, 1..=CONTENT_CAPACITY bytes
    pub content: Vec<u8>,
}

impl Chunk {
    /// Serialize into the fixed 1024-byte wire unit.
    ///
    /// The data region past the content is zero-padded; the checksum covers
    /// the offset prefix and content only.
    pub fn to_bytes(&self) -> [u8; CHUNK_SIZE] {
        debug_assert!(!self.content.is_empty() && self.content.len() <= CONTENT_CAPACITY);

        let payload_len = OFFSET_PREFIX_SIZE + self.content.len();
        let header = PackedHeader::pack(self.msg_id, payload_len as u16);

        let mut bytes = [0u8; CHUNK_SIZE];
        bytes[0] = START_OF_MESSAGE;
        bytes[1..3].copy_from_slice(&header.raw().to_le_bytes());
        bytes[3..7].copy_from_slice(&self.intra_blob_offset.to_le_bytes());
        bytes[7..7 + self.content.len()].copy_from_slice(&self.content);

        let checksum = crc::checksum(&bytes[3..3 + payload_len]) as u16;
        bytes[CHUNK_SIZE - 3..CHUNK_SIZE - 1].copy_from_slice(&checksum.to_le_bytes());
        bytes[CHUNK_SIZE - 1] = END_OF_MESSAGE;

        bytes
    }

    /// Parse and validate one wire unit.
    ///
    /// # Errors
    /// - `FrameError::UnitTooShort` if the buffer is smaller than a chunk
    /// - `FrameError::BadMarker` if either sentinel is wrong
    /// - `FrameError::LengthOutOfRange` if the packed length can't be valid
    /// - `FrameError::ChecksumMismatch` if the payload region is corrupt
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CHUNK_SIZE {
            return Err(FrameError::UnitTooShort {
                required: CHUNK_SIZE,
                actual: bytes.len(),
            }
            .into());
        }

        if bytes[0] != START_OF_MESSAGE {
            return Err(FrameError::BadMarker {
                expected: START_OF_MESSAGE,
                actual: bytes[0],
            }
            .into());
        }
        if bytes[CHUNK_SIZE - 1] != END_OF_MESSAGE {
            return Err(FrameError::BadMarker {
                expected: END_OF_MESSAGE,
                actual: bytes[CHUNK_SIZE - 1],
            }
            .into());
        }

        let header = PackedHeader::from_raw(u16::from_le_bytes(bytes[1..3].try_into().unwrap()));
        let payload_len = header.payload_len() as usize;
        if !(MIN_PAYLOAD_LEN..=DATA_SIZE).contains(&payload_len) {
            return Err(FrameError::LengthOutOfRange {
                len: payload_len,
                min: MIN_PAYLOAD_LEN,
                max: DATA_SIZE,
            }
            .into());
        }

        let stored =
            u16::from_le_bytes(bytes[CHUNK_SIZE - 3..CHUNK_SIZE - 1].try_into().unwrap());
        let computed = crc::checksum(&bytes[3..3 + payload_len]) as u16;
        if stored != computed {
            return Err(FrameError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            }
            .into());
        }

        let intra_blob_offset = u32::from_le_bytes(bytes[3..7].try_into().unwrap());
        let content = bytes[7..3 + payload_len].to_vec();

        Ok(Self {
            msg_id: header.msg_id(),
            intra_blob_offset,
            content,
        })
    }
}

/// Slices sub-binaries into chunks, threading the transfer-wide message id.
///
/// The id cursor is explicit state with a defined lifecycle: one encoder per
/// transfer, created before the first chunk and discarded after the last.
#[derive(Debug)]
pub struct ChunkEncoder {
    next_msg_id: u16,
}

impl ChunkEncoder {
    /// Create an encoder with the message id cursor at zero.
    pub fn new() -> Self {
        Self { next_msg_id: 0 }
    }

    /// Slice one sub-binary into chunks.
    ///
    /// Each chunk takes `min(CONTENT_CAPACITY, remaining)` content bytes and
    /// records its position within the blob; the last chunk of a blob may be
    /// short. An empty blob yields no chunks. The message id keeps counting
    /// across calls.
    pub fn encode_blob(&mut self, blob: &[u8]) -> Vec<Chunk> {
        let mut chunks = Vec::with_capacity(chunks_for(blob.len()));
        let mut cursor = 0usize;

        while cursor < blob.len() {
            let take = (blob.len() - cursor).min(CONTENT_CAPACITY);

            chunks.push(Chunk {
                msg_id: self.next_msg_id % MSG_ID_MODULUS,
                intra_blob_offset: cursor as u32,
                content: blob[cursor..cursor + take].to_vec(),
            });

            self.next_msg_id = self.next_msg_id.wrapping_add(1);
            cursor += take;
        }

        chunks
    }
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        Self::new()
    }
}
