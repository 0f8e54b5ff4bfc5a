//! Descriptor region: the main descriptor and per-blob sub-descriptors.
//!
//! A transfer begins with a fixed header region that fully describes the
//! bundle before any chunk is sent:
//!
//! ```text
//! +--------------------+
//! | MainDescriptor(16) |  watermark, sub-binary count
//! +--------------------+
//! | SubDescriptor (64) |  one per sub-binary: watermark, offset, size, CRC
//! | ...                |
//! +--------------------+
//! | Chunk stream       |
//! +--------------------+
//! ```
//!
//! # Wire Format
//!
//! All multi-byte fields are little-endian. Reserved bytes are written as
//! zero and ignored on read.
//!
//! ```text
//! MainDescriptor (16 bytes):
//!   watermark (4)  = 0x12345678
//!   sub_count (4)
//!   reserved  (8)
//!
//! SubDescriptor (64 bytes):
//!   watermark    (4)  = 0xABCDEF00 + index
//!   start_offset (4)  absolute offset of the blob in the logical stream
//!   size         (4)  original blob length in bytes
//!   checksum     (4)  CRC variant over the whole blob
//!   reserved     (48)
//! ```
//!
//! # Offsets
//!
//! Start offsets are absolute positions in the logical stream, whose offset 0
//! is the first byte of the MainDescriptor. The first blob therefore starts
//! at `16 + 64 * sub_count`; each successive offset advances by the previous
//! blob's size rounded up to a multiple of 4. Descriptors are computed once,
//! before any chunk is emitted, and are immutable thereafter.

use crate::crc;
use crate::error::{DescriptorError, Result};

/// Magic constant identifying the stream.
pub const MAIN_WATERMARK: u32 = 0x1234_5678;

/// Base for per-index sub-binary watermarks: `base + index`.
pub const SUB_WATERMARK_BASE: u32 = 0xABCD_EF00;

/// Size of the main descriptor on the wire.
pub const MAIN_DESCRIPTOR_SIZE: usize = 16;

/// Size of one sub-descriptor on the wire.
pub const SUB_DESCRIPTOR_SIZE: usize = 64;

/// Round a byte count up to the next multiple of 4.
///
/// Used to pad inter-blob offsets. Computed in u64 so sizes near u32::MAX
/// can't wrap.
pub fn align4(size: u32) -> u64 {
    (u64::from(size) + 3) & !3
}

/// Allocation bounds applied before trusting a parsed descriptor region.
///
/// A corrupt or hostile main descriptor can claim an arbitrary sub-binary
/// count and arbitrary sizes; both are capped before anything is allocated.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum sub-binary count accepted from a main descriptor
    pub max_sub_binaries: u32,

    /// Maximum logical stream length in bytes
    pub max_stream_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_sub_binaries: 1024,
            max_stream_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Stream-level descriptor: identifies the transfer and counts its blobs.
///
/// Written exactly once per transfer, before all sub-descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainDescriptor {
    /// Stream identity check, always [`MAIN_WATERMARK`]
    pub watermark: u32,

    /// Number of sub-binaries in the bundle
    pub sub_count: u32,
}

impl MainDescriptor {
    /// Create a main descriptor for a bundle of `sub_count` blobs.
    pub fn new(sub_count: u32) -> Self {
        Self {
            watermark: MAIN_WATERMARK,
            sub_count,
        }
    }

    /// Serialize to the 16-byte wire form.
    pub fn to_bytes(&self) -> [u8; MAIN_DESCRIPTOR_SIZE] {
        let mut bytes = [0u8; MAIN_DESCRIPTOR_SIZE];
        bytes[0..4].copy_from_slice(&self.watermark.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.sub_count.to_le_bytes());
        bytes
    }

    /// Parse from wire bytes.
    ///
    /// # Errors
    /// - `DescriptorError::Truncated` if the buffer is too small
    /// - `DescriptorError::BadWatermark` if the magic doesn't match
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAIN_DESCRIPTOR_SIZE {
            return Err(DescriptorError::Truncated {
                required: MAIN_DESCRIPTOR_SIZE,
                actual: bytes.len(),
            }
            .into());
        }

        let watermark = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if watermark != MAIN_WATERMARK {
            return Err(DescriptorError::BadWatermark {
                expected: MAIN_WATERMARK,
                actual: watermark,
            }
            .into());
        }

        let sub_count = u32::from_le_bytes(bytes[4..8].try_into().unwrap());

        Ok(Self {
            watermark,
            sub_count,
        })
    }
}

/// Per-blob descriptor: where the blob lives in the logical stream and how
/// to verify it arrived intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubDescriptor {
    /// Index-derived identity check, `SUB_WATERMARK_BASE + index`
    pub watermark: u32,

    /// Absolute offset of the blob's first byte in the logical stream
    pub start_offset: u32,

    /// Original blob length in bytes
    pub size: u32,

    /// CRC variant over the whole blob
    pub checksum: u32,
}

impl SubDescriptor {
    /// Serialize to the 64-byte wire form.
    pub fn to_bytes(&self) -> [u8; SUB_DESCRIPTOR_SIZE] {
        let mut bytes = [0u8; SUB_DESCRIPTOR_SIZE];
        bytes[0..4].copy_from_slice(&self.watermark.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.start_offset.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.size.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    /// Parse the sub-descriptor at position `index` from wire bytes.
    ///
    /// # Errors
    /// - `DescriptorError::Truncated` if the buffer is too small
    /// - `DescriptorError::BadWatermark` if the index-derived magic doesn't match
    pub fn from_bytes(bytes: &[u8], index: u32) -> Result<Self> {
        if bytes.len() < SUB_DESCRIPTOR_SIZE {
            return Err(DescriptorError::Truncated {
                required: SUB_DESCRIPTOR_SIZE,
                actual: bytes.len(),
            }
            .into());
        }

        let expected = SUB_WATERMARK_BASE.wrapping_add(index);
        let watermark = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if watermark != expected {
            return Err(DescriptorError::BadWatermark {
                expected,
                actual: watermark,
            }
            .into());
        }

        Ok(Self {
            watermark,
            start_offset: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            size: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            checksum: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        })
    }

    /// End of this blob's payload range (exclusive) in the logical stream.
    pub fn end_offset(&self) -> u64 {
        u64::from(self.start_offset) + u64::from(self.size)
    }
}

/// Byte length of the descriptor region for a bundle of `sub_count` blobs.
pub fn descriptor_region_len(sub_count: u32) -> u64 {
    MAIN_DESCRIPTOR_SIZE as u64 + SUB_DESCRIPTOR_SIZE as u64 * u64::from(sub_count)
}

/// Build the descriptor region for a bundle.
///
/// Assigns the fixed main watermark and index-derived sub watermarks,
/// computes each blob's whole-content checksum, and lays the blobs out at
/// contiguous 4-byte-aligned offsets starting right after the descriptor
/// region.
///
/// # Errors
/// - `DescriptorError::BlobTooLarge` if a blob doesn't fit the u32 size field
/// - `DescriptorError::StreamTooLarge` if the layout overflows the u32
///   offset field
pub fn build_descriptors(blobs: &[&[u8]]) -> Result<(MainDescriptor, Vec<SubDescriptor>)> {
    let main = MainDescriptor::new(blobs.len() as u32);

    let mut cursor = descriptor_region_len(main.sub_count);
    let mut subs = Vec::with_capacity(blobs.len());

    for (index, blob) in blobs.iter().enumerate() {
        let size = u32::try_from(blob.len()).map_err(|_| DescriptorError::BlobTooLarge {
            index,
            size: blob.len(),
        })?;

        let start_offset = u32::try_from(cursor).map_err(|_| DescriptorError::StreamTooLarge {
            bytes: cursor,
            max: u64::from(u32::MAX),
        })?;

        subs.push(SubDescriptor {
            watermark: SUB_WATERMARK_BASE.wrapping_add(index as u32),
            start_offset,
            size,
            checksum: crc::checksum(blob),
        });

        cursor += align4(size);
    }

    Ok((main, subs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align4() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(3), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(5), 8);
        assert_eq!(align4(1024), 1024);
        assert_eq!(align4(u32::MAX), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_main_descriptor_round_trip() {
        let main = MainDescriptor::new(7);
        let bytes = main.to_bytes();

        assert_eq!(bytes.len(), MAIN_DESCRIPTOR_SIZE);
        // Reserved tail stays zero
        assert!(bytes[8..].iter().all(|&b| b == 0));

        let parsed = MainDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, main);
    }

    #[test]
    fn test_main_descriptor_bad_watermark() {
        let mut bytes = MainDescriptor::new(1).to_bytes();
        bytes[0] ^= 0xFF;

        let result = MainDescriptor::from_bytes(&bytes);
        assert!(matches!(
            result,
            Err(crate::error::Error::Descriptor(DescriptorError::BadWatermark { .. }))
        ));
    }

    #[test]
    fn test_main_descriptor_truncated() {
        let result = MainDescriptor::from_bytes(&[0u8; 10]);
        assert!(matches!(
            result,
            Err(crate::error::Error::Descriptor(DescriptorError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_sub_descriptor_round_trip() {
        let sub = SubDescriptor {
            watermark: SUB_WATERMARK_BASE.wrapping_add(3),
            start_offset: 272,
            size: 1000,
            checksum: 0xDEADBEEF,
        };

        let parsed = SubDescriptor::from_bytes(&sub.to_bytes(), 3).unwrap();
        assert_eq!(parsed, sub);
    }

    #[test]
    fn test_sub_descriptor_watermark_is_index_derived() {
        let sub = SubDescriptor {
            watermark: SUB_WATERMARK_BASE.wrapping_add(3),
            start_offset: 272,
            size: 1000,
            checksum: 0,
        };

        // Parsing the same bytes at the wrong index fails the identity check.
        let result = SubDescriptor::from_bytes(&sub.to_bytes(), 4);
        assert!(matches!(
            result,
            Err(crate::error::Error::Descriptor(DescriptorError::BadWatermark { .. }))
        ));
    }

    #[test]
    fn test_build_descriptors_layout() {
        let a = vec![0xAA; 2048];
        let b = vec![0xBB; 1024];
        let blobs: Vec<&[u8]> = vec![&a, &b];

        let (main, subs) = build_descriptors(&blobs).unwrap();

        assert_eq!(main.watermark, MAIN_WATERMARK);
        assert_eq!(main.sub_count, 2);
        assert_eq!(subs.len(), 2);

        let first = descriptor_region_len(2);
        assert_eq!(u64::from(subs[0].start_offset), first);
        assert_eq!(subs[0].size, 2048);
        assert_eq!(subs[1].start_offset, subs[0].start_offset + 2048);

        assert_eq!(subs[0].checksum, crc::checksum(&a));
        assert_eq!(subs[1].checksum, crc::checksum(&b));
    }

    #[test]
    fn test_build_descriptors_aligns_offsets() {
        let a = vec![1u8; 5];
        let b = vec![2u8; 3];
        let c = vec![3u8; 8];
        let blobs: Vec<&[u8]> = vec![&a, &b, &c];

        let (_, subs) = build_descriptors(&blobs).unwrap();

        for window in subs.windows(2) {
            assert_eq!(
                u64::from(window[0].start_offset) + align4(window[0].size),
                u64::from(window[1].start_offset)
            );
            assert_eq!(window[1].start_offset % 4, 0);
        }
    }

    #[test]
    fn test_build_descriptors_empty_bundle() {
        let (main, subs) = build_descriptors(&[]).unwrap();
        assert_eq!(main.sub_count, 0);
        assert!(subs.is_empty());
    }

    #[test]
    fn test_empty_blob_occupies_no_payload() {
        let a: Vec<u8> = Vec::new();
        let b = vec![9u8; 16];
        let blobs: Vec<&[u8]> = vec![&a, &b];

        let (_, subs) = build_descriptors(&blobs).unwrap();

        assert_eq!(subs[0].size, 0);
        assert_eq!(subs[0].checksum, 0);
        assert_eq!(subs[1].start_offset, subs[0].start_offset);
    }
}
