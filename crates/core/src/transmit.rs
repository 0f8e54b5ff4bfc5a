//! Sender side: serialize a bundle onto a byte sink.
//!
//! The stream order is fixed: MainDescriptor, then every SubDescriptor in
//! index order, then every chunk of every blob in order. There is no feedback
//! channel from the receiver, so a transfer is write-and-forget.

use std::io::Write;

use crate::descriptor::{build_descriptors, descriptor_region_len};
use crate::error::Result;
use crate::frame::{ChunkEncoder, CHUNK_SIZE};

/// Counters describing one completed transmission, for metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransmitSummary {
    /// Number of sub-binaries in the bundle
    pub sub_binaries: u32,

    /// Bytes of descriptor region written
    pub descriptor_bytes: u64,

    /// Fixed-size chunk units written
    pub chunks_written: u64,

    /// Content bytes carried inside chunks (excludes framing and prefixes)
    pub payload_bytes: u64,

    /// Total bytes written to the sink
    pub stream_bytes: u64,
}

/// Serialize a whole bundle onto `sink`.
///
/// Descriptors are computed up front (immutable from then on), written first,
/// and followed by the chunk stream. Returns counters for metrics.
///
/// # Errors
/// `DescriptorError::BlobTooLarge` for blobs exceeding the u32 size field;
/// `Error::Io` for sink failures.
pub fn transmit<W: Write>(blobs: &[&[u8]], sink: &mut W) -> Result<TransmitSummary> {
    let (main, subs) = build_descriptors(blobs)?;

    sink.write_all(&main.to_bytes())?;
    for sub in &subs {
        sink.write_all(&sub.to_bytes())?;
    }

    let mut summary = TransmitSummary {
        sub_binaries: main.sub_count,
        descriptor_bytes: descriptor_region_len(main.sub_count),
        ..TransmitSummary::default()
    };

    let mut encoder = ChunkEncoder::new();
    for blob in blobs {
        for chunk in encoder.encode_blob(blob) {
            sink.write_all(&chunk.to_bytes())?;
            summary.chunks_written += 1;
            summary.payload_bytes += chunk.content.len() as u64;
        }
    }

    summary.stream_bytes = summary.descriptor_bytes + summary.chunks_written * CHUNK_SIZE as u64;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MainDescriptor, MAIN_DESCRIPTOR_SIZE};
    use crate::frame::{chunks_for, START_OF_MESSAGE};

    #[test]
    fn test_stream_layout() {
        let a = vec![0xAA; 2048];
        let b = vec![0xBB; 1024];
        let blobs: Vec<&[u8]> = vec![&a, &b];

        let mut stream = Vec::new();
        let summary = transmit(&blobs, &mut stream).unwrap();

        let expected_chunks = (chunks_for(2048) + chunks_for(1024)) as u64;
        assert_eq!(summary.chunks_written, expected_chunks);
        assert_eq!(summary.payload_bytes, 2048 + 1024);
        assert_eq!(summary.stream_bytes, stream.len() as u64);
        assert_eq!(
            stream.len() as u64,
            summary.descriptor_bytes + expected_chunks * CHUNK_SIZE as u64
        );

        // Main descriptor leads the stream; the first chunk starts right
        // after the descriptor region.
        let main = MainDescriptor::from_bytes(&stream[..MAIN_DESCRIPTOR_SIZE]).unwrap();
        assert_eq!(main.sub_count, 2);
        assert_eq!(stream[summary.descriptor_bytes as usize], START_OF_MESSAGE);
    }

    #[test]
    fn test_empty_bundle_is_descriptor_only() {
        let mut stream = Vec::new();
        let summary = transmit(&[], &mut stream).unwrap();

        assert_eq!(summary.chunks_written, 0);
        assert_eq!(stream.len(), MAIN_DESCRIPTOR_SIZE);
    }

    #[test]
    fn test_empty_blob_emits_no_chunks() {
        let a: Vec<u8> = Vec::new();
        let blobs: Vec<&[u8]> = vec![&a];

        let mut stream = Vec::new();
        let summary = transmit(&blobs, &mut stream).unwrap();

        assert_eq!(summary.chunks_written, 0);
        assert_eq!(summary.payload_bytes, 0);
    }
}
