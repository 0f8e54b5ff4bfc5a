//! Receiver side: validate chunks and reassemble the logical stream.
//!
//! The receiver is a small stateful object with a defined lifecycle: created
//! per transfer by parsing the descriptor region, fed fixed-size units until
//! the expected payload byte count is reached, then consumed for its
//! reassembled stream.
//!
//! # Design
//!
//! - **Bounds first**: the declared sub-binary count and stream length are
//!   checked against [`Limits`] before anything is allocated, so a corrupt
//!   main descriptor can't demand unbounded memory.
//! - **Pre-sized stream**: the logical stream (descriptor region + payload,
//!   offset 0 = first MainDescriptor byte) is allocated up front; validated
//!   content is placed at `start_offset + intra_blob_offset`. Alignment gaps
//!   between blobs stay zero.
//! - **Offset cross-check**: each chunk's embedded intra-blob offset must
//!   match the receive cursor. Chunks carry no sub-binary identifier, so the
//!   channel must be ordered and lossless; within that assumption, a dropped
//!   or reordered unit surfaces as [`FrameError::OffsetMismatch`] instead of
//!   silently corrupting the output.
//! - **Byte-count termination**: the receive loop stops once the running
//!   received-byte counter reaches the bundle's total payload size. A short
//!   read before then is `TruncatedInput`, unrecoverable — there is no
//!   retransmission channel.
//!
//! # Bad-chunk policy
//!
//! What happens on an invalid unit is an explicit decision, not an accident:
//! [`BadChunkPolicy::Abort`] (default) fails the transfer with the frame
//! error; [`BadChunkPolicy::Skip`] counts the unit, leaves its slot zeroed,
//! and lets the blob-level verification report the damage per index. Retry is
//! deliberately not offered.

use std::io::Read;

use crate::descriptor::{
    align4, descriptor_region_len, Limits, MainDescriptor, SubDescriptor, MAIN_DESCRIPTOR_SIZE,
    SUB_DESCRIPTOR_SIZE,
};
use crate::error::{DescriptorError, Error, FrameError, Result};
use crate::frame::{Chunk, CHUNK_SIZE, CONTENT_CAPACITY};

/// What to do with a unit that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadChunkPolicy {
    /// Fail the transfer on the first invalid unit (default)
    Abort,

    /// Count the unit, leave its slot zero-filled, keep going; the damaged
    /// blob is reported per-index by verification
    Skip,
}

/// Per-transfer receiver configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReceiveConfig {
    /// Allocation bounds applied to the parsed descriptor region
    pub limits: Limits,

    /// Policy for units that fail validation
    pub bad_chunk: BadChunkPolicy,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            bad_chunk: BadChunkPolicy::Abort,
        }
    }
}

/// Counters describing receiver progress, for metrics.
#[derive(Debug, Clone, Copy)]
pub struct ReceiveStats {
    /// Units that validated and were placed
    pub chunks_accepted: u64,

    /// Units rejected by validation
    pub chunks_rejected: u64,

    /// Content bytes accounted so far
    pub payload_bytes: u64,

    /// Content bytes expected for the whole bundle
    pub payload_expected: u64,
}

/// Reassembles one transfer from a source of fixed-size units.
///
/// Not reusable: one transfer per instance.
pub struct Receiver {
    config: ReceiveConfig,
    main: MainDescriptor,
    subs: Vec<SubDescriptor>,

    /// The logical stream: descriptor region at offset 0, then payload
    stream: Vec<u8>,

    /// Total content bytes the descriptors promise
    payload_total: u64,

    /// Running received-byte counter (drives loop termination)
    received: u64,

    /// Index of the sub-binary currently being filled (== subs.len() when done)
    current_sub: usize,

    /// Expected intra-blob offset of the next chunk
    sub_cursor: u32,

    chunks_accepted: u64,
    chunks_rejected: u64,
}

impl Receiver {
    /// Read and validate the descriptor region, then set up the reassembly
    /// stream.
    ///
    /// # Errors
    /// - `TruncatedInput` if the source ends inside the descriptor region
    /// - `DescriptorError::BadWatermark` on a wrong main or sub magic
    /// - `DescriptorError::TooManySubBinaries` / `StreamTooLarge` when the
    ///   declared layout exceeds the configured limits
    /// - `DescriptorError::BadOffset` if the offsets don't form the
    ///   contiguous aligned layout the sizes imply
    pub fn read_descriptors<R: Read>(source: &mut R, config: ReceiveConfig) -> Result<Self> {
        let mut head = [0u8; MAIN_DESCRIPTOR_SIZE];
        read_unit(source, &mut head, MAIN_DESCRIPTOR_SIZE as u64, 0)?;
        let main = MainDescriptor::from_bytes(&head)?;

        if main.sub_count > config.limits.max_sub_binaries {
            return Err(DescriptorError::TooManySubBinaries {
                count: main.sub_count,
                max: config.limits.max_sub_binaries,
            }
            .into());
        }

        let region_len = descriptor_region_len(main.sub_count);
        let mut subs = Vec::with_capacity(main.sub_count as usize);
        let mut buf = [0u8; SUB_DESCRIPTOR_SIZE];
        for index in 0..main.sub_count {
            let read_so_far =
                MAIN_DESCRIPTOR_SIZE as u64 + u64::from(index) * SUB_DESCRIPTOR_SIZE as u64;
            read_unit(source, &mut buf, region_len, read_so_far)?;
            subs.push(SubDescriptor::from_bytes(&buf, index)?);
        }

        // Check the layout the descriptors claim before sizing the stream:
        // offsets must be contiguous, 4-byte aligned, and start right after
        // the descriptor region.
        let mut cursor = region_len;
        for (index, sub) in subs.iter().enumerate() {
            if u64::from(sub.start_offset) != cursor {
                return Err(DescriptorError::BadOffset {
                    index,
                    expected: cursor,
                    actual: sub.start_offset,
                }
                .into());
            }
            cursor += align4(sub.size);
        }
        if cursor > config.limits.max_stream_bytes {
            return Err(DescriptorError::StreamTooLarge {
                bytes: cursor,
                max: config.limits.max_stream_bytes,
            }
            .into());
        }

        // Lay the descriptor region down at offset 0 so sub-descriptor
        // offsets index the stream directly.
        let mut stream = vec![0u8; cursor as usize];
        stream[..MAIN_DESCRIPTOR_SIZE].copy_from_slice(&main.to_bytes());
        for (index, sub) in subs.iter().enumerate() {
            let at = MAIN_DESCRIPTOR_SIZE + index * SUB_DESCRIPTOR_SIZE;
            stream[at..at + SUB_DESCRIPTOR_SIZE].copy_from_slice(&sub.to_bytes());
        }

        let payload_total = subs.iter().map(|sub| u64::from(sub.size)).sum();

        let mut receiver = Self {
            config,
            main,
            subs,
            stream,
            payload_total,
            received: 0,
            current_sub: 0,
            sub_cursor: 0,
            chunks_accepted: 0,
            chunks_rejected: 0,
        };
        receiver.skip_empty_subs();
        Ok(receiver)
    }

    /// Validate one fixed-size unit and place its content.
    ///
    /// Returns the number of content bytes placed (0 for a skipped unit).
    ///
    /// # Errors
    /// Under `Abort`, any validation failure; under `Skip`, only
    /// `FrameError::UnexpectedChunk` (a unit offered after completion).
    pub fn accept(&mut self, unit: &[u8]) -> Result<usize> {
        if self.is_complete() {
            return Err(FrameError::UnexpectedChunk.into());
        }

        let chunk = match Chunk::from_bytes(unit) {
            Ok(chunk) => chunk,
            Err(err) => return self.reject(err),
        };

        let sub = self.subs[self.current_sub];
        if chunk.intra_blob_offset != self.sub_cursor {
            return self.reject(
                FrameError::OffsetMismatch {
                    expected: self.sub_cursor,
                    actual: chunk.intra_blob_offset,
                }
                .into(),
            );
        }

        let remaining = sub.size - self.sub_cursor;
        if chunk.content.len() as u64 > u64::from(remaining) {
            return self.reject(
                FrameError::BlobOverrun {
                    remaining,
                    got: chunk.content.len(),
                }
                .into(),
            );
        }

        let at = sub.start_offset as usize + self.sub_cursor as usize;
        self.stream[at..at + chunk.content.len()].copy_from_slice(&chunk.content);

        let placed = chunk.content.len();
        self.sub_cursor += placed as u32;
        self.received += placed as u64;
        self.chunks_accepted += 1;
        self.advance_if_blob_done();

        Ok(placed)
    }

    /// Drive the receive loop to completion: consume fixed-size units from
    /// `source` until the received-byte counter reaches the expected total.
    ///
    /// # Errors
    /// `TruncatedInput` if the source ends early; otherwise whatever
    /// `accept` surfaces under the configured policy.
    pub fn run<R: Read>(&mut self, source: &mut R) -> Result<()> {
        let mut unit = [0u8; CHUNK_SIZE];
        while !self.is_complete() {
            read_unit(source, &mut unit, self.payload_total, self.received)?;
            self.accept(&unit)?;
        }
        Ok(())
    }

    /// Whether every expected payload byte has been accounted for.
    pub fn is_complete(&self) -> bool {
        self.received >= self.payload_total
    }

    /// The main descriptor parsed from the stream.
    pub fn main_descriptor(&self) -> &MainDescriptor {
        &self.main
    }

    /// The sub-descriptors parsed from the stream, in index order.
    pub fn descriptors(&self) -> &[SubDescriptor] {
        &self.subs
    }

    /// The reassembled logical stream (descriptor region + payload).
    pub fn stream(&self) -> &[u8] {
        &self.stream
    }

    /// Consume the receiver, keeping only the reassembled stream.
    pub fn into_stream(self) -> Vec<u8> {
        self.stream
    }

    /// Borrow one reconstructed sub-binary by index.
    pub fn sub_binary(&self, index: usize) -> Option<&[u8]> {
        let sub = self.subs.get(index)?;
        let start = sub.start_offset as usize;
        self.stream.get(start..start + sub.size as usize)
    }

    /// Progress counters for metrics.
    pub fn stats(&self) -> ReceiveStats {
        ReceiveStats {
            chunks_accepted: self.chunks_accepted,
            chunks_rejected: self.chunks_rejected,
            payload_bytes: self.received,
            payload_expected: self.payload_total,
        }
    }

    /// Apply the bad-chunk policy to a failed unit.
    fn reject(&mut self, err: Error) -> Result<usize> {
        self.chunks_rejected += 1;
        match self.config.bad_chunk {
            BadChunkPolicy::Abort => Err(err),
            BadChunkPolicy::Skip => {
                // Advance past the slot this unit should have filled; the
                // region stays zero and verification flags the blob.
                let sub = self.subs[self.current_sub];
                let skipped =
                    u64::from(sub.size - self.sub_cursor).min(CONTENT_CAPACITY as u64) as u32;
                self.sub_cursor += skipped;
                self.received += u64::from(skipped);
                self.advance_if_blob_done();
                Ok(0)
            }
        }
    }

    fn advance_if_blob_done(&mut self) {
        if self.sub_cursor >= self.subs[self.current_sub].size {
            self.current_sub += 1;
            self.sub_cursor = 0;
            self.skip_empty_subs();
        }
    }

    /// Empty blobs own no chunks; step over them.
    fn skip_empty_subs(&mut self) {
        while self.current_sub < self.subs.len() && self.subs[self.current_sub].size == 0 {
            self.current_sub += 1;
        }
    }
}

/// `read_exact` with EOF mapped to `TruncatedInput` carrying progress.
fn read_unit<R: Read>(source: &mut R, buf: &mut [u8], expected: u64, got: u64) -> Result<()> {
    source.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::TruncatedInput { expected, got },
        _ => Error::Io(err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmit::transmit;
    use std::io::Cursor;

    fn staged(blobs: &[&[u8]]) -> Vec<u8> {
        let mut stream = Vec::new();
        transmit(blobs, &mut stream).unwrap();
        stream
    }

    fn receive_all(stream: &[u8], config: ReceiveConfig) -> Result<Receiver> {
        let mut source = Cursor::new(stream);
        let mut receiver = Receiver::read_descriptors(&mut source, config)?;
        receiver.run(&mut source)?;
        Ok(receiver)
    }

    #[test]
    fn test_round_trip_two_blobs() {
        let a = vec![0xAA; 2048];
        let b = vec![0xBB; 1024];
        let stream = staged(&[&a, &b]);

        let receiver = receive_all(&stream, ReceiveConfig::default()).unwrap();

        assert!(receiver.is_complete());
        assert_eq!(receiver.sub_binary(0).unwrap(), &a[..]);
        assert_eq!(receiver.sub_binary(1).unwrap(), &b[..]);

        let stats = receiver.stats();
        assert_eq!(stats.payload_bytes, 2048 + 1024);
        assert_eq!(stats.chunks_rejected, 0);
    }

    #[test]
    fn test_round_trip_unaligned_and_empty_blobs() {
        let a = vec![0x11; 3];
        let b: Vec<u8> = Vec::new();
        let c = vec![0x33; CONTENT_CAPACITY + 1];
        let stream = staged(&[&a, &b, &c]);

        let receiver = receive_all(&stream, ReceiveConfig::default()).unwrap();

        assert_eq!(receiver.sub_binary(0).unwrap(), &a[..]);
        assert_eq!(receiver.sub_binary(1).unwrap(), &b[..]);
        assert_eq!(receiver.sub_binary(2).unwrap(), &c[..]);
    }

    #[test]
    fn test_empty_bundle_completes_immediately() {
        let stream = staged(&[]);
        let receiver = receive_all(&stream, ReceiveConfig::default()).unwrap();
        assert!(receiver.is_complete());
    }

    #[test]
    fn test_too_many_sub_binaries_rejected_before_allocation() {
        let head = MainDescriptor::new(u32::MAX).to_bytes();

        let result = Receiver::read_descriptors(&mut Cursor::new(&head), ReceiveConfig::default());
        assert!(matches!(
            result,
            Err(Error::Descriptor(DescriptorError::TooManySubBinaries { .. }))
        ));
    }

    #[test]
    fn test_stream_too_large_rejected() {
        let a = vec![0u8; 4096];
        let stream = staged(&[&a]);

        let config = ReceiveConfig {
            limits: Limits {
                max_stream_bytes: 1024,
                ..Limits::default()
            },
            ..ReceiveConfig::default()
        };

        let result = receive_all(&stream, config);
        assert!(matches!(
            result,
            Err(Error::Descriptor(DescriptorError::StreamTooLarge { .. }))
        ));
    }

    #[test]
    fn test_bad_declared_offset_rejected() {
        let a = vec![0u8; 64];
        let mut stream = staged(&[&a]);

        // Corrupt the sub-descriptor's start_offset field (bytes 4..8 of the
        // descriptor at offset 16), keeping the watermark intact.
        stream[MAIN_DESCRIPTOR_SIZE + 4] ^= 0x01;

        let result = receive_all(&stream, ReceiveConfig::default());
        assert!(matches!(
            result,
            Err(Error::Descriptor(DescriptorError::BadOffset { index: 0, .. }))
        ));
    }

    #[test]
    fn test_reordered_units_detected() {
        // Three chunks for one blob; swapping two units desynchronizes the
        // intra-blob offsets.
        let a = vec![0x77; CONTENT_CAPACITY * 2 + 10];
        let mut stream = staged(&[&a]);

        let region = stream.len() - 3 * CHUNK_SIZE;
        let (first, rest) = stream[region..].split_at_mut(CHUNK_SIZE);
        first.swap_with_slice(&mut rest[..CHUNK_SIZE]);

        let result = receive_all(&stream, ReceiveConfig::default());
        assert!(matches!(
            result,
            Err(Error::Frame(FrameError::OffsetMismatch { .. }))
        ));
    }

    #[test]
    fn test_corrupt_unit_aborts_by_default() {
        let a = vec![0x42; 100];
        let mut stream = staged(&[&a]);

        // Flip a content byte inside the first (only) chunk's data region.
        let unit_start = stream.len() - CHUNK_SIZE;
        stream[unit_start + 10] ^= 0xFF;

        let result = receive_all(&stream, ReceiveConfig::default());
        assert!(matches!(
            result,
            Err(Error::Frame(FrameError::ChecksumMismatch { .. }))
        ));
    }

    #[test]
    fn test_skip_policy_leaves_slot_zeroed() {
        let a = vec![0x42; CONTENT_CAPACITY + 100];
        let mut stream = staged(&[&a]);

        // Corrupt the second chunk's content.
        let unit_start = stream.len() - CHUNK_SIZE;
        stream[unit_start + 10] ^= 0xFF;

        let config = ReceiveConfig {
            bad_chunk: BadChunkPolicy::Skip,
            ..ReceiveConfig::default()
        };
        let receiver = receive_all(&stream, config).unwrap();

        let stats = receiver.stats();
        assert_eq!(stats.chunks_accepted, 1);
        assert_eq!(stats.chunks_rejected, 1);

        let blob = receiver.sub_binary(0).unwrap();
        assert_eq!(&blob[..CONTENT_CAPACITY], &a[..CONTENT_CAPACITY]);
        assert!(blob[CONTENT_CAPACITY..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_truncated_stream() {
        let a = vec![0x42; CONTENT_CAPACITY * 2];
        let stream = staged(&[&a]);

        let cut = &stream[..stream.len() - CHUNK_SIZE];
        let result = receive_all(cut, ReceiveConfig::default());
        assert!(matches!(result, Err(Error::TruncatedInput { .. })));
    }

    #[test]
    fn test_unit_after_completion_rejected() {
        let a = vec![0x42; 10];
        let stream = staged(&[&a]);

        let mut receiver = receive_all(&stream, ReceiveConfig::default()).unwrap();

        let result = receiver.accept(&[0u8; CHUNK_SIZE]);
        assert!(matches!(
            result,
            Err(Error::Frame(FrameError::UnexpectedChunk))
        ));
    }

    #[test]
    fn test_logical_stream_starts_with_descriptors() {
        let a = vec![0x42; 10];
        let stream = staged(&[&a]);

        let receiver = receive_all(&stream, ReceiveConfig::default()).unwrap();

        let main = MainDescriptor::from_bytes(&receiver.stream()[..MAIN_DESCRIPTOR_SIZE]).unwrap();
        assert_eq!(main.sub_count, 1);
    }
}
