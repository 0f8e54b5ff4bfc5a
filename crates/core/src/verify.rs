//! Whole-blob verification after reassembly.
//!
//! Per-chunk checksums catch single-unit corruption in flight; this second
//! level re-reads each reconstructed sub-binary by its recorded offset and
//! size and recomputes the whole-blob checksum against the descriptor,
//! catching cumulative damage the chunk checks can miss (skipped units,
//! placement bugs, corruption of the reassembled store itself).
//!
//! Verification walks descriptors in index order and stops at the first
//! mismatch, reporting the failing index; the transfer as a whole succeeds
//! only if every blob passes.

use std::io::{Read, Seek, SeekFrom};

use crate::crc;
use crate::descriptor::SubDescriptor;
use crate::error::{Error, Result, VerifyError};

/// Verify every sub-binary inside an in-memory logical stream.
///
/// # Errors
/// - `VerifyError::RangeOutOfBounds` if a descriptor points outside the stream
/// - `VerifyError::ChecksumMismatch` with the first failing index
pub fn verify_slice(stream: &[u8], subs: &[SubDescriptor]) -> Result<()> {
    for (index, sub) in subs.iter().enumerate() {
        let start = u64::from(sub.start_offset);
        let end = sub.end_offset();
        if end > stream.len() as u64 {
            return Err(VerifyError::RangeOutOfBounds {
                index,
                start,
                end,
                len: stream.len() as u64,
            }
            .into());
        }

        check_blob(index, &stream[start as usize..end as usize], sub)?;
    }
    Ok(())
}

/// Verify every sub-binary by seeking a reassembled store (e.g., the written
/// output file), mirroring the wire contract: the source only needs
/// sequential reads plus seek-by-offset.
///
/// # Errors
/// Same as [`verify_slice`], with `TruncatedInput` if the store is shorter
/// than a descriptor's range.
pub fn verify_reader<R: Read + Seek>(source: &mut R, subs: &[SubDescriptor]) -> Result<()> {
    for (index, sub) in subs.iter().enumerate() {
        source.seek(SeekFrom::Start(u64::from(sub.start_offset)))?;

        let mut blob = vec![0u8; sub.size as usize];
        source.read_exact(&mut blob).map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::TruncatedInput {
                expected: sub.end_offset(),
                got: u64::from(sub.start_offset),
            },
            _ => Error::Io(err),
        })?;

        check_blob(index, &blob, sub)?;
    }
    Ok(())
}

fn check_blob(index: usize, blob: &[u8], sub: &SubDescriptor) -> Result<()> {
    let actual = crc::checksum(blob);
    if actual != sub.checksum {
        return Err(VerifyError::ChecksumMismatch {
            index,
            expected: sub.checksum,
            actual,
        }
        .into());
    }
    Ok(())
}
