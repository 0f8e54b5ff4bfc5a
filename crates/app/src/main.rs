//! binxfer: end-to-end driver for the chunked multi-blob transfer pipeline.
//!
//! Plays both ends of the wire against a staging file that stands in for the
//! channel: generate a bundle, transmit it (device A), receive and reassemble
//! it (device B), then verify every sub-binary against its descriptor and
//! report metrics.

mod config;
mod input_gen;

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::process::ExitCode;

use binxfer_core::error::{Error, VerifyError};
use binxfer_core::metrics::TransferMetrics;
use binxfer_core::receive::{BadChunkPolicy, ReceiveConfig, Receiver};
use binxfer_core::transmit::transmit;
use binxfer_core::verify::verify_reader;

use config::Config;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {}", message);
            eprintln!("run with --help for usage");
            return ExitCode::from(2);
        }
    };

    if config.print_config {
        config.print();
    }

    match run(&config) {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> binxfer_core::Result<bool> {
    let mut metrics = TransferMetrics::new();

    // Device A: build the bundle and send it through the channel file.
    let bundle = input_gen::generate_bundle(
        config.seed,
        config.sub_count,
        config.min_size,
        config.max_size,
    );
    let blobs: Vec<&[u8]> = bundle.iter().map(|blob| blob.as_slice()).collect();
    metrics.input_bytes = blobs.iter().map(|blob| blob.len() as u64).sum();
    metrics.subs_total = blobs.len() as u64;

    let mut sink = BufWriter::new(File::create(&config.channel_file)?);
    let summary = transmit(&blobs, &mut sink)?;
    sink.flush()?;
    drop(sink);

    metrics.descriptor_bytes = summary.descriptor_bytes;
    metrics.chunks_emitted = summary.chunks_written;
    metrics.payload_bytes_sent = summary.payload_bytes;
    metrics.stream_bytes = summary.stream_bytes;

    // Optional fault injection: corrupt one byte of the staged stream so the
    // detection path is observable.
    if let Some(offset) = config.flip_offset {
        flip_byte(&config.channel_file, offset)?;
    }

    // Device B: consume the channel file and reassemble.
    let receive_config = ReceiveConfig {
        bad_chunk: if config.skip_bad {
            BadChunkPolicy::Skip
        } else {
            BadChunkPolicy::Abort
        },
        ..ReceiveConfig::default()
    };

    let mut source = BufReader::new(File::open(&config.channel_file)?);
    let mut receiver = Receiver::read_descriptors(&mut source, receive_config)?;
    receiver.run(&mut source)?;

    let stats = receiver.stats();
    metrics.chunks_accepted = stats.chunks_accepted;
    metrics.chunks_rejected = stats.chunks_rejected;
    metrics.payload_bytes_received = stats.payload_bytes;

    // Persist the reassembled store, then verify it the way a device would:
    // seeking each sub-binary by its descriptor offset.
    let subs = receiver.descriptors().to_vec();
    std::fs::write(&config.output_file, receiver.into_stream())?;

    let mut store = File::open(&config.output_file)?;
    match verify_reader(&mut store, &subs) {
        Ok(()) => {
            metrics.subs_verified = subs.len() as u64;
        }
        Err(Error::Verify(verify_err)) => {
            let index = match &verify_err {
                VerifyError::ChecksumMismatch { index, .. }
                | VerifyError::RangeOutOfBounds { index, .. } => *index,
            };
            eprintln!("verification failed: {}", verify_err);
            metrics.subs_verified = index as u64;
            metrics.subs_failed = 1;
        }
        Err(err) => return Err(err),
    }

    metrics.complete();

    if config.print_metrics {
        metrics.print_summary();
    }
    metrics.print_result();

    Ok(metrics.is_success())
}

/// Flip one byte of the staged stream in place.
fn flip_byte(path: &Path, offset: u64) -> binxfer_core::Result<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;

    let mut byte = [0u8; 1];
    file.read_exact(&mut byte)?;
    byte[0] ^= 0xFF;

    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&byte)?;
    Ok(())
}
