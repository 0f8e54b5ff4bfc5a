//! Metrics collection and reporting for the transfer system.
//!
//! This module provides observable insights into system behavior:
//! - Sender counters (descriptor bytes, chunks, payload, framing overhead)
//! - Receiver counters (accepted/rejected units, placed bytes)
//! - Verification results per bundle
//! - Timing information
//!
//! # Design
//!
//! Metrics are collected in a simple struct with explicit updates at each
//! pipeline stage. The pipeline is single-threaded, so no synchronization is
//! involved; for multi-threaded use, keep per-thread metrics and merge.

use std::time::{Duration, Instant};

/// Comprehensive metrics for one transfer.
///
/// Tracks counts, bytes, and timing across all pipeline stages.
#[derive(Debug, Clone)]
pub struct TransferMetrics {
    // === Timing ===
    /// When the transfer started
    pub start_time: Instant,

    /// When the transfer ended (set on completion)
    pub end_time: Option<Instant>,

    // === Sender ===
    /// Total content bytes across the input bundle
    pub input_bytes: u64,

    /// Bytes of descriptor region written
    pub descriptor_bytes: u64,

    /// Fixed-size chunk units emitted
    pub chunks_emitted: u64,

    /// Content bytes carried in emitted chunks
    pub payload_bytes_sent: u64,

    /// Total bytes written to the channel
    pub stream_bytes: u64,

    // === Receiver ===
    /// Units that validated and were placed
    pub chunks_accepted: u64,

    /// Units rejected by validation
    pub chunks_rejected: u64,

    /// Content bytes placed into the reassembly stream
    pub payload_bytes_received: u64,

    // === Verification ===
    /// Sub-binaries in the bundle
    pub subs_total: u64,

    /// Sub-binaries whose whole-blob checksum matched
    pub subs_verified: u64,

    /// Sub-binaries that failed verification
    pub subs_failed: u64,
}

impl TransferMetrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            input_bytes: 0,
            descriptor_bytes: 0,
            chunks_emitted: 0,
            payload_bytes_sent: 0,
            stream_bytes: 0,
            chunks_accepted: 0,
            chunks_rejected: 0,
            payload_bytes_received: 0,
            subs_total: 0,
            subs_verified: 0,
            subs_failed: 0,
        }
    }

    /// Mark the transfer as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Framing overhead: channel bytes per content byte.
    ///
    /// Returns 0.0 if nothing was sent.
    pub fn framing_overhead(&self) -> f64 {
        if self.input_bytes == 0 {
            0.0
        } else {
            self.stream_bytes as f64 / self.input_bytes as f64
        }
    }

    /// Rejection rate (rejected / consumed units).
    pub fn rejection_rate(&self) -> f64 {
        let consumed = self.chunks_accepted + self.chunks_rejected;
        if consumed == 0 {
            0.0
        } else {
            self.chunks_rejected as f64 / consumed as f64
        }
    }

    /// Compute throughput in bytes/second.
    pub fn throughput_bps(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.input_bytes as f64 / duration_secs
        }
    }

    /// Whether the transfer delivered and verified everything.
    pub fn is_success(&self) -> bool {
        self.subs_failed == 0
            && self.subs_verified == self.subs_total
            && self.payload_bytes_received == self.input_bytes
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        let duration_ms = self.duration().as_millis();

        println!("\n=== Transfer Summary ===");
        println!("Duration: {} ms", duration_ms);
        println!();

        println!("=== Sender ===");
        println!("Input: {} bytes across {} sub-binaries", self.input_bytes, self.subs_total);
        println!("Descriptor region: {} bytes", self.descriptor_bytes);
        println!("Chunks emitted: {}", self.chunks_emitted);
        println!("Stream: {} bytes ({:.2}x framing overhead)", self.stream_bytes, self.framing_overhead());
        println!();

        println!("=== Receiver ===");
        println!("Chunks accepted: {}", self.chunks_accepted);
        println!("Chunks rejected: {} ({:.2}%)", self.chunks_rejected, self.rejection_rate() * 100.0);
        println!("Payload placed: {} bytes", self.payload_bytes_received);
        println!();

        println!("=== Verification ===");
        println!("Sub-binaries verified: {}/{}", self.subs_verified, self.subs_total);
        if self.subs_failed > 0 {
            println!("Sub-binaries failed: {}", self.subs_failed);
        }
        println!();

        println!("=== Performance ===");
        println!("Throughput: {:.2} MB/s", self.throughput_bps() / 1_000_000.0);
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.is_success() {
            println!("✓ Binary transfer successful and validated");
            println!(
                "  {} bytes in {} sub-binaries transferred in {} ms",
                self.input_bytes,
                self.subs_total,
                self.duration().as_millis()
            );
        } else if self.subs_failed > 0 {
            println!("✗ Transfer failed: {} sub-binaries failed verification", self.subs_failed);
        } else if self.payload_bytes_received != self.input_bytes {
            println!(
                "✗ Transfer failed: payload mismatch ({} != {})",
                self.payload_bytes_received, self.input_bytes
            );
        } else {
            println!("✗ Transfer failed: verification incomplete");
        }
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             input_bytes={}\n\
             descriptor_bytes={}\n\
             chunks_emitted={}\n\
             stream_bytes={}\n\
             framing_overhead={:.4}\n\
             chunks_accepted={}\n\
             chunks_rejected={}\n\
             rejection_rate={:.4}\n\
             payload_bytes_received={}\n\
             subs_verified={}\n\
             subs_failed={}\n",
            self.duration().as_millis(),
            self.input_bytes,
            self.descriptor_bytes,
            self.chunks_emitted,
            self.stream_bytes,
            self.framing_overhead(),
            self.chunks_accepted,
            self.chunks_rejected,
            self.rejection_rate(),
            self.payload_bytes_received,
            self.subs_verified,
            self.subs_failed,
        )
    }
}

impl Default for TransferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = TransferMetrics::new();
        assert!(metrics.end_time.is_none());
        assert!(metrics.duration().as_millis() < 100); // Should be recent
    }

    #[test]
    fn test_framing_overhead() {
        let mut metrics = TransferMetrics::new();
        metrics.input_bytes = 1000;
        metrics.stream_bytes = 2000;

        assert_eq!(metrics.framing_overhead(), 2.0);
    }

    #[test]
    fn test_framing_overhead_no_input() {
        let metrics = TransferMetrics::new();
        assert_eq!(metrics.framing_overhead(), 0.0);
    }

    #[test]
    fn test_rejection_rate() {
        let mut metrics = TransferMetrics::new();
        metrics.chunks_accepted = 95;
        metrics.chunks_rejected = 5;

        assert_eq!(metrics.rejection_rate(), 0.05);
    }

    #[test]
    fn test_is_success() {
        let mut metrics = TransferMetrics::new();
        metrics.input_bytes = 1000;
        metrics.payload_bytes_received = 1000;
        metrics.subs_total = 2;
        metrics.subs_verified = 2;

        assert!(metrics.is_success());

        metrics.subs_failed = 1;
        assert!(!metrics.is_success());
    }

    #[test]
    fn test_throughput() {
        let mut metrics = TransferMetrics::new();
        metrics.input_bytes = 1_000_000;

        std::thread::sleep(Duration::from_millis(100));
        metrics.complete();

        let throughput = metrics.throughput_bps();
        assert!(throughput > 0.0);
    }

    #[test]
    fn test_export_text() {
        let mut metrics = TransferMetrics::new();
        metrics.input_bytes = 1000;
        metrics.chunks_emitted = 10;
        metrics.subs_verified = 2;

        let text = metrics.export_text();
        assert!(text.contains("input_bytes=1000"));
        assert!(text.contains("chunks_emitted=10"));
        assert!(text.contains("subs_verified=2"));
    }
}
