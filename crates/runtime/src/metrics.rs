// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deploy profiling metrics.
//!
//! [`DeployMetrics`] collects per-stage timings and per-part transfer sizes
//! for one deploy attempt. They are the main tool for telling a slow link
//! apart from a slow compiler.

use artifact_builder::ArtifactPart;
use std::time::Duration;

/// Metrics for a single artifact part transfer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UploadMetrics {
    pub part: ArtifactPart,
    pub bytes: usize,
    pub duration: Duration,
}

/// Aggregate metrics for one deploy attempt.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct DeployMetrics {
    /// Symbol resolution time.
    pub resolve_duration: Duration,
    /// Compile time; zero when an existing artifact was reused.
    pub build_duration: Duration,
    /// Per-part transfers, in upload order.
    pub uploads: Vec<UploadMetrics>,
    /// Time the peer took to acknowledge the materialize call.
    pub materialize_duration: Duration,
    /// Wall-clock time from the first upload to the ready handle.
    pub total_duration: Duration,
}

impl DeployMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished part transfer.
    pub fn record_upload(&mut self, part: ArtifactPart, bytes: usize, duration: Duration) {
        self.uploads.push(UploadMetrics { part, bytes, duration });
    }

    /// Finalises metrics with the materialize and wall-clock times.
    pub fn finalise(&mut self, materialize: Duration, total: Duration) {
        self.materialize_duration = materialize;
        self.total_duration = total;
    }

    pub fn uploaded_bytes(&self) -> usize {
        self.uploads.iter().map(|u| u.bytes).sum()
    }

    pub fn upload_duration(&self) -> Duration {
        self.uploads.iter().map(|u| u.duration).sum()
    }

    /// Upload throughput in MB/s.
    pub fn throughput_mbps(&self) -> f64 {
        let secs = self.upload_duration().as_secs_f64();
        if secs <= 0.0 || self.uploads.is_empty() {
            return 0.0;
        }
        self.uploaded_bytes() as f64 / (1024.0 * 1024.0) / secs
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Deploy: {:.2}ms total, resolve {:.2}ms, build {:.2}ms, \
             {} parts / {} bytes uploaded in {:.2}ms ({:.1} MB/s), \
             materialize {:.2}ms",
            self.total_duration.as_secs_f64() * 1000.0,
            self.resolve_duration.as_secs_f64() * 1000.0,
            self.build_duration.as_secs_f64() * 1000.0,
            self.uploads.len(),
            self.uploaded_bytes(),
            self.upload_duration().as_secs_f64() * 1000.0,
            self.throughput_mbps(),
            self.materialize_duration.as_secs_f64() * 1000.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = DeployMetrics::new();
        assert_eq!(m.throughput_mbps(), 0.0);
        assert_eq!(m.uploaded_bytes(), 0);
    }

    #[test]
    fn test_record_and_finalise() {
        let mut m = DeployMetrics::new();
        m.record_upload(ArtifactPart::Binary, 1000, Duration::from_millis(5));
        m.record_upload(ArtifactPart::Descriptor, 200, Duration::from_millis(3));
        m.record_upload(ArtifactPart::Parameters, 4000, Duration::from_millis(2));
        m.finalise(Duration::from_millis(7), Duration::from_millis(20));

        assert_eq!(m.uploads.len(), 3);
        assert_eq!(m.uploaded_bytes(), 5200);
        assert_eq!(m.upload_duration(), Duration::from_millis(10));
        assert_eq!(m.materialize_duration, Duration::from_millis(7));
        assert!(m.throughput_mbps() > 0.0);
    }

    #[test]
    fn test_summary_format() {
        let mut m = DeployMetrics::new();
        m.record_upload(ArtifactPart::Binary, 1024, Duration::from_millis(1));
        m.finalise(Duration::from_millis(1), Duration::from_millis(4));

        let s = m.summary();
        assert!(s.contains("Deploy:"));
        assert!(s.contains("1 parts"));
        assert!(s.contains("1024 bytes"));
    }
}
