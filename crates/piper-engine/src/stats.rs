//! Statistics scraped from engine stdout.
//!
//! The engine prints human-readable lines such as
//!
//! ```text
//! Original size: 1024 bytes
//! Compressed size: 612 bytes
//! Space saved: 40.23%
//! ```
//!
//! Any of them may be missing or garbled. Each field falls back to the
//! size measured by the caller independently of the others.

use piper_core::types::{savings_pct, CompressionStats};
use regex::Regex;
use std::sync::LazyLock;

static RE_ORIGINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Original size:(.*?)bytes").unwrap());
static RE_COMPRESSED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Compressed size:(.*?)bytes").unwrap());
static RE_SAVED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Space saved:(.*?)%").unwrap());

/// Build stats from engine stdout, using `original_size` and
/// `compressed_size` for anything the engine did not report.
///
/// Later lines win over earlier ones. Never fails.
pub fn parse_stats(stdout: &str, original_size: u64, compressed_size: u64) -> CompressionStats {
    let mut original = original_size;
    let mut compressed = compressed_size;
    let mut ratio: Option<f64> = None;

    for line in stdout.lines() {
        if let Some(caps) = RE_ORIGINAL.captures(line) {
            if let Ok(n) = caps[1].trim().parse::<u64>() {
                original = n;
            }
        } else if let Some(caps) = RE_COMPRESSED.captures(line) {
            if let Ok(n) = caps[1].trim().parse::<u64>() {
                compressed = n;
            }
        } else if let Some(caps) = RE_SAVED.captures(line) {
            match caps[1].trim().parse::<f64>() {
                Ok(pct) if pct.is_finite() => ratio = Some(pct),
                _ => {}
            }
        }
    }

    CompressionStats {
        original_size: original,
        compressed_size: compressed,
        compression_ratio: ratio.unwrap_or_else(|| savings_pct(original, compressed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_markers() {
        let out = "Compression Algorithm v0.1.0\n\
                   Original size: 1000 bytes\n\
                   Compressed size: 600 bytes\n\
                   Space saved: 40.5%\n";
        let stats = parse_stats(out, 1, 1);
        assert_eq!(stats.original_size, 1000);
        assert_eq!(stats.compressed_size, 600);
        assert_eq!(stats.compression_ratio, 40.5);
    }

    #[test]
    fn test_no_markers_uses_fallback() {
        let stats = parse_stats("done\n", 100, 60);
        assert_eq!(stats.original_size, 100);
        assert_eq!(stats.compressed_size, 60);
        assert_eq!(stats.compression_ratio, 40.0);
    }

    #[test]
    fn test_empty_stdout() {
        let stats = parse_stats("", 8, 8);
        assert_eq!(stats, CompressionStats::from_sizes(8, 8));
    }

    #[test]
    fn test_zero_original_size() {
        let stats = parse_stats("", 0, 0);
        assert_eq!(stats.compression_ratio, 0.0);
        let stats = parse_stats("Compressed size: 12 bytes", 0, 0);
        assert_eq!(stats.compressed_size, 12);
        assert_eq!(stats.compression_ratio, 0.0);
    }

    #[test]
    fn test_ratio_recomputed_from_reported_sizes() {
        let out = "Original size: 200 bytes\nCompressed size: 50 bytes\n";
        let stats = parse_stats(out, 999, 999);
        assert_eq!(stats.compression_ratio, 75.0);
    }

    #[test]
    fn test_partial_fields_fall_back_independently() {
        let stats = parse_stats("Compressed size: 30 bytes", 100, 70);
        assert_eq!(stats.original_size, 100);
        assert_eq!(stats.compressed_size, 30);
        assert_eq!(stats.compression_ratio, 70.0);
    }

    #[test]
    fn test_unparsable_numbers_skipped() {
        let out = "Original size: lots bytes\n\
                   Compressed size: -4 bytes\n\
                   Space saved: NaN%\n";
        let stats = parse_stats(out, 100, 60);
        assert_eq!(stats.original_size, 100);
        assert_eq!(stats.compressed_size, 60);
        assert_eq!(stats.compression_ratio, 40.0);
    }

    #[test]
    fn test_marker_without_unit_ignored() {
        let stats = parse_stats("Original size: 5000\nSpace saved: 12", 10, 5);
        assert_eq!(stats.original_size, 10);
        assert_eq!(stats.compression_ratio, 50.0);
    }

    #[test]
    fn test_reported_zero_ratio_kept() {
        let stats = parse_stats("Space saved: 0.0%", 100, 60);
        assert_eq!(stats.compression_ratio, 0.0);
    }

    #[test]
    fn test_negative_ratio_reported() {
        let stats = parse_stats("Space saved: -12.5%", 100, 112);
        assert_eq!(stats.compression_ratio, -12.5);
    }

    #[test]
    fn test_later_lines_win() {
        let out = "Original size: 10 bytes\nOriginal size: 20 bytes\n";
        assert_eq!(parse_stats(out, 0, 0).original_size, 20);
    }

    #[test]
    fn test_markers_with_prefix_and_crlf() {
        let out = "[info] Original size:   42 bytes\r\n[info] Space saved: 9.75 %\r\n";
        let stats = parse_stats(out, 1, 1);
        assert_eq!(stats.original_size, 42);
        assert_eq!(stats.compression_ratio, 9.75);
    }
}
