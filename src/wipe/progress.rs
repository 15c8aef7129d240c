// Progress line grammar for streaming copy tools
//
// dd prints `<N> bytes (<X> <unit>[, <Y> <unit>]) copied, <T> s, <S> <unit>/s`
// and redraws the same terminal line with `\r`, so the stream is split on both
// `\r` and `\n`. Anything that does not match is ignored.

use super::state::Eta;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PROGRESS_LINE: Regex = Regex::new(
        r"(?P<bytes>\d+) bytes(?: \([^)]*\))? copied, (?P<elapsed>\d+(?:[.,]\d+)?) s, (?P<rate>\d+(?:[.,]\d+)?) ?(?P<unit>[kKMGT]?i?B)/s"
    )
    .unwrap();
}

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub bytes_copied: u64,
    pub elapsed_secs: f64,
    /// Normalized to MB/s
    pub throughput_mbps: f64,
}

impl ProgressSample {
    pub fn bytes_per_sec(&self) -> f64 {
        self.throughput_mbps * MIB
    }
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.replace(',', ".").parse().ok()
}

/// Convert a rate in `unit`/s to MB/s
pub fn normalize_throughput(value: f64, unit: &str) -> f64 {
    let scale = unit.trim_end_matches("B").trim_end_matches('i');
    match scale.to_ascii_uppercase().as_str() {
        "T" => value * 1024.0 * 1024.0,
        "G" => value * 1024.0,
        "M" => value,
        "K" => value / 1024.0,
        _ => value / MIB,
    }
}

/// Parse one status line; `None` for anything that is not a progress report
pub fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let caps = PROGRESS_LINE.captures(line)?;
    let bytes_copied = caps["bytes"].parse().ok()?;
    let elapsed_secs = parse_decimal(&caps["elapsed"])?;
    let rate = parse_decimal(&caps["rate"])?;

    Some(ProgressSample {
        bytes_copied,
        elapsed_secs,
        throughput_mbps: normalize_throughput(rate, &caps["unit"]),
    })
}

/// Percent of `total` written, clamped to [0, 100]; withheld for an unknown or empty device
pub fn percent_complete(bytes_copied: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(total) if total > 0 => {
            Some((bytes_copied as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
        }
        _ => None,
    }
}

pub fn estimate_eta(bytes_copied: u64, total: Option<u64>, sample: Option<&ProgressSample>) -> Eta {
    let (Some(total), Some(sample)) = (total, sample) else {
        return Eta::Calculating;
    };
    let rate = sample.bytes_per_sec();
    if rate <= 0.0 {
        return Eta::Calculating;
    }
    let remaining = total.saturating_sub(bytes_copied) as f64;
    Eta::Remaining {
        seconds: (remaining / rate).round() as u64,
    }
}

/// Longest line kept; bytes beyond it are dropped until the next terminator
pub const MAX_PENDING_LINE: usize = 4096;

/// Reassembles lines from arbitrarily chunked output
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else if self.pending.len() < MAX_PENDING_LINE {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Whatever was left without a terminator
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}
