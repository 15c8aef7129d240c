// Plain-text analysis report
//
// Shared by `scan --verbose`, `device` and `scan --export`. No colour codes:
// the same text is written to files.

use crate::drives::is_executable;
use crate::{ClassifiedDevice, DeviceClass};
use chrono::{DateTime, Local};
use colored::Colorize;
use std::fmt::Write;

const RULE_WIDTH: usize = 100;

pub fn class_icon(class: DeviceClass) -> &'static str {
    match class {
        DeviceClass::HDD => "💾",
        DeviceClass::SataSSD => "💿",
        DeviceClass::NVMe => "⚡",
        DeviceClass::USB => "🔌",
        DeviceClass::Unknown => "❓",
    }
}

/// Devices per classification, in `DeviceClass::ALL` order, omitting empty classes
pub fn summary_counts(devices: &[ClassifiedDevice]) -> Vec<(DeviceClass, usize)> {
    DeviceClass::ALL
        .iter()
        .map(|class| {
            let count = devices
                .iter()
                .filter(|d| d.classification == *class)
                .count();
            (*class, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
}

/// One-line listing used by the non-verbose scan
pub fn render_device_summary(device: &ClassifiedDevice) -> String {
    format!(
        "{} {} - {}\n    Model: {} | Size: {}\n",
        class_icon(device.classification),
        device.path,
        device.classification,
        device.model,
        device.size
    )
}

/// Full section for one device: identity, evidence trail and commands
pub fn render_device(index: usize, device: &ClassifiedDevice) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} DEVICE {}: {}",
        class_icon(device.classification),
        index,
        device.path
    );
    let _ = writeln!(out, "    Model: {}", device.model);
    let _ = writeln!(out, "    Size: {}", device.size);
    let _ = writeln!(out, "    Transport: {}", device.transport);
    let _ = writeln!(out, "    Classification: {}", device.classification);
    out.push('\n');

    out.push_str("    Evidence Trail:\n");
    for evidence in &device.evidence {
        let _ = writeln!(out, "      • {}", evidence);
    }

    out.push_str("\n    Recommended Secure Wipe Commands:\n");
    for command in &device.wipe_commands {
        let marker = if is_executable(command) { "⚡" } else { "💬" };
        let _ = writeln!(out, "      {} {}", marker, command);
    }
    out
}

/// `render_device` with terminal highlighting: bold header, class verdict in
/// red or green, note-only commands dimmed. Text is otherwise identical.
pub fn render_device_colored(index: usize, device: &ClassifiedDevice) -> String {
    let verdict = format!("    Classification: {}", device.classification);
    let mut out = String::new();
    for (i, line) in render_device(index, device).lines().enumerate() {
        let styled = if i == 0 {
            line.bold().to_string()
        } else if line == verdict {
            match device.classification {
                DeviceClass::Unknown => line.red().bold().to_string(),
                _ => line.green().bold().to_string(),
            }
        } else if line.trim_start().starts_with('💬') {
            line.dimmed().to_string()
        } else {
            line.to_string()
        };
        out.push_str(&styled);
        out.push('\n');
    }
    out
}

/// Complete report: header, one section per device, summary statistics
pub fn render_report(devices: &[ClassifiedDevice], generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str("SECURE WIPE ANALYSIS REPORT\n");
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Devices Found: {}", devices.len());
    let _ = writeln!(out, "{}\n", "=".repeat(RULE_WIDTH));

    if devices.is_empty() {
        out.push_str("No storage devices found.\n\n");
    }

    for (i, device) in devices.iter().enumerate() {
        out.push_str(&render_device(i + 1, device));
        let _ = writeln!(out, "\n{}\n", "-".repeat(RULE_WIDTH));
    }

    out.push_str("SUMMARY STATISTICS\n");
    let _ = writeln!(out, "{}", "=".repeat(50));
    for (class, count) in summary_counts(devices) {
        let _ = writeln!(out, "{} {}: {} device(s)", class_icon(class), class, count);
    }
    let _ = writeln!(out, "\n📊 Total Devices Analyzed: {}", devices.len());
    out
}
