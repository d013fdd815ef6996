//! Sizes, durations and the build summary table.

use std::time::Duration;

use console::Term;
use owo_colors::OwoColorize;
use sitepack_bundler::{BuildReport, TransformError};

/// ```
/// use sitepack_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

/// ```
/// use std::time::Duration;
/// use sitepack_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print every output of `report` with its size. Emitted files are marked.
pub fn print_build_summary(report: &BuildReport) {
    let width = (Term::stderr().size().1 as usize).min(80);

    eprintln!("\n{}", format!("Build #{} ({})", report.build, report.mode).bold().underline());
    eprintln!("{}", "─".repeat(width));

    for asset in &report.assets {
        let marker = if report.emitted.contains(&asset.path) { "▸" } else { " " };
        eprintln!(
            "  {} {} {}",
            marker.blue(),
            asset.path.bright_white(),
            format_size(asset.size as u64).dimmed()
        );
    }
    for removed in &report.removed {
        eprintln!("  {} {}", "-".red(), removed.dimmed());
    }

    eprintln!("{}", "─".repeat(width));
    eprintln!(
        "  {} {} in {} ({} transformed, {} reused)",
        "Total:".bold(),
        format_size(report.total_size() as u64).green(),
        format_duration(report.duration).green(),
        report.transformed,
        report.reused
    );
}

/// Print transform failures tolerated by a development build.
pub fn print_diagnostics(diagnostics: &[TransformError]) {
    for diagnostic in diagnostics {
        super::warning(&diagnostic.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
