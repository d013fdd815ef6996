//! Terminal output: status lines and build summaries.
//!
//! Messages go to stderr so stdout stays free for machine-readable output
//! (`check --json`).

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary, print_diagnostics};
pub use messages::{error, info, success, warning};

/// Whether a CI environment variable is set.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Apply `--no-color` (and `NO_COLOR`) to everything printed through this module.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && crate::logger::should_use_colors();
    owo_colors::set_override(enabled);
    console::set_colors_enabled_stderr(enabled);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn detects_ci() {
        unsafe {
            std::env::set_var("GITLAB_CI", "true");
        }
        assert!(is_ci());
        unsafe {
            std::env::remove_var("GITLAB_CI");
        }
    }
}
