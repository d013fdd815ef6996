//! Logging setup for the sitepack CLI.
//!
//! Verbosity is decided in this order: `--verbose` (debug for sitepack
//! crates), `--quiet` (errors only), `RUST_LOG`, then info for sitepack
//! crates.
//!
//! ```rust,no_run
//! use sitepack_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("starting build");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 4] = ["sitepack_cli", "sitepack_bundler", "sitepack_graph", "sitepack_config"];

/// Directive string enabling `level` for every sitepack crate.
pub fn directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(directives("debug"))
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives("info")))
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    // A second call (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(fmt_layer)
        .try_init();
}

/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise ask the terminal.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
