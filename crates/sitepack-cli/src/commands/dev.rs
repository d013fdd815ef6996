//! `sitepack dev`.
//!
//! Development build kept in memory, a file watcher feeding debounced
//! rebuilds, and an HTTP server pushing updates to the browser. Runs until
//! Ctrl+C.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sitepack_bundler::{BuildError, BuildReport, BuildSession, OutputTarget};
use sitepack_config::BuildMode;
use sitepack_graph::runtime::NativeRuntime;
use tokio::sync::watch;

use super::utils::{
    DevOverrides, Overrides, load_config, resolve_root, shutdown_signal, watch_ignores,
};
use crate::cli::DevArgs;
use crate::dev::{
    BuildHandler, ChangeBatch, Coordinator, DevServer, DevState, FileWatcher, SharedState,
    debounce,
};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: DevArgs) -> Result<()> {
    let root = resolve_root(args.config.cwd.as_deref())?;
    let overrides = Overrides {
        dev: DevOverrides {
            host: args.host.clone(),
            port: args.port,
            open: args.open.then_some(true),
        },
        ..Overrides::default()
    };
    let config = load_config(&root, &args.config, &overrides)?;
    let dev = config.dev.clone();
    let ignores = watch_ignores(&config);

    let session = BuildSession::with_runtime(
        &root,
        config,
        BuildMode::Development,
        Arc::new(NativeRuntime),
        OutputTarget::Memory,
    )?
    .watching();

    let state: SharedState = Arc::new(DevState::new());
    let coordinator = Coordinator::new(session, ServerHandler { state: Arc::clone(&state) });

    ui::info("Initial build...");
    if !coordinator.build_now().await {
        ui::warning("Initial build failed; serving the error page until the next successful build");
    }

    let (watcher, changes) = FileWatcher::new(root.clone(), ignores)?;
    let server = DevServer::bind(&dev.host, dev.port, Arc::clone(&state)).await?;
    let url = server.url();

    // One signal stops both the server and the rebuild loop.
    let (stop_tx, stop_rx) = watch::channel(false);
    let server_task = tokio::spawn(server.serve(stopped(stop_rx)));

    ui::success(&format!("Dev server running at {url}"));
    ui::info(&format!("Watching {} (Ctrl+C to stop)", watcher.root().display()));
    if dev.open {
        open_browser(&url);
    }

    let shutdown = async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    };
    coordinator
        .run(debounce(changes, Duration::from_millis(dev.debounce_ms)), shutdown)
        .await;

    drop(watcher);
    ui::info("Shutting down");
    match server_task.await {
        Ok(result) => result,
        Err(err) => Err(crate::error::CliError::Server(err.to_string())),
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    // A dropped sender also means stop.
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Publishes build results to the dev server and the terminal.
struct ServerHandler {
    state: SharedState,
}

impl BuildHandler for ServerHandler {
    fn started(&self, batch: &ChangeBatch, root: &Path) {
        ui::info(&format!("Change in {}, rebuilding", batch.describe(root)));
        let changed = batch
            .paths()
            .map(|path| path.strip_prefix(root).unwrap_or(path).display().to_string())
            .collect();
        self.state.start_build(changed);
    }

    fn finished(
        &self,
        result: &std::result::Result<BuildReport, BuildError>,
        session: &BuildSession,
    ) {
        match result {
            Ok(report) => {
                self.state.complete_build(report, session.assets(), session.document_path());
                ui::print_diagnostics(&report.diagnostics);
                ui::success(&format!(
                    "Build #{} ready in {} ({} transformed)",
                    report.build,
                    ui::format_duration(report.duration),
                    report.transformed
                ));
            }
            Err(err) => {
                self.state.fail_build(err.to_string());
                ui::error(&format!("Build failed: {err}"));
            }
        }
    }
}

fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(url).spawn();

    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd").args(["/C", "start", url]).spawn();

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = std::process::Command::new("xdg-open").arg(url).spawn();

    if let Err(err) = result {
        ui::warning(&format!("Could not open a browser: {err}"));
    }
}
