//! `sitepack build`.

use std::path::Path;

use sitepack_bundler::{BuildError, BuildReport, BuildSession, Pipeline};
use tracing::debug;

use super::utils::{Overrides, load_config, resolve_root, shutdown_signal, watch_ignores};
use crate::cli::BuildArgs;
use crate::dev::{BuildHandler, ChangeBatch, Coordinator, FileWatcher, debounce};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: BuildArgs) -> Result<()> {
    let root = resolve_root(args.config.cwd.as_deref())?;
    let overrides = Overrides {
        out_dir: args.out_dir.clone(),
        ..Overrides::default()
    };
    let config = load_config(&root, &args.config, &overrides)?;
    debug!(root = %root.display(), mode = %args.mode, "building");

    if !args.watch {
        let session = BuildSession::new(&root, config, args.mode)?;
        let out_dir = session.output_dir().map(Path::to_path_buf);
        let (report, _assets) = Pipeline::from_session(session).build().await?;
        ui::print_build_summary(&report);
        ui::print_diagnostics(&report.diagnostics);
        if let Some(dir) = out_dir {
            ui::success(&format!("Wrote {} files to {}", report.assets.len(), dir.display()));
        }
        return Ok(());
    }

    let debounce_window = std::time::Duration::from_millis(config.dev.debounce_ms);
    let ignores = watch_ignores(&config);
    let session = BuildSession::new(&root, config, args.mode)?.watching();
    let coordinator = Coordinator::new(session, TerminalHandler);
    coordinator.build_now().await;

    let (watcher, changes) = FileWatcher::new(root.clone(), ignores)?;
    ui::info(&format!("Watching {} for changes (Ctrl+C to stop)", watcher.root().display()));
    coordinator.run(debounce(changes, debounce_window), shutdown_signal()).await;
    drop(watcher);
    Ok(())
}

/// Prints each rebuild to the terminal.
pub(crate) struct TerminalHandler;

impl BuildHandler for TerminalHandler {
    fn started(&self, batch: &ChangeBatch, root: &Path) {
        ui::info(&format!("Change in {}, rebuilding", batch.describe(root)));
    }

    fn finished(
        &self,
        result: &std::result::Result<BuildReport, BuildError>,
        _session: &BuildSession,
    ) {
        match result {
            Ok(report) => {
                ui::print_build_summary(report);
                ui::print_diagnostics(&report.diagnostics);
            }
            Err(err) => ui::error(&format!("Build failed: {err}")),
        }
    }
}
