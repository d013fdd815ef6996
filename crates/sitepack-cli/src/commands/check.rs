//! `sitepack check`: load, validate and plan without transforming.

use std::sync::Arc;

use serde::Serialize;
use sitepack_bundler::BuildError;
use sitepack_graph::runtime::NativeRuntime;
use sitepack_graph::{Dependency, Planner, SourceGraph, SourceKind};

use super::utils::{Overrides, load_config, resolve_root};
use crate::cli::CheckArgs;
use crate::error::{CliError, Result};
use crate::ui;

#[derive(Debug, Serialize)]
struct GraphSummary<'a> {
    entries: Vec<EntrySummary<'a>>,
    document: Option<&'a str>,
    nodes: Vec<NodeSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct EntrySummary<'a> {
    name: &'a str,
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct NodeSummary<'a> {
    id: &'a str,
    kind: SourceKind,
    transforms: Vec<&'a str>,
    dependencies: &'a [Dependency],
}

impl<'a> GraphSummary<'a> {
    fn new(graph: &'a SourceGraph) -> Self {
        Self {
            entries: graph
                .entries()
                .iter()
                .map(|entry| EntrySummary {
                    name: &entry.name,
                    id: entry.id.as_str(),
                })
                .collect(),
            document: graph.document().map(|node| node.id.as_str()),
            nodes: graph
                .nodes()
                .map(|node| NodeSummary {
                    id: node.id.as_str(),
                    kind: node.kind,
                    transforms: node.transforms.iter().map(|t| t.name()).collect(),
                    dependencies: &node.dependencies,
                })
                .collect(),
        }
    }
}

pub async fn execute(args: CheckArgs) -> Result<()> {
    let root = resolve_root(args.config.cwd.as_deref())?;
    let config = load_config(&root, &args.config, &Overrides::default())?;
    sitepack_config::validate_schema(&config)?;

    let planner = Planner::new(root.clone(), &config, Arc::new(NativeRuntime));
    let graph = match planner.plan_config(&config).await {
        Ok(graph) => graph,
        Err(err) => {
            let err = BuildError::from(err);
            ui::error(&err.to_string());
            return Err(CliError::CheckFailed(1));
        }
    };

    let unhandled: Vec<&str> = graph
        .nodes()
        .filter(|node| node.transforms.is_empty())
        .map(|node| node.id.as_str())
        .collect();
    for id in &unhandled {
        ui::warning(&format!("{id} matches no transform rule and is copied as is"));
    }

    if args.json {
        let json = serde_json::to_string_pretty(&GraphSummary::new(&graph))
            .map_err(|err| CliError::Custom(format!("cannot serialize graph: {err}")))?;
        println!("{json}");
    }

    let edges = graph.edges().count();
    ui::success(&format!(
        "{} entries, {} files, {} references: no problems found",
        graph.entries().len(),
        graph.len(),
        edges
    ));
    Ok(())
}
