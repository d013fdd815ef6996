//! Cycle policy.
//!
//! A cycle is legal when every edge on it is a module import: ES module
//! bindings are resolved lazily, so mutually importing scripts work at
//! runtime. A cycle through any other edge kind (stylesheet imports, `url()`
//! references, asset imports, includes) can never be emitted and is rejected.

use std::path::PathBuf;

use rustc_hash::FxHashSet;

use crate::error::{PlanError, Result};
use crate::graph::SourceGraph;
use crate::node::NodeId;

/// Reject the first illegal cycle found, naming every file on it.
pub fn check_cycles(graph: &SourceGraph) -> Result<()> {
    match find_illegal_cycle(graph) {
        Some(cycle) => Err(PlanError::CyclicReference {
            cycle: cycle.iter().map(|id| PathBuf::from(id.as_str())).collect(),
        }),
        None => Ok(()),
    }
}

/// The first cycle containing a non-module edge, as the list of nodes on it
/// starting at the importer of that edge.
pub fn find_illegal_cycle(graph: &SourceGraph) -> Option<Vec<NodeId>> {
    for component in graph.components() {
        let members: FxHashSet<&NodeId> = component.iter().collect();

        for (from, to, kind) in graph.edges() {
            if kind.allows_cycles() || !members.contains(from) || !members.contains(to) {
                continue;
            }
            if from == to {
                return Some(vec![from.clone()]);
            }
            // Both ends share a component, so `to` reaches `from`.
            if let Some(back) = graph.path_between(to, from) {
                let mut cycle = vec![from.clone()];
                cycle.extend(back.into_iter().filter(|id| id != from));
                return Some(cycle);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Entry;
    use crate::node::{Dependency, SourceKind, SourceNode};
    use crate::reference::ReferenceKind;
    use std::sync::Arc;

    fn node(id: &str, deps: &[(&str, ReferenceKind)]) -> SourceNode {
        let ext = id.rsplit('.').next().unwrap_or_default();
        SourceNode {
            id: NodeId::new(id),
            path: PathBuf::from("/p").join(id),
            extension: ext.to_string(),
            kind: SourceKind::from_extension(ext),
            raw: Arc::from(&b""[..]),
            transforms: Vec::new(),
            dependencies: deps
                .iter()
                .map(|(target, kind)| Dependency {
                    specifier: (*target).to_string(),
                    kind: *kind,
                    target: NodeId::new(target),
                })
                .collect(),
        }
    }

    fn graph(nodes: Vec<SourceNode>) -> SourceGraph {
        let entry = nodes[0].id.clone();
        SourceGraph::from_nodes("/p", nodes, vec![Entry { name: "app".into(), id: entry }], None)
    }

    #[test]
    fn module_cycles_are_legal() {
        let g = graph(vec![
            node("a.ts", &[("b.ts", ReferenceKind::ModuleImport)]),
            node("b.ts", &[("a.ts", ReferenceKind::ModuleImport)]),
        ]);
        assert!(check_cycles(&g).is_ok());
    }

    #[test]
    fn style_cycle_names_both_files() {
        let g = graph(vec![
            node("x.css", &[("y.css", ReferenceKind::StyleImport)]),
            node("y.css", &[("x.css", ReferenceKind::StyleImport)]),
        ]);
        let err = check_cycles(&g).unwrap_err();
        let PlanError::CyclicReference { cycle } = &err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(cycle, &[PathBuf::from("x.css"), PathBuf::from("y.css")]);
        let message = err.to_string();
        assert!(message.contains("x.css") && message.contains("y.css"));
    }

    #[test]
    fn mixed_cycle_is_illegal() {
        // Script imports a stylesheet whose url() points back at the script.
        let g = graph(vec![
            node("a.ts", &[("b.ts", ReferenceKind::ModuleImport)]),
            node("b.ts", &[("s.css", ReferenceKind::AssetImport)]),
            node("s.css", &[("a.ts", ReferenceKind::UrlReference)]),
        ]);
        let cycle = find_illegal_cycle(&g).unwrap();
        let names: Vec<_> = cycle.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, ["b.ts", "s.css", "a.ts"]);
    }

    #[test]
    fn self_reference_is_illegal() {
        let g = graph(vec![node("a.css", &[("a.css", ReferenceKind::UrlReference)])]);
        assert_eq!(find_illegal_cycle(&g), Some(vec![NodeId::new("a.css")]));
    }

    #[test]
    fn diamond_without_cycle_is_fine() {
        let g = graph(vec![
            node(
                "a.css",
                &[("b.css", ReferenceKind::StyleImport), ("c.css", ReferenceKind::StyleImport)],
            ),
            node("b.css", &[("d.png", ReferenceKind::UrlReference)]),
            node("c.css", &[("d.png", ReferenceKind::UrlReference)]),
            node("d.png", &[]),
        ]);
        assert!(check_cycles(&g).is_ok());
    }
}
