//! Planner behavior over in-memory and on-disk trees.

use std::path::PathBuf;
use std::sync::Arc;

use sitepack_config::{SitepackConfig, TransformId};
use sitepack_graph::runtime::{MemoryRuntime, NativeRuntime};
use sitepack_graph::{NodeId, PlanError, Planner, ReferenceKind};

fn planner(fs: MemoryRuntime) -> Planner {
    Planner::new("/site", &SitepackConfig::default(), Arc::new(fs))
}

fn entries(path: &str) -> Vec<(String, PathBuf)> {
    vec![("app".to_string(), PathBuf::from(path))]
}

fn docs_site() -> MemoryRuntime {
    MemoryRuntime::new("/site")
        .with_file(
            "src/index.ts",
            "import { mount } from './lib/mount';\nimport './scss/main.scss';\n\
             import notes from './notes.txt';\nmount(notes);\n",
        )
        .with_file(
            "src/lib/mount.ts",
            "export function mount(s: string) { document.body.append(s); }\n",
        )
        .with_file(
            "src/scss/main.scss",
            "@use 'variables';\nbody { background: url(../img/bg.png); }\n",
        )
        .with_file("src/scss/_variables.scss", "$accent: #0af;\n")
        .with_file("src/img/bg.png", vec![0x89, b'P', b'N', b'G'])
        .with_file("src/notes.txt", "hello")
        .with_file(
            "src/index.html",
            "<html><head><!--#include file=\"head.html\" --></head><body></body></html>",
        )
        .with_file("src/head.html", "<link rel=\"icon\" href=\"img/bg.png\">")
}

#[tokio::test]
async fn plans_mixed_tree_in_discovery_order() {
    let graph = planner(docs_site())
        .plan(&entries("src/index.ts"), Some("src/index.html".as_ref()))
        .await
        .unwrap();

    let ids: Vec<_> = graph.nodes().map(|n| n.id.to_string()).collect();
    assert_eq!(
        ids,
        [
            "src/index.ts",
            "src/index.html",
            "src/lib/mount.ts",
            "src/scss/main.scss",
            "src/notes.txt",
            "src/head.html",
            "src/scss/_variables.scss",
            "src/img/bg.png",
        ]
    );

    let index = graph.node(&NodeId::new("src/index.ts")).unwrap();
    let kinds: Vec<_> = index.dependencies.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        [
            ReferenceKind::ModuleImport,
            ReferenceKind::AssetImport,
            ReferenceKind::ModuleImport
        ]
    );
    assert_eq!(index.transforms, [TransformId::TypeScript]);

    assert!(graph.is_inline_only(&NodeId::new("src/scss/_variables.scss")));
    assert!(graph.is_inline_only(&NodeId::new("src/head.html")));
    assert_eq!(graph.document().unwrap().id.as_str(), "src/index.html");
    assert_eq!(graph.entry_name(&NodeId::new("src/index.ts")), Some("app"));
}

#[tokio::test]
async fn template_page_links_are_not_dependencies() {
    let fs = MemoryRuntime::new("/site")
        .with_file("src/index.ts", "console.log('home');\n")
        .with_file("src/logo.svg", "<svg/>")
        .with_file(
            "src/index.html",
            "<html><head><link rel=\"icon\" href=\"logo.svg\"></head>\n<body>\
             <a href=\"docs/\">Docs</a><a class=\"nav\" href=\"about.html\">About</a>\
             </body></html>",
        );
    let graph = planner(fs)
        .plan(&entries("src/index.ts"), Some("src/index.html".as_ref()))
        .await
        .unwrap();

    let document = graph.document().unwrap();
    let targets: Vec<_> = document.dependencies.iter().map(|d| d.target.as_str()).collect();
    assert_eq!(targets, ["src/logo.svg"]);
}

#[tokio::test]
async fn planning_is_deterministic() {
    let first = planner(docs_site()).plan(&entries("src/index.ts"), None).await.unwrap();
    let second = planner(docs_site()).plan(&entries("src/index.ts"), None).await.unwrap();
    let ids = |g: &sitepack_graph::SourceGraph| g.nodes().map(|n| n.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
}

#[tokio::test]
async fn unresolved_reference_names_specifier_and_importer() {
    let fs = MemoryRuntime::new("/site").with_file("src/index.ts", "import './missing';\n");
    let err = planner(fs).plan(&entries("src/index.ts"), None).await.unwrap_err();
    match err {
        PlanError::UnresolvedReference { specifier, importer } => {
            assert_eq!(specifier, "./missing");
            assert_eq!(importer, PathBuf::from("src/index.ts"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn static_asset_cycle_is_rejected() {
    let fs = MemoryRuntime::new("/site")
        .with_file("src/index.ts", "import './x.css';\n")
        .with_file("src/x.css", "@import './y.css';\n")
        .with_file("src/y.css", "@import './x.css';\n");
    let err = planner(fs).plan(&entries("src/index.ts"), None).await.unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, PlanError::CyclicReference { .. }));
    assert!(message.contains("src/x.css"), "{message}");
    assert!(message.contains("src/y.css"), "{message}");
}

#[tokio::test]
async fn module_cycle_is_tolerated() {
    let fs = MemoryRuntime::new("/site")
        .with_file("src/index.ts", "import { b } from './b';\nexport const a = () => b();\n")
        .with_file("src/b.ts", "import { a } from './index';\nexport const b = () => a;\n");
    let graph = planner(fs).plan(&entries("src/index.ts"), None).await.unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.components().len(), 1);
}

#[tokio::test]
async fn missing_entry_is_an_error() {
    let err = planner(MemoryRuntime::new("/site"))
        .plan(&entries("src/index.ts"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::Runtime(_)));
}

#[tokio::test]
async fn no_entries_is_an_error() {
    let err = planner(MemoryRuntime::new("/site")).plan(&[], None).await.unwrap_err();
    assert!(matches!(err, PlanError::NoEntries));
}

#[tokio::test]
async fn plans_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    let index = "import data from './data.json';\nconsole.log(data);\n";
    std::fs::write(src.join("index.ts"), index).unwrap();
    std::fs::write(src.join("data.json"), "{\"ok\": true}").unwrap();

    let planner = Planner::new(dir.path(), &SitepackConfig::default(), Arc::new(NativeRuntime));
    let graph = planner.plan_config(&SitepackConfig::default()).await.unwrap();
    assert_eq!(graph.len(), 2);
    let data = graph.node(&NodeId::new("src/data.json")).unwrap();
    assert_eq!(data.transforms, [TransformId::Json]);
}
