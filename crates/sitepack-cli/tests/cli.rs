//! End-to-end tests of the `sitepack` binary on temporary projects.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn sitepack(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sitepack").unwrap();
    cmd.current_dir(root).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

const SITE: &[(&str, &str)] = &[
    (
        "src/index.ts",
        "import { greet } from './greet';\nimport './site.css';\ngreet('world');\n",
    ),
    (
        "src/greet.ts",
        "export function greet(name: string): void {\n  console.log(`hello ${name}`);\n}\n",
    ),
    ("src/site.css", "body { margin: 0; color: #333333; }\n"),
];

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    sitepack(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("dev"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn production_build_writes_hashed_outputs() {
    let dir = project(SITE);
    sitepack(dir.path()).arg("build").assert().success();

    let dist = dir.path().join("dist");
    let index = fs::read_to_string(dist.join("index.html")).unwrap();
    let names = file_names(&dist);
    let script = names
        .iter()
        .find(|name| name.starts_with("app.") && name.ends_with(".min.js"))
        .unwrap_or_else(|| panic!("no app script in {names:?}"));
    assert!(index.contains(script.as_str()), "index.html does not load {script}");
}

#[test]
fn production_build_cleans_the_output_directory() {
    let dir = project(SITE);
    fs::create_dir_all(dir.path().join("dist")).unwrap();
    fs::write(dir.path().join("dist/leftover.js"), "old").unwrap();

    sitepack(dir.path()).arg("build").assert().success();
    assert!(!dir.path().join("dist/leftover.js").exists());
}

#[test]
fn out_dir_flag_overrides_config() {
    let dir = project(SITE);
    fs::write(dir.path().join("sitepack.toml"), "out_dir = \"www\"\n").unwrap();

    sitepack(dir.path())
        .args(["build", "--mode", "development", "--out-dir", "public"])
        .assert()
        .success();
    assert!(dir.path().join("public/index.html").is_file());
    assert!(!dir.path().join("www").exists());
}

#[test]
fn cwd_flag_selects_the_project() {
    let dir = project(SITE);
    let elsewhere = TempDir::new().unwrap();
    sitepack(elsewhere.path())
        .args(["build", "--cwd"])
        .arg(dir.path())
        .assert()
        .success();
    assert!(dir.path().join("dist/index.html").is_file());
}

#[test]
fn build_fails_on_unresolved_import() {
    let dir = project(&[("src/index.ts", "import './missing';\n")]);
    sitepack(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot resolve './missing'"));
    assert!(!dir.path().join("dist/index.html").exists());
}

#[test]
fn missing_entry_is_a_config_error() {
    let dir = project(&[("README.md", "nothing here")]);
    sitepack(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn check_reports_a_clean_graph() {
    let dir = project(SITE);
    sitepack(dir.path())
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains("no problems found"));
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn check_json_prints_the_graph() {
    let dir = project(SITE);
    let output = sitepack(dir.path()).args(["check", "--json"]).output().unwrap();
    assert!(output.status.success());

    let graph: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(graph["entries"][0]["name"], "app");
    let ids: Vec<&str> = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|node| node["id"].as_str())
        .collect();
    assert!(ids.contains(&"src/greet.ts"));
    assert!(ids.contains(&"src/site.css"));
}

#[test]
fn check_fails_on_style_cycle() {
    let dir = project(&[
        ("src/index.ts", "import './a.css';\n"),
        ("src/a.css", "@import './b.css';\n"),
        ("src/b.css", "@import './a.css';\n"),
    ]);
    sitepack(dir.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("illegal reference cycle"));
}

#[test]
fn check_and_build_agree_on_files_without_a_rule() {
    let dir = project(&[
        ("src/index.ts", "import './site.css';\n"),
        (
            "src/site.css",
            "@font-face { font-family: brand; src: url(./brand.otf); }\n",
        ),
        ("src/brand.otf", "OTTO"),
    ]);
    sitepack(dir.path())
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains("src/brand.otf matches no transform rule"));
    sitepack(dir.path()).arg("build").assert().success();
    assert!(file_names(&dir.path().join("dist/img")).iter().any(|name| name.ends_with(".otf")));
}
