//! Specifier resolution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::node::SourceKind;
use crate::reference::ReferenceSyntax;
use crate::runtime::Runtime;

/// Resolves specifiers to absolute, normalized file paths.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    modules: Vec<PathBuf>,
    extensions: Vec<String>,
    runtime: Arc<dyn Runtime>,
}

impl Resolver {
    pub fn new(
        root: impl Into<PathBuf>,
        modules: &[PathBuf],
        extensions: &[String],
        runtime: Arc<dyn Runtime>,
    ) -> Self {
        let root = path_clean::clean(root.into());
        let modules = modules
            .iter()
            .map(|m| path_clean::clean(root.join(m)))
            .collect();
        let extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            root,
            modules,
            extensions,
            runtime,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `specifier` written in `importer` using the given syntax.
    ///
    /// Relative specifiers (`./`, `../`) resolve against the importer's
    /// directory. Bare specifiers try the importer's directory first for
    /// styles and documents (where `url(img.png)` is relative), then each
    /// module root in order.
    pub fn resolve(
        &self,
        specifier: &str,
        importer: &Path,
        syntax: ReferenceSyntax,
    ) -> Option<PathBuf> {
        let base = importer.parent().unwrap_or(&self.root);
        let sass = syntax == ReferenceSyntax::SassInclude;

        if let Some(stripped) = specifier.strip_prefix('/') {
            return self.locate(&self.root.join(stripped), sass);
        }

        if is_relative(specifier) {
            return self.locate(&base.join(specifier), sass);
        }

        let relative_first = !matches!(
            syntax,
            ReferenceSyntax::StaticImport | ReferenceSyntax::DynamicImport
        );
        if relative_first {
            if let Some(found) = self.locate(&base.join(specifier), sass) {
                return Some(found);
            }
        }

        self.modules
            .iter()
            .find_map(|module_root| self.locate(&module_root.join(specifier), sass))
    }

    fn locate(&self, candidate: &Path, sass: bool) -> Option<PathBuf> {
        let candidate = path_clean::clean(candidate);

        if sass {
            if let Some(found) = self.locate_sass(&candidate) {
                return Some(found);
            }
        }

        if self.runtime.is_file(&candidate) {
            return Some(candidate);
        }

        for ext in &self.extensions {
            let with_ext = append_extension(&candidate, ext);
            if self.runtime.is_file(&with_ext) {
                return Some(with_ext);
            }
        }

        if self.runtime.is_dir(&candidate) {
            return self.locate_directory(&candidate);
        }

        None
    }

    /// `@use "a/b"` finds `a/_b.scss`, `a/b.scss`, `a/_b.sass`, `a/b.sass`,
    /// and `a/b/_index.scss`.
    fn locate_sass(&self, candidate: &Path) -> Option<PathBuf> {
        let file_name = candidate.file_name()?.to_str()?;
        let parent = candidate.parent()?;
        let has_ext = Path::new(file_name)
            .extension()
            .is_some_and(|e| e == "scss" || e == "sass" || e == "css");

        let mut options = Vec::new();
        if has_ext {
            options.push(parent.join(format!("_{file_name}")));
            options.push(candidate.to_path_buf());
        } else {
            for ext in ["scss", "sass", "css"] {
                options.push(parent.join(format!("_{file_name}.{ext}")));
                options.push(parent.join(format!("{file_name}.{ext}")));
            }
            for ext in ["scss", "sass"] {
                options.push(candidate.join(format!("_index.{ext}")));
                options.push(candidate.join(format!("index.{ext}")));
            }
        }

        options.into_iter().find(|p| self.runtime.is_file(p))
    }

    fn locate_directory(&self, dir: &Path) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("index.{ext}")))
            .find(|p| self.runtime.is_file(p))
    }
}

/// Whether a specifier is relative to its importer.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

/// Kind used to decide how a resolved file is treated.
pub fn kind_of(path: &Path) -> SourceKind {
    SourceKind::from_extension(
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default(),
    )
}
