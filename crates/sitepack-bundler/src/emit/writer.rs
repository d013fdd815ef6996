//! Writing emitted assets to the output directory.
//!
//! Every output name is validated to stay inside the output directory.
//! Writes are two-phase: all content goes to temporary siblings first (in
//! parallel, the paths are disjoint), then each temporary file is renamed
//! over its target. If any step fails, the temporary files are removed and
//! the previous output stays intact.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::EmittedAsset;
use crate::error::EmitError;

const TEMP_SUFFIX: &str = ".sitepack-tmp";

/// Writes assets below one output directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// `dir` must be absolute; it is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, EmitError> {
        let dir = dir.as_ref().clean();
        if !dir.is_absolute() {
            return Err(EmitError::InvalidPath {
                path: dir.display().to_string(),
            });
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove everything below the output directory.
    pub fn clean(&self) -> Result<(), EmitError> {
        if self.dir.parent().is_none() {
            return Err(EmitError::Clean {
                path: self.dir.clone(),
                message: "refusing to clean a filesystem root".into(),
            });
        }
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|e| EmitError::Clean {
                path: self.dir.clone(),
                message: e.to_string(),
            })?;
            debug!(dir = %self.dir.display(), "cleaned output directory");
        }
        Ok(())
    }

    /// Write assets atomically. Paths must be unique.
    pub fn write(&self, assets: &[&EmittedAsset]) -> Result<(), EmitError> {
        let operations = assets
            .iter()
            .map(|asset| {
                let path = validate_output_path(&self.dir, &asset.path)?;
                Ok((path, asset.bytes.as_slice()))
            })
            .collect::<Result<Vec<_>, EmitError>>()?;
        write_files_atomic(&operations)
    }

    /// Delete previously emitted files. Missing files are ignored.
    pub fn remove(&self, paths: &[String]) -> Result<(), EmitError> {
        for path in paths {
            let target = validate_output_path(&self.dir, path)?;
            match fs::remove_file(&target) {
                Ok(()) => debug!(path = %path, "removed stale output"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(EmitError::Write {
                        path: target,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Normalize an output name relative to the output directory, rejecting
/// names that would land outside of it.
pub fn normalize_output_name(name: &str) -> Result<String, EmitError> {
    let base = Path::new("/");
    let full = validate_output_path(base, name)?;
    let relative = full.strip_prefix(base).unwrap_or(&full);
    let normalized = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if normalized.is_empty() {
        return Err(EmitError::InvalidPath { path: name.to_string() });
    }
    Ok(normalized)
}

/// Join `filename` to `base_dir` and check that the cleaned result is still
/// below `base_dir`.
pub fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf, EmitError> {
    let invalid = || EmitError::InvalidPath {
        path: filename.to_string(),
    };

    if filename.is_empty() || filename.contains('\0') {
        return Err(invalid());
    }
    let filename_path = Path::new(filename);
    if filename_path.is_absolute() || filename.starts_with('/') || filename.starts_with('\\') {
        return Err(invalid());
    }

    let full_path = base_dir.join(filename_path.clean()).clean();
    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(invalid());
    }
    Ok(full_path)
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<(), EmitError> {
    // Phase 1: temporary files, in parallel.
    let results: Vec<Result<PathBuf, EmitError>> = operations
        .par_iter()
        .map(|(target, content)| {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| EmitError::Write {
                    path: parent.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
            let temp = temp_path(target);
            fs::write(&temp, content).map_err(|e| EmitError::Write {
                path: temp.clone(),
                message: e.to_string(),
            })?;
            Ok(temp)
        })
        .collect();

    let mut temp_files = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(temp) => temp_files.push(temp),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(err) = first_error {
        cleanup_temp_files(&temp_files);
        return Err(err);
    }

    // Phase 2: rename over the targets.
    for ((target, _), temp) in operations.iter().zip(&temp_files) {
        if let Err(e) = fs::rename(temp, target) {
            cleanup_temp_files(&temp_files);
            return Err(EmitError::Write {
                path: target.clone(),
                message: e.to_string(),
            });
        }
    }
    Ok(())
}

fn cleanup_temp_files(temp_files: &[PathBuf]) {
    for temp in temp_files {
        if temp.exists() {
            if let Err(e) = fs::remove_file(temp) {
                warn!(path = %temp.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}
