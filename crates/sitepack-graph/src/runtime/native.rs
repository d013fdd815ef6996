use std::path::Path;

use async_trait::async_trait;

use super::{Runtime, RuntimeError, RuntimeResult};

/// Runtime backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRuntime;

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|err| RuntimeError::from_io(path, err))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
