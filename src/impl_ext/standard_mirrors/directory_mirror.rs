use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use fractic_server_error::ServerError;
use tracing::debug;

use crate::{entities::RemoteMirror, errors::SyncUnavailable};

/// Mirror backed by a directory, typically a mounted network share or a
/// folder synced by an external client. Object names map to file names.
#[derive(Debug, Clone)]
pub struct DirectoryMirror {
    root: PathBuf,
}

impl DirectoryMirror {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl RemoteMirror for DirectoryMirror {
    async fn download(&self, object: &str) -> Result<Option<Vec<u8>>, ServerError> {
        match tokio::fs::read(self.root.join(object)).await {
            Ok(bytes) => {
                debug!(object, bytes = bytes.len(), "read object from mirror directory");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncUnavailable::with_debug("download", object, &e)),
        }
    }

    async fn upload(&self, object: &str, bytes: Vec<u8>) -> Result<(), ServerError> {
        let target = self.root.join(object);
        let tmp = self.root.join(format!(".{}.upload", object));
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SyncUnavailable::with_debug("upload", object, &e))?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| SyncUnavailable::with_debug("upload", object, &e))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| SyncUnavailable::with_debug("upload", object, &e))?;
        debug!(object, bytes = bytes.len(), "wrote object to mirror directory");
        Ok(())
    }
}
