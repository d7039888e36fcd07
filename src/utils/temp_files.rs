use std::io;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::response::Response;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Temp files owned by one translate request.
///
/// Both paths start out absent. Whatever was allocated is deleted when the
/// value is dropped, on the blocking pool. Handlers pass the guard to
/// [`RequestFiles::release_after`] so the files outlive the response body;
/// a cancelled handler drops it directly.
#[derive(Debug)]
pub struct RequestFiles {
    dir: PathBuf,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl RequestFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            input: None,
            output: None,
        }
    }

    /// Persist the uploaded bytes under a fresh name that keeps the upload's extension.
    pub async fn stage_input(&mut self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = unique_path(&self.dir, &extension_suffix(filename));
        let mut file = create_new(&path).await?;
        self.input = Some(path.clone());

        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(path)
    }

    /// Reserve an empty file for converter output.
    pub async fn reserve_output(&mut self, suffix: &str) -> io::Result<PathBuf> {
        let path = unique_path(&self.dir, suffix);
        create_new(&path).await?;
        self.output = Some(path.clone());
        Ok(path)
    }

    /// Tie the guard to `response`'s body. Cleanup starts once the server has
    /// finished sending the body and drops it.
    pub fn release_after(self, response: Response) -> Response {
        if self.input.is_none() && self.output.is_none() {
            return response;
        }

        let (parts, body) = response.into_parts();
        let files = self;
        let body = body.into_data_stream().map(move |chunk| {
            let _held = &files;
            chunk
        });
        Response::from_parts(parts, Body::from_stream(body))
    }
}

impl Drop for RequestFiles {
    fn drop(&mut self) {
        let input = self.input.take();
        let output = self.output.take();
        if input.is_none() && output.is_none() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || cleanup_files(input.as_deref(), output.as_deref()));
            }
            Err(_) => cleanup_files(input.as_deref(), output.as_deref()),
        }
    }
}

/// Best-effort removal of request temp files. Missing files are skipped and
/// failures are only logged, so calling this repeatedly is harmless.
pub fn cleanup_files(input: Option<&Path>, output: Option<&Path>) {
    if let Some(path) = input {
        remove_file(path, "input");
    }
    if let Some(path) = output {
        remove_file(path, "output");
    }
}

fn remove_file(path: &Path, label: &str) {
    if std::fs::metadata(path).is_err() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {} file: {}", label, path.display()),
        Err(e) => warn!("Error deleting {} file {}: {}", label, path.display(), e),
    }
}

async fn create_new(path: &Path) -> io::Result<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

fn unique_path(dir: &Path, suffix: &str) -> PathBuf {
    dir.join(format!("translate-{}{}", Uuid::new_v4().simple(), suffix))
}

fn extension_suffix(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}
