//! Filesystem asset fetcher.

use async_trait::async_trait;
use kiosko_abstraction::{AssetFetcher, CancellationToken, FetchError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads module assets from a local directory.
#[derive(Debug, Clone)]
pub struct FsAssetFetcher {
    root: PathBuf,
}

impl FsAssetFetcher {
    /// Creates a fetcher resolving asset paths against `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an asset path; absolute paths are used as they are.
    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        self.root.join(path.trim_start_matches("./"))
    }
}

fn to_fetch_error(path: &Path, e: &std::io::Error) -> FetchError {
    match e.kind() {
        ErrorKind::NotFound => FetchError::NotFound(path.display().to_string()),
        _ => FetchError::Network(format!("{}: {e}", path.display())),
    }
}

#[async_trait]
impl AssetFetcher for FsAssetFetcher {
    async fn fetch_text(&self, path: &str, cancel: &CancellationToken) -> Result<String, FetchError> {
        let resolved = self.resolve(path);
        debug!(path = %resolved.display(), "Reading asset");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            result = tokio::fs::read_to_string(&resolved) => result.map_err(|e| to_fetch_error(&resolved, &e)),
        }
    }

    async fn probe(&self, path: &str) -> Result<(), FetchError> {
        let resolved = self.resolve(path);
        let metadata = tokio::fs::metadata(&resolved).await.map_err(|e| to_fetch_error(&resolved, &e))?;
        if metadata.is_file() { Ok(()) } else { Err(FetchError::NotFound(resolved.display().to_string())) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn module_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let caja = dir.path().join("modules").join("caja");
        std::fs::create_dir_all(&caja).unwrap();
        std::fs::write(caja.join("caja.html"), "<section>caja</section>").unwrap();
        std::fs::write(caja.join("caja.js"), "console.log('caja')").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let dir = module_dir();
        let fetcher = FsAssetFetcher::new(dir.path());

        let body = fetcher.fetch_text("./modules/caja/caja.html", &CancellationToken::new()).await.unwrap();
        assert_eq!(body, "<section>caja</section>");
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let dir = module_dir();
        let fetcher = FsAssetFetcher::new(dir.path());

        let err = fetcher.fetch_text("./modules/notas/notas.html", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_cancelled() {
        let dir = module_dir();
        let fetcher = FsAssetFetcher::new(dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher.fetch_text("./modules/caja/caja.html", &cancel).await.unwrap_err();
        assert_eq!(err, FetchError::Cancelled);
    }

    #[tokio::test]
    async fn test_probe() {
        let dir = module_dir();
        let fetcher = FsAssetFetcher::new(dir.path());

        assert!(fetcher.probe("./modules/caja/caja.js").await.is_ok());
        assert!(fetcher.probe("./modules/caja/caja.css").await.is_err());
        assert!(fetcher.probe("./modules/caja").await.is_err());
    }

    #[test]
    fn test_resolve() {
        let fetcher = FsAssetFetcher::new("/srv/kiosko");
        assert_eq!(fetcher.resolve("./modules/caja/caja.html"), PathBuf::from("/srv/kiosko/modules/caja/caja.html"));
        assert_eq!(fetcher.resolve("/etc/kiosko/x.html"), PathBuf::from("/etc/kiosko/x.html"));
    }
}
