// Resource cache store.
// Owns one flat directory of entries named by key; fetches remote resources into it.

use std::io;
use std::path::{Path, PathBuf};

use reqwest::{Response, StatusCode};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{HostError, Result};
use crate::fetch::Fetcher;
use crate::paths;

use super::payload::Payload;

/// Directory-scoped cache of fetched and saved resources.
///
/// There is no per-key coordination: two writers targeting the same key race
/// at the filesystem level and the last write wins. A failed write may leave
/// a partial file behind.
#[derive(Debug, Clone)]
pub struct ResourceCache {
    dir: PathBuf,
    fetcher: Fetcher,
}

impl ResourceCache {
    /// Open the cache rooted at `dir`, creating the directory if absent.
    ///
    /// Fails with [`HostError::Config`] for an empty or relative path and with
    /// [`HostError::Conflict`] if `dir` exists but is not a directory; the
    /// filesystem is left untouched in both cases.
    pub async fn open(dir: impl Into<PathBuf>, fetcher: Fetcher) -> Result<Self> {
        let dir = dir.into();

        if dir.as_os_str().is_empty() {
            return Err(HostError::Config("cache path is empty".to_string()));
        }
        if !dir.is_absolute() {
            return Err(HostError::Config(format!(
                "cache path {} is not absolute",
                dir.display()
            )));
        }

        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(HostError::Conflict(dir)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&dir).await?;
                info!(path = %dir.display(), "created cache directory");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self { dir, fetcher })
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry stored under `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        paths::entry_path(&self.dir, key)
    }

    /// Open the entry for writing, creating it or truncating existing content.
    pub async fn open_write_stream(&self, key: &str) -> Result<File> {
        let file = File::create(self.entry_path(key)).await?;
        Ok(file)
    }

    /// GET `url` with the cache's header set and return the raw response.
    pub async fn fetch(&self, url: &str) -> Result<Response> {
        self.fetcher.get(url).await
    }

    /// Download `url` into the entry for `key`.
    ///
    /// Only a 200 response is stored; any other status is returned as
    /// [`HostError::RemoteStatus`]. Resolves once the body is fully written.
    pub async fn fetch_as_file(&self, url: &str, key: &str) -> Result<PathBuf> {
        let mut response = self.fetch(url).await?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(url, status = status.as_u16(), "not caching response");
            return Err(HostError::RemoteStatus(status.as_u16()));
        }

        let mut file = self.open_write_stream(key).await?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!(url, key, bytes = written, "cached remote resource");
        Ok(self.entry_path(key))
    }

    /// Persist `payload` under `key` and return the entry path.
    pub async fn save(&self, key: &str, payload: Payload) -> Result<PathBuf> {
        let path = self.entry_path(key);

        match payload {
            Payload::Stream(mut reader) => {
                let mut file = self.open_write_stream(key).await?;
                let copied = tokio::io::copy(&mut reader, &mut file).await?;
                file.flush().await?;
                debug!(key, bytes = copied, "saved stream");
            }
            Payload::Structured(value) => {
                let json = serde_json::to_vec(&value)?;
                fs::write(&path, json).await?;
                debug!(key, "saved structured value");
            }
            Payload::Raw(bytes) => {
                fs::write(&path, &bytes).await?;
                debug!(key, bytes = bytes.len(), "saved raw bytes");
            }
        }

        Ok(path)
    }

    /// Check whether an entry exists. Probe failures count as absent.
    pub async fn has(&self, key: &str) -> bool {
        fs::try_exists(self.entry_path(key)).await.unwrap_or(false)
    }

    /// Delete the entry for `key`. Fails if it does not exist.
    pub async fn rm(&self, key: &str) -> Result<()> {
        fs::remove_file(self.entry_path(key)).await?;
        debug!(key, "removed cache entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::test_server::{Route, TestServer, test_fetcher};
    use reqwest::header::HeaderMap;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    async fn open_in(temp_dir: &TempDir) -> ResourceCache {
        ResourceCache::open(temp_dir.path().join("cache"), test_fetcher(HeaderMap::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        assert!(cache.dir().is_dir());
    }

    #[tokio::test]
    async fn test_open_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResourceCache::open(temp_dir.path(), test_fetcher(HeaderMap::new()))
            .await
            .unwrap();

        assert_eq!(cache.dir(), temp_dir.path());
    }

    #[tokio::test]
    async fn test_open_conflicts_with_plain_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache");
        std::fs::write(&path, b"occupied").unwrap();

        let err = ResourceCache::open(path.clone(), test_fetcher(HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Conflict(ref p) if *p == path));

        // Nothing was touched
        assert!(path.is_file());
        assert_eq!(std::fs::read(&path).unwrap(), b"occupied");
    }

    #[tokio::test]
    async fn test_open_rejects_relative_and_empty_paths() {
        let err = ResourceCache::open("relative/cache", test_fetcher(HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Config(_)));

        let err = ResourceCache::open("", test_fetcher(HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
    }

    #[tokio::test]
    async fn test_has_unknown_key() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        assert!(!cache.has("never-written").await);
    }

    #[tokio::test]
    async fn test_save_has_rm() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        let path = cache.save("lyric-1", Payload::from("la la la")).await.unwrap();
        assert_eq!(path, cache.entry_path("lyric-1"));
        assert!(cache.has("lyric-1").await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "la la la");

        cache.rm("lyric-1").await.unwrap();
        assert!(!cache.has("lyric-1").await);
    }

    #[tokio::test]
    async fn test_rm_missing_entry_fails() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        let err = cache.rm("ghost").await.unwrap_err();
        match err {
            HostError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_structured_writes_compact_json() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        let value = json!({"id": 42, "name": "Track"});
        let path = cache.save("track.json", Payload::from(value.clone())).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, value);
    }

    #[tokio::test]
    async fn test_save_truncates_existing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        cache.save("k", Payload::from("a much longer value")).await.unwrap();
        let path = cache.save("k", Payload::from("short")).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
    }

    #[tokio::test]
    async fn test_save_stream_resolves_after_completion() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        let (mut writer, reader) = tokio::io::duplex(8);
        let producer = tokio::spawn(async move {
            for part in ["first ", "second ", "third"] {
                writer.write_all(part.as_bytes()).await.unwrap();
            }
        });

        let path = cache.save("stream.txt", Payload::stream(reader)).await.unwrap();
        producer.await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first second third");
    }

    #[tokio::test]
    async fn test_fetch_as_file_stores_body() {
        let body: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        let server = TestServer::start(vec![Route::ok("/cover.jpg", body.clone())]).await;
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        let path = cache
            .fetch_as_file(&server.url("/cover.jpg"), "cover-1")
            .await
            .unwrap();

        assert_eq!(path, cache.entry_path("cover-1"));
        assert_eq!(std::fs::read(&path).unwrap(), body);
    }

    #[tokio::test]
    async fn test_fetch_as_file_rejects_non_200() {
        let server = TestServer::start(vec![Route::status("/gone", 410)]).await;
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        let err = cache
            .fetch_as_file(&server.url("/missing"), "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::RemoteStatus(404)));
        assert_eq!(err.reply_value(), serde_json::Value::from(404));

        let err = cache.fetch_as_file(&server.url("/gone"), "gone").await.unwrap_err();
        assert!(matches!(err, HostError::RemoteStatus(410)));

        assert!(!cache.has("missing").await);
        assert!(!cache.has("gone").await);
    }

    #[tokio::test]
    async fn test_fetch_as_file_follows_redirects() {
        let server = TestServer::start(vec![Route::ok("/real", b"payload".to_vec())]).await;
        let redirect = TestServer::start(vec![Route::redirect("/old", &server.url("/real"))]).await;
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        let path = cache.fetch_as_file(&redirect.url("/old"), "moved").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_fetch_unsupported_protocol() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_in(&temp_dir).await;

        let err = cache.fetch("ftp://host/resource").await.unwrap_err();
        assert!(matches!(err, HostError::UnsupportedProtocol(_)));

        let err = cache
            .fetch_as_file("ftp://host/resource", "ftp-entry")
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::UnsupportedProtocol(_)));
        assert!(!cache.has("ftp-entry").await);
    }
}
