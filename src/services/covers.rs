//! On-disk cache of cover thumbnails fetched through the Bot API.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use futures::TryStreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::telegram::{BotApi, TelegramError};

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("Telegram request failed: {0}")]
    Telegram(#[from] TelegramError),

    #[error("cover cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A cover image available on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCover {
    pub path: PathBuf,
    pub content_type: String,
}

impl CachedCover {
    fn at(path: PathBuf) -> Self {
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();
        Self { path, content_type }
    }
}

/// Thumbnails are stored as `<file id><extension>` and written through a
/// temporary file, so readers only ever see complete images.
pub struct CoverCache {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl CoverCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the cached thumbnail for `file_id`, downloading it on a miss.
    pub async fn fetch(&self, bot: &dyn BotApi, file_id: &str) -> Result<CachedCover, CoverError> {
        let key = cache_key(file_id);
        if let Some(hit) = self.lookup(&key).await? {
            return Ok(hit);
        }

        let file = bot.get_file(file_id).await?;
        let remote_path = file.file_path.ok_or(TelegramError::MissingResult)?;
        let extension = Path::new(&remote_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");

        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.dir.join(format!("{key}.{extension}"));
        let tmp = self.dir.join(format!(
            "{key}.{extension}.{}.tmp",
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = self.download_to(bot, &remote_path, &tmp).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        tokio::fs::rename(&tmp, &target).await?;

        debug!(file_id, path = %target.display(), "Cached cover");
        Ok(CachedCover::at(target))
    }

    async fn download_to(
        &self,
        bot: &dyn BotApi,
        remote_path: &str,
        tmp: &Path,
    ) -> Result<(), CoverError> {
        let mut stream = bot.download_file(remote_path).await?;
        let mut out = tokio::fs::File::create(tmp).await?;
        while let Some(chunk) = stream.try_next().await? {
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        Ok(())
    }

    /// A complete, non-empty cached file for `key`, if one exists.
    async fn lookup(&self, key: &str) -> Result<Option<CachedCover>, CoverError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{key}.");
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(&prefix) || name.ends_with(".tmp") {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_file() && metadata.len() > 0 {
                return Ok(Some(CachedCover::at(entry.path())));
            }
        }
        Ok(None)
    }
}

/// File ids are URL-safe base64, but never trust them as path components.
fn cache_key(file_id: &str) -> String {
    file_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeBot;

    #[test]
    fn test_cache_key_sanitizes() {
        assert_eq!(cache_key("AbC-_9"), "AbC-_9");
        assert_eq!(cache_key("../etc/passwd"), "___etc_passwd");
    }

    #[tokio::test]
    async fn test_fetch_downloads_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CoverCache::new(dir.path().join("covers"));
        let bot = FakeBot::new();
        bot.add_file("THUMB", "thumbnails/file_3.jpg", b"jpeg-bytes");

        let first = cache.fetch(&bot, "THUMB").await.unwrap();
        assert_eq!(first.path, dir.path().join("covers").join("THUMB.jpg"));
        assert_eq!(first.content_type, "image/jpeg");
        assert_eq!(std::fs::read(&first.path).unwrap(), b"jpeg-bytes");

        let second = cache.fetch(&bot, "THUMB").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(*bot.downloads.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_partial_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("T.png"), b"").unwrap();
        std::fs::write(dir.path().join("T.png.0.tmp"), b"partial").unwrap();

        let cache = CoverCache::new(dir.path());
        let bot = FakeBot::new();
        bot.add_file("T", "thumbnails/t.webp", b"webp");

        let cover = cache.fetch(&bot, "T").await.unwrap();
        assert_eq!(cover.path, dir.path().join("T.webp"));
        assert_eq!(cover.content_type, "image/webp");
    }

    #[tokio::test]
    async fn test_unknown_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CoverCache::new(dir.path());
        let bot = FakeBot::new();

        let err = cache.fetch(&bot, "missing").await.unwrap_err();
        assert!(matches!(err, CoverError::Telegram(_)));
    }
}
