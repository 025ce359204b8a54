use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use futures::StreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::storage::{
    Capability, Download, EntryMetadata, Metadata, ProviderError, ProviderResult,
    ResponseWrapper, StorageProvider, UploadStream,
};
use crate::utils::{is_folder_key, key_name, normalize_key};

pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get root directory / 获取根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate key and map it under root (no traversal outside root) / 规范化路径
    fn resolve(&self, path: &str) -> ProviderResult<(String, PathBuf)> {
        let key = normalize_key(path)?;
        let full_path = self.root.join(key.trim_end_matches('/'));
        Ok((key, full_path))
    }

    fn file_key(&self, path: &str) -> ProviderResult<(String, PathBuf)> {
        let (key, full_path) = self.resolve(path)?;
        if is_folder_key(&key) {
            return Err(ProviderError::invalid_path(path, "expected a file path"));
        }
        Ok((key, full_path))
    }

    fn entry(key: String, meta: &std::fs::Metadata) -> EntryMetadata {
        let is_dir = meta.is_dir();
        let modified = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339());
        let content_type = if is_dir {
            None
        } else {
            Some(mime_guess::from_path(&key).first_or_octet_stream().to_string())
        };

        EntryMetadata {
            name: key_name(&key).to_string(),
            path: key,
            size: if is_dir { 0 } else { meta.len() },
            modified,
            is_dir,
            content_type,
            etag: None,
        }
    }
}

/// io::NotFound becomes the provider's NotFound / 文件不存在转换
fn map_not_found(err: std::io::Error, path: &str) -> ProviderError {
    if err.kind() == ErrorKind::NotFound {
        ProviderError::not_found(path)
    } else {
        ProviderError::Io(err)
    }
}

fn part_path(full_path: &Path) -> PathBuf {
    let name = full_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    full_path.with_file_name(format!(".{}.part", name))
}

async fn write_part(part_path: &Path, source: UploadStream) -> std::io::Result<u64> {
    let mut reader = StreamReader::new(source.into_stream());
    let mut file = tokio::fs::File::create(part_path).await?;
    let written = tokio::io::copy(&mut reader, &mut file).await?;
    file.sync_all().await?;
    Ok(written)
}

#[async_trait]
impl StorageProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn capabilities(&self) -> Capability {
        Capability {
            can_direct_link: false,
            can_stream_upload: true,
            requires_session: false,
        }
    }

    /// No direct links here: `accept_url` still streams / 本地存储不支持直链
    async fn download(&self, path: &str, _accept_url: bool) -> ProviderResult<Download> {
        let (key, full_path) = self.file_key(path)?;

        let file = tokio::fs::File::open(&full_path)
            .await
            .map_err(|e| map_not_found(e, path))?;
        let meta = file.metadata().await?;
        if meta.is_dir() {
            return Err(ProviderError::invalid_path(path, "is a directory"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(meta.len()));
        let mime = mime_guess::from_path(&key).first_or_octet_stream();
        if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
            headers.insert(CONTENT_TYPE, value);
        }

        let body = ReaderStream::new(file).boxed();
        Ok(Download::Stream(ResponseWrapper::new(StatusCode::OK, headers, body)))
    }

    async fn upload(&self, source: UploadStream, path: &str) -> ProviderResult<ResponseWrapper> {
        let (key, full_path) = self.file_key(path)?;

        // Ensure parent directory exists / 确保父目录存在
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let existed = tokio::fs::try_exists(&full_path).await?;

        // Write to a sibling `.part` file; the target is only replaced once complete
        let part_path = part_path(&full_path);
        let declared = source.size();
        let written = match write_part(&part_path, source).await {
            Ok(written) if written == declared => written,
            Ok(written) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(ProviderError::Io(std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("declared {} bytes, received {}", declared, written),
                )));
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e.into());
            }
        };
        tokio::fs::rename(&part_path, &full_path).await?;

        tracing::debug!("Local upload: key={}, size={}", key, written);
        let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
        Ok(ResponseWrapper::empty(status))
    }

    async fn delete(&self, path: &str) -> ProviderResult<ResponseWrapper> {
        let (key, full_path) = self.resolve(path)?;
        if key.is_empty() {
            return Err(ProviderError::invalid_path(path, "refusing to delete the root"));
        }

        let meta = tokio::fs::metadata(&full_path)
            .await
            .map_err(|e| map_not_found(e, path))?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&full_path).await?;
        } else {
            tokio::fs::remove_file(&full_path).await?;
        }

        tracing::debug!("Local delete: key={}", key);
        Ok(ResponseWrapper::empty(StatusCode::NO_CONTENT))
    }

    async fn metadata(&self, path: &str) -> ProviderResult<Metadata> {
        let (key, full_path) = self.resolve(path)?;
        let meta = tokio::fs::metadata(&full_path)
            .await
            .map_err(|e| map_not_found(e, path))?;

        if !is_folder_key(&key) {
            // Folders are addressed with a trailing `/`
            if meta.is_dir() {
                return Err(ProviderError::not_found(path));
            }
            return Ok(Metadata::File(Self::entry(key, &meta)));
        }
        if !meta.is_dir() {
            return Err(ProviderError::not_found(path));
        }

        let mut children = Vec::new();
        let mut dir = tokio::fs::read_dir(&full_path).await?;
        while let Some(item) = dir.next_entry().await? {
            let meta = item.metadata().await?;
            let name = item.file_name().to_string_lossy().to_string();
            let child_key = if meta.is_dir() {
                format!("{}{}/", key, name)
            } else {
                format!("{}{}", key, name)
            };
            children.push(Self::entry(child_key, &meta));
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Metadata::Folder(children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> (tempfile::TempDir, LocalProvider) {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalProvider::new(dir.path().to_path_buf());
        (dir, provider)
    }

    #[tokio::test]
    async fn test_upload_download_roundtrip() {
        let (_dir, provider) = provider();

        let resp = provider.upload(UploadStream::from_bytes("hello"), "docs/a.txt").await.unwrap();
        assert_eq!(resp.status_code(), 201);
        let resp = provider.upload(UploadStream::from_bytes("hello!"), "docs/a.txt").await.unwrap();
        assert_eq!(resp.status_code(), 200);

        let resp = match provider.download("docs/a.txt", true).await.unwrap() {
            Download::Stream(resp) => resp,
            Download::Url(url) => panic!("unexpected url {}", url),
        };
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.size(), Some(6));
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.bytes().await.unwrap(), "hello!");
    }

    #[tokio::test]
    async fn test_metadata_file_and_folder() {
        let (_dir, provider) = provider();
        provider.upload(UploadStream::from_bytes("1"), "docs/b.txt").await.unwrap();
        provider.upload(UploadStream::from_bytes("22"), "docs/sub/c.txt").await.unwrap();

        match provider.metadata("docs/b.txt").await.unwrap() {
            Metadata::File(entry) => {
                assert_eq!(entry.name, "b.txt");
                assert_eq!(entry.size, 1);
                assert!(!entry.is_dir);
            }
            other => panic!("expected file, got {:?}", other),
        }

        let children = match provider.metadata("docs/").await.unwrap() {
            Metadata::Folder(children) => children,
            other => panic!("expected folder, got {:?}", other),
        };
        let paths: Vec<&str> = children.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["docs/b.txt", "docs/sub/"]);
        assert!(children[1].is_dir);

        assert!(provider.metadata("docs").await.unwrap_err().is_not_found());
        assert!(provider.metadata("nope/").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, provider) = provider();
        provider.upload(UploadStream::from_bytes("x"), "a.txt").await.unwrap();

        assert_eq!(provider.delete("a.txt").await.unwrap().status_code(), 204);
        assert!(provider.delete("a.txt").await.unwrap_err().is_not_found());
        assert!(provider.delete("/").await.is_err());
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let (_dir, provider) = provider();
        let err = provider.download("../etc/passwd", false).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_previous_content() {
        let (dir, provider) = provider();
        provider.upload(UploadStream::from_bytes("original"), "keep.txt").await.unwrap();

        let body = futures::stream::once(async { Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"abc")) }).boxed();
        let err = provider.upload(UploadStream::new(body, 10), "keep.txt").await.unwrap_err();
        assert!(matches!(err, ProviderError::Io(_)));

        let chunks = vec![
            Ok(bytes::Bytes::from_static(b"ab")),
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "client went away")),
        ];
        let body = futures::stream::iter(chunks).boxed();
        assert!(provider.upload(UploadStream::new(body, 4), "keep.txt").await.is_err());

        assert_eq!(std::fs::read(dir.path().join("keep.txt")).unwrap(), b"original");
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["keep.txt"]);
    }
}
