use super::{DirEntry, FileMeta, ReadStream, Storage, WriteMode, WriteStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

/// 本机文件系统
pub struct LocalStorage {
    name: String,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self {
            name: "local".to_string(),
        }
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let base = PathBuf::from(path);

        // walkdir 是同步的，放到 blocking 线程里
        tokio::task::spawn_blocking(move || -> Result<Vec<DirEntry>> {
            let mut entries = Vec::new();
            for entry in WalkDir::new(&base)
                .min_depth(1)
                .max_depth(1)
                .follow_links(false)
            {
                let entry = entry.with_context(|| format!("读取目录失败: {}", base.display()))?;
                let Some(name) = entry.file_name().to_str() else {
                    warn!("跳过非 UTF-8 文件名: {:?}", entry.file_name());
                    continue;
                };
                // 链接按目标判断，指向普通文件的算文件，悬空链接跳过
                let is_file = if entry.file_type().is_symlink() {
                    std::fs::metadata(entry.path())
                        .map(|meta| meta.is_file())
                        .unwrap_or(false)
                } else {
                    entry.file_type().is_file()
                };
                entries.push(DirEntry {
                    name: name.to_string(),
                    is_file,
                });
            }
            Ok(entries)
        })
        .await?
    }

    async fn stat(&self, path: &str) -> Result<Option<FileMeta>> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(Some(FileMeta {
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified_time: DateTime::<Utc>::from(metadata.modified()?),
                is_dir: metadata.is_dir(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn open_read(&self, path: &str) -> Result<ReadStream> {
        let file = fs::File::open(path)
            .await
            .with_context(|| format!("无法打开本地文件: {}", path))?;
        Ok(Box::pin(file))
    }

    async fn open_write(&self, path: &str, mode: WriteMode) -> Result<WriteStream> {
        let mut options = fs::OpenOptions::new();
        options.write(true);
        match mode {
            WriteMode::Overwrite => options.create(true).truncate(true),
            WriteMode::CreateNew => options.create_new(true),
        };

        let file = options
            .open(path)
            .await
            .with_context(|| format!("无法创建本地文件: {}", path))?;
        Ok(Box::pin(file))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
