use crate::storage::Storage;
use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info};

/// 永远不参与同步的系统文件
pub const DENYLIST: &[&str] = &["desktop.ini"];

/// 一个目录在某一时刻的可同步文件名集合
pub type FileSet = HashSet<String>;

/// 文件扫描器：列出目录下的普通文件（不递归）
#[derive(Debug, Clone)]
pub struct FileScanner {
    denylist: Vec<String>,
}

impl FileScanner {
    pub fn new() -> Self {
        Self {
            denylist: DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 检查文件名是否应该被排除
    fn should_exclude(&self, name: &str) -> bool {
        self.denylist.iter().any(|d| d == name)
    }

    /// 扫描目录，列出失败时返回错误而不是空集合
    pub async fn scan(&self, storage: &dyn Storage, dir: &str) -> Result<FileSet> {
        info!("开始扫描: {} {}", storage.name(), dir);

        let entries = storage.list_dir(dir).await?;
        let total = entries.len();

        let files: FileSet = entries
            .into_iter()
            .filter(|entry| entry.is_file)
            .filter(|entry| {
                let excluded = self.should_exclude(&entry.name);
                if excluded {
                    debug!("排除文件: {}", entry.name);
                }
                !excluded
            })
            .map(|entry| entry.name)
            .collect();

        info!("扫描完成: {} 个条目, {} 个文件", total, files.len());
        Ok(files)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}
