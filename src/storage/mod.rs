pub mod local;
pub mod sftp;

use crate::config::SyncProfile;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

pub use local::LocalStorage;
pub use sftp::{SftpConnector, SftpStorage};

// ============ 公共常量 ============

/// 建立连接的默认超时（秒）
pub const OP_TIMEOUT_SECS: u64 = 60;

/// 目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// 是否为普通文件（目录、链接、设备等都为 false）
    pub is_file: bool,
}

/// 文件元数据
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub size: u64,
    pub modified_time: DateTime<Utc>,
    pub is_dir: bool,
}

/// 目标文件的打开方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// 不存在则创建，存在则截断覆盖
    Overwrite,
    /// 只能新建，目标已存在时报错
    CreateNew,
}

pub type ReadStream = Pin<Box<dyn AsyncRead + Send>>;
pub type WriteStream = Pin<Box<dyn AsyncWrite + Send>>;

/// 存储抽象接口，本地和远程共用
#[async_trait]
pub trait Storage: Send + Sync {
    /// 列出目录下的直接子项（不递归）
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// 获取文件元数据，不存在时返回 None
    async fn stat(&self, path: &str) -> Result<Option<FileMeta>>;

    /// 检查文件是否存在
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.stat(path).await?.is_some())
    }

    /// 创建目录
    async fn create_dir(&self, path: &str) -> Result<()>;

    /// 打开文件用于读取
    async fn open_read(&self, path: &str) -> Result<ReadStream>;

    /// 打开文件用于写入
    async fn open_write(&self, path: &str, mode: WriteMode) -> Result<WriteStream>;

    /// 释放连接
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 远程会话的建立方式
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, profile: &SyncProfile) -> Result<Arc<dyn Storage>>;
}

/// 拼接目录和文件名，统一使用 `/`
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/srv/data", "a.txt"), "/srv/data/a.txt");
        assert_eq!(join_path("/srv/data/", "a.txt"), "/srv/data/a.txt");
        assert_eq!(join_path("", "a.txt"), "a.txt");
    }
}
