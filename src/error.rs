//! 错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 设置文件错误（致命，进入选择循环之前就退出）
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse settings file JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings file {path} must contain an object of named profiles")]
    NotAMapping { path: PathBuf },
}

/// 单个同步方向的失败原因
///
/// 每个变体都只终止当前方向，不会让进程退出。
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Connection failed!")]
    Connection(#[source] anyhow::Error),

    #[error("Connection timed out after {0}s")]
    ConnectTimeout(u64),

    #[error("Remote directory does not exist")]
    RemoteDirMissing { path: String },

    #[error("Unable to prepare directory {path}: {source}")]
    Precondition {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unable to list {path}: {source}")]
    Enumeration {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unable to compare files: {0}")]
    Diff(#[source] anyhow::Error),

    #[error("Transfer of {file} failed after {transferred} files: {source}")]
    Transfer {
        file: String,
        transferred: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    /// 出错前已经传输完成的文件数（不会回滚）
    pub fn transferred(&self) -> usize {
        match self {
            SyncError::Transfer { transferred, .. } => *transferred,
            _ => 0,
        }
    }
}
