use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 同步方向
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// 本地 -> 远程
    Push,
    /// 远程 -> 本地
    Pull,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Push => write!(f, "push"),
            Direction::Pull => write!(f, "pull"),
        }
    }
}

/// 单个方向的同步状态
///
/// `Idle -> Connecting -> EnsuringDirectory -> Enumerating -> Comparing
/// -> Transferring -> Completed`，任何一步都可能转入 `Failed`（终态）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Connecting,
    EnsuringDirectory,
    Enumerating,
    Comparing,
    Transferring,
    Completed,
    Failed,
}

/// 同步进度，通过 channel 发给展示层
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub direction: Direction,
    pub status: SyncStatus,
    pub phase: String,
    pub current_file: String,
    /// 当前阶段已完成的条目数
    pub completed: u32,
    /// 当前阶段的总条目数（0 表示不确定）
    pub total: u32,
}

impl SyncProgress {
    pub fn phase(direction: Direction, status: SyncStatus, phase: impl Into<String>) -> Self {
        Self {
            direction,
            status,
            phase: phase.into(),
            current_file: String::new(),
            completed: 0,
            total: 0,
        }
    }
}

/// 单个方向一次运行的结果
#[derive(Debug)]
pub struct SyncReport {
    pub direction: Direction,
    pub status: SyncStatus,
    /// 成功传输的文件数
    pub files_transferred: usize,
    pub start_time: i64,
    pub end_time: i64,
    pub error: Option<SyncError>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Completed
    }

    /// 给操作者看的结果描述
    pub fn message(&self) -> String {
        match (&self.error, self.direction) {
            (Some(e), _) => e.to_string(),
            (None, Direction::Push) => format!("Uploaded {} files", self.files_transferred),
            (None, Direction::Pull) => format!("Downloaded {} files", self.files_transferred),
        }
    }
}
