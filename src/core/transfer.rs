//! 传输调度 - 按源文件修改时间从旧到新逐个复制

use crate::core::comparator::Side;
use crate::core::progress::ProgressSink;
use crate::error::SyncError;
use crate::models::{Direction, SyncStatus};
use crate::storage::WriteMode;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// 文件大小显示，例如 `1.50MB`
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / BYTES_PER_MB)
}

/// 按源文件修改时间升序排列，时间相同按文件名
///
/// 中途中断时，目标端已有的文件是时间上连续的一段前缀。
/// 源文件已消失的排在最前面，复制时会报错。
pub async fn order_by_modified(source: &Side, files: Vec<String>) -> Result<Vec<String>> {
    let mut timed = Vec::with_capacity(files.len());
    for name in files {
        let path = crate::storage::join_path(&source.dir, &name);
        let modified = source
            .storage
            .stat(&path)
            .await
            .with_context(|| format!("获取修改时间失败: {}", name))?
            .map(|meta| meta.modified_time)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        timed.push((modified, name));
    }

    timed.sort();
    Ok(timed.into_iter().map(|(_, name)| name).collect())
}

/// 传输调度器：严格串行，一个文件复制完才开始下一个
#[derive(Debug, Clone, Default)]
pub struct TransferScheduler {
    /// 单个文件的超时，None 表示不限制
    timeout: Option<Duration>,
}

impl TransferScheduler {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// 排序后逐个复制，返回成功传输的文件数
    ///
    /// 任何一个文件失败都会终止剩余传输，已经传完的文件保留。
    pub async fn run(
        &self,
        files: Vec<String>,
        source: &Side,
        dest: &Side,
        mode: WriteMode,
        progress: &ProgressSink,
    ) -> Result<usize, SyncError> {
        let ordered = order_by_modified(source, files)
            .await
            .map_err(SyncError::Diff)?;
        let total = ordered.len();
        let verb = match progress.direction() {
            Direction::Push => "Uploading",
            Direction::Pull => "Downloading",
        };

        progress
            .item(SyncStatus::Transferring, "Syncing files", "", 0, total)
            .await;

        for (index, name) in ordered.iter().enumerate() {
            let fail = |err: anyhow::Error| SyncError::Transfer {
                file: name.clone(),
                transferred: index,
                source: err,
            };

            let size = source
                .storage
                .stat(&crate::storage::join_path(&source.dir, name))
                .await
                .map_err(fail)?
                .map(|meta| meta.size)
                .unwrap_or(0);
            let label = format_size_mb(size);
            debug!("{} {} [{}]", verb, name, label);
            progress
                .item(
                    SyncStatus::Transferring,
                    verb,
                    format!("{} [{}]", name, label),
                    index,
                    total,
                )
                .await;

            let copy = copy_file(source, dest, name, mode);
            let copied = match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, copy).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!("传输超时 ({}s)", limit.as_secs())),
                },
                None => copy.await,
            };
            copied.map_err(fail)?;
        }

        progress
            .item(SyncStatus::Transferring, "Syncing files", "", total, total)
            .await;
        info!("传输完成: {} 个文件", total);
        Ok(total)
    }
}

/// 复制单个文件，返回写入的字节数
async fn copy_file(source: &Side, dest: &Side, name: &str, mode: WriteMode) -> Result<u64> {
    let src_path = crate::storage::join_path(&source.dir, name);
    let dst_path = crate::storage::join_path(&dest.dir, name);

    let mut reader = source.storage.open_read(&src_path).await?;
    let mut writer = dest.storage.open_write(&dst_path, mode).await?;
    let bytes = tokio::io::copy(&mut reader, &mut writer)
        .await
        .with_context(|| format!("复制失败: {} -> {}", src_path, dst_path))?;
    writer.shutdown().await?;

    Ok(bytes)
}
