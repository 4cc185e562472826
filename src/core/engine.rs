use crate::config::SyncProfile;
use crate::core::comparator::{FileComparator, Side};
use crate::core::progress::ProgressSink;
use crate::core::scanner::{FileScanner, FileSet};
use crate::core::transfer::TransferScheduler;
use crate::error::SyncError;
use crate::models::{Direction, SyncProgress, SyncReport, SyncStatus};
use crate::storage::{Connector, LocalStorage, Storage, WriteMode, OP_TIMEOUT_SECS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// 目录列出失败时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumerationPolicy {
    /// 当作空目录继续（只记录警告）
    #[default]
    DegradeToEmpty,
    /// 终止当前方向
    Abort,
}

/// 同步配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 比较阶段的最大并发数
    pub max_concurrent_compares: usize,
    /// 连接超时
    pub connect_timeout: Option<Duration>,
    /// 单个文件传输超时
    pub transfer_timeout: Option<Duration>,
    pub enumeration_policy: EnumerationPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_compares: 8,
            connect_timeout: Some(Duration::from_secs(OP_TIMEOUT_SECS)),
            transfer_timeout: None,
            enumeration_policy: EnumerationPolicy::default(),
        }
    }
}

/// 同步引擎：一次处理一个配置项，推送和拉取互相独立
pub struct SyncEngine {
    connector: Arc<dyn Connector>,
    local: Arc<dyn Storage>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_config(connector, SyncConfig::default())
    }

    pub fn with_config(connector: Arc<dyn Connector>, config: SyncConfig) -> Self {
        Self {
            connector,
            local: Arc::new(LocalStorage::new()),
            config,
        }
    }

    /// 按配置项执行启用的方向，先推送后拉取
    pub async fn sync(
        &self,
        profile: &SyncProfile,
        progress_tx: Option<mpsc::Sender<SyncProgress>>,
    ) -> Vec<SyncReport> {
        let mut reports = Vec::new();
        if profile.push {
            reports.push(self.sync_push(profile, progress_tx.clone()).await);
        }
        if profile.pull {
            reports.push(self.sync_pull(profile, progress_tx).await);
        }
        if reports.is_empty() {
            info!("配置项未启用任何同步方向");
        }
        reports
    }

    /// 本地 -> 远程
    pub async fn sync_push(
        &self,
        profile: &SyncProfile,
        progress_tx: Option<mpsc::Sender<SyncProgress>>,
    ) -> SyncReport {
        let progress = ProgressSink::new(Direction::Push, progress_tx);
        self.run_direction(profile, &progress).await
    }

    /// 远程 -> 本地
    pub async fn sync_pull(
        &self,
        profile: &SyncProfile,
        progress_tx: Option<mpsc::Sender<SyncProgress>>,
    ) -> SyncReport {
        let progress = ProgressSink::new(Direction::Pull, progress_tx);
        self.run_direction(profile, &progress).await
    }

    /// 连接、执行、关闭连接，并把结果整理成报告
    async fn run_direction(&self, profile: &SyncProfile, progress: &ProgressSink) -> SyncReport {
        let direction = progress.direction();
        let start_time = chrono::Utc::now().timestamp();
        info!(
            "开始{}: {} -> {}",
            direction,
            profile.local_dir,
            profile.remote_dir
        );

        let result = match self.connect(profile, progress).await {
            Ok(remote) => {
                let result = match direction {
                    Direction::Push => self.push(profile, &remote, progress).await,
                    Direction::Pull => self.pull(profile, &remote, progress).await,
                };
                // 任何退出路径都要关闭连接
                if let Err(e) = remote.close().await {
                    warn!("关闭远程连接失败: {:#}", e);
                }
                result
            }
            Err(e) => Err(e),
        };

        let end_time = chrono::Utc::now().timestamp();
        match result {
            Ok(count) => {
                info!("{}完成: {} 个文件", direction, count);
                progress.phase(SyncStatus::Completed, "Finished!").await;
                SyncReport {
                    direction,
                    status: SyncStatus::Completed,
                    files_transferred: count,
                    start_time,
                    end_time,
                    error: None,
                }
            }
            Err(e) => {
                error!(error = ?e, "{}失败: {}", direction, e);
                progress.phase(SyncStatus::Failed, e.to_string()).await;
                SyncReport {
                    direction,
                    status: SyncStatus::Failed,
                    files_transferred: e.transferred(),
                    start_time,
                    end_time,
                    error: Some(e),
                }
            }
        }
    }

    async fn connect(
        &self,
        profile: &SyncProfile,
        progress: &ProgressSink,
    ) -> Result<Arc<dyn Storage>, SyncError> {
        progress
            .phase(
                SyncStatus::Connecting,
                format!("Connecting to {} on port {}", profile.host, profile.port),
            )
            .await;

        let connect = self.connector.connect(profile);
        match self.config.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, connect).await {
                Ok(result) => result.map_err(SyncError::Connection),
                Err(_) => Err(SyncError::ConnectTimeout(limit.as_secs())),
            },
            None => connect.await.map_err(SyncError::Connection),
        }
    }

    async fn push(
        &self,
        profile: &SyncProfile,
        remote: &Arc<dyn Storage>,
        progress: &ProgressSink,
    ) -> Result<usize, SyncError> {
        // 推送时远程目录不存在就创建
        progress
            .phase(
                SyncStatus::EnsuringDirectory,
                "Ensuring remote directory exists...",
            )
            .await;
        ensure_dir(remote.as_ref(), &profile.remote_dir).await?;

        let remote = Side::new(remote.clone(), profile.remote_dir.as_str());
        let local = Side::new(self.local.clone(), profile.local_dir.as_str());

        progress
            .phase(SyncStatus::Enumerating, "Fetching remote files...")
            .await;
        let remote_files = self.enumerate(&remote).await?;
        progress
            .phase(SyncStatus::Enumerating, "Fetching local files...")
            .await;
        let local_files = self.enumerate(&local).await?;

        let diff = FileComparator::new(self.config.max_concurrent_compares)
            .diff(&local, &local_files, &remote, &remote_files, progress)
            .await
            .map_err(SyncError::Diff)?;

        TransferScheduler::new(self.config.transfer_timeout)
            .run(diff, &local, &remote, WriteMode::Overwrite, progress)
            .await
    }

    async fn pull(
        &self,
        profile: &SyncProfile,
        remote: &Arc<dyn Storage>,
        progress: &ProgressSink,
    ) -> Result<usize, SyncError> {
        // 拉取时远程目录不存在视为配置错误，不去创建
        progress
            .phase(SyncStatus::EnsuringDirectory, "Checking remote directory...")
            .await;
        let remote_exists = remote
            .exists(&profile.remote_dir)
            .await
            .map_err(|source| SyncError::Precondition {
                path: profile.remote_dir.clone(),
                source,
            })?;
        if !remote_exists {
            return Err(SyncError::RemoteDirMissing {
                path: profile.remote_dir.clone(),
            });
        }

        progress
            .phase(
                SyncStatus::EnsuringDirectory,
                "Ensuring local directory exists...",
            )
            .await;
        ensure_dir(self.local.as_ref(), &profile.local_dir).await?;

        let remote = Side::new(remote.clone(), profile.remote_dir.as_str());
        let local = Side::new(self.local.clone(), profile.local_dir.as_str());

        progress
            .phase(SyncStatus::Enumerating, "Fetching remote files...")
            .await;
        let remote_files = self.enumerate(&remote).await?;
        progress
            .phase(SyncStatus::Enumerating, "Fetching local files...")
            .await;
        let local_files = self.enumerate(&local).await?;

        let diff = FileComparator::new(self.config.max_concurrent_compares)
            .diff(&remote, &remote_files, &local, &local_files, progress)
            .await
            .map_err(SyncError::Diff)?;

        progress
            .phase(SyncStatus::Transferring, "Sorting download...")
            .await;
        TransferScheduler::new(self.config.transfer_timeout)
            .run(diff, &remote, &local, WriteMode::CreateNew, progress)
            .await
    }

    async fn enumerate(&self, side: &Side) -> Result<FileSet, SyncError> {
        match FileScanner::new().scan(side.storage.as_ref(), &side.dir).await {
            Ok(files) => Ok(files),
            Err(e) => match self.config.enumeration_policy {
                EnumerationPolicy::DegradeToEmpty => {
                    warn!("列出 {} 失败，按空目录处理: {:#}", side.dir, e);
                    Ok(FileSet::new())
                }
                EnumerationPolicy::Abort => Err(SyncError::Enumeration {
                    path: side.dir.clone(),
                    source: e,
                }),
            },
        }
    }
}

/// 目录不存在时创建
async fn ensure_dir(storage: &dyn Storage, dir: &str) -> Result<(), SyncError> {
    let precondition = |source: anyhow::Error| SyncError::Precondition {
        path: dir.to_string(),
        source,
    };

    if !storage.exists(dir).await.map_err(precondition)? {
        info!("创建目录: {} {}", storage.name(), dir);
        storage.create_dir(dir).await.map_err(precondition)?;
    }
    Ok(())
}
