use crate::models::{Direction, SyncProgress, SyncStatus};
use tokio::sync::mpsc;

/// 向展示层发送进度，没有接收方时什么都不做
#[derive(Debug, Clone)]
pub struct ProgressSink {
    direction: Direction,
    tx: Option<mpsc::Sender<SyncProgress>>,
}

impl ProgressSink {
    pub fn new(direction: Direction, tx: Option<mpsc::Sender<SyncProgress>>) -> Self {
        Self { direction, tx }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub async fn send(&self, progress: SyncProgress) {
        if let Some(tx) = &self.tx {
            // 接收方已关闭时忽略，进度不影响同步本身
            let _ = tx.send(progress).await;
        }
    }

    /// 进入新阶段
    pub async fn phase(&self, status: SyncStatus, phase: impl Into<String>) {
        self.send(SyncProgress::phase(self.direction, status, phase))
            .await;
    }

    /// 当前阶段的条目进度
    pub async fn item(
        &self,
        status: SyncStatus,
        phase: impl Into<String>,
        current_file: impl Into<String>,
        completed: usize,
        total: usize,
    ) {
        self.send(SyncProgress {
            direction: self.direction,
            status,
            phase: phase.into(),
            current_file: current_file.into(),
            completed: completed as u32,
            total: total as u32,
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_without_receiver_is_silent() {
        let sink = ProgressSink::new(Direction::Push, None);
        sink.phase(SyncStatus::Connecting, "Connecting").await;
    }

    #[tokio::test]
    async fn test_sink_forwards() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ProgressSink::new(Direction::Pull, Some(tx));
        sink.item(SyncStatus::Transferring, "Syncing files", "a.txt", 1, 2)
            .await;

        let progress = rx.recv().await.unwrap();
        assert_eq!(progress.direction, Direction::Pull);
        assert_eq!(progress.current_file, "a.txt");
        assert_eq!((progress.completed, progress.total), (1, 2));
    }
}
