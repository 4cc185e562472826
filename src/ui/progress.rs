use crate::models::{SyncProgress, SyncStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 进度条上显示的一行文字
pub fn status_line(progress: &SyncProgress) -> String {
    if progress.current_file.is_empty() {
        format!("[{}] {}", progress.direction, progress.phase)
    } else {
        format!(
            "[{}] {} {}",
            progress.direction, progress.phase, progress.current_file
        )
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} [{bar:25.cyan/dim}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// 消费进度通道并刷新进度条，发送端全部关闭后结束
pub fn spawn_renderer(mut rx: mpsc::Receiver<SyncProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        bar.set_style(bar_style());
        bar.enable_steady_tick(Duration::from_millis(100));

        while let Some(progress) = rx.recv().await {
            match progress.status {
                // 终态由结果输出负责，这里只清掉当前方向的进度
                SyncStatus::Completed | SyncStatus::Failed => {
                    bar.set_length(0);
                    bar.set_position(0);
                    bar.set_message(String::new());
                }
                _ => {
                    bar.set_length(progress.total as u64);
                    bar.set_position(progress.completed as u64);
                    bar.set_message(status_line(&progress));
                }
            }
        }

        bar.finish_and_clear();
    })
}
