use crate::config::{ProfileSet, SyncProfile};
use crate::core::SyncEngine;
use crate::models::SyncReport;
use crate::ui::{print_report, spawn_renderer, ProfileSelector};
use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

const PROGRESS_BUFFER: usize = 256;

/// 同步一个配置项：进度条显示过程，结束后逐个方向输出结果
pub async fn run_once(engine: &SyncEngine, name: &str, profile: &SyncProfile) -> Vec<SyncReport> {
    info!("同步配置项: {}", name);

    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    let renderer = spawn_renderer(rx);
    let reports = engine.sync(profile, Some(tx)).await;
    if let Err(e) = renderer.await {
        warn!("进度显示任务异常结束: {}", e);
    }

    for report in &reports {
        print_report(report);
    }
    reports
}

/// 选择 -> 同步 -> 再选择，直到操作者退出
///
/// 单个配置项失败只输出结果，不影响下一轮。
pub async fn run_session<S>(engine: &SyncEngine, profiles: &ProfileSet, selector: S) -> Result<()>
where
    S: ProfileSelector + 'static,
{
    let names = profiles.names();
    let mut selector = selector;

    loop {
        // 菜单会阻塞，放到阻塞线程里
        let menu_names = names.clone();
        let (returned, choice) = tokio::task::spawn_blocking(move || {
            let choice = selector.select(&menu_names);
            (selector, choice)
        })
        .await?;
        selector = returned;

        let Some(index) = choice? else {
            info!("退出");
            return Ok(());
        };
        let Some(name) = names.get(index) else {
            warn!("无效的选择: {}", index);
            continue;
        };
        if let Some(profile) = profiles.get(name) {
            run_once(engine, name, profile).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Connector, Storage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Scripted(VecDeque<Option<usize>>);

    impl ProfileSelector for Scripted {
        fn select(&mut self, _names: &[String]) -> Result<Option<usize>> {
            Ok(self.0.pop_front().flatten())
        }
    }

    #[derive(Default)]
    struct CountingConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn connect(&self, _profile: &SyncProfile) -> Result<Arc<dyn Storage>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("no route to host"))
        }
    }

    fn profiles() -> ProfileSet {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "both": { "Host": "h", "SyncToRemote": true, "SyncToLocal": true },
                "idle": { "Host": "h" }
            }"#,
        )
        .unwrap();
        ProfileSet::load(&path).unwrap()
    }

    #[tokio::test]
    async fn test_session_loops_until_quit() {
        let connector = Arc::new(CountingConnector::default());
        let engine = SyncEngine::new(connector.clone());
        let script = Scripted(VecDeque::from(vec![Some(0), Some(1), Some(7), Some(0), None]));

        run_session(&engine, &profiles(), script).await.unwrap();

        // "both" 选了两次，每次推送和拉取各连接一次；"idle" 不连接
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_run_once_returns_failed_reports() {
        let engine = SyncEngine::new(Arc::new(CountingConnector::default()));
        let set = profiles();
        let reports = run_once(&engine, "both", set.get("both").unwrap()).await;

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.is_success()));
    }
}
