use crate::core::progress::ProgressSink;
use crate::core::scanner::FileSet;
use crate::models::{Direction, SyncStatus};
use crate::storage::{join_path, Storage};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

/// 比较的一侧：存储 + 目录
#[derive(Clone)]
pub struct Side {
    pub storage: Arc<dyn Storage>,
    pub dir: String,
}

impl Side {
    pub fn new(storage: Arc<dyn Storage>, dir: impl Into<String>) -> Self {
        Self {
            storage,
            dir: dir.into(),
        }
    }

    fn path(&self, name: &str) -> String {
        join_path(&self.dir, name)
    }

    async fn modified_time(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let meta = self
            .storage
            .stat(&self.path(name))
            .await
            .with_context(|| format!("获取修改时间失败: {}", name))?;
        Ok(meta.map(|m| m.modified_time))
    }
}

/// 单个文件是否需要从源复制到目标
///
/// 目标不存在时总是复制；两边都存在时只有源严格更新才复制，时间相同不复制。
/// 源在比较过程中消失的文件不复制。
pub fn needs_transfer(source: Option<DateTime<Utc>>, dest: Option<DateTime<Utc>>) -> bool {
    match (source, dest) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(src), Some(dst)) => dst < src,
    }
}

/// 比较过程中的共享状态
#[derive(Default)]
struct DiffState {
    result: Vec<String>,
    processed: usize,
}

/// 文件比较器：按修改时间计算需要传输的文件
pub struct FileComparator {
    max_concurrent: usize,
}

impl FileComparator {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 计算需要从 `source` 复制到 `dest` 的文件
    ///
    /// 每个文件并发判断，结果顺序不确定，由传输阶段重新排序。
    pub async fn diff(
        &self,
        source: &Side,
        source_set: &FileSet,
        dest: &Side,
        dest_set: &FileSet,
        progress: &ProgressSink,
    ) -> Result<Vec<String>> {
        let total = source_set.len();
        let phase = match progress.direction() {
            Direction::Push => "Calculating upload...",
            Direction::Pull => "Calculating download...",
        };
        progress
            .item(SyncStatus::Comparing, phase, "", 0, total)
            .await;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let state = Arc::new(Mutex::new(DiffState::default()));
        let dest_set = Arc::new(dest_set.clone());
        let mut handles = Vec::with_capacity(total);

        for name in source_set.iter().cloned() {
            let permit = semaphore.clone().acquire_owned().await?;
            let source = source.clone();
            let dest = dest.clone();
            let dest_set = dest_set.clone();
            let state = state.clone();
            let progress = progress.clone();

            handles.push(tokio::spawn(async move {
                let outcome = Self::evaluate(&name, &source, &dest, &dest_set).await;

                // 锁只保护追加和计数，发送进度前释放
                let processed = {
                    let mut state = state.lock().await;
                    state.processed += 1;
                    if let Ok(true) = outcome {
                        state.result.push(name.clone());
                    }
                    state.processed
                };
                drop(permit);

                progress
                    .item(SyncStatus::Comparing, phase, name, processed, total)
                    .await;

                outcome.map(|_| ())
            }));
        }

        for outcome in futures::future::join_all(handles).await {
            outcome??;
        }

        let result = std::mem::take(&mut state.lock().await.result);
        debug!("比较完成: {} 个源文件, {} 个需要传输", total, result.len());
        Ok(result)
    }

    async fn evaluate(name: &str, source: &Side, dest: &Side, dest_set: &FileSet) -> Result<bool> {
        if !dest_set.contains(name) {
            debug!("新文件: {}", name);
            return Ok(true);
        }

        let src_time = source.modified_time(name).await?;
        let dst_time = dest.modified_time(name).await?;
        let include = needs_transfer(src_time, dst_time);
        if include {
            debug!("源文件更新: {} ({:?} > {:?})", name, src_time, dst_time);
        }
        Ok(include)
    }
}

impl Default for FileComparator {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::FileScanner;
    use crate::storage::{DirEntry, FileMeta, LocalStorage, ReadStream, WriteMode, WriteStream};
    use async_trait::async_trait;
    use filetime::FileTime;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &[u8], unix_secs: i64) {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
    }

    fn side(dir: &TempDir) -> Side {
        Side::new(Arc::new(LocalStorage::new()), dir.path().to_string_lossy())
    }

    async fn run_diff(src: &TempDir, dst: &TempDir) -> Vec<String> {
        let scanner = FileScanner::new();
        let (src_side, dst_side) = (side(src), side(dst));
        let src_set = scanner
            .scan(src_side.storage.as_ref(), &src_side.dir)
            .await
            .unwrap();
        let dst_set = scanner
            .scan(dst_side.storage.as_ref(), &dst_side.dir)
            .await
            .unwrap();

        let mut result = FileComparator::default()
            .diff(
                &src_side,
                &src_set,
                &dst_side,
                &dst_set,
                &ProgressSink::new(Direction::Push, None),
            )
            .await
            .unwrap();
        result.sort();
        result
    }

    #[test]
    fn test_needs_transfer_rules() {
        let t1 = DateTime::<Utc>::from_timestamp(1_000, 0).unwrap();
        let t2 = DateTime::<Utc>::from_timestamp(2_000, 0).unwrap();

        assert!(needs_transfer(Some(t1), None));
        assert!(needs_transfer(Some(t2), Some(t1)));
        assert!(!needs_transfer(Some(t1), Some(t2)));
        assert!(!needs_transfer(Some(t1), Some(t1)));
        assert!(!needs_transfer(None, Some(t1)));
    }

    #[tokio::test]
    async fn test_push_and_pull_fixture() {
        // a.txt: 本地 T1，远程 T2 (T1 < T2)；b.txt 只在本地 (T3)
        let local = tempfile::tempdir().unwrap();
        let remote = tempfile::tempdir().unwrap();
        write_file(local.path(), "a.txt", b"old", 1_000);
        write_file(local.path(), "b.txt", b"b", 3_000);
        write_file(remote.path(), "a.txt", b"new", 2_000);

        assert_eq!(run_diff(&local, &remote).await, vec!["b.txt"]);
        assert_eq!(run_diff(&remote, &local).await, vec!["a.txt"]);
    }

    #[tokio::test]
    async fn test_equal_times_never_transfer_even_if_size_differs() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_file(src.path(), "same.bin", b"a much longer body", 5_000);
        write_file(dst.path(), "same.bin", b"short", 5_000);

        assert!(run_diff(&src, &dst).await.is_empty());
    }

    #[tokio::test]
    async fn test_result_is_subset_of_source() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_file(src.path(), "x", b"x", 10);
        write_file(dst.path(), "only-dest", b"d", 10);
        write_file(dst.path(), "y", b"y", 10);

        assert_eq!(run_diff(&src, &dst).await, vec!["x"]);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_file(dst.path(), "z", b"z", 10);

        assert!(run_diff(&src, &dst).await.is_empty());
    }

    #[tokio::test]
    async fn test_many_files_in_parallel() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        for i in 0..50 {
            let name = format!("f{:02}", i);
            write_file(src.path(), &name, b"s", 2_000);
            // 偶数文件目标更旧
            let dst_time = if i % 2 == 0 { 1_000 } else { 3_000 };
            write_file(dst.path(), &name, b"d", dst_time);
        }

        let result = run_diff(&src, &dst).await;
        assert_eq!(result.len(), 25);
        assert!(result.iter().all(|n| n[1..].parse::<u32>().unwrap() % 2 == 0));
    }

    #[tokio::test]
    async fn test_reports_progress_per_file() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            write_file(src.path(), name, b"s", 100);
        }
        let set: FileSet = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        FileComparator::new(2)
            .diff(
                &side(&src),
                &set,
                &side(&dst),
                &FileSet::new(),
                &ProgressSink::new(Direction::Push, Some(tx)),
            )
            .await
            .unwrap();

        let mut updates = Vec::new();
        while let Ok(p) = rx.try_recv() {
            updates.push(p);
        }
        // 开始时一条，每个文件一条；各文件的进度到达顺序不固定
        assert_eq!(updates.len(), 4);
        let mut completed: Vec<u32> = updates.iter().map(|p| p.completed).collect();
        completed.sort();
        assert_eq!(completed, vec![0, 1, 2, 3]);
        assert!(updates.iter().all(|p| p.total == 3));
    }

    /// 统计 stat 调用次数的本地存储
    struct CountingStorage {
        inner: LocalStorage,
        stats: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Storage for CountingStorage {
        async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
            self.inner.list_dir(path).await
        }

        async fn stat(&self, path: &str) -> Result<Option<FileMeta>> {
            self.stats.fetch_add(1, Ordering::SeqCst);
            self.inner.stat(path).await
        }

        async fn create_dir(&self, path: &str) -> Result<()> {
            self.inner.create_dir(path).await
        }

        async fn open_read(&self, path: &str) -> Result<ReadStream> {
            self.inner.open_read(path).await
        }

        async fn open_write(&self, path: &str, mode: WriteMode) -> Result<WriteStream> {
            self.inner.open_write(path, mode).await
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_stalled_progress_reader_does_not_block_comparison() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..6).map(|i| format!("f{}", i)).collect();
        for name in &names {
            write_file(src.path(), name, b"s", 2_000);
            write_file(dst.path(), name, b"d", 1_000);
        }
        let set: FileSet = names.iter().cloned().collect();

        let stats = Arc::new(AtomicUsize::new(0));
        let storage: Arc<dyn Storage> = Arc::new(CountingStorage {
            inner: LocalStorage::new(),
            stats: stats.clone(),
        });
        let source = Side::new(storage.clone(), src.path().to_string_lossy());
        let dest = Side::new(storage, dst.path().to_string_lossy());

        // 容量 1，暂时没有人读取
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        let sink = ProgressSink::new(Direction::Push, Some(tx));
        let handle = tokio::spawn(async move {
            FileComparator::new(2)
                .diff(&source, &set, &dest, &set, &sink)
                .await
        });

        // 进度发不出去时，每个文件的两次 stat 仍然都能完成
        tokio::time::timeout(Duration::from_secs(5), async {
            while stats.load(Ordering::SeqCst) < 12 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        while rx.recv().await.is_some() {}
        let mut result = handle.await.unwrap().unwrap();
        result.sort();
        assert_eq!(result, names);
    }
}
