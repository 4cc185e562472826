pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod ui;

pub use config::{ProfileSet, SyncProfile};
pub use core::{EnumerationPolicy, SyncConfig, SyncEngine};
pub use error::{ConfigError, SyncError};
pub use models::{Direction, SyncProgress, SyncReport, SyncStatus};
pub use storage::{Connector, SftpConnector, Storage};

/// 应用名称，用于配置目录
pub const APP_NAME: &str = "sftpsync";

// 各平台的配置目录，避免额外引入 dirs 依赖
pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }

    /// 应用自己的配置目录 `<config dir>/sftpsync`
    pub fn app_dir() -> PathBuf {
        config_dir()
            .map(|p| p.join(crate::APP_NAME))
            .unwrap_or_else(|| PathBuf::from(format!(".{}", crate::APP_NAME)))
    }
}
