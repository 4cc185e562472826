use clap::Parser;
use sftpsync_lib::logging::{get_log_dir, LogConfig, SizeRotatingWriter};
use sftpsync_lib::ui::{run_once, run_session, TerminalSelector};
use sftpsync_lib::{EnumerationPolicy, ProfileSet, SftpConnector, SyncConfig, SyncEngine};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::prelude::*;

/// 按修改时间在本地目录和 SFTP 服务器之间同步文件
#[derive(Debug, Parser)]
#[command(name = "sftpsync", version, about)]
struct Cli {
    /// JSON settings file with the named sync profiles
    settings: PathBuf,

    /// Sync this profile once and exit instead of showing the menu
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,

    /// Seconds to wait for the SSH connection (0 disables the limit)
    #[arg(long, value_name = "SECS", default_value_t = sftpsync_lib::storage::OP_TIMEOUT_SECS)]
    connect_timeout: u64,

    /// Seconds allowed for each file copy (unlimited when omitted)
    #[arg(long, value_name = "SECS")]
    transfer_timeout: Option<u64>,

    /// Maximum number of files compared in parallel
    #[arg(long, value_name = "N", default_value_t = 8)]
    jobs: usize,

    /// Fail a direction when a directory cannot be listed instead of treating it as empty
    #[arg(long)]
    strict: bool,
}

impl Cli {
    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_concurrent_compares: self.jobs,
            connect_timeout: (self.connect_timeout > 0)
                .then(|| Duration::from_secs(self.connect_timeout)),
            transfer_timeout: self.transfer_timeout.map(Duration::from_secs),
            enumeration_policy: if self.strict {
                EnumerationPolicy::Abort
            } else {
                EnumerationPolicy::DegradeToEmpty
            },
        }
    }
}

/// 初始化日志系统
fn init_logging() {
    let log_dir = get_log_dir();
    let config = LogConfig::load(&log_dir);

    if !config.enabled {
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        return;
    }

    let mut env_filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(config.tracing_level().into());
    for directive in ["russh=warn", "russh_sftp=warn"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    match SizeRotatingWriter::new(&log_dir, config.max_size_mb) {
        Ok(file_writer) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false);

            // debug 构建同时输出到 stderr
            let console_layer = cfg!(debug_assertions).then(|| {
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
            });

            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(console_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        Err(e) => {
            eprintln!("Unable to open log file in {}: {}", log_dir.display(), e);
            #[cfg(debug_assertions)]
            {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .try_init();
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let profiles = match ProfileSet::load(&cli.settings) {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::error!("加载设置文件失败: {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("已加载 {} 个配置项: {}", profiles.len(), cli.settings.display());

    let engine = SyncEngine::with_config(Arc::new(SftpConnector), cli.sync_config());

    match &cli.profile {
        Some(name) => {
            let Some(profile) = profiles.get(name) else {
                eprintln!("Profile '{}' not found in {}", name, cli.settings.display());
                return ExitCode::FAILURE;
            };
            let reports = run_once(&engine, name, profile).await;
            if reports.iter().all(|report| report.is_success()) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        None => {
            if profiles.is_empty() {
                eprintln!("No profiles found in {}", cli.settings.display());
                return ExitCode::FAILURE;
            }
            match run_session(&engine, &profiles, TerminalSelector::new()).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!("交互会话异常结束: {:#}", e);
                    eprintln!("{:#}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
