use super::{Connector, DirEntry, FileMeta, ReadStream, Storage, WriteMode, WriteStream};
use crate::config::SyncProfile;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use russh::client;
use russh_keys::key;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{OpenFlags, StatusCode};
use std::sync::Arc;
use tracing::{debug, info};

/// SSH 客户端回调
struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    // 不校验主机密钥
    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// 基于 SSH 会话的 SFTP 存储
pub struct SftpStorage {
    sftp: SftpSession,
    session: client::Handle<ClientHandler>,
    name: String,
}

impl SftpStorage {
    /// 建立 SSH 连接、密码认证并打开 sftp 子系统
    pub async fn connect(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        let name = format!("sftp://{}@{}:{}", username, host, port);
        info!("连接远程存储: {}", name);

        let config = Arc::new(client::Config::default());
        let mut session = client::connect(config, (host, port), ClientHandler)
            .await
            .with_context(|| format!("无法连接 {}:{}", host, port))?;

        let authenticated = session
            .authenticate_password(username, password)
            .await
            .context("SSH 认证失败")?;
        if !authenticated {
            bail!("用户 {} 认证被拒绝", username);
        }

        let channel = session.channel_open_session().await?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .context("服务器不支持 sftp 子系统")?;
        let sftp = SftpSession::new(channel.into_stream()).await?;

        debug!("sftp 会话已建立: {}", name);
        Ok(Self {
            sftp,
            session,
            name,
        })
    }
}

/// 两步都执行完之后，报告先出现的错误
fn first_error(first: Result<()>, second: Result<()>) -> Result<()> {
    if let Err(e) = second {
        first?;
        return Err(e);
    }
    first
}

fn is_not_found(err: &SftpError) -> bool {
    matches!(err, SftpError::Status(status) if status.status_code == StatusCode::NoSuchFile)
}

#[async_trait]
impl Storage for SftpStorage {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let read_dir = self
            .sftp
            .read_dir(path)
            .await
            .with_context(|| format!("读取远程目录失败: {}", path))?;

        Ok(read_dir
            .map(|entry| DirEntry {
                is_file: entry.metadata().is_regular(),
                name: entry.file_name(),
            })
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<Option<FileMeta>> {
        match self.sftp.metadata(path).await {
            Ok(meta) => Ok(Some(FileMeta {
                size: meta.size.unwrap_or(0),
                modified_time: meta
                    .mtime
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t as i64, 0))
                    .unwrap_or_default(),
                is_dir: meta.is_dir(),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("获取远程文件信息失败: {}", path)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.sftp.try_exists(path).await?)
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.sftp
            .create_dir(path)
            .await
            .with_context(|| format!("创建远程目录失败: {}", path))?;
        Ok(())
    }

    async fn open_read(&self, path: &str) -> Result<ReadStream> {
        let file = self
            .sftp
            .open(path)
            .await
            .with_context(|| format!("无法打开远程文件: {}", path))?;
        Ok(Box::pin(file))
    }

    async fn open_write(&self, path: &str, mode: WriteMode) -> Result<WriteStream> {
        let flags = match mode {
            WriteMode::Overwrite => OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            WriteMode::CreateNew => OpenFlags::CREATE | OpenFlags::EXCLUDE | OpenFlags::WRITE,
        };
        let file = self
            .sftp
            .open_with_flags(path, flags)
            .await
            .with_context(|| format!("无法创建远程文件: {}", path))?;
        Ok(Box::pin(file))
    }

    async fn close(&self) -> Result<()> {
        debug!("关闭远程连接: {}", self.name);
        let closed = self.sftp.close().await.context("关闭 sftp 会话失败");
        // sftp 关闭失败也要断开 SSH
        let disconnected = self
            .session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .context("断开 SSH 连接失败");
        first_error(closed, disconnected)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 用配置项中的主机、端口和密码建立 SFTP 连接
#[derive(Debug, Clone, Copy, Default)]
pub struct SftpConnector;

#[async_trait]
impl Connector for SftpConnector {
    async fn connect(&self, profile: &SyncProfile) -> Result<Arc<dyn Storage>> {
        let storage = SftpStorage::connect(
            &profile.host,
            profile.port,
            &profile.username,
            &profile.password,
        )
        .await?;
        Ok(Arc::new(storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_first_error_keeps_earliest_failure() {
        assert!(first_error(Ok(()), Ok(())).is_ok());

        let err = first_error(Err(anyhow!("close")), Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "close");

        let err = first_error(Ok(()), Err(anyhow!("disconnect"))).unwrap_err();
        assert_eq!(err.to_string(), "disconnect");

        let err = first_error(Err(anyhow!("close")), Err(anyhow!("disconnect"))).unwrap_err();
        assert_eq!(err.to_string(), "close");
    }
}
