//! 更新管理器
//!
//! 串联版本发现、检查节流、下载与安装，并维护当前更新状态。
//! 同一个管理器同时只允许一个更新操作进行。

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use super::discovery::{DiscoveryError, ReleaseDiscoveryClient};
use super::downloader::{
    DownloadError, DownloadOptions, DownloadOutcome, DownloadProgress, PackageDownloader,
};
use super::installer::{default_downloads_dir, InstallError, InstallOutcome, InstallerDispatcher};
use super::launcher::{Launcher, SystemLauncher};
use super::release::UpdateInfo;
use super::scheduler::UpdateCheckScheduler;
use crate::config::{ConfigError, ConfigLoader, UpdateConfig};
use crate::network::{build_http_client, default_user_agent, with_retry};
use crate::storage::{KeyValueStore, StorageError};

/// 更新错误
#[derive(Debug, Error)]
pub enum UpdateError {
    /// 已有更新操作在进行
    #[error("an update operation is already in progress")]
    InFlight,

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// 更新状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Idle,
    Checking,
    UpToDate,
    UpdateAvailable,
    Downloading,
    Downloaded,
    Installing,
    Installed,
    Failed,
}

/// 更新管理器
pub struct UpdateManager {
    config: UpdateConfig,
    discovery: ReleaseDiscoveryClient,
    scheduler: UpdateCheckScheduler,
    downloader: PackageDownloader,
    installer: InstallerDispatcher,
    status: RwLock<UpdateStatus>,
    in_flight: Mutex<()>,
}

impl UpdateManager {
    pub fn new(
        config: UpdateConfig,
        discovery: ReleaseDiscoveryClient,
        scheduler: UpdateCheckScheduler,
        downloader: PackageDownloader,
        installer: InstallerDispatcher,
    ) -> Self {
        Self {
            config,
            discovery,
            scheduler,
            downloader,
            installer,
            status: RwLock::new(UpdateStatus::Idle),
            in_flight: Mutex::new(()),
        }
    }

    /// 按配置组装各组件，使用系统浏览器作为外部打开方式
    pub fn from_config(
        config: UpdateConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, UpdateError> {
        Self::with_launcher(config, store, Arc::new(SystemLauncher))
    }

    /// 与 `from_config` 相同，但可以替换外部打开方式
    pub fn with_launcher(
        config: UpdateConfig,
        store: Arc<dyn KeyValueStore>,
        launcher: Arc<dyn Launcher>,
    ) -> Result<Self, UpdateError> {
        let user_agent = config.user_agent.clone().unwrap_or_else(default_user_agent);
        let client = build_http_client(
            &user_agent,
            &config.effective_http_proxy(),
            &config.timeouts,
        )?;

        let discovery = ReleaseDiscoveryClient::new(client.clone(), config.discovery_config())
            .with_request_timeout(config.timeouts.request_duration());
        let scheduler = UpdateCheckScheduler::new(store, config.check_interval_ms);
        let downloader = PackageDownloader::new(client, config.download_mode, launcher.clone())
            .with_options(DownloadOptions {
                cancel: None,
                chunk_timeout: config.timeouts.request_duration(),
            });
        let downloads_dir = config
            .downloads_dir
            .clone()
            .unwrap_or_else(default_downloads_dir);
        let installer = InstallerDispatcher::detect(downloads_dir, launcher);

        Ok(Self::new(config, discovery, scheduler, downloader, installer))
    }

    /// 从设置文件与环境变量加载配置后组装
    pub fn load(loader: &ConfigLoader, store: Arc<dyn KeyValueStore>) -> Result<Self, UpdateError> {
        let config = loader.load()?;
        Self::from_config(config, store)
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    pub fn status(&self) -> UpdateStatus {
        *self.status.read()
    }

    pub fn scheduler(&self) -> &UpdateCheckScheduler {
        &self.scheduler
    }

    pub fn installer(&self) -> &InstallerDispatcher {
        &self.installer
    }

    fn set_status(&self, status: UpdateStatus) {
        let previous = std::mem::replace(&mut *self.status.write(), status);
        if previous != status {
            tracing::debug!("更新状态 {:?} -> {:?}", previous, status);
        }
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, UpdateError> {
        self.in_flight.try_lock().map_err(|_| UpdateError::InFlight)
    }

    /// 启动时自动检查
    ///
    /// 未开启自动检查或距离上次检查不足一个间隔时直接返回 `Ok(None)`
    pub async fn check_on_launch(&self) -> Result<Option<UpdateInfo>, UpdateError> {
        let _guard = self.acquire()?;

        if !self.config.auto_check_on_launch {
            tracing::debug!("未开启启动时自动检查");
            return Ok(None);
        }
        if !self.scheduler.should_check() {
            tracing::debug!("距上次检查不足 {}ms，跳过", self.scheduler.check_interval_ms());
            return Ok(None);
        }

        self.run_check().await
    }

    /// 手动检查，忽略检查间隔
    pub async fn check_now(&self) -> Result<Option<UpdateInfo>, UpdateError> {
        let _guard = self.acquire()?;
        self.run_check().await
    }

    async fn run_check(&self) -> Result<Option<UpdateInfo>, UpdateError> {
        self.set_status(UpdateStatus::Checking);

        let result = with_retry(
            || self.discovery.check_for_update(),
            &self.config.retry,
            DiscoveryError::is_retryable,
        )
        .await;

        match result {
            Ok(update) => {
                if let Err(e) = self.scheduler.record_check() {
                    tracing::warn!("无法记录更新检查时间: {}", e);
                }
                self.set_status(if update.is_some() {
                    UpdateStatus::UpdateAvailable
                } else {
                    UpdateStatus::UpToDate
                });
                Ok(update)
            }
            Err(e) => {
                tracing::warn!("检查更新失败: {}", e);
                self.set_status(UpdateStatus::Failed);
                Err(e.into())
            }
        }
    }

    /// 下载更新包
    pub async fn download<P>(
        &self,
        info: &UpdateInfo,
        on_progress: P,
    ) -> Result<DownloadOutcome, UpdateError>
    where
        P: FnMut(DownloadProgress),
    {
        let _guard = self.acquire()?;
        self.run_download(info, on_progress).await
    }

    async fn run_download<P>(
        &self,
        info: &UpdateInfo,
        on_progress: P,
    ) -> Result<DownloadOutcome, UpdateError>
    where
        P: FnMut(DownloadProgress),
    {
        self.set_status(UpdateStatus::Downloading);
        match self.downloader.download(info, on_progress).await {
            Ok(outcome) => {
                self.set_status(UpdateStatus::Downloaded);
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("下载更新包失败: {}", e);
                self.set_status(UpdateStatus::Failed);
                Err(e.into())
            }
        }
    }

    /// 安装已下载的更新包
    pub async fn install(
        &self,
        package: &DownloadOutcome,
        file_name: &str,
    ) -> Result<InstallOutcome, UpdateError> {
        let _guard = self.acquire()?;
        self.run_install(package, file_name).await
    }

    async fn run_install(
        &self,
        package: &DownloadOutcome,
        file_name: &str,
    ) -> Result<InstallOutcome, UpdateError> {
        self.set_status(UpdateStatus::Installing);
        match self.installer.install(package, file_name).await {
            Ok(outcome) => {
                tracing::info!("更新包已交给 {:?} 安装", outcome.strategy);
                self.set_status(UpdateStatus::Installed);
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("安装更新包失败: {}", e);
                self.set_status(UpdateStatus::Failed);
                Err(e.into())
            }
        }
    }

    /// 下载并安装
    pub async fn download_and_install<P>(
        &self,
        info: &UpdateInfo,
        on_progress: P,
    ) -> Result<InstallOutcome, UpdateError>
    where
        P: FnMut(DownloadProgress),
    {
        let _guard = self.acquire()?;

        // 不支持安装的平台不下载，也不交给浏览器
        if let Err(e) = self.installer.ensure_supported() {
            tracing::warn!("跳过下载: {}", e);
            self.set_status(UpdateStatus::Failed);
            return Err(e.into());
        }

        let package = self.run_download(info, on_progress).await?;
        self.run_install(&package, &info.file_name).await
    }

    /// 清除检查记录
    pub fn reset_schedule(&self) -> Result<(), UpdateError> {
        self.scheduler.reset()?;
        Ok(())
    }
}

impl std::fmt::Debug for UpdateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateManager")
            .field("status", &self.status())
            .field("scheduler", &self.scheduler)
            .field("downloader", &self.downloader)
            .field("installer", &self.installer)
            .finish()
    }
}
