//! 版本发现
//!
//! 查询 GitHub Releases 的最新发布，判断是否存在比当前版本更新的安装包

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::release::{Release, UpdateInfo};
use super::version::compare_versions;
use crate::network::rewrite_download_url;

/// GitHub API 默认地址
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// GitHub REST v3 媒体类型
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// 版本发现错误
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// 发布服务返回非 2xx 状态
    #[error("release host returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 网络错误
    #[error("release request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 响应不是合法的发布信息
    #[error("invalid release metadata: {0}")]
    InvalidRelease(#[from] serde_json::Error),
}

impl DiscoveryError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DiscoveryError::Status { status, .. } => Some(*status),
            DiscoveryError::Transport(e) => e.status().map(|s| s.as_u16()),
            DiscoveryError::InvalidRelease(_) => None,
        }
    }

    /// 调用方配置了重试时用于判断是否值得再试一次
    pub fn is_retryable(&self) -> bool {
        match self {
            DiscoveryError::Status { status, .. } => crate::network::is_retryable_status(*status),
            DiscoveryError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            DiscoveryError::InvalidRelease(_) => false,
        }
    }
}

/// 仓库坐标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub repo: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

/// 版本发现配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub repository: Repository,
    /// 当前运行的版本
    pub current_version: String,
    /// 可选的 GitHub Token，用于提高速率限制
    pub auth_token: Option<String>,
    /// 可选的下载加速前缀
    pub download_proxy: Option<String>,
    /// 安装包扩展名，如 ".apk"
    pub package_extension: String,
    pub api_base: String,
}

impl DiscoveryConfig {
    /// `GET /repos/{owner}/{repo}/releases/latest`
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            self.repository.owner,
            self.repository.repo
        )
    }

    fn bearer_token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// 根据发布信息判断是否有可用更新
///
/// 版本不高于当前版本、或者没有匹配扩展名的附件时返回 `None`
pub fn evaluate_release(release: &Release, config: &DiscoveryConfig) -> Option<UpdateInfo> {
    if compare_versions(&release.tag_name, &config.current_version) <= 0 {
        tracing::debug!(
            "最新发布 {} 不高于当前版本 {}",
            release.tag_name,
            config.current_version
        );
        return None;
    }

    let Some(asset) = release.find_package(&config.package_extension) else {
        tracing::warn!(
            "Release {} 中未找到 {} 安装包",
            release.tag_name,
            config.package_extension
        );
        return None;
    };

    Some(UpdateInfo {
        latest_version: release.tag_name.clone(),
        current_version: config.current_version.clone(),
        download_url: rewrite_download_url(
            config.download_proxy.as_deref(),
            &asset.browser_download_url,
        ),
        file_size: asset.size,
        file_name: asset.name.clone(),
        update_log: release.changelog(),
        release_url: release.html_url.clone(),
        published_at: release.published_at.clone(),
    })
}

/// GitHub Releases 客户端
#[derive(Debug, Clone)]
pub struct ReleaseDiscoveryClient {
    client: reqwest::Client,
    config: DiscoveryConfig,
    request_timeout: Option<Duration>,
}

impl ReleaseDiscoveryClient {
    pub fn new(client: reqwest::Client, config: DiscoveryConfig) -> Self {
        Self {
            client,
            config,
            request_timeout: None,
        }
    }

    /// 为发现请求设置超时；默认不限制
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// 获取最新发布信息
    pub async fn fetch_latest_release(&self) -> Result<Release, DiscoveryError> {
        let url = self.config.latest_release_url();
        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT);

        match self.config.bearer_token() {
            Some(token) => request = request.bearer_auth(token),
            None => tracing::debug!("未配置 GitHub Token，请求受未认证速率限制"),
        }

        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("查询最新发布: {}", url);
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            tracing::debug!("发布服务返回 {}", status);
            // 读不到响应体时仍保留状态码
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// 检查是否有新版本
    ///
    /// `Ok(None)` 表示没有可用更新（已是最新或未找到安装包）
    pub async fn check_for_update(&self) -> Result<Option<UpdateInfo>, DiscoveryError> {
        let release = self.fetch_latest_release().await?;
        let update = evaluate_release(&release, &self.config);

        match &update {
            Some(info) => tracing::info!(
                "发现新版本 {} (当前 {})",
                info.latest_version,
                info.current_version
            ),
            None => tracing::info!("当前版本 {} 已是最新", self.config.current_version),
        }

        Ok(update)
    }
}
