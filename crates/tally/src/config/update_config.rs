//! 更新配置
//!
//! `UpdateConfig` 描述更新流程所需的全部设置，`ConfigLoader` 负责从磁盘与环境变量加载

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::network::{ProxyConfig, RetryConfig, TimeoutConfig};
use crate::updater::{
    DiscoveryConfig, DownloadMode, Repository, DEFAULT_API_BASE, DEFAULT_CHECK_INTERVAL_MS,
};

/// 配置目录环境变量
pub const ENV_CONFIG_DIR: &str = "TALLY_CONFIG_DIR";
pub const ENV_GITHUB_TOKEN: &str = "TALLY_GITHUB_TOKEN";
/// 设为空字符串可关闭下载加速
pub const ENV_GH_PROXY: &str = "TALLY_GH_PROXY";
pub const ENV_CURRENT_VERSION: &str = "TALLY_CURRENT_VERSION";
pub const ENV_API_BASE: &str = "TALLY_API_BASE";

pub const SETTINGS_FILE: &str = "settings.yaml";

pub const DEFAULT_REPOSITORY_OWNER: &str = "guoziyangnb";
pub const DEFAULT_REPOSITORY_REPO: &str = "bookkeeping-app";
/// 默认 GitHub 下载加速前缀
pub const DEFAULT_GH_PROXY: &str = "https://hk.gh-proxy.org/";

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

fn default_current_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_repository() -> Repository {
    Repository::new(DEFAULT_REPOSITORY_OWNER, DEFAULT_REPOSITORY_REPO)
}

fn default_download_proxy() -> Option<String> {
    Some(DEFAULT_GH_PROXY.to_string())
}

fn default_check_interval_ms() -> u64 {
    DEFAULT_CHECK_INTERVAL_MS
}

fn default_package_extension() -> String {
    ".apk".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// 更新配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// 当前运行的版本
    #[serde(default = "default_current_version")]
    pub current_version: String,

    /// 发布所在的 GitHub 仓库
    #[serde(default = "default_repository")]
    pub repository: Repository,

    /// GitHub Token（可选，提高 API 速率限制）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// 下载地址前缀，空字符串表示不改写
    #[serde(default = "default_download_proxy")]
    pub download_proxy: Option<String>,

    /// 自动检查间隔（毫秒）
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// 启动时是否自动检查
    #[serde(default)]
    pub auto_check_on_launch: bool,

    #[serde(default = "default_package_extension")]
    pub package_extension: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub download_mode: DownloadMode,

    /// 安装包保存目录，未设置时使用数据目录下的 downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads_dir: Option<PathBuf>,

    /// 自定义 User-Agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// HTTP 代理设置，未配置时读取 HTTP(S)_PROXY 环境变量
    #[serde(default, skip_serializing_if = "ProxyConfig::is_empty")]
    pub http_proxy: ProxyConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            current_version: default_current_version(),
            repository: default_repository(),
            auth_token: None,
            download_proxy: default_download_proxy(),
            check_interval_ms: default_check_interval_ms(),
            auto_check_on_launch: false,
            package_extension: default_package_extension(),
            api_base: default_api_base(),
            download_mode: DownloadMode::default(),
            downloads_dir: None,
            user_agent: None,
            http_proxy: ProxyConfig::default(),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl UpdateConfig {
    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = env_non_empty(ENV_GITHUB_TOKEN) {
            self.auth_token = Some(token);
        }
        if let Ok(proxy) = std::env::var(ENV_GH_PROXY) {
            let proxy = proxy.trim().to_string();
            self.download_proxy = if proxy.is_empty() { None } else { Some(proxy) };
        }
        if let Some(version) = env_non_empty(ENV_CURRENT_VERSION) {
            self.current_version = version;
        }
        if let Some(base) = env_non_empty(ENV_API_BASE) {
            self.api_base = base;
        }
    }

    /// 版本发现所需的配置
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            repository: self.repository.clone(),
            current_version: self.current_version.clone(),
            auth_token: self.auth_token.clone(),
            download_proxy: self.download_proxy.clone(),
            package_extension: self.package_extension.clone(),
            api_base: self.api_base.clone(),
        }
    }

    /// 生效的 HTTP 代理：配置文件优先，其次环境变量
    pub fn effective_http_proxy(&self) -> ProxyConfig {
        if self.http_proxy.is_empty() {
            ProxyConfig::from_env()
        } else {
            self.http_proxy.clone()
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// 使用 `TALLY_CONFIG_DIR`，未设置时为 `~/.tally`
    pub fn new() -> Self {
        let config_dir = std::env::var(ENV_CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".tally"));
        Self::with_dir(config_dir)
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// 加载设置文件并应用环境变量
    pub fn load(&self) -> Result<UpdateConfig, ConfigError> {
        let mut config = self.load_file()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// 只读取设置文件；文件不存在时返回默认值
    pub fn load_file(&self) -> Result<UpdateConfig, ConfigError> {
        let path = self.settings_path();
        if !path.exists() {
            tracing::debug!("未找到设置文件 {:?}，使用默认配置", path);
            return Ok(UpdateConfig::default());
        }

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(UpdateConfig::default());
        }

        let config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("加载设置文件: {:?}", path);
        Ok(config)
    }

    /// 写回设置文件
    pub fn save(&self, config: &UpdateConfig) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)?;
        let yaml = serde_yaml::to_string(config)?;
        fs::write(self.settings_path(), yaml)?;
        Ok(())
    }
}
