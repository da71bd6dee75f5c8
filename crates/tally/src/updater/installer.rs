//! 更新安装器
//!
//! 安装只支持 Android（.apk）。启动时选定两种策略:
//! 有原生安装能力时先写入下载目录再调用系统安装器，失败后退回浏览器交接；
//! 没有原生能力（或只有下载地址）时直接交给浏览器处理。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::downloader::DownloadOutcome;
use super::launcher::{LaunchTarget, Launcher};

/// 安装错误
#[derive(Debug, Error)]
pub enum InstallError {
    /// 当前平台不支持安装，不做任何尝试
    #[error("package installation is not supported on {platform}")]
    UnsupportedPlatform { platform: Platform },

    /// 原生安装失败（由分发器记录并退回浏览器方式）
    #[error("native installer failed: {0}")]
    Native(String),

    #[error("failed to hand package to the browser: {0}")]
    Handoff(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 操作系统平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Linux,
    Macos,
    Windows,
    Other,
}

impl Platform {
    /// 编译目标对应的平台
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    pub fn supports_install(&self) -> bool {
        matches!(self, Platform::Android)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
            Platform::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 实际生效的安装方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMethod {
    Native,
    Browser,
}

/// 安装结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub strategy: InstallMethod,
    /// 写入磁盘的安装包路径（只交接了 URL 时为 `None`）
    pub path: Option<PathBuf>,
}

/// 安装策略
#[async_trait]
pub trait InstallStrategy: Send + Sync {
    fn method(&self) -> InstallMethod;

    async fn install(
        &self,
        package: &DownloadOutcome,
        file_name: &str,
    ) -> Result<InstallOutcome, InstallError>;
}

/// 只取文件名部分，避免写到下载目录之外
fn safe_file_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("update.apk")
}

async fn write_package(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, InstallError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(safe_file_name(file_name));
    tokio::fs::write(&path, bytes).await?;
    tracing::debug!("安装包已写入 {:?} ({} 字节)", path, bytes.len());
    Ok(path)
}

/// 默认下载目录: `<data_dir>/tally/downloads`
pub fn default_downloads_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("downloads")
}

/// 原生安装命令，参数中的 `{path}` 会被替换为安装包路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl InstallCommand {
    /// Android activity manager 打开包安装器
    pub fn android_package_installer() -> Self {
        Self {
            program: "am".to_string(),
            args: [
                "start",
                "-a",
                "android.intent.action.VIEW",
                "-t",
                "application/vnd.android.package-archive",
                "-d",
                "file://{path}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    fn render_args(&self, path: &Path) -> Vec<String> {
        let path = path.to_string_lossy();
        self.args.iter().map(|a| a.replace("{path}", &path)).collect()
    }
}

/// 原生安装策略
#[derive(Debug, Clone)]
pub struct NativeInstaller {
    downloads_dir: PathBuf,
    command: InstallCommand,
}

impl NativeInstaller {
    pub fn new(downloads_dir: PathBuf, command: InstallCommand) -> Self {
        Self {
            downloads_dir,
            command,
        }
    }

    /// 安装命令存在于 PATH 中时返回原生策略
    pub fn detect(downloads_dir: PathBuf, command: InstallCommand) -> Option<Self> {
        match which::which(&command.program) {
            Ok(path) => {
                tracing::debug!("检测到原生安装命令: {:?}", path);
                Some(Self::new(downloads_dir, command))
            }
            Err(_) => None,
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }
}

#[async_trait]
impl InstallStrategy for NativeInstaller {
    fn method(&self) -> InstallMethod {
        InstallMethod::Native
    }

    async fn install(
        &self,
        package: &DownloadOutcome,
        file_name: &str,
    ) -> Result<InstallOutcome, InstallError> {
        let bytes = package
            .bytes()
            .ok_or_else(|| InstallError::Native("no package bytes to install".to_string()))?;

        let path = write_package(&self.downloads_dir, file_name, bytes).await?;

        let output = tokio::process::Command::new(&self.command.program)
            .args(self.command.render_args(&path))
            .output()
            .await
            .map_err(|e| InstallError::Native(format!("{}: {}", self.command.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InstallError::Native(format!(
                "{} exited with {}: {}",
                self.command.program,
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!("已调用系统安装器: {:?}", path);
        Ok(InstallOutcome {
            strategy: InstallMethod::Native,
            path: Some(path),
        })
    }
}

/// 浏览器交接策略
///
/// 有安装包内容时先落盘再打开文件，否则直接打开下载地址；
/// 浏览器拒绝直接打开时换一个新的上下文重试一次，仍失败则删除落盘的文件
#[derive(Clone)]
pub struct BrowserInstaller {
    launcher: Arc<dyn Launcher>,
    staging_dir: PathBuf,
}

impl BrowserInstaller {
    pub fn new(launcher: Arc<dyn Launcher>, staging_dir: PathBuf) -> Self {
        Self {
            launcher,
            staging_dir,
        }
    }

    fn hand_off(&self, target: &str) -> Result<(), InstallError> {
        match self.launcher.open(target, LaunchTarget::Browser) {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!("浏览器拒绝直接打开 {}，改用新窗口: {}", target, first);
                self.launcher
                    .open(target, LaunchTarget::NewContext)
                    .map_err(|e| InstallError::Handoff(e.to_string()))
            }
        }
    }
}

impl fmt::Debug for BrowserInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserInstaller")
            .field("staging_dir", &self.staging_dir)
            .finish()
    }
}

#[async_trait]
impl InstallStrategy for BrowserInstaller {
    fn method(&self) -> InstallMethod {
        InstallMethod::Browser
    }

    async fn install(
        &self,
        package: &DownloadOutcome,
        file_name: &str,
    ) -> Result<InstallOutcome, InstallError> {
        match package {
            DownloadOutcome::Buffered(bytes) => {
                let path = write_package(&self.staging_dir, file_name, bytes).await?;
                let target = url::Url::from_file_path(&path)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| path.to_string_lossy().into_owned());
                if let Err(e) = self.hand_off(&target) {
                    // 没有程序接手时不留下孤立的安装包
                    if let Err(rm) = tokio::fs::remove_file(&path).await {
                        tracing::debug!("清理 {:?} 失败: {}", path, rm);
                    }
                    return Err(e);
                }
                Ok(InstallOutcome {
                    strategy: InstallMethod::Browser,
                    path: Some(path),
                })
            }
            DownloadOutcome::Delegated { url } => {
                self.hand_off(url)?;
                Ok(InstallOutcome {
                    strategy: InstallMethod::Browser,
                    path: None,
                })
            }
        }
    }
}

/// 安装分发器
#[derive(Clone)]
pub struct InstallerDispatcher {
    platform: Platform,
    native: Option<Arc<dyn InstallStrategy>>,
    fallback: Arc<dyn InstallStrategy>,
}

impl InstallerDispatcher {
    pub fn new(
        platform: Platform,
        native: Option<Arc<dyn InstallStrategy>>,
        fallback: Arc<dyn InstallStrategy>,
    ) -> Self {
        Self {
            platform,
            native,
            fallback,
        }
    }

    /// 按当前平台与可用的安装命令选定策略
    pub fn detect(downloads_dir: PathBuf, launcher: Arc<dyn Launcher>) -> Self {
        let platform = Platform::current();
        let native = if platform.supports_install() {
            NativeInstaller::detect(
                downloads_dir.clone(),
                InstallCommand::android_package_installer(),
            )
            .map(|n| Arc::new(n) as Arc<dyn InstallStrategy>)
        } else {
            None
        };

        tracing::debug!(
            "安装平台 {}，原生安装{}",
            platform,
            if native.is_some() { "可用" } else { "不可用" }
        );

        Self::new(
            platform,
            native,
            Arc::new(BrowserInstaller::new(launcher, downloads_dir)),
        )
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn has_native(&self) -> bool {
        self.native.is_some()
    }

    /// 当前平台不支持安装时返回 `UnsupportedPlatform`
    pub fn ensure_supported(&self) -> Result<(), InstallError> {
        if self.platform.supports_install() {
            Ok(())
        } else {
            Err(InstallError::UnsupportedPlatform {
                platform: self.platform,
            })
        }
    }

    /// 安装更新包
    pub async fn install(
        &self,
        package: &DownloadOutcome,
        file_name: &str,
    ) -> Result<InstallOutcome, InstallError> {
        self.ensure_supported()?;

        if let (Some(native), Some(_)) = (&self.native, package.bytes()) {
            match native.install(package, file_name).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => tracing::warn!("原生安装失败，使用浏览器下载: {}", e),
            }
        }

        self.fallback.install(package, file_name).await
    }
}

impl fmt::Debug for InstallerDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerDispatcher")
            .field("platform", &self.platform)
            .field("native", &self.native.as_ref().map(|n| n.method()))
            .field("fallback", &self.fallback.method())
            .finish()
    }
}
