//! 自动更新系统
//!
//! 从 GitHub Releases 发现新版本，按间隔节流启动时检查，
//! 下载安装包并交给平台安装器或系统浏览器

mod discovery;
mod downloader;
mod format;
mod installer;
mod launcher;
mod manager;
mod release;
mod scheduler;
mod version;

pub use discovery::{
    evaluate_release, DiscoveryConfig, DiscoveryError, ReleaseDiscoveryClient, Repository,
    DEFAULT_API_BASE, GITHUB_ACCEPT,
};
pub use downloader::{
    DownloadError, DownloadMode, DownloadOptions, DownloadOutcome, DownloadProgress,
    PackageDownloader, PackageStream,
};
pub use format::{format_file_size, format_release_date};
pub use installer::{
    default_downloads_dir, BrowserInstaller, InstallCommand, InstallError, InstallMethod,
    InstallOutcome, InstallStrategy, InstallerDispatcher, NativeInstaller, Platform,
};
pub use launcher::{LaunchTarget, Launcher, SystemLauncher};
pub use manager::{UpdateError, UpdateManager, UpdateStatus};
pub use release::{Release, ReleaseAsset, UpdateInfo};
pub use scheduler::{UpdateCheckScheduler, DEFAULT_CHECK_INTERVAL_MS, LAST_CHECK_KEY};
pub use version::{compare_versions, is_newer, Version};
