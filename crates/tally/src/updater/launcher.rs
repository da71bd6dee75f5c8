//! 外部程序交接
//!
//! 把 URL 或本地文件交给系统浏览器 / 默认程序处理

use std::io;

/// 打开方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchTarget {
    /// 系统默认浏览器
    Browser,
    /// 新的浏览上下文（系统默认打开方式），用于浏览器拒绝直接触发时重试
    NewContext,
}

/// 外部打开能力
pub trait Launcher: Send + Sync {
    fn open(&self, target: &str, how: LaunchTarget) -> io::Result<()>;
}

/// 使用系统浏览器与默认程序
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, target: &str, how: LaunchTarget) -> io::Result<()> {
        match how {
            LaunchTarget::Browser => webbrowser::open(target),
            LaunchTarget::NewContext => open::that(target),
        }
    }
}
