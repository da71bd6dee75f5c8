//! 子命令实现

pub mod check;
pub mod config;
pub mod update;

use console::style;
use tally::updater::{format_file_size, format_release_date, UpdateInfo};

/// 打印新版本摘要
pub(crate) fn print_update(info: &UpdateInfo) {
    println!(
        "{} {} → {}",
        style("发现新版本").green().bold(),
        info.current_version,
        style(&info.latest_version).cyan().bold()
    );
    println!("  安装包: {} ({})", info.file_name, format_file_size(info.file_size));
    if let Some(published_at) = &info.published_at {
        println!("  发布于: {}", format_release_date(published_at));
    }
    if !info.release_url.is_empty() {
        println!("  详情:   {}", style(&info.release_url).underlined());
    }
    if !info.update_log.trim().is_empty() {
        println!();
        for line in info.update_log.lines() {
            println!("  {}", line);
        }
    }
}
