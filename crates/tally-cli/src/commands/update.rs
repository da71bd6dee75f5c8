//! `tally update`

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tally::updater::{InstallMethod, InstallerDispatcher, UpdateManager};

use super::print_update;

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({percent}%) {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb
}

/// 下载前确认平台可以安装，返回将采用的安装方式说明
fn install_plan(installer: &InstallerDispatcher) -> Result<&'static str, String> {
    let platform = installer.platform();
    if !platform.supports_install() {
        return Err(format!("当前平台 {} 不支持安装更新包", platform));
    }
    Ok(if installer.has_native() {
        "下载完成后将调用系统安装器"
    } else {
        "下载完成后将通过浏览器完成安装"
    })
}

pub async fn run(manager: &UpdateManager, yes: bool) -> anyhow::Result<()> {
    let Some(info) = manager.check_now().await? else {
        println!(
            "{} 当前版本 {} 已是最新",
            style("✓").green(),
            manager.config().current_version
        );
        return Ok(());
    };

    print_update(&info);
    println!();

    let plan = match install_plan(manager.installer()) {
        Ok(plan) => plan,
        Err(reason) => {
            println!("{} {}，请在 Android 设备上更新", style("!").yellow(), reason);
            if !info.release_url.is_empty() {
                println!("  发布页面: {}", info.release_url);
            }
            return Ok(());
        }
    };
    println!("  {}", plan);

    if !yes && !cliclack::confirm("现在下载并安装？").initial_value(true).interact()? {
        println!("已取消");
        return Ok(());
    }

    let pb = progress_bar(info.file_size);
    let package = manager
        .download(&info, |p| {
            pb.set_length(p.total_bytes);
            pb.set_position(p.bytes_received);
        })
        .await;
    match &package {
        Ok(_) => pb.finish(),
        Err(_) => pb.abandon(),
    }
    let package = package?;

    if package.is_delegated() {
        println!("已在浏览器中打开下载地址");
    }

    let outcome = manager.install(&package, &info.file_name).await?;
    match (outcome.strategy, outcome.path) {
        (InstallMethod::Native, _) => println!("{} 已启动系统安装器", style("✓").green()),
        (InstallMethod::Browser, Some(path)) => println!(
            "{} 安装包已保存到 {}，请在打开的窗口中完成安装",
            style("✓").green(),
            path.display()
        ),
        (InstallMethod::Browser, None) => {
            println!("{} 请在浏览器下载完成后安装", style("✓").green())
        }
    }
    Ok(())
}
