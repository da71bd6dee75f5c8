//! `tally check`

use console::style;
use tally::updater::UpdateManager;

use super::print_update;

pub async fn run(manager: &UpdateManager, force: bool, reset: bool) -> anyhow::Result<()> {
    if reset {
        manager.reset_schedule()?;
        println!("已清除上次检查记录");
    }

    let update = if force {
        manager.check_now().await?
    } else {
        let config = manager.config();
        if !config.auto_check_on_launch {
            println!(
                "启动检查未开启（auto_check_on_launch: false），使用 {} 立即检查",
                style("tally check --force").bold()
            );
            return Ok(());
        }
        if !manager.scheduler().should_check() {
            println!(
                "距离上次检查不足 {} 小时，使用 {} 立即检查",
                config.check_interval_ms / 3_600_000,
                style("tally check --force").bold()
            );
            return Ok(());
        }
        manager.check_on_launch().await?
    };

    match update {
        Some(info) => print_update(&info),
        None => println!(
            "{} 当前版本 {} 已是最新",
            style("✓").green(),
            manager.config().current_version
        ),
    }
    Ok(())
}
