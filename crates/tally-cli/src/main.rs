//! `tally` 命令行入口

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tally::config::ConfigLoader;
use tally::storage::FileStore;
use tally::updater::UpdateManager;

mod cli;
mod commands;
mod logging;

use cli::{Cli, Command};

const STORAGE_FILE: &str = "storage.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.global.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };

    let log_dir = cli.global.log_file.then(|| loader.config_dir().join("logs"));
    let _log_guard = logging::init(cli.global.verbose, log_dir.as_deref())?;

    let mut config = loader
        .load()
        .with_context(|| format!("无法加载配置 {}", loader.settings_path().display()))?;
    cli.apply_overrides(&mut config);
    tracing::debug!("配置目录 {:?}，当前版本 {}", loader.config_dir(), config.current_version);

    if let Command::Config = cli.command {
        return commands::config::run(&config);
    }

    let store = FileStore::open(loader.config_dir().join(STORAGE_FILE))
        .context("无法打开本地存储")?;
    let manager = UpdateManager::from_config(config, Arc::new(store))?;

    match cli.command {
        Command::Check { force, reset } => commands::check::run(&manager, force, reset).await,
        Command::Update { yes, .. } => commands::update::run(&manager, yes).await,
        Command::Config => Ok(()),
    }
}
