//! 命令行参数

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tally::config::UpdateConfig;
use tally::updater::DownloadMode;

/// Tally 记账客户端更新工具
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// 配置目录（默认 ~/.tally，也可用 TALLY_CONFIG_DIR 指定）
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// GitHub Token
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// 下载加速前缀，传空字符串关闭
    #[arg(long, global = true, value_name = "PREFIX")]
    pub proxy: Option<String>,

    /// 同时把日志写入配置目录下的 logs/
    #[arg(long, global = true)]
    pub log_file: bool,

    /// 提高日志级别（-v debug，-vv trace）
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 检查是否有新版本
    Check {
        /// 忽略启动检查开关与检查间隔
        #[arg(long)]
        force: bool,

        /// 先清除上次检查记录
        #[arg(long)]
        reset: bool,
    },

    /// 检查、下载并安装新版本
    Update {
        /// 把下载交给系统浏览器
        #[arg(long)]
        delegated: bool,

        /// 不再确认
        #[arg(short, long)]
        yes: bool,
    },

    /// 输出当前生效的配置
    Config,
}

impl Cli {
    /// 命令行标志覆盖配置（优先级最高）
    pub fn apply_overrides(&self, config: &mut UpdateConfig) {
        if let Some(token) = &self.global.token {
            config.auth_token = Some(token.clone());
        }
        if let Some(proxy) = &self.global.proxy {
            let proxy = proxy.trim();
            config.download_proxy = (!proxy.is_empty()).then(|| proxy.to_string());
        }
        if let Command::Update {
            delegated: true, ..
        } = self.command
        {
            config.download_mode = DownloadMode::Delegated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use test_case::test_case;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test_case(&["tally", "check"], false ; "gated check")]
    #[test_case(&["tally", "check", "--force"], true ; "forced check")]
    fn test_check_force(args: &[&str], expected: bool) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Check { force, .. } => assert_eq!(force, expected),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_check_reset_flag() {
        let cli = Cli::try_parse_from(["tally", "check", "--reset"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Check {
                force: false,
                reset: true
            }
        ));
    }

    #[test]
    fn test_flag_overrides() {
        let cli = Cli::try_parse_from([
            "tally",
            "update",
            "--delegated",
            "--token",
            "ghp_flag",
            "--proxy",
            "",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.global.verbose, 2);

        let mut config = UpdateConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.auth_token.as_deref(), Some("ghp_flag"));
        assert_eq!(config.download_proxy, None);
        assert_eq!(config.download_mode, DownloadMode::Delegated);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::try_parse_from(["tally", "config"]).unwrap();
        let mut config = UpdateConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, UpdateConfig::default());
    }
}
