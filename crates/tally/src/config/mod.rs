//! 配置模块
//!
//! 更新设置按以下顺序合并（后者覆盖前者）:
//! 内置默认值 → `~/.tally/settings.yaml` → 环境变量 → 命令行标志

mod update_config;

pub use update_config::{
    ConfigError, ConfigLoader, UpdateConfig, DEFAULT_GH_PROXY, DEFAULT_REPOSITORY_OWNER,
    DEFAULT_REPOSITORY_REPO, ENV_API_BASE, ENV_CONFIG_DIR, ENV_CURRENT_VERSION, ENV_GH_PROXY,
    ENV_GITHUB_TOKEN, SETTINGS_FILE,
};
