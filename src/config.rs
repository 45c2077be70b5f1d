//! 启动配置 - 配置文件 + 环境变量
//!
//! 读取优先级：
//! 1. 配置文件 `~/.config/clipsense/config.json`（字段 `gemini_api_key`、`gemini_model` 及可选调优项）
//! 2. 环境变量 `GEMINI_API_KEY` / `GEMINI_MODEL`
//!
//! 缺少 API key 是致命错误，在任何工作线程启动前中止。
//! 模型覆盖缺失时回落到默认模型 `gemini-2.5-flash`。

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::analyzer::DEFAULT_DRAIN_TIMEOUT;
use crate::backoff::{RetryPolicy, DEFAULT_BASE_DELAY_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_SECS};
use crate::watcher::DEFAULT_POLL_INTERVAL_MS;

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// 配置文件结构（所有字段可选）
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    gemini_api_key: Option<String>,
    gemini_model: Option<String>,
    poll_interval_ms: Option<u64>,
    queue_capacity: Option<usize>,
    max_attempts: Option<u32>,
    base_delay_secs: Option<u64>,
    max_delay_secs: Option<u64>,
    drain_timeout_secs: Option<u64>,
}

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API 密钥（必需）
    pub api_key: String,
    /// 模型覆盖，置于优先级列表首位
    pub model_override: Option<String>,
    pub poll_interval: Duration,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub drain_timeout: Duration,
}

impl AppConfig {
    /// 自动加载：配置文件优先，环境变量兜底
    pub fn auto_load() -> Result<Self> {
        let file = default_config_path()
            .filter(|p| p.exists())
            .map(|p| read_config_file(&p))
            .transpose()?
            .unwrap_or_default();
        Self::from_parts(
            file,
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("GEMINI_MODEL").ok(),
        )
    }

    /// 从指定路径加载（测试用）；路径不存在时只用环境值
    pub fn load_from_path(
        path: &Path,
        env_key: Option<String>,
        env_model: Option<String>,
    ) -> Result<Self> {
        let file = if path.exists() {
            read_config_file(path)?
        } else {
            ConfigFile::default()
        };
        Self::from_parts(file, env_key, env_model)
    }

    fn from_parts(
        file: ConfigFile,
        env_key: Option<String>,
        env_model: Option<String>,
    ) -> Result<Self> {
        let api_key = file
            .gemini_api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env_key.filter(|k| !k.trim().is_empty()));

        let Some(api_key) = api_key else {
            bail!(
                "GEMINI_API_KEY not found. Set the environment variable or add \
                 gemini_api_key to ~/.config/clipsense/config.json"
            );
        };

        let model_override = file
            .gemini_model
            .or(env_model)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(Self {
            api_key,
            model_override,
            poll_interval: Duration::from_millis(
                file.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            queue_capacity: file.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY).max(1),
            max_attempts: file.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
            base_delay: Duration::from_secs(file.base_delay_secs.unwrap_or(DEFAULT_BASE_DELAY_SECS)),
            max_delay: Duration::from_secs(file.max_delay_secs.unwrap_or(DEFAULT_MAX_DELAY_SECS)),
            drain_timeout: file
                .drain_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_DRAIN_TIMEOUT),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
        }
    }
}

/// 仅解析模型覆盖（`models` 子命令不要求凭证）
pub fn load_model_override() -> Option<String> {
    let from_file = default_config_path()
        .filter(|p| p.exists())
        .and_then(|p| read_config_file(&p).ok())
        .and_then(|f| f.gemini_model);
    from_file
        .or_else(|| std::env::var("GEMINI_MODEL").ok())
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/clipsense/config.json"))
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file {}", path.display()))?;
    let file = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(file)
}
