//! 应用装配 - 线程编排与有界关停
//!
//! 共三个并发单元：Watcher 与 Analyzer 两个长驻工作线程，加上
//! 占用主线程的控制面事件循环（托盘或控制台）。
//!
//! 关停状态机：RUNNING →（退出请求置位 shutdown）→ DRAINING
//! （Watcher 停产，Analyzer 排空队列）→ STOPPED（有界 join 后返回）。
//! join 超时后放弃等待，进程退出时残余线程随之终止。

use anyhow::Result;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::ai::{AnalysisResult, ClassifyBackend, GeminiClient, GeminiConfig, ModelPriorityList};
use crate::analyzer::Analyzer;
use crate::clipboard::SystemClipboard;
use crate::config::AppConfig;
use crate::control;
use crate::notify::DesktopNotifier;
use crate::signals::Signals;
use crate::watcher::Watcher;

/// watcher 线程 join 上限
pub const WATCHER_JOIN_TIMEOUT: Duration = Duration::from_secs(3);
/// analyzer 线程 join 上限（包含排空阶段）
pub const ANALYZER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 启动完整流水线并运行控制面
///
/// 返回时两个工作线程均已退出（或超出 join 上限被放弃）。
pub fn run(config: AppConfig, console: bool) -> Result<()> {
    let signals = Arc::new(Signals::new());
    let models = ModelPriorityList::new(config.model_override.as_deref());
    info!(models = ?models.as_slice(), "Model priority list resolved");

    let backend = GeminiClient::new(GeminiConfig {
        api_key: config.api_key.clone(),
        ..Default::default()
    })?;
    let source = SystemClipboard::new()?;
    let sink = DesktopNotifier::new();

    let (tx, rx) = mpsc::sync_channel(config.queue_capacity);

    let mut watcher = Watcher::new(source, tx, Arc::clone(&signals))
        .with_poll_interval(config.poll_interval);
    let mut analyzer = Analyzer::new(backend, sink, models, rx, Arc::clone(&signals))
        .with_policy(config.retry_policy())
        .with_drain_timeout(config.drain_timeout);

    let watcher_handle = thread::Builder::new()
        .name("watcher".to_string())
        .spawn(move || watcher.run())?;
    let analyzer_handle = thread::Builder::new()
        .name("analyzer".to_string())
        .spawn(move || analyzer.run())?;

    // 控制面占用主线程，返回即表示退出请求已置位
    run_control(Arc::clone(&signals), console);

    join_with_timeout(watcher_handle, WATCHER_JOIN_TIMEOUT, "watcher");
    join_with_timeout(analyzer_handle, ANALYZER_JOIN_TIMEOUT, "analyzer");
    info!("Clean shutdown complete");
    Ok(())
}

#[cfg(feature = "tray")]
fn run_control(signals: Arc<Signals>, console: bool) {
    if console {
        control::run_console(signals);
        return;
    }
    if let Err(e) = crate::tray::run_tray(Arc::clone(&signals)) {
        warn!(error = %e, "Tray unavailable, falling back to console control");
        control::run_console(signals);
    }
}

#[cfg(not(feature = "tray"))]
fn run_control(signals: Arc<Signals>, _console: bool) {
    control::run_console(signals);
}

/// 一次性分类（`analyze` 子命令）
///
/// 按优先级逐模型尝试一次，不做限流退避；诊断用途。
pub fn analyze_once(config: &AppConfig, text: &str) -> Result<AnalysisResult> {
    let models = ModelPriorityList::new(config.model_override.as_deref());
    let backend = GeminiClient::new(GeminiConfig {
        api_key: config.api_key.clone(),
        ..Default::default()
    })?;

    for model in models.iter() {
        match backend.classify(model, text) {
            Ok(result) => return Ok(result),
            Err(e) => warn!(model, error = %e, "Model attempt failed"),
        }
    }
    anyhow::bail!("all models failed")
}

/// 有界 join：超时后放弃等待
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration, name: &str) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!(thread = name, "Worker did not stop within join timeout");
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    if handle.join().is_err() {
        error!(thread = name, "Worker thread panicked");
    }
}
