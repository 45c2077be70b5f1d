//! 流水线端到端测试
//!
//! 用脚本化剪贴板源与假分类后端驱动真实的 Watcher/Analyzer 线程，
//! 验证去重、隐私模式、通知顺序与关停时限。

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use clipsense::{
    AnalysisResult, Analyzer, Classification, ClassifyBackend, ClassifyError, ClipboardSource,
    ModelPriorityList, NotificationSink, RetryPolicy, Signals, Watcher,
};

// ============================================================================
// 测试替身
// ============================================================================

/// 共享"当前剪贴板值"的脚本源，并统计读取次数
#[derive(Clone)]
struct SharedClipboard {
    value: Arc<Mutex<String>>,
    reads: Arc<Mutex<usize>>,
}

impl SharedClipboard {
    fn new() -> Self {
        Self {
            value: Arc::new(Mutex::new(String::new())),
            reads: Arc::new(Mutex::new(0)),
        }
    }

    fn set(&self, text: &str) {
        *self.value.lock().unwrap() = text.to_string();
    }

    fn read_count(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

impl ClipboardSource for SharedClipboard {
    fn read_text(&mut self) -> anyhow::Result<String> {
        *self.reads.lock().unwrap() += 1;
        Ok(self.value.lock().unwrap().clone())
    }
}

/// 始终成功的后端，摘要回显原文
struct OkBackend;

impl ClassifyBackend for OkBackend {
    fn classify(&self, model: &str, text: &str) -> Result<AnalysisResult, ClassifyError> {
        Ok(AnalysisResult {
            classification: Classification::General,
            summary: text.to_string(),
            model: model.to_string(),
        })
    }
}

/// 始终瞬时限流的后端（用于验证退避被 shutdown 打断）
#[derive(Clone)]
struct StallBackend {
    calls: Arc<Mutex<usize>>,
}

impl StallBackend {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(0)),
        }
    }

    fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ClassifyBackend for StallBackend {
    fn classify(&self, _model: &str, _text: &str) -> Result<AnalysisResult, ClassifyError> {
        *self.calls.lock().unwrap() += 1;
        Err(ClassifyError::RateLimited {
            quota_exhausted: false,
        })
    }
}

/// 收集通知的假出口
#[derive(Clone, Default)]
struct CollectorSink {
    delivered: Arc<Mutex<Vec<AnalysisResult>>>,
}

impl CollectorSink {
    fn summaries(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.summary.clone())
            .collect()
    }

    fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl NotificationSink for CollectorSink {
    fn deliver(&self, result: &AnalysisResult) -> anyhow::Result<()> {
        self.delivered.lock().unwrap().push(result.clone());
        Ok(())
    }

    fn deliver_failure(&self, _message: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

// ============================================================================
// 辅助
// ============================================================================

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    }
}

fn spawn_pipeline<B: ClassifyBackend + 'static>(
    clipboard: SharedClipboard,
    backend: B,
    sink: CollectorSink,
    signals: Arc<Signals>,
    policy: RetryPolicy,
) -> (JoinHandle<()>, JoinHandle<()>) {
    let (tx, rx) = mpsc::sync_channel(16);
    let mut watcher = Watcher::new(clipboard, tx, Arc::clone(&signals))
        .with_poll_interval(Duration::from_millis(10));
    let mut analyzer = Analyzer::new(
        backend,
        sink,
        ModelPriorityList::from_models(vec!["m1".to_string()]),
        rx,
        signals,
    )
    .with_policy(policy)
    .with_drain_timeout(Duration::from_millis(500));

    (
        thread::spawn(move || watcher.run()),
        thread::spawn(move || analyzer.run()),
    )
}

fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn join_bounded(handle: JoinHandle<()>, timeout: Duration, name: &str) {
    assert!(
        wait_for(|| handle.is_finished(), timeout),
        "{name} did not stop in time"
    );
    handle.join().unwrap();
}

// ============================================================================
// 测试
// ============================================================================

#[test]
fn test_scenario_foo_foo_bar_yields_two_ordered_notifications() {
    let clipboard = SharedClipboard::new();
    let sink = CollectorSink::default();
    let signals = Arc::new(Signals::new());
    let (wh, ah) = spawn_pipeline(
        clipboard.clone(),
        OkBackend,
        sink.clone(),
        Arc::clone(&signals),
        fast_policy(),
    );

    // "foo" 被多个轮询周期重复读到，只应产生一条通知
    clipboard.set("foo");
    assert!(wait_for(|| sink.count() >= 1, Duration::from_secs(2)));
    thread::sleep(Duration::from_millis(60));

    clipboard.set("bar");
    assert!(wait_for(|| sink.count() >= 2, Duration::from_secs(2)));
    thread::sleep(Duration::from_millis(60));

    signals.request_shutdown();
    join_bounded(wh, Duration::from_secs(3), "watcher");
    join_bounded(ah, Duration::from_secs(5), "analyzer");

    assert_eq!(sink.summaries(), vec!["foo".to_string(), "bar".to_string()]);
}

#[test]
fn test_privacy_mode_suppresses_all_enqueues() {
    let clipboard = SharedClipboard::new();
    let sink = CollectorSink::default();
    let signals = Arc::new(Signals::new());
    signals.set_privacy(true);

    let (wh, ah) = spawn_pipeline(
        clipboard.clone(),
        OkBackend,
        sink.clone(),
        Arc::clone(&signals),
        fast_policy(),
    );

    // privacy 开启期间剪贴板多次变化：不读取、不通知
    clipboard.set("secret-1");
    thread::sleep(Duration::from_millis(60));
    clipboard.set("secret-2");
    thread::sleep(Duration::from_millis(60));
    assert_eq!(clipboard.read_count(), 0);
    assert_eq!(sink.count(), 0);

    // 关闭 privacy 前换成新值，之后应恢复读取与处理
    clipboard.set("visible");
    signals.set_privacy(false);
    assert!(wait_for(|| sink.count() >= 1, Duration::from_secs(2)));
    assert!(clipboard.read_count() > 0);

    signals.request_shutdown();
    join_bounded(wh, Duration::from_secs(3), "watcher");
    join_bounded(ah, Duration::from_secs(5), "analyzer");

    let summaries = sink.summaries();
    assert_eq!(summaries, vec!["visible".to_string()]);
    assert!(summaries.iter().all(|s| !s.contains("secret")));
}

#[test]
fn test_shutdown_interrupts_backoff_and_stays_bounded() {
    let clipboard = SharedClipboard::new();
    let sink = CollectorSink::default();
    let signals = Arc::new(Signals::new());
    let backend = StallBackend::new();
    let probe = backend.clone();

    // 30 秒基础退避：若不可中断，join 必然超时
    let (wh, ah) = spawn_pipeline(
        clipboard.clone(),
        backend,
        sink.clone(),
        Arc::clone(&signals),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(60),
        },
    );

    clipboard.set("pending-work");
    assert!(wait_for(|| probe.call_count() >= 1, Duration::from_secs(2)));

    let start = Instant::now();
    signals.request_shutdown();
    join_bounded(wh, Duration::from_secs(3), "watcher");
    join_bounded(ah, Duration::from_secs(5), "analyzer");

    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_pipeline_processes_alternating_values() {
    let clipboard = SharedClipboard::new();
    let sink = CollectorSink::default();
    let signals = Arc::new(Signals::new());
    let (wh, ah) = spawn_pipeline(
        clipboard.clone(),
        OkBackend,
        sink.clone(),
        Arc::clone(&signals),
        fast_policy(),
    );

    for (i, text) in ["one", "two", "three"].iter().enumerate() {
        clipboard.set(text);
        assert!(
            wait_for(|| sink.count() >= i + 1, Duration::from_secs(2)),
            "missing notification for {text}"
        );
    }

    signals.request_shutdown();
    join_bounded(wh, Duration::from_secs(3), "watcher");
    join_bounded(ah, Duration::from_secs(5), "analyzer");

    assert_eq!(
        sink.summaries(),
        vec!["one".to_string(), "two".to_string(), "three".to_string()]
    );
}
