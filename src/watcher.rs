//! 剪贴板监控（生产者）- 轮询、去重、入队
//!
//! 固定 500ms 节奏读取剪贴板。privacy 置位时整个周期跳过，完全不读取；
//! 与上次入队值相同的内容被去重，保证每个连续不同值至多入队一次。
//! 队列满时丢弃最新项并告警（复制事件是人工节奏，正常远低于处理吞吐）。

use chrono::{DateTime, Local};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clipboard::ClipboardSource;
use crate::signals::Signals;

/// 默认轮询间隔（毫秒）
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// 单条剪贴板内容
#[derive(Debug, Clone)]
pub struct ClipboardItem {
    pub text: String,
    /// 捕获时间，仅用于排序与日志，不持久化
    pub captured_at: DateTime<Local>,
}

impl ClipboardItem {
    pub fn new(text: String) -> Self {
        Self {
            text,
            captured_at: Local::now(),
        }
    }
}

/// 剪贴板监控器
pub struct Watcher<S: ClipboardSource> {
    source: S,
    tx: SyncSender<ClipboardItem>,
    signals: Arc<Signals>,
    poll_interval: Duration,
    /// 上次入队的值（去重边界）
    last_text: String,
}

impl<S: ClipboardSource> Watcher<S> {
    pub fn new(source: S, tx: SyncSender<ClipboardItem>, signals: Arc<Signals>) -> Self {
        Self {
            source,
            tx,
            signals,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            last_text: String::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// 监控主循环，shutdown 置位后返回
    pub fn run(&mut self) {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "Clipboard watcher started"
        );
        loop {
            if self.signals.is_shutdown() {
                break;
            }

            // privacy 模式下不读取剪贴板，保证零内容进入下游
            if self.signals.privacy_enabled() {
                if self.signals.wait_shutdown(self.poll_interval) {
                    break;
                }
                continue;
            }

            match self.source.read_text() {
                Ok(text) => self.handle_text(text),
                Err(e) => {
                    // 读取失败不致命，下个周期重试
                    warn!(error = %e, "Clipboard read failed");
                }
            }

            if self.signals.wait_shutdown(self.poll_interval) {
                break;
            }
        }
        debug!("Clipboard watcher stopped");
    }

    /// 处理一次读取结果：去重后入队
    fn handle_text(&mut self, text: String) {
        if text.is_empty() || text == self.last_text {
            return;
        }

        let item = ClipboardItem::new(text.clone());
        match self.tx.try_send(item) {
            Ok(()) => {
                // 去重边界只在成功入队后推进：被丢弃的值下个周期仍可入队
                debug!(preview = %preview(&text), "New clipboard content queued");
                self.last_text = text;
            }
            Err(TrySendError::Full(item)) => {
                warn!(preview = %preview(&item.text), "Queue full, clipboard item dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Analyzer queue disconnected, clipboard item dropped");
            }
        }
    }
}

/// 日志预览：最多 30 个字符
fn preview(text: &str) -> String {
    if text.chars().count() <= 30 {
        text.to_string()
    } else {
        let head: String = text.chars().take(30).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn watcher_with_queue(
        capacity: usize,
    ) -> (Watcher<NullSource>, mpsc::Receiver<ClipboardItem>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        let watcher = Watcher::new(NullSource, tx, Arc::new(Signals::new()));
        (watcher, rx)
    }

    /// handle_text 直接驱动，不经过该数据源
    struct NullSource;
    impl ClipboardSource for NullSource {
        fn read_text(&mut self) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_identical_consecutive_reads_enqueue_once() {
        let (mut watcher, rx) = watcher_with_queue(8);

        watcher.handle_text("foo".to_string());
        watcher.handle_text("foo".to_string());
        watcher.handle_text("foo".to_string());

        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_changed_values_enqueue_in_order() {
        let (mut watcher, rx) = watcher_with_queue(8);

        watcher.handle_text("foo".to_string());
        watcher.handle_text("foo".to_string());
        watcher.handle_text("bar".to_string());

        let items: Vec<String> = rx.try_iter().map(|i| i.text).collect();
        assert_eq!(items, vec!["foo".to_string(), "bar".to_string()]);
    }

    #[test]
    fn test_empty_reads_are_skipped() {
        let (mut watcher, rx) = watcher_with_queue(8);

        watcher.handle_text(String::new());
        watcher.handle_text(String::new());

        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_alternating_values_are_not_deduplicated() {
        // 去重只针对连续相同的值
        let (mut watcher, rx) = watcher_with_queue(8);

        watcher.handle_text("foo".to_string());
        watcher.handle_text("bar".to_string());
        watcher.handle_text("foo".to_string());

        assert_eq!(rx.try_iter().count(), 3);
    }

    #[test]
    fn test_queue_full_drops_newest() {
        let (mut watcher, rx) = watcher_with_queue(1);

        watcher.handle_text("first".to_string());
        watcher.handle_text("second".to_string());
        watcher.handle_text("third".to_string());

        let items: Vec<String> = rx.try_iter().map(|i| i.text).collect();
        // 容量 1：后续项被丢弃而非阻塞
        assert_eq!(items, vec!["first".to_string()]);
    }

    #[test]
    fn test_dropped_item_can_reenqueue_after_queue_drains() {
        let (mut watcher, rx) = watcher_with_queue(1);

        watcher.handle_text("first".to_string());
        // 队列已满，"second" 被丢弃，但不推进去重边界
        watcher.handle_text("second".to_string());
        assert_eq!(rx.try_iter().count(), 1);

        // 队列腾空后同一值再次被读到，应当入队
        watcher.handle_text("second".to_string());
        let items: Vec<String> = rx.try_iter().map(|i| i.text).collect();
        assert_eq!(items, vec!["second".to_string()]);
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "x".repeat(100);
        let p = preview(&long);
        assert!(p.chars().count() <= 33);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
