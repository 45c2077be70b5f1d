//! Clipsense - 剪贴板监控 + Gemini 分类 + 桌面通知

pub mod ai;
pub mod analyzer;
pub mod app;
pub mod backoff;
pub mod clipboard;
pub mod config;
pub mod control;
pub mod notify;
pub mod signals;
#[cfg(feature = "tray")]
pub mod tray;
pub mod watcher;

pub use ai::{
    AnalysisResult, Classification, ClassifyBackend, ClassifyError, GeminiClient, GeminiConfig,
    ModelPriorityList, DEFAULT_MODEL,
};
pub use analyzer::Analyzer;
pub use backoff::RetryPolicy;
pub use clipboard::{ClipboardSource, SystemClipboard};
pub use config::AppConfig;
pub use notify::{DesktopNotifier, NotificationSink};
pub use signals::Signals;
pub use watcher::{ClipboardItem, Watcher};
