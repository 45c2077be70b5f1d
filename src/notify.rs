//! 桌面通知 - notify-rust 封装
//!
//! 通知是 fire-and-forget：投递失败由调用方记录日志，不影响流水线。

use anyhow::Result;
use notify_rust::{Notification, Timeout};
use crate::ai::AnalysisResult;

/// 通知正文长度上限（字符）
pub const MAX_BODY_CHARS: usize = 256;

/// 通知展示时长（毫秒）
const DISPLAY_TIMEOUT_MS: u32 = 5000;

const APP_NAME: &str = "Clipsense";

/// 通知出口抽象
///
/// Analyzer 依赖该 trait，测试时注入收集器实现。
pub trait NotificationSink: Send {
    /// 投递分析结果
    fn deliver(&self, result: &AnalysisResult) -> Result<()>;
    /// 所有模型均失败时的错误提示
    fn deliver_failure(&self, message: &str) -> Result<()>;
}

/// 系统桌面通知
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }

    /// 通知正文：分类标签 + 摘要，截断到上限
    pub fn format_body(result: &AnalysisResult) -> String {
        truncate_chars(&format!("[{}] {}", result.classification, result.summary))
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for DesktopNotifier {
    fn deliver(&self, result: &AnalysisResult) -> Result<()> {
        Notification::new()
            .appname(APP_NAME)
            .summary(APP_NAME)
            .body(&Self::format_body(result))
            .timeout(Timeout::Milliseconds(DISPLAY_TIMEOUT_MS))
            .show()?;
        Ok(())
    }

    fn deliver_failure(&self, message: &str) -> Result<()> {
        Notification::new()
            .appname(APP_NAME)
            .summary("Clipsense Error")
            .body(&truncate_chars(message))
            .timeout(Timeout::Milliseconds(DISPLAY_TIMEOUT_MS))
            .show()?;
        Ok(())
    }
}

fn truncate_chars(text: &str) -> String {
    if text.chars().count() <= MAX_BODY_CHARS {
        text.to_string()
    } else {
        text.chars().take(MAX_BODY_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Classification;

    #[test]
    fn test_format_body_includes_label_and_summary() {
        let result = AnalysisResult {
            classification: Classification::Url,
            summary: "A link to the docs.".to_string(),
            model: "m".to_string(),
        };
        assert_eq!(DesktopNotifier::format_body(&result), "[URL] A link to the docs.");
    }

    #[test]
    fn test_format_body_truncates_long_summary() {
        let result = AnalysisResult {
            classification: Classification::General,
            summary: "x".repeat(1000),
            model: "m".to_string(),
        };
        let body = DesktopNotifier::format_body(&result);
        assert_eq!(body.chars().count(), MAX_BODY_CHARS);
    }
}
