//! 剪贴板读取 - arboard 封装

use anyhow::Result;

/// 剪贴板数据源抽象
///
/// Watcher 通过该 trait 轮询剪贴板，测试时可注入脚本化实现。
pub trait ClipboardSource: Send {
    /// 读取当前剪贴板文本快照
    ///
    /// 剪贴板为空或内容不是文本时返回空字符串；读取失败返回错误，
    /// 由调用方记录日志并在下个周期重试（永不致命）。
    fn read_text(&mut self) -> Result<String>;
}

/// 系统剪贴板
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: arboard::Clipboard::new()?,
        })
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_text(&mut self) -> Result<String> {
        match self.inner.get_text() {
            Ok(text) => Ok(text),
            // 空剪贴板或非文本内容视为无内容，不算错误
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}
