//! 共享信号 - shutdown 与 privacy 两个独立布尔标志
//!
//! shutdown 单调（false→true，不可重置），privacy 可自由切换。
//! 两个标志互相独立，没有组合不变量，因此只需原子读写，不需要更大范围的锁。
//! 所有线程通过 `Arc<Signals>` 在构造时获得句柄，不存在环境全局变量。
//!
//! `wait_shutdown` 提供可中断休眠：任何工作线程在退避或轮询等待中
//! 都会在 shutdown 置位时立即被唤醒，保证关停延迟有界。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// 共享信号集
pub struct Signals {
    shutdown: AtomicBool,
    privacy: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}

impl Signals {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            privacy: AtomicBool::new(false),
            lock: Mutex::new(()),
            cvar: Condvar::new(),
        }
    }

    /// 请求退出（单调，不可撤销），并唤醒所有等待中的线程
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.cvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn set_privacy(&self, enabled: bool) {
        self.privacy.store(enabled, Ordering::SeqCst);
    }

    /// 切换 privacy，返回切换后的新值
    pub fn toggle_privacy(&self) -> bool {
        !self.privacy.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn privacy_enabled(&self) -> bool {
        self.privacy.load(Ordering::SeqCst)
    }

    /// 可中断休眠：等待 `timeout` 或 shutdown 置位，以先到者为准
    ///
    /// 返回 `true` 表示 shutdown 已置位，调用方应尽快退出循环
    pub fn wait_shutdown(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if self.is_shutdown() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (g, _) = self
                .cvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            guard = g;
        }
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}
