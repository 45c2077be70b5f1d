//! 系统托盘控制面 - tray-item 封装（feature = "tray"）
//!
//! 菜单项直接映射为信号写入：Privacy Mode 切换 privacy，Quit 置位 shutdown。
//! 事件循环占用主线程，带超时轮询以便外部 shutdown 也能结束循环。

use anyhow::Result;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tray_item::{IconSource, TrayItem};

use crate::signals::Signals;

enum TrayEvent {
    TogglePrivacy,
    Quit,
}

/// 运行托盘事件循环直到用户选择退出；返回前置位 shutdown
pub fn run_tray(signals: Arc<Signals>) -> Result<()> {
    let mut tray = TrayItem::new("Clipsense", IconSource::Resource("edit-paste"))?;

    let (tx, rx) = mpsc::sync_channel(4);
    let privacy_tx = tx.clone();
    tray.add_menu_item("Privacy Mode", move || {
        let _ = privacy_tx.try_send(TrayEvent::TogglePrivacy);
    })?;
    let quit_tx = tx;
    tray.add_menu_item("Quit", move || {
        let _ = quit_tx.try_send(TrayEvent::Quit);
    })?;

    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(TrayEvent::TogglePrivacy) => {
                let enabled = signals.toggle_privacy();
                info!(enabled, "Privacy mode toggled");
            }
            Ok(TrayEvent::Quit) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if signals.is_shutdown() {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    signals.request_shutdown();
    Ok(())
}
