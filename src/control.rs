//! 控制台控制面 - 托盘不可用时的标准输入控制
//!
//! 每个指令直接映射为信号写入：`p` 切换 privacy，`q` 请求退出。

use std::io::BufRead;
use std::sync::Arc;
use tracing::info;

use crate::signals::Signals;

/// 阻塞读取 stdin 直到 EOF 或退出指令；返回前置位 shutdown
pub fn run_console(signals: Arc<Signals>) {
    println!("Clipsense running. Commands: p = toggle privacy, q = quit");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match line.trim() {
            "p" => {
                let enabled = signals.toggle_privacy();
                info!(enabled, "Privacy mode toggled");
                println!("privacy: {}", if enabled { "on" } else { "off" });
            }
            "q" | "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command: {} (p = privacy, q = quit)", other),
        }
        if signals.is_shutdown() {
            break;
        }
    }
    signals.request_shutdown();
}
