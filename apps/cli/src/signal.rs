//! Ctrl+C 处理
//!
//! 信号处理函数只向通道发送一个事件，主循环用 `recv_timeout` 同时完成
//! 节拍等待和退出检测。

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// 退出信号
pub struct Shutdown {
    rx: Receiver<()>,
}

impl Shutdown {
    /// 安装 Ctrl+C 处理函数（每个进程只能调用一次）
    pub fn install() -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        ctrlc::set_handler(move || {
            eprintln!("\n收到退出信号，正在关闭...");
            let _ = tx.try_send(());
        })
        .context("设置信号处理函数失败")?;
        Ok(Self { rx })
    }

    /// 等待一个节拍；收到退出信号时返回 `true`
    pub fn wait(&self, interval: Duration) -> bool {
        match self.rx.recv_timeout(interval) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => true,
        }
    }

    #[cfg(test)]
    fn from_receiver(rx: Receiver<()>) -> Self {
        Self { rx }
    }
}
