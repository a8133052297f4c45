//! 客户端生命周期状态
//!
//! 控制句柄用它来保证 `disconnect` 幂等：只有 `Running` 状态会真正执行
//! 停止流程，`Stopping` / `Disconnected` 状态下的重复调用直接返回。

use std::sync::atomic::{AtomicU8, Ordering};

/// 客户端生命周期
///
/// ```text
/// Running ──disconnect()──▶ Stopping ──线程已 join──▶ Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ClientLifecycle {
    /// 已断开（或从未连接）
    #[default]
    Disconnected = 0,

    /// 已连接，接收线程在运行
    Running = 1,

    /// 正在停止：已通知接收线程退出，等待 join
    Stopping = 2,
}

impl ClientLifecycle {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Disconnected。
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Disconnected,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl std::fmt::Display for ClientLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// 生命周期（原子版本，用于线程间共享）
///
/// # 示例
///
/// ```rust
/// use simlink_driver::lifecycle::{AtomicLifecycle, ClientLifecycle};
///
/// let state = AtomicLifecycle::new(ClientLifecycle::Running);
/// assert!(state.transition(ClientLifecycle::Running, ClientLifecycle::Stopping));
/// assert!(!state.transition(ClientLifecycle::Running, ClientLifecycle::Stopping));
/// assert_eq!(state.get(), ClientLifecycle::Stopping);
/// ```
#[derive(Debug)]
pub struct AtomicLifecycle {
    inner: AtomicU8,
}

impl AtomicLifecycle {
    pub fn new(state: ClientLifecycle) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 获取当前状态
    pub fn get(&self) -> ClientLifecycle {
        ClientLifecycle::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 设置状态
    pub fn set(&self, state: ClientLifecycle) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换：当前为 `from` 时切换到 `to`，返回是否成功
    pub fn transition(&self, from: ClientLifecycle, to: ClientLifecycle) -> bool {
        self.inner
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicLifecycle {
    fn default() -> Self {
        Self::new(ClientLifecycle::default())
    }
}
