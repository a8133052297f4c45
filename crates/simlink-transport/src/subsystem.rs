//! 进程级传输子系统生命周期
//!
//! 某些平台要求在使用 socket 之前做一次进程级初始化，并在最后释放
//! （例如 Windows 的 WSAStartup / WSACleanup）。这里把它抽象为引用计数的
//! init / teardown 配对：第一个 [`SubsystemGuard`] 负责初始化，最后一个被 drop
//! 时负责释放，与具体的客户端实例无关。
//!
//! Rust 标准库会在第一次创建 socket 时自动完成 Windows 上的初始化，
//! 并在进程退出时释放，因此所有平台上的 init / teardown 实际都是空操作，
//! 只保留计数与日志。
//!
//! 计数归零后子系统即被释放；之后再次 acquire 会重新初始化。
//! 因此 init / teardown 的次数等于“无人持有 → 有人持有”的转换次数，
//! 而不是严格的每进程一次。二者始终成对出现，且都是空操作，
//! 重新初始化不会影响已经关闭的连接。

use crate::TransportError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// 当前持有 guard 的数量
static USERS: Mutex<usize> = parking_lot::const_mutex(0);

/// 累计初始化次数（init 与 teardown 必须成对）
static INIT_COUNT: AtomicU64 = AtomicU64::new(0);
static TEARDOWN_COUNT: AtomicU64 = AtomicU64::new(0);

/// 传输子系统引用
///
/// 持有期间保证子系统处于已初始化状态。
#[derive(Debug)]
pub struct SubsystemGuard {
    _private: (),
}

impl SubsystemGuard {
    /// 获取子系统引用，必要时初始化
    pub fn acquire() -> Result<Self, TransportError> {
        let mut users = USERS.lock();
        if *users == 0 {
            platform_init()?;
            INIT_COUNT.fetch_add(1, Ordering::Relaxed);
            info!("Transport subsystem initialized");
        }
        *users += 1;
        Ok(Self { _private: () })
    }
}

impl Drop for SubsystemGuard {
    fn drop(&mut self) {
        let mut users = USERS.lock();
        *users = users.saturating_sub(1);
        if *users == 0 {
            platform_teardown();
            TEARDOWN_COUNT.fetch_add(1, Ordering::Relaxed);
            debug!("Transport subsystem torn down");
        }
    }
}

/// 当前持有 guard 的数量
pub fn active_users() -> usize {
    *USERS.lock()
}

/// 累计 (init, teardown) 次数
pub fn lifecycle_counts() -> (u64, u64) {
    (
        INIT_COUNT.load(Ordering::Relaxed),
        TEARDOWN_COUNT.load(Ordering::Relaxed),
    )
}

fn platform_init() -> Result<(), TransportError> {
    #[cfg(windows)]
    {
        // std::net 在第一次创建 socket 时调用 WSAStartup
        debug!("Winsock is initialized lazily by std::net");
    }
    Ok(())
}

fn platform_teardown() {
    #[cfg(windows)]
    {
        // WSACleanup 由 std 在进程退出时调用
        debug!("Winsock cleanup is deferred to process exit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_guards_are_reference_counted() {
        let (init_before, teardown_before) = lifecycle_counts();
        assert_eq!(active_users(), 0);

        let first = SubsystemGuard::acquire().unwrap();
        let second = SubsystemGuard::acquire().unwrap();
        assert_eq!(active_users(), 2);
        assert_eq!(lifecycle_counts().0, init_before + 1);

        drop(first);
        assert_eq!(active_users(), 1);
        assert_eq!(lifecycle_counts().1, teardown_before);

        drop(second);
        assert_eq!(active_users(), 0);
        assert_eq!(lifecycle_counts(), (init_before + 1, teardown_before + 1));
    }

    #[test]
    #[serial]
    fn test_reinitialize_after_teardown() {
        let (init_before, _) = lifecycle_counts();
        drop(SubsystemGuard::acquire().unwrap());
        drop(SubsystemGuard::acquire().unwrap());
        assert_eq!(lifecycle_counts().0, init_before + 2);
    }
}
