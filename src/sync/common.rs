//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了异步写入的在途计数和排空屏障。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// 在途写入计数
///
/// 记录已提交但尚未落盘的异步写入数量，并提供有界的排空等待。
/// 提交时计数加一，物理写入结束（无论成败）时减一；
/// 计数归零时唤醒所有等待者。
pub struct PendingWrites {
    count: AtomicUsize,
    drained: Notify,
}

impl PendingWrites {
    /// 创建新的在途计数
    pub fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// 登记一个新提交的写入
    pub fn track_one(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// 标记一个写入已结束
    pub fn complete_one(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// 当前在途写入数量
    pub fn in_flight(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// 在限定时间内等待计数归零
    ///
    /// # 参数
    ///
    /// * `timeout` - 最长等待时间
    ///
    /// # 返回值
    ///
    /// 时限内排空返回 true，超时返回 false（写入仍在进行，并未失败）
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.drained.notified();
                tokio::pin!(notified);
                // 先注册等待者再检查计数，避免丢失唤醒
                notified.as_mut().enable();
                if self.count.load(Ordering::Acquire) == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl Default for PendingWrites {
    fn default() -> Self {
        Self::new()
    }
}
