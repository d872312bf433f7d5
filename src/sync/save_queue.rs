//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了异步写入队列，将持久化器的物理写入移出调用方线程。

use super::common::PendingWrites;
use crate::error::{PersistError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// 异步写入队列
///
/// 每个持久化器持有至多一个队列。单个专用工作任务按提交顺序
/// 依次执行物理写入，因此同一键的写入天然串行，后写覆盖先写。
/// 序列化仍在调用方线程完成，队列只承载已编码的载荷。
///
/// 写入失败不会回传给已经返回的调用方：失败计入失败计数并记录
/// 错误日志，互不影响其余写入。
pub struct SaveQueue<J: Send + 'static> {
    tx: mpsc::UnboundedSender<J>,
    pending: Arc<PendingWrites>,
    failures: Arc<AtomicU64>,
}

impl<J: Send + 'static> SaveQueue<J> {
    /// 创建新的写入队列并启动工作任务
    ///
    /// # 参数
    ///
    /// * `label` - 日志中标识该队列的名称
    /// * `apply` - 执行单个物理写入的函数
    pub fn new<F, Fut>(label: &'static str, apply: F) -> Self
    where
        F: Fn(J) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<J>();
        let pending = Arc::new(PendingWrites::new());
        let failures = Arc::new(AtomicU64::new(0));

        let worker_pending = pending.clone();
        let worker_failures = failures.clone();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = apply(job).await {
                    worker_failures.fetch_add(1, Ordering::Relaxed);
                    error!("{} 异步写入失败: {}", label, e);
                }
                worker_pending.complete_one();
            }
            debug!("{} save queue worker stopped", label);
        });

        Self {
            tx,
            pending,
            failures,
        }
    }

    /// 提交一个写入任务
    ///
    /// 立即返回，不等待物理写入完成
    pub fn submit(&self, job: J) -> Result<()> {
        self.pending.track_one();
        if self.tx.send(job).is_err() {
            self.pending.complete_one();
            return Err(PersistError::AsyncSave(
                "save queue worker is no longer running".to_string(),
            ));
        }
        Ok(())
    }

    /// 在限定时间内等待队列排空
    ///
    /// # 返回值
    ///
    /// 全部在途写入在时限内完成时返回 true
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        self.pending.wait_idle(timeout).await
    }

    /// 当前在途写入数量
    pub fn in_flight(&self) -> usize {
        self.pending.in_flight()
    }

    /// 累计失败的写入数量
    pub fn failed_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
