use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// 池的只读统计快照，由 [`FixedBufferPool::stats`](crate::FixedBufferPool::stats) 生成。
///
/// # 契约说明（What）
/// - 各字段分别读取，彼此之间不保证原子一致，仅用于监控与排障；
/// - 计数器自池构造起单调累计，`reset`/`release` 不会清零。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    /// 当前配置的缓冲数量，未初始化或已释放时为 0。
    pub buffer_count: usize,
    /// 当前配置的单个缓冲容量。
    pub buffer_size: usize,
    /// 自由链表中的缓冲数量。
    pub available: usize,
    /// 当前代际，每次 `init`/`reset` 递增。
    pub generation: u64,
    /// 池是否已永久释放。
    pub released: bool,
    /// 正被调用方持有的缓冲数量（含旧代孤儿缓冲）。
    pub active_leases: usize,
    /// 成功租借次数（非阻塞与流式合计）。
    pub total_acquired: u64,
    /// 成功回到自由链表的次数。
    pub total_recycled: u64,
    /// 非阻塞租借落空的次数。
    pub failed_acquisitions: u64,
    /// 旧代缓冲归还被丢弃的次数。
    pub stale_releases: u64,
}

/// 池内部的原子计数器，全部使用 `Relaxed`，只承担统计职责，不参与同步。
#[derive(Default)]
pub(crate) struct PoolMetrics {
    active_leases: AtomicUsize,
    total_acquired: AtomicU64,
    total_recycled: AtomicU64,
    failed_acquisitions: AtomicU64,
    stale_releases: AtomicU64,
}

impl PoolMetrics {
    pub(crate) fn on_acquired(&self) {
        self.total_acquired.fetch_add(1, Ordering::Relaxed);
        self.active_leases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_acquire_miss(&self) {
        self.failed_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    /// 句柄归还（无论最终是否回到自由链表）。
    pub(crate) fn on_returned(&self) {
        let _ = self
            .active_leases
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
                Some(prev.saturating_sub(1))
            });
    }

    pub(crate) fn on_recycled(&self) {
        self.total_recycled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_stale_release(&self) {
        self.stale_releases.fetch_add(1, Ordering::Relaxed);
    }

    /// 将计数器写入快照，容量类字段由调用方补齐。
    pub(crate) fn fill(&self, stats: &mut PoolStats) {
        stats.active_leases = self.active_leases.load(Ordering::Relaxed);
        stats.total_acquired = self.total_acquired.load(Ordering::Relaxed);
        stats.total_recycled = self.total_recycled.load(Ordering::Relaxed);
        stats.failed_acquisitions = self.failed_acquisitions.load(Ordering::Relaxed);
        stats.stale_releases = self.stale_releases.load(Ordering::Relaxed);
    }
}
