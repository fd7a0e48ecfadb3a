use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    buffer::{BufferSlot, PooledBuffer},
    config::PoolConfig,
    error::{PoolError, Result},
    free_list::{FreeList, PushError},
    stats::{PoolMetrics, PoolStats},
    stream::BufferStream,
};

/// `FixedBufferPool` 提供定长、有界、线程安全的缓冲复用。
///
/// # 模块角色（Why）
/// - 网络 I/O、流式编解码等高吞吐路径每条消息都需要一块缓冲，
///   预先分配 `buffer_count` 块容量为 `buffer_size` 的缓冲并循环复用，避免反复申请释放堆内存；
/// - 同时提供非阻塞租借（[`acquire`](Self::acquire)）与阻塞流视图（[`buffer_stream`](Self::buffer_stream)），
///   两者共享同一条自由链表，互相竞争缓冲。
///
/// # 核心机制（How）
/// - 自由链表由 `ArcSwapOption<FreeList<T>>` 承载，热路径（租借、归还、`available`）无锁读取当前链表；
/// - `init`/`reset`/`release` 通过 `parking_lot::Mutex` 串行化，每次 `init`/`reset` 都铸造新一代链表
///   并原子替换旧链表，旧链表随即关闭、清空；
/// - 每个缓冲携带代际标签，`reset` 前租出的孤儿缓冲归还时与当前链表代际不符，被静默丢弃。
///
/// # 契约说明（What）
/// - **可恢复错误**：参数为零、池已释放时 `init` 返回 [`PoolError`]；
/// - **不可恢复错误**：所有权协议被破坏（重复归还、归还仍在使用的缓冲、归还到已满链表）直接 `panic`；
/// - **释放语义**：[`release`](Self::release) 幂等且单向，之后 `init` 永远失败，`acquire` 恒为 `None`。
///
/// # 设计权衡（Trade-offs）
/// - 克隆句柄共享同一个池，缓冲句柄本身也持有池的引用，池会存活到最后一个缓冲归还；
/// - `available` 只是瞬时快照，与并发租借不保证原子一致。
pub struct FixedBufferPool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for FixedBufferPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for FixedBufferPool<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(PoolInner::new()),
        }
    }
}

impl<T> FixedBufferPool<T> {
    /// 创建尚未初始化的空池。
    pub fn new() -> Self {
        Self::default()
    }

    /// 非阻塞租借一块缓冲；池已耗尽、未初始化或已释放时返回 `None`。
    ///
    /// # 实现策略
    /// 1. 无锁读取当前自由链表并尝试出队；
    /// 2. 若出队后发现链表已被 `reset`/`release` 关闭，丢弃该缓冲并重新读取链表；
    /// 3. 对出队缓冲执行 CAS（空闲 → 已租借）。CAS 失败说明所有权标志被外部破坏，
    ///    将其放回链表后重试，重试次数以链表容量为上限，绝不把该缓冲交给调用方。
    pub fn acquire(&self) -> Option<PooledBuffer<T>> {
        let inner = &self.inner;
        let mut anomalies = 0;
        loop {
            if inner.is_released() {
                return None;
            }
            let list = inner.current_list()?;
            let Some(slot) = list.pop() else {
                inner.metrics.on_acquire_miss();
                return None;
            };
            if list.is_closed() {
                continue;
            }
            if slot.try_acquire() {
                inner.metrics.on_acquired();
                return Some(PooledBuffer::new(slot, Arc::clone(inner)));
            }

            anomalies += 1;
            warn!(
                generation = slot.generation(),
                anomalies, "free list yielded a buffer that is already in use"
            );
            let _ = list.push(slot);
            if anomalies >= list.capacity() {
                inner.metrics.on_acquire_miss();
                return None;
            }
        }
    }

    /// 获取阻塞流视图；池已释放或尚未初始化时返回 `None`。
    pub fn buffer_stream(&self) -> Option<BufferStream<T>> {
        if self.inner.is_released() || self.inner.current_list().is_none() {
            return None;
        }
        Some(BufferStream::new(Arc::clone(&self.inner)))
    }

    /// 自由链表中的缓冲数量；池已释放时为 0。
    pub fn available(&self) -> usize {
        self.inner.available()
    }

    /// 永久释放池：清空并关闭自由链表，清除配置。幂等，重复调用无副作用。
    ///
    /// 释放后仍在外流转的缓冲可以照常归还，归还动作会被静默忽略；
    /// 阻塞在流视图上的消费者会被唤醒并结束迭代。
    pub fn release(&self) {
        if self
            .inner
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let mut state = self.inner.state.lock();
        let discarded = self.inner.install(None);
        *state = PoolState::default();
        info!(discarded, "buffer pool released");
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_released()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }

    pub fn buffer_count(&self) -> usize {
        self.inner.state.lock().buffer_count
    }

    pub fn buffer_size(&self) -> usize {
        self.inner.state.lock().buffer_size
    }

    /// 读取统计快照。
    pub fn stats(&self) -> PoolStats {
        let mut stats = {
            let state = self.inner.state.lock();
            PoolStats {
                buffer_count: state.buffer_count,
                buffer_size: state.buffer_size,
                ..PoolStats::default()
            }
        };
        stats.available = self.inner.available();
        stats.generation = self.inner.generation.load(Ordering::Acquire);
        stats.released = self.inner.is_released();
        self.inner.metrics.fill(&mut stats);
        stats
    }
}

impl<T: Default> FixedBufferPool<T> {
    /// 以 `buffer_count` 块、每块容量 `buffer_size` 初始化池。
    ///
    /// # 契约说明
    /// - 池已释放时返回 [`PoolError::Released`]（优先于参数校验）；
    /// - 任一参数为零时返回 [`PoolError::InvalidConfig`]，池状态保持不变；
    /// - 对已初始化的池再次调用视为重新配置：铸造新一代链表替换旧链表，旧代缓冲归还时被丢弃。
    pub fn init(&self, buffer_count: usize, buffer_size: usize) -> Result<()> {
        self.init_with(&PoolConfig::new(buffer_count, buffer_size))
    }

    /// 使用 [`PoolConfig`] 初始化池，语义与 [`Self::init`] 相同。
    pub fn init_with(&self, config: &PoolConfig) -> Result<()> {
        let mut state = self.inner.state.lock();
        if self.inner.is_released() {
            return Err(PoolError::Released);
        }
        config.validate()?;

        let list = self.inner.seed(config.buffer_count, config.buffer_size);
        let generation = list.generation();
        let discarded = self.inner.install(Some(list));
        *state = PoolState {
            buffer_count: config.buffer_count,
            buffer_size: config.buffer_size,
            initialized: true,
        };
        info!(
            buffer_count = config.buffer_count,
            buffer_size = config.buffer_size,
            generation,
            discarded,
            "buffer pool initialized"
        );
        Ok(())
    }

    /// 丢弃自由链表现有内容，重新铸造 `buffer_count` 块全新缓冲。
    ///
    /// 池已释放或从未初始化时为空操作。调用时仍被持有的缓冲不会被追回，
    /// 它们之后的归还会因代际不符被静默丢弃。
    pub fn reset(&self) {
        let state = self.inner.state.lock();
        if self.inner.is_released() || !state.initialized {
            return;
        }
        let list = self.inner.seed(state.buffer_count, state.buffer_size);
        let generation = list.generation();
        let discarded = self.inner.install(Some(list));
        info!(
            buffer_count = state.buffer_count,
            generation, discarded, "buffer pool reset"
        );
    }
}

impl<T> fmt::Debug for FixedBufferPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedBufferPool")
            .field("available", &self.available())
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct PoolState {
    buffer_count: usize,
    buffer_size: usize,
    initialized: bool,
}

/// 池的共享状态，被池句柄、缓冲句柄与流视图共同持有。
pub(crate) struct PoolInner<T> {
    state: Mutex<PoolState>,
    free_list: ArcSwapOption<FreeList<T>>,
    released: AtomicBool,
    generation: AtomicU64,
    pub(crate) metrics: PoolMetrics,
}

impl<T> PoolInner<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            free_list: ArcSwapOption::empty(),
            released: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            metrics: PoolMetrics::default(),
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn current_list(&self) -> Option<Arc<FreeList<T>>> {
        self.free_list.load_full()
    }

    fn available(&self) -> usize {
        if self.is_released() {
            return 0;
        }
        match &*self.free_list.load() {
            Some(list) => list.len(),
            None => 0,
        }
    }

    /// 原子替换当前链表，随后关闭并清空旧链表，返回被丢弃的缓冲数量。
    ///
    /// 必须先发布新链表再关闭旧链表：被关闭唤醒的流消费者会立即转向新链表。
    fn install(&self, list: Option<Arc<FreeList<T>>>) -> usize {
        match self.free_list.swap(list) {
            Some(previous) => {
                previous.close();
                previous.drain()
            }
            None => 0,
        }
    }

    /// 归还入口，仅由 [`PooledBuffer`] 的释放路径调用。
    ///
    /// # 契约说明
    /// - 池已释放：静默丢弃；
    /// - 缓冲仍标记为使用中：违反所有权协议，`panic`；
    /// - 缓冲来自旧代或链表已关闭：静默丢弃并计入 `stale_releases`；
    /// - 链表已满：记账出错（同一缓冲被归还两次或来源不明），`panic`。
    pub(crate) fn put(&self, slot: BufferSlot<T>) {
        self.metrics.on_returned();
        if self.is_released() {
            return;
        }
        if slot.is_in_use() {
            error!(
                generation = slot.generation(),
                "returning a buffer that is still in use"
            );
            panic!("returning a buffer that is still in use");
        }
        let Some(list) = self.current_list() else {
            return;
        };
        match list.push(slot) {
            Ok(()) => self.metrics.on_recycled(),
            Err(PushError::Stale(slot)) | Err(PushError::Closed(slot)) => {
                if !self.is_released() {
                    self.metrics.on_stale_release();
                    debug!(
                        buffer_generation = slot.generation(),
                        pool_generation = list.generation(),
                        "dropping buffer from a previous pool generation"
                    );
                }
            }
            Err(PushError::Full(slot)) => {
                error!(
                    generation = slot.generation(),
                    capacity = list.capacity(),
                    "returning a buffer to a full pool"
                );
                panic!("returning a buffer to a full pool");
            }
        }
    }
}

impl<T: Default> PoolInner<T> {
    /// 铸造新一代链表并填满全新缓冲。
    fn seed(&self, buffer_count: usize, buffer_size: usize) -> Arc<FreeList<T>> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let list = FreeList::new(buffer_count, generation);
        for _ in 0..buffer_count {
            if list.push(BufferSlot::new(buffer_size, generation)).is_err() {
                break;
            }
        }
        Arc::new(list)
    }
}
