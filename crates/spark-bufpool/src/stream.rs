use std::{iter::FusedIterator, sync::Arc};

use tracing::error;

use crate::{
    buffer::{BufferSlot, PooledBuffer},
    pool::PoolInner,
};

/// `BufferStream` 是缓冲池的阻塞流视图，逐个产出被独占租借的缓冲。
///
/// # 设计动机（Why）
/// - 流水线式消费者希望“有缓冲就处理，没有就等”，不必自行轮询 `acquire`；
/// - 与 `acquire` 共享同一条自由链表，两条路径之间除队列自身的原子性外不做额外协调。
///
/// # 契约说明（What）
/// - `next()` 阻塞直到拿到缓冲，或池被释放（此后永远返回 `None`）；
/// - `reset`/重新 `init` 不会终止流：旧链表关闭唤醒等待者后，流转向新一代链表继续等待；
/// - 交付前对缓冲执行 CAS（空闲 → 已租借），若缓冲已处于使用中说明所有权协议被破坏，直接 `panic`。
pub struct BufferStream<T> {
    pool: Arc<PoolInner<T>>,
}

impl<T> BufferStream<T> {
    pub(crate) fn new(pool: Arc<PoolInner<T>>) -> Self {
        Self { pool }
    }

    /// 非阻塞地从流中取一块缓冲；当前没有空闲缓冲或池已释放时返回 `None`。
    pub fn try_next(&mut self) -> Option<PooledBuffer<T>> {
        loop {
            if self.pool.is_released() {
                return None;
            }
            let list = self.pool.current_list()?;
            let slot = list.pop()?;
            if list.is_closed() {
                continue;
            }
            return Some(self.deliver(slot));
        }
    }

    fn deliver(&self, slot: BufferSlot<T>) -> PooledBuffer<T> {
        if !slot.try_acquire() {
            error!(
                generation = slot.generation(),
                "buffer stream received a buffer that is already in use"
            );
            panic!("buffer stream received a buffer that is already in use");
        }
        self.pool.metrics.on_acquired();
        PooledBuffer::new(slot, Arc::clone(&self.pool))
    }
}

impl<T> Iterator for BufferStream<T> {
    type Item = PooledBuffer<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pool.is_released() {
                return None;
            }
            let list = self.pool.current_list()?;
            match list.pop_wait() {
                Some(slot) if !list.is_closed() => return Some(self.deliver(slot)),
                // 链表已被 reset 或 release 关闭，重新读取当前链表
                _ => continue,
            }
        }
    }
}

impl<T> FusedIterator for BufferStream<T> {}
