use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering, fence};

use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};

use crate::buffer::BufferSlot;

/// `FreeList` 是缓冲池内部的有界并发队列，保存当前无人持有的缓冲。
///
/// # 设计动机（Why）
/// - 非阻塞路径（`acquire`/归还）需要无锁的入队出队，选用 `crossbeam_queue::ArrayQueue`；
/// - 阻塞流视图需要“等到有缓冲或队列关闭”，额外配一对 `parking_lot::{Mutex, Condvar}`，
///   只在确有等待者时才触碰锁，热路径保持无锁；
/// - 每个队列绑定一个代际（generation），只接纳同代缓冲，`reset` 之后的旧缓冲天然无法混入。
///
/// # 核心机制（How）
/// - `sleepers` 记录阻塞等待者数量；入队后以 `SeqCst` 栅栏配合读取该计数，
///   等待者在持锁状态下先登记、再复查队列，两侧构成 Dekker 式握手，不会丢失唤醒；
/// - `close` 先置位 `closed` 再持锁 `notify_all`，所有等待者醒来后观察到关闭并返回 `None`。
///
/// # 契约说明（What）
/// - 容量在构造时固定，必须大于零；
/// - 关闭后 `push` 一律失败，`pop`/`pop_wait` 仍可取走残留元素（调用方通常随后 `drain`）。
pub(crate) struct FreeList<T> {
    generation: u64,
    slots: ArrayQueue<BufferSlot<T>>,
    closed: AtomicBool,
    sleepers: AtomicUsize,
    waiters: Mutex<()>,
    ready: Condvar,
}

/// 入队失败的原因，携带被拒绝的缓冲交还调用方处置。
pub(crate) enum PushError<T> {
    /// 队列已满。
    Full(BufferSlot<T>),
    /// 队列已关闭。
    Closed(BufferSlot<T>),
    /// 缓冲来自其它代际。
    Stale(BufferSlot<T>),
}

impl<T> FreeList<T> {
    pub(crate) fn new(capacity: usize, generation: u64) -> Self {
        Self {
            generation,
            slots: ArrayQueue::new(capacity),
            closed: AtomicBool::new(false),
            sleepers: AtomicUsize::new(0),
            waiters: Mutex::new(()),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 非阻塞入队，成功后唤醒一个阻塞等待者。
    pub(crate) fn push(&self, slot: BufferSlot<T>) -> Result<(), PushError<T>> {
        if slot.generation() != self.generation {
            return Err(PushError::Stale(slot));
        }
        if self.is_closed() {
            return Err(PushError::Closed(slot));
        }
        self.slots.push(slot).map_err(PushError::Full)?;

        fence(Ordering::SeqCst);
        if self.sleepers.load(Ordering::SeqCst) > 0 {
            let _guard = self.waiters.lock();
            self.ready.notify_one();
        }
        Ok(())
    }

    pub(crate) fn pop(&self) -> Option<BufferSlot<T>> {
        self.slots.pop()
    }

    /// 阻塞出队：直到取到缓冲或队列关闭（返回 `None`）。
    pub(crate) fn pop_wait(&self) -> Option<BufferSlot<T>> {
        if let Some(slot) = self.slots.pop() {
            return Some(slot);
        }

        let mut guard = self.waiters.lock();
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        let slot = loop {
            fence(Ordering::SeqCst);
            if let Some(slot) = self.slots.pop() {
                break Some(slot);
            }
            if self.is_closed() {
                break None;
            }
            self.ready.wait(&mut guard);
        };
        self.sleepers.fetch_sub(1, Ordering::SeqCst);
        slot
    }

    /// 关闭队列并唤醒全部等待者；重复调用无副作用。
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let _guard = self.waiters.lock();
        self.ready.notify_all();
    }

    /// 丢弃队列中全部缓冲，返回丢弃数量。
    pub(crate) fn drain(&self) -> usize {
        let mut drained = 0;
        while self.slots.pop().is_some() {
            drained += 1;
        }
        drained
    }
}
