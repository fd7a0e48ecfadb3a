use std::{
    fmt, mem,
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::error;

use crate::pool::PoolInner;

/// 缓冲的实际存储：定长数据区、有效长度游标、代际标签与所有权标志。
///
/// # 设计动机（Why）
/// - 存储以值的形式在自由链表与持有者之间**移动**，同一时刻只有一处拥有 `data`，
///   借用检查器即可保证不会出现两个写者；
/// - `in_use` 仍作为所有权协议的唯一判据，每次出入自由链表都经过 CAS 翻转，
///   一旦观测到不符合预期的状态（重复归还、归还仍在使用的缓冲）立即失败。
///
/// # 契约说明（What）
/// - `data` 长度在构造时固定为容量 C，之后永不变化；
/// - `valid_len` 始终落在 `[0, C]`；
/// - `generation` 标记该缓冲诞生于哪一次 `init`/`reset`，只有同代自由链表接纳它。
pub(crate) struct BufferSlot<T> {
    data: Box<[T]>,
    valid_len: usize,
    generation: u64,
    in_use: AtomicBool,
}

impl<T: Default> BufferSlot<T> {
    pub(crate) fn new(capacity: usize, generation: u64) -> Self {
        let data = std::iter::repeat_with(T::default)
            .take(capacity)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            data,
            valid_len: 0,
            generation,
            in_use: AtomicBool::new(false),
        }
    }
}

impl<T> BufferSlot<T> {
    /// 不持有任何存储的占位槽，用于在 `Drop` 中转移真实槽的所有权。
    fn vacant() -> Self {
        Self {
            data: Vec::new().into_boxed_slice(),
            valid_len: 0,
            generation: 0,
            in_use: AtomicBool::new(false),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    /// 尝试将所有权标志从“空闲”翻转为“已租借”。
    pub(crate) fn try_acquire(&self) -> bool {
        self.in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 将所有权标志从“已租借”翻转回“空闲”；标志本就空闲意味着重复归还，直接中止。
    pub(crate) fn release_ownership(&self) {
        if self
            .in_use
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!(
                generation = self.generation,
                "buffer released without being acquired"
            );
            panic!("buffer released without being acquired (double release)");
        }
    }

    fn set_len(&mut self, len: usize) {
        self.valid_len = len.min(self.data.len());
    }
}

/// `PooledBuffer` 是调用方从池中租到的独占缓冲句柄。
///
/// # 设计动机（Why）
/// - 句柄持有缓冲存储本身，读写接口全部走普通借用，无需锁也无需 `unsafe`；
/// - 归还既可以显式调用 [`PooledBuffer::release`]，也可以直接丢弃句柄，
///   两条路径都在 `Drop` 中完成“翻转所有权标志 → 清零有效长度 → 交还池”。
///
/// # 契约说明（What）
/// - `full_data_mut` 暴露完整容量，调用方写入后用 `set_len` 标注有效前缀；
/// - `set_len` 超过容量时静默截断为容量，不报错；
/// - `release` 消耗句柄，因此同一次租借无法被二次归还；
///   若内部所有权标志仍出现不一致，归还路径会 `panic`。
///
/// # 风险提示（Trade-offs）
/// - `reset` 之后仍在外流转的旧代缓冲依旧可读写，但归还时会被池静默丢弃，不再回到自由链表。
pub struct PooledBuffer<T> {
    slot: BufferSlot<T>,
    pool: Arc<PoolInner<T>>,
}

impl<T> PooledBuffer<T> {
    pub(crate) fn new(slot: BufferSlot<T>, pool: Arc<PoolInner<T>>) -> Self {
        debug_assert!(slot.is_in_use());
        Self { slot, pool }
    }

    /// 设置有效长度，超出容量时截断为容量。
    pub fn set_len(&mut self, len: usize) {
        self.slot.set_len(len);
    }

    /// 当前有效长度。
    pub fn len(&self) -> usize {
        self.slot.valid_len
    }

    pub fn is_empty(&self) -> bool {
        self.slot.valid_len == 0
    }

    /// 固定容量 C。
    pub fn capacity(&self) -> usize {
        self.slot.capacity()
    }

    /// 有效前缀视图，与底层存储共享内存。
    pub fn valid_data(&self) -> &[T] {
        &self.slot.data[..self.slot.valid_len]
    }

    pub fn valid_data_mut(&mut self) -> &mut [T] {
        let len = self.slot.valid_len;
        &mut self.slot.data[..len]
    }

    /// 完整容量视图。
    pub fn full_data(&self) -> &[T] {
        &self.slot.data
    }

    /// 完整容量的可写视图，写入后通过 [`Self::set_len`] 标注有效区间。
    pub fn full_data_mut(&mut self) -> &mut [T] {
        &mut self.slot.data
    }

    /// 所有权标志是否处于“已租借”。
    pub fn is_acquired(&self) -> bool {
        self.slot.is_in_use()
    }

    /// 缓冲诞生时的池代际。
    pub fn generation(&self) -> u64 {
        self.slot.generation()
    }

    /// 归还缓冲：清零有效长度并交还所属池。
    pub fn release(self) {
        drop(self);
    }
}

impl<T> Drop for PooledBuffer<T> {
    fn drop(&mut self) {
        let mut slot = mem::replace(&mut self.slot, BufferSlot::vacant());
        slot.release_ownership();
        slot.set_len(0);
        self.pool.put(slot);
    }
}

impl<T> Deref for PooledBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.valid_data()
    }
}

impl<T> AsRef<[T]> for PooledBuffer<T> {
    fn as_ref(&self) -> &[T] {
        self.valid_data()
    }
}

impl<T> AsMut<[T]> for PooledBuffer<T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.full_data_mut()
    }
}

impl<T> fmt::Debug for PooledBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slot_is_free_and_zeroed() {
        let slot: BufferSlot<u32> = BufferSlot::new(8, 3);
        assert_eq!(slot.capacity(), 8);
        assert_eq!(slot.generation(), 3);
        assert_eq!(slot.valid_len, 0);
        assert!(!slot.is_in_use());
        assert!(slot.data.iter().all(|v| *v == 0));
    }

    #[test]
    fn ownership_flag_flips_exactly_once() {
        let slot: BufferSlot<u8> = BufferSlot::new(1, 1);
        assert!(slot.try_acquire());
        assert!(!slot.try_acquire());
        slot.release_ownership();
        assert!(!slot.is_in_use());
    }

    #[test]
    #[should_panic(expected = "double release")]
    fn second_release_is_fatal() {
        let slot: BufferSlot<u8> = BufferSlot::new(1, 1);
        assert!(slot.try_acquire());
        slot.release_ownership();
        slot.release_ownership();
    }

    #[test]
    #[should_panic(expected = "double release")]
    fn releasing_a_never_acquired_slot_is_fatal() {
        let slot: BufferSlot<u8> = BufferSlot::new(1, 1);
        slot.release_ownership();
    }

    #[test]
    fn set_len_clamps_to_capacity() {
        let mut slot: BufferSlot<u8> = BufferSlot::new(4, 1);
        slot.set_len(9);
        assert_eq!(slot.valid_len, 4);
        slot.set_len(2);
        assert_eq!(slot.valid_len, 2);
    }
}
