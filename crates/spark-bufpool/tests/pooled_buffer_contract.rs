//! `pooled_buffer_contract` 集成测试：聚焦 `PooledBuffer` 的数据视图与长度游标契约。
//!
//! # 测试总览（Why）
//! - `set_len` 超出容量时截断而非报错；
//! - `valid_data` 始终是 `full_data` 的前缀，且与底层存储共享；
//! - 性质测试覆盖任意容量与任意请求长度的组合。

use proptest::prelude::*;
use spark_bufpool::FixedBufferPool;

fn single_buffer_pool(size: usize) -> FixedBufferPool<i32> {
    let pool = FixedBufferPool::new();
    pool.init(1, size).expect("初始化应成功");
    pool
}

#[test]
fn written_prefix_is_visible_through_valid_data() {
    let pool = single_buffer_pool(10);
    let mut buf = pool.acquire().expect("应能租借");
    for (i, slot) in buf.full_data_mut().iter_mut().enumerate() {
        *slot = i as i32;
    }
    buf.set_len(5);

    assert_eq!(buf.len(), 5);
    assert_eq!(buf.valid_data(), &[0, 1, 2, 3, 4]);
    assert_eq!(&*buf, &buf.full_data()[..5]);
    buf.release();
}

#[test]
fn set_len_clamps_to_capacity() {
    let pool = single_buffer_pool(8);
    let mut buf = pool.acquire().expect("应能租借");
    buf.set_len(100);
    assert_eq!(buf.len(), 8);
    assert_eq!(buf.valid_data().len(), 8);
    buf.set_len(0);
    assert!(buf.is_empty());
}

#[test]
fn valid_data_mut_aliases_storage() {
    let pool = single_buffer_pool(4);
    let mut buf = pool.acquire().expect("应能租借");
    buf.set_len(2);
    buf.valid_data_mut().copy_from_slice(&[7, 8]);
    assert_eq!(&buf.full_data()[..2], &[7, 8]);
    assert_eq!(&buf.full_data()[2..], &[0, 0]);
}

#[test]
fn contents_survive_release_but_length_is_cleared() {
    let pool = single_buffer_pool(3);
    let mut buf = pool.acquire().expect("应能租借");
    buf.as_mut().copy_from_slice(&[1, 2, 3]);
    buf.set_len(3);
    buf.release();

    let again = pool.acquire().expect("应能再次租借");
    assert_eq!(again.len(), 0);
    assert!(again.valid_data().is_empty());
    assert_eq!(again.full_data(), &[1, 2, 3], "缓冲内容在复用间保留，仅有效长度清零");
}

#[test]
fn acquired_handle_reports_ownership() {
    let pool = single_buffer_pool(1);
    let buf = pool.acquire().expect("应能租借");
    assert!(buf.is_acquired());
    assert_eq!(buf.generation(), 1);
    assert!(format!("{buf:?}").contains("PooledBuffer"));
}

proptest! {
    #[test]
    fn prop_set_len_is_min_of_request_and_capacity(capacity in 1usize..256, request in 0usize..512) {
        let pool = single_buffer_pool(capacity);
        let mut buf = pool.acquire().expect("应能租借");
        buf.set_len(request);
        prop_assert_eq!(buf.len(), request.min(capacity));
        prop_assert_eq!(buf.valid_data().len(), buf.len());
        prop_assert_eq!(buf.valid_data(), &buf.full_data()[..buf.len()]);
    }

    #[test]
    fn prop_init_makes_every_buffer_available(count in 1usize..64, size in 1usize..64) {
        let pool: FixedBufferPool<u8> = FixedBufferPool::new();
        pool.init(count, size).expect("合法配置应初始化成功");
        prop_assert_eq!(pool.available(), count);

        let held: Vec<_> = (0..count).filter_map(|_| pool.acquire()).collect();
        prop_assert_eq!(held.len(), count);
        prop_assert!(pool.acquire().is_none());
        drop(held);
        prop_assert_eq!(pool.available(), count);
    }
}
