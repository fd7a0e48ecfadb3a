//! `spark-bufpool` 提供定长、线程安全、可复用的缓冲池。
//!
//! # 模块定位（Why）
//! - 网络 I/O 与流式处理每条消息都需要一块缓冲，池化后可复用内存，避免按消息申请和释放；
//! - 严格检测误用：重复归还、归还仍在使用的缓冲、归还到已满的池都会立即 `panic`，
//!   而参数非法、池已释放这类配置问题则以 [`PoolError`] 返回。
//!
//! # 设计概要（How）
//! - `free_list` 模块实现有界并发自由链表（`crossbeam_queue::ArrayQueue`），附带阻塞等待与关闭语义；
//! - `buffer` 模块实现缓冲存储与独占句柄 [`PooledBuffer`]，句柄 `Drop` 时自动归还；
//! - `pool` 模块实现 [`FixedBufferPool`] 的生命周期（`init`/`reset`/`release`）与租借路径；
//! - `stream` 模块实现阻塞流视图 [`BufferStream`]。
//!
//! # 使用示例
//! ```
//! use spark_bufpool::FixedBufferPool;
//!
//! let pool: FixedBufferPool<u8> = FixedBufferPool::new();
//! pool.init(4, 1500).expect("valid configuration");
//!
//! let mut buf = pool.acquire().expect("pool has free buffers");
//! buf.full_data_mut()[..5].copy_from_slice(b"hello");
//! buf.set_len(5);
//! assert_eq!(buf.valid_data(), b"hello");
//! buf.release();
//!
//! assert_eq!(pool.available(), 4);
//! ```

mod buffer;
mod config;
mod error;
mod free_list;
mod pool;
mod stats;
mod stream;

pub use buffer::PooledBuffer;
pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use pool::FixedBufferPool;
pub use stats::PoolStats;
pub use stream::BufferStream;
