//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义缓冲池对外暴露的**可恢复**错误，仅覆盖配置类失误：参数非法、池已永久释放；
//! - 所有权协议被破坏（重复归还、归还仍在使用的缓冲、归还到已满的自由链表）属于调用方 Bug，
//!   一律以 `panic!` 立即失败，不会出现在本枚举中。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，与 `std::error::Error` 生态兼容；
//! - 变体携带足够的上下文（非法的数量/尺寸），便于日志直接定位。

use thiserror::Error;

/// 缓冲池返回的配置错误。
///
/// # 教案式说明
/// - **意图 (Why)**：把“配置写错了”与“所有权协议被破坏”两类问题彻底分开，
///   前者返回给调用方自行处理，后者直接中止，避免掩盖会污染池计数的 Bug。
/// - **契约 (What)**：枚举为 `Copy`，可在多线程间随意传递；`Display` 文案为英文短句，便于检索日志。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum PoolError {
    /// `buffer_count` 或 `buffer_size` 为零。
    #[error(
        "invalid buffer pool configuration: buffer_count={buffer_count}, buffer_size={buffer_size} (both must be greater than zero)"
    )]
    InvalidConfig {
        buffer_count: usize,
        buffer_size: usize,
    },

    /// 池已被永久释放，不能再次初始化。
    #[error("buffer pool has been released")]
    Released,
}

/// 缓冲池操作的统一返回类型。
pub type Result<T, E = PoolError> = core::result::Result<T, E>;
