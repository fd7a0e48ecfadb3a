use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// 缓冲池的静态配置：缓冲数量与单个缓冲的元素容量。
///
/// # 设计动机（Why）
/// - 运行时通常从配置文件（TOML/JSON）装载池参数，派生 `serde` 后可直接嵌入上层配置结构；
/// - 校验逻辑集中在 [`PoolConfig::validate`]，`init` 与配置装载路径共享同一套规则。
///
/// # 契约说明（What）
/// - `buffer_count`：池管理的缓冲数量，也是自由链表的容量上限；
/// - `buffer_size`：每个缓冲的固定容量（元素个数，而非字节数）；
/// - 两者都必须大于零，否则 `validate` 返回 [`PoolError::InvalidConfig`]。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub buffer_count: usize,
    pub buffer_size: usize,
}

impl PoolConfig {
    pub const fn new(buffer_count: usize, buffer_size: usize) -> Self {
        Self {
            buffer_count,
            buffer_size,
        }
    }

    /// 校验配置是否可用于初始化。
    pub fn validate(&self) -> Result<()> {
        if self.buffer_count == 0 || self.buffer_size == 0 {
            return Err(PoolError::InvalidConfig {
                buffer_count: self.buffer_count,
                buffer_size: self.buffer_size,
            });
        }
        Ok(())
    }
}
