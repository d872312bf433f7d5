//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存读取的最大可接受年龄及其过期判定规则。

use std::time::Duration;

/// 最大可接受年龄
///
/// 读取缓存时由调用方提供的过期预算。`Always` 为哨兵值，
/// 表示条目永不过期（跳过年龄检查）；`Bounded` 与条目实际年龄
/// 做严格大于比较，年龄恰好等于上限的条目不视为过期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAge {
    /// 永不过期
    Always,
    /// 具体的年龄上限
    Bounded(Duration),
}

impl MaxAge {
    /// 一秒
    pub const ONE_SECOND: MaxAge = MaxAge::Bounded(Duration::from_secs(1));
    /// 一分钟
    pub const ONE_MINUTE: MaxAge = MaxAge::Bounded(Duration::from_secs(60));
    /// 一小时
    pub const ONE_HOUR: MaxAge = MaxAge::Bounded(Duration::from_secs(60 * 60));
    /// 一天
    pub const ONE_DAY: MaxAge = MaxAge::Bounded(Duration::from_secs(24 * 60 * 60));
    /// 一周
    pub const ONE_WEEK: MaxAge = MaxAge::Bounded(Duration::from_secs(7 * 24 * 60 * 60));

    /// 创建具体上限的最大年龄
    pub fn bounded(limit: Duration) -> Self {
        MaxAge::Bounded(limit)
    }

    /// 是否为永不过期哨兵
    pub fn is_always_fresh(self) -> bool {
        matches!(self, MaxAge::Always)
    }

    /// 判定给定年龄的条目是否过期
    ///
    /// # 参数
    ///
    /// * `age` - 条目的实际年龄
    ///
    /// # 返回值
    ///
    /// 永不过期时返回 false；否则当且仅当 `age > 上限` 时返回 true
    pub fn is_expired(self, age: Duration) -> bool {
        match self {
            MaxAge::Always => false,
            MaxAge::Bounded(limit) => age > limit,
        }
    }
}

impl From<Duration> for MaxAge {
    fn from(limit: Duration) -> Self {
        MaxAge::Bounded(limit)
    }
}
