//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了持久化器的统一契约：可持久化类型的标记特征、
//! 各存储后端实现的异步操作接口，以及工厂持有的维护接口。

use crate::duration::MaxAge;
use crate::error::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::any::TypeId;
use std::fmt;
use std::time::Duration;

/// 可持久化类型的标记特征
///
/// 实现该特征的类型可以被任意后端存储。`storage_name` 返回的标识
/// 用于划分该类型的物理存储空间（文件后端的子目录、表后端的默认表名），
/// 对同一类型必须终生保持不变。
pub trait Persistable: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 该类型的稳定存储标识
    fn storage_name() -> &'static str;
}

/// 持久化器操作特征
///
/// 每个持久化器绑定唯一的数据类型和一个存储后端。所有后端
/// 对外提供同一组操作；同步调用在物理IO完成或失败前不返回。
#[async_trait]
pub trait Persister: Send + Sync {
    /// 绑定的数据类型
    type Data: Persistable;
    /// 缓存键类型（文件后端为字符串，表后端为行标识）
    type Key: Clone + Send + Sync + fmt::Debug + 'static;

    /// 检查能否处理给定的数据类型
    ///
    /// 纯能力判定，在持久化器的生命周期内保持一致
    fn can_handle(&self, data_type: TypeId) -> bool {
        data_type == TypeId::of::<Self::Data>()
    }

    /// 将对象写为 `key` 对应的条目并原样返回
    ///
    /// 覆盖已有条目。物理写入失败时返回错误，且此前的条目保持完整；
    /// 任何时刻后续读取都不会看到写了一半的条目。
    async fn save(&self, data: Self::Data, key: Self::Key) -> Result<Self::Data>;

    /// 读取 `key` 对应的条目
    ///
    /// # 返回值
    ///
    /// 条目不存在或已过期时返回None；存在且未过期但无法解码时返回错误
    async fn load(&self, key: Self::Key, max_age: MaxAge) -> Result<Option<Self::Data>>;

    /// 枚举该类型的所有未过期条目
    ///
    /// 顺序不作保证；缓存为空时返回空列表
    async fn load_all(&self, max_age: MaxAge) -> Result<Vec<Self::Data>>;

    /// 删除 `key` 对应的条目，条目不存在时为空操作
    async fn remove(&self, key: Self::Key) -> Result<()>;

    /// 删除该类型的全部条目，缓存已空时为空操作
    async fn remove_all(&self) -> Result<()>;
}

/// 持久化器维护接口
///
/// 工厂对其持有的持久化器实例统一执行清空和排空时使用的
/// 对象安全切面，不暴露具体的数据类型。
#[async_trait]
pub trait PersisterMaintenance: Send + Sync {
    /// 删除该持久化器的全部条目
    async fn remove_all_entries(&self) -> Result<()>;

    /// 在限定时间内等待该持久化器的异步写入排空
    ///
    /// # 返回值
    ///
    /// 全部在时限内完成时返回 true
    async fn drain(&self, timeout: Duration) -> bool;
}
