//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了持久化层的错误类型和处理机制。

use thiserror::Error;

/// 持久化层错误类型枚举
///
/// 定义了持久化操作中可能发生的各种错误类型。
/// 注意：缓存条目不存在或已过期不是错误，由各操作以 `None` / 空列表表示。
#[derive(Error, Debug)]
pub enum PersistError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 反序列化错误
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// 工厂未配置该数据类型
    #[error("Unsupported data type: {0}")]
    UnsupportedType(String),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sea-ORM数据库错误
    #[error("Sea-ORM error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(String),

    /// 条目年龄无法确定（存储介质未提供时间戳）
    #[error("Entry age unavailable: {0}")]
    AgeUnavailable(String),

    /// 异步写入队列错误
    #[error("Async save error: {0}")]
    AsyncSave(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 持久化操作结果类型别名
///
/// 简化错误处理，所有持久化操作都返回此类型
pub type Result<T> = std::result::Result<T, PersistError>;
