//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON序列化器的实现。

use super::Serializer;
use crate::error::{PersistError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// JSON序列化器
///
/// 实现基于serde_json的序列化和反序列化
#[derive(Clone)]
pub struct JsonSerializer {
    _private: (),
}

impl JsonSerializer {
    /// 创建新的JSON序列化器
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for JsonSerializer {
    /// 序列化值为JSON字节数组
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| PersistError::Serialization(e.to_string()))
    }

    /// 从JSON字节数组反序列化值
    ///
    /// 解码失败表示存在但无法读取的记录，映射为反序列化错误
    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| PersistError::Deserialization(e.to_string()))
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}
