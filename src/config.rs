//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了持久化层的配置结构和解析逻辑。

use crate::database::validate_connection_string;
use crate::error::{PersistError, Result};
use crate::serialization::{JsonSerializer, SerializerEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// 持久化层配置
///
/// 两个后端的配置均可省略，只构造实际需要的工厂
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// 序列化类型
    #[serde(default)]
    pub serialization: SerializationType,
    /// 文件后端配置
    #[serde(default)]
    pub file: Option<FileStoreConfig>,
    /// 表后端配置
    #[serde(default)]
    pub table: Option<TableStoreConfig>,
}

/// 序列化类型枚举
///
/// 支持JSON和Bincode两种序列化方式
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializationType {
    /// JSON序列化
    #[default]
    Json,
    /// Bincode序列化
    Bincode,
}

/// 文件后端配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FileStoreConfig {
    /// 缓存根目录，每个类型在其下拥有独立子目录
    pub root: PathBuf,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./object_cache"),
        }
    }
}

/// 表后端配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TableStoreConfig {
    /// SQLite连接字符串
    pub connection_string: String,
}

impl Default for TableStoreConfig {
    fn default() -> Self {
        Self {
            connection_string: "sqlite:./object_cache.db".to_string(),
        }
    }
}

impl Config {
    /// 从TOML文本解析配置
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| PersistError::Config(e.to_string()))
    }

    /// 验证配置
    ///
    /// # 返回值
    ///
    /// 配置有效时返回Ok(())，否则返回相应的配置错误
    pub fn validate(&self) -> Result<()> {
        if let Some(file) = &self.file {
            if file.root.as_os_str().is_empty() {
                return Err(PersistError::Config(
                    "file.root must not be empty".to_string(),
                ));
            }
        }
        if let Some(table) = &self.table {
            validate_connection_string(&table.connection_string)?;
        }
        Ok(())
    }

    /// 根据配置构造序列化器
    pub fn serializer(&self) -> Result<SerializerEnum> {
        match self.serialization {
            SerializationType::Json => Ok(SerializerEnum::Json(JsonSerializer::new())),
            SerializationType::Bincode => Err(PersistError::Config(
                "Bincode serialization is not currently supported.".to_string(),
            )),
        }
    }
}
