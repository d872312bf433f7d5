//! oxpersist - 对象缓存持久化层
//!
//! 为上层请求缓存管道提供统一的对象持久化能力：
//! 支持文件后端和关系表后端，按最大可接受年龄判定过期，
//! 并提供可等待完成的异步写入协调。

#![doc(html_root_url = "https://docs.rs/oxpersist/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod config;
pub mod database;
pub mod duration;
pub mod error;
pub mod factory;
pub mod persister;
pub mod serialization;
pub mod sync;

// Re-export commonly used items
pub use backend::file::FilePersister;
pub use backend::table::TablePersister;
pub use config::Config;
pub use duration::MaxAge;
pub use error::{PersistError, Result};
pub use factory::{FilePersisterFactory, TablePersisterFactory, TableRegistry};
pub use persister::{Persistable, Persister, PersisterMaintenance};
pub use serialization::{JsonSerializer, Serializer, SerializerEnum};

/// oxpersist 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
