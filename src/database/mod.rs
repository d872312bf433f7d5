//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了表后端使用的SQLite连接管理。

pub mod connection_string;

pub use connection_string::{
    ensure_database_directory, extract_sqlite_path, normalize_connection_string,
    validate_connection_string,
};

use crate::error::{PersistError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// 打开SQLite数据库连接
///
/// 自动创建数据库文件所在目录并规范化连接字符串。
/// 使用单连接池，保证同一存储上的写入顺序。
///
/// # 参数
///
/// * `connection_string` - SQLite连接字符串，如 `sqlite:./cache.db`
///
/// # 返回值
///
/// 返回数据库连接，失败时返回相应的错误
pub async fn connect(connection_string: &str) -> Result<DatabaseConnection> {
    let ensured = ensure_database_directory(connection_string)?;
    let normalized = normalize_connection_string(&ensured);

    let mut opt = ConnectOptions::new(normalized);
    opt.max_connections(1)
        .min_connections(1)
        .connect_timeout(std::time::Duration::from_secs(30));

    Database::connect(opt)
        .await
        .map_err(|e| PersistError::Database(format!("Failed to open database: {}", e)))
}
