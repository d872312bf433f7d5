//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了关系表后端的实现：每个缓存键对应类型专属表中的一行，
//! 过期判定基于行内维护的写入时间戳列。

use crate::duration::MaxAge;
use crate::error::{PersistError, Result};
use crate::persister::{Persistable, Persister, PersisterMaintenance};
use crate::serialization::{Serializer, SerializerEnum};
use crate::sync::SaveQueue;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement, Value};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument};

/// 表后端写入任务
struct RowSaveJob {
    key: i64,
    payload: Vec<u8>,
}

/// 关系表后端持久化器
///
/// 为绑定类型维护一张
/// `(cache_key INTEGER PRIMARY KEY, payload BLOB, written_at INTEGER)` 表，
/// 写入通过单条upsert语句发布，`written_at` 由后端在每次写入时刷新
/// （epoch毫秒）。年龄从时间戳列计算，跨进程重启仍然正确。
pub struct TablePersister<T: Persistable> {
    db: DatabaseConnection,
    quoted_table: String,
    serializer: SerializerEnum,
    async_save: AtomicBool,
    queue: OnceLock<SaveQueue<RowSaveJob>>,
    _data: PhantomData<fn() -> T>,
}

impl<T: Persistable> TablePersister<T> {
    /// 创建新的表持久化器，并确保类型专属表存在
    pub(crate) async fn create(
        db: DatabaseConnection,
        table_name: &str,
        serializer: SerializerEnum,
    ) -> Result<Self> {
        validate_identifier(table_name)?;
        let quoted_table = escape_identifier(table_name);

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                cache_key INTEGER PRIMARY KEY,
                payload BLOB NOT NULL,
                written_at INTEGER NOT NULL
            )",
            quoted_table
        );
        db.execute(Statement::from_string(DatabaseBackend::Sqlite, ddl))
            .await?;
        debug!("table persister ready: {}", table_name);

        Ok(Self {
            db,
            quoted_table,
            serializer,
            async_save: AtomicBool::new(false),
            queue: OnceLock::new(),
            _data: PhantomData,
        })
    }

    /// 开启或关闭异步写入
    ///
    /// 开启后 `save` 在提交物理写入后立即返回
    pub fn set_async_save_enabled(&self, enabled: bool) {
        self.async_save.store(enabled, Ordering::Release);
    }

    /// 在限定时间内等待所有在途异步写入完成
    ///
    /// # 返回值
    ///
    /// 全部在时限内完成时返回 true；从未启用异步写入时立即返回 true
    pub async fn await_save_async_termination(&self, timeout: Duration) -> bool {
        match self.queue.get() {
            Some(queue) => queue.await_termination(timeout).await,
            None => true,
        }
    }

    /// 累计失败的异步写入数量
    pub fn failed_save_count(&self) -> u64 {
        self.queue.get().map(|q| q.failed_count()).unwrap_or(0)
    }

    fn save_queue(&self) -> &SaveQueue<RowSaveJob> {
        self.queue.get_or_init(|| {
            let db = self.db.clone();
            let quoted_table = self.quoted_table.clone();
            SaveQueue::new("table", move |job: RowSaveJob| {
                let db = db.clone();
                let quoted_table = quoted_table.clone();
                async move { upsert_row(&db, &quoted_table, job.key, job.payload).await }
            })
        })
    }
}

#[async_trait]
impl<T: Persistable> Persister for TablePersister<T> {
    type Data = T;
    type Key = i64;

    #[instrument(skip(self, data), level = "debug")]
    async fn save(&self, data: T, key: i64) -> Result<T> {
        let payload = self.serializer.serialize(&data)?;
        if self.async_save.load(Ordering::Acquire) {
            self.save_queue().submit(RowSaveJob { key, payload })?;
        } else {
            upsert_row(&self.db, &self.quoted_table, key, payload).await?;
        }
        Ok(data)
    }

    #[instrument(skip(self), level = "debug")]
    async fn load(&self, key: i64, max_age: MaxAge) -> Result<Option<T>> {
        let sql = format!(
            "SELECT payload, written_at FROM {} WHERE cache_key = ?1",
            self.quoted_table
        );
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                sql,
                vec![Value::BigInt(Some(key))],
            ))
            .await?;

        let row = match row {
            Some(row) => row,
            None => {
                debug!("table load: key={}, found=false", key);
                return Ok(None);
            }
        };

        if !max_age.is_always_fresh() {
            let written_at: i64 = row
                .try_get("", "written_at")
                .map_err(|e| PersistError::AgeUnavailable(format!("key {}: {}", key, e)))?;
            let age_ms = (Utc::now().timestamp_millis() - written_at).max(0) as u64;
            if max_age.is_expired(Duration::from_millis(age_ms)) {
                debug!("table load: key={}, expired=true", key);
                return Ok(None);
            }
        }

        let payload: Vec<u8> = row
            .try_get("", "payload")
            .map_err(|e| PersistError::Database(e.to_string()))?;
        let data = self.serializer.deserialize(&payload)?;
        Ok(Some(data))
    }

    /// 单次扫描枚举所有未过期的行
    ///
    /// 有界的最大年龄直接下推为SQL过滤条件；解码失败是错误，
    /// 每行都归本持久化器所有，不适用文件后端的宽松扫描
    #[instrument(skip(self), level = "debug")]
    async fn load_all(&self, max_age: MaxAge) -> Result<Vec<T>> {
        let stmt = match max_age {
            MaxAge::Bounded(limit) => {
                let limit_ms = i64::try_from(limit.as_millis()).unwrap_or(i64::MAX);
                let cutoff = Utc::now().timestamp_millis().saturating_sub(limit_ms);
                Statement::from_sql_and_values(
                    DatabaseBackend::Sqlite,
                    format!(
                        "SELECT payload FROM {} WHERE written_at >= ?1",
                        self.quoted_table
                    ),
                    vec![Value::BigInt(Some(cutoff))],
                )
            }
            MaxAge::Always => Statement::from_string(
                DatabaseBackend::Sqlite,
                format!("SELECT payload FROM {}", self.quoted_table),
            ),
        };

        let rows = self.db.query_all(stmt).await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: Vec<u8> = row
                .try_get("", "payload")
                .map_err(|e| PersistError::Database(e.to_string()))?;
            entries.push(self.serializer.deserialize(&payload)?);
        }
        debug!("table load_all: {} entries", entries.len());
        Ok(entries)
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove(&self, key: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE cache_key = ?1", self.quoted_table);
        self.db
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                sql,
                vec![Value::BigInt(Some(key))],
            ))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove_all(&self) -> Result<()> {
        let sql = format!("DELETE FROM {}", self.quoted_table);
        self.db
            .execute(Statement::from_string(DatabaseBackend::Sqlite, sql))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<T: Persistable> PersisterMaintenance for TablePersister<T> {
    async fn remove_all_entries(&self) -> Result<()> {
        Persister::remove_all(self).await
    }

    async fn drain(&self, timeout: Duration) -> bool {
        self.await_save_async_termination(timeout).await
    }
}

/// 以单条upsert语句写入或覆盖一行
async fn upsert_row(
    db: &DatabaseConnection,
    quoted_table: &str,
    key: i64,
    payload: Vec<u8>,
) -> Result<()> {
    let written_at = Utc::now().timestamp_millis();
    let sql = format!(
        "INSERT INTO {} (cache_key, payload, written_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(cache_key) DO UPDATE SET payload = excluded.payload, \
         written_at = excluded.written_at",
        quoted_table
    );
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        sql,
        vec![
            Value::BigInt(Some(key)),
            Value::Bytes(Some(Box::new(payload))),
            Value::BigInt(Some(written_at)),
        ],
    ))
    .await?;
    Ok(())
}

/// 验证SQL标识符是否安全（防止SQL注入）
///
/// SQLite标识符规则：只能包含字母、数字、下划线，且不能以数字开头
fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(PersistError::Database(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if identifier.len() > 128 {
        return Err(PersistError::Database(
            "Identifier exceeds maximum length of 128 characters".to_string(),
        ));
    }

    let mut chars = identifier.chars();
    let first = chars
        .next()
        .ok_or_else(|| PersistError::Database("Invalid identifier: empty".to_string()))?;

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(PersistError::Database(format!(
            "Invalid identifier '{}': must start with a letter or underscore",
            identifier
        )));
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(PersistError::Database(format!(
                "Invalid identifier '{}': only alphanumeric characters and underscores are allowed",
                identifier
            )));
        }
    }

    let reserved_keywords = [
        "SELECT", "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TABLE", "INDEX",
        "WHERE", "FROM", "JOIN", "UNION", "OR", "AND", "NOT", "NULL", "TRUE", "FALSE", "IS", "IN",
        "LIKE", "BETWEEN", "ORDER", "BY", "GROUP", "HAVING", "LIMIT", "OFFSET", "DISTINCT",
        "VIEW", "TRIGGER", "PRAGMA",
    ];

    let upper_identifier = identifier.to_uppercase();
    if reserved_keywords.contains(&upper_identifier.as_str()) {
        return Err(PersistError::Database(format!(
            "Invalid identifier '{}': reserved keyword",
            identifier
        )));
    }

    Ok(())
}

/// 转义SQL标识符（使用双引号）
fn escape_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}
