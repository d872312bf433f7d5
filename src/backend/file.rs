//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了文件后端的实现：每个缓存键对应类型目录下的一个文件，
//! 过期判定基于文件的最后修改时间。

use crate::config::FileStoreConfig;
use crate::duration::MaxAge;
use crate::error::{PersistError, Result};
use crate::persister::{Persistable, Persister, PersisterMaintenance};
use crate::serialization::{Serializer, SerializerEnum};
use crate::sync::SaveQueue;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};
use tracing::{debug, instrument, warn};

/// 文件后端写入任务
struct FileSaveJob {
    path: PathBuf,
    bytes: Vec<u8>,
}

/// 文件后端持久化器
///
/// 在 `<根目录>/<类型存储标识>/` 下为每个缓存键维护一个文件，
/// 文件名由后端对键做安全化处理后派生，条目年龄取自文件的
/// 最后修改时间。该类型目录归此持久化器独占。
pub struct FilePersister<T: Persistable> {
    dir: PathBuf,
    extension: &'static str,
    serializer: SerializerEnum,
    async_save: AtomicBool,
    queue: OnceLock<SaveQueue<FileSaveJob>>,
    _data: PhantomData<fn() -> T>,
}

impl<T: Persistable> FilePersister<T> {
    /// 创建新的文件持久化器，并确保类型目录存在
    pub(crate) fn new(config: &FileStoreConfig, serializer: SerializerEnum) -> Result<Self> {
        let dir = config.root.join(T::storage_name());
        std::fs::create_dir_all(&dir)?;
        let extension = serializer.file_extension();
        Ok(Self {
            dir,
            extension,
            serializer,
            async_save: AtomicBool::new(false),
            queue: OnceLock::new(),
            _data: PhantomData,
        })
    }

    /// 给定键对应的缓存文件路径
    ///
    /// 仅在调用方明确持有文件后端时可用
    pub fn cache_file(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_key(key), self.extension))
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

    fn save_queue(&self) -> &SaveQueue<FileSaveJob> {
        self.queue
            .get_or_init(|| SaveQueue::new("file", |job: FileSaveJob| publish(job.path, job.bytes)))
    }

    /// 按单键规则读取一个缓存文件
    ///
    /// 文件不存在或已过期返回None；年龄无法确定或无法解码返回错误
    async fn read_entry(&self, path: &Path, max_age: MaxAge) -> Result<Option<T>> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if !max_age.is_always_fresh() {
            let modified = meta.modified().map_err(|e| {
                PersistError::AgeUnavailable(format!("{}: {}", path.display(), e))
            })?;
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO);
            if max_age.is_expired(age) {
                debug!("cache file expired: {}", path.display());
                return Ok(None);
            }
        }

        let bytes = tokio::fs::read(path).await?;
        let data = self.serializer.deserialize(&bytes)?;
        Ok(Some(data))
    }
}

#[async_trait]
impl<T: Persistable> Persister for FilePersister<T> {
    type Data = T;
    type Key = String;

    #[instrument(skip(self, data), level = "debug")]
    async fn save(&self, data: T, key: String) -> Result<T> {
        let bytes = self.serializer.serialize(&data)?;
        let path = self.cache_file(&key);
        if self.async_save.load(Ordering::Acquire) {
            self.save_queue().submit(FileSaveJob { path, bytes })?;
        } else {
            publish(path, bytes).await?;
        }
        Ok(data)
    }

    #[instrument(skip(self), level = "debug")]
    async fn load(&self, key: String, max_age: MaxAge) -> Result<Option<T>> {
        let path = self.cache_file(&key);
        let found = self.read_entry(&path, max_age).await?;
        debug!("file load: key={}, found={}", key, found.is_some());
        Ok(found)
    }

    /// 枚举类型目录下所有未过期的条目
    ///
    /// 目录可能与无关的缓存根共享，无法读取或解码的文件仅跳过并告警，
    /// 与单键 `load` 的严格失败有意不同
    #[instrument(skip(self), level = "debug")]
    async fn load_all(&self, max_age: MaxAge) -> Result<Vec<T>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension) {
                continue;
            }
            match self.read_entry(&path, max_age).await {
                Ok(Some(data)) => entries.push(data),
                Ok(None) => {}
                Err(e) => {
                    warn!("skipping unreadable cache file {}: {}", path.display(), e);
                }
            }
        }
        debug!("file load_all: {} entries", entries.len());
        Ok(entries)
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove(&self, key: String) -> Result<()> {
        let path = self.cache_file(&key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove_all(&self) -> Result<()> {
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Persistable> PersisterMaintenance for FilePersister<T> {
    async fn remove_all_entries(&self) -> Result<()> {
        Persister::remove_all(self).await
    }

    async fn drain(&self, timeout: Duration) -> bool {
        self.await_save_async_termination(timeout).await
    }
}

/// 以"先写临时文件再重命名"的方式发布一个条目
///
/// 后续读取要么看到旧条目要么看到完整的新条目
async fn publish(path: PathBuf, bytes: Vec<u8>) -> Result<()> {
    let mut tmp_os = path.clone().into_os_string();
    tmp_os.push(".tmp");
    let tmp = PathBuf::from(tmp_os);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

/// 将缓存键安全化为文件名
///
/// 保留ASCII字母数字和 `-` `_` `.`，其余字符转义为 `%XXXX` 码点；
/// 拒绝产生 `.`、`..` 或空文件名
fn sanitize_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
            name.push(c);
        } else {
            name.push_str(&format!("%{:04X}", c as u32));
        }
    }
    match name.as_str() {
        "" => format!("%{:04X}", '_' as u32),
        "." => "%002E".to_string(),
        ".." => "%002E%002E".to_string(),
        _ => name,
    }
}
