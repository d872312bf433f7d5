//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了持久化器工厂：按数据类型解析或惰性构造持久化器实例，
//! 同一类型在同一工厂内至多存在一个实例。

use crate::backend::file::FilePersister;
use crate::backend::table::TablePersister;
use crate::config::{FileStoreConfig, TableStoreConfig};
use crate::database;
use crate::error::{PersistError, Result};
use crate::persister::{Persistable, PersisterMaintenance};
use crate::serialization::SerializerEnum;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// 工厂持有的持久化器实例
///
/// 同一实例以两种形态保存：`Any` 用于按具体类型取回，
/// 维护接口用于不区分类型的清空与排空
struct PersisterEntry {
    instance: Arc<dyn Any + Send + Sync>,
    maintenance: Arc<dyn PersisterMaintenance>,
}

fn downcast_entry<P: Send + Sync + 'static>(entry: &PersisterEntry) -> Result<Arc<P>> {
    entry
        .instance
        .clone()
        .downcast::<P>()
        .map_err(|_| {
            PersistError::UnsupportedType(
                "registered persister has a different concrete type".to_string(),
            )
        })
}

async fn sweep_remove_all(instances: &DashMap<TypeId, PersisterEntry>) -> Result<()> {
    let sweep: Vec<_> = instances
        .iter()
        .map(|entry| entry.maintenance.clone())
        .collect();
    for persister in sweep {
        persister.remove_all_entries().await?;
    }
    Ok(())
}

async fn sweep_drain(instances: &DashMap<TypeId, PersisterEntry>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let sweep: Vec<_> = instances
        .iter()
        .map(|entry| entry.maintenance.clone())
        .collect();
    let mut all_drained = true;
    for persister in sweep {
        let remaining = deadline.saturating_duration_since(Instant::now());
        all_drained &= persister.drain(remaining).await;
    }
    all_drained
}

/// 文件后端持久化器工厂
///
/// 任何可持久化类型都可以获得文件持久化器；同一类型重复请求
/// 返回缓存的同一实例。不同工厂实例之间互不共享。
pub struct FilePersisterFactory {
    config: FileStoreConfig,
    serializer: SerializerEnum,
    instances: DashMap<TypeId, PersisterEntry>,
}

impl FilePersisterFactory {
    /// 创建新的文件持久化器工厂，并确保存储根目录存在
    pub fn new(config: FileStoreConfig, serializer: SerializerEnum) -> Result<Self> {
        std::fs::create_dir_all(&config.root)?;
        Ok(Self {
            config,
            serializer,
            instances: DashMap::new(),
        })
    }

    /// 解析或构造给定类型的文件持久化器
    ///
    /// # 返回值
    ///
    /// 同一类型的重复调用返回同一实例
    #[instrument(skip(self), level = "debug", fields(data_type = std::any::type_name::<T>()))]
    pub fn create_persister<T: Persistable>(&self) -> Result<Arc<FilePersister<T>>> {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.instances.get(&type_id) {
            return downcast_entry::<FilePersister<T>>(&existing);
        }

        let persister = Arc::new(FilePersister::<T>::new(&self.config, self.serializer.clone())?);
        match self.instances.entry(type_id) {
            Entry::Occupied(existing) => downcast_entry::<FilePersister<T>>(existing.get()),
            Entry::Vacant(slot) => {
                debug!("created file persister for {}", T::storage_name());
                slot.insert(PersisterEntry {
                    instance: persister.clone(),
                    maintenance: persister.clone(),
                });
                Ok(persister)
            }
        }
    }

    /// 删除该工厂所有持久化器的全部条目
    pub async fn remove_all_data(&self) -> Result<()> {
        sweep_remove_all(&self.instances).await
    }

    /// 在限定时间内等待所有持久化器的异步写入排空
    ///
    /// # 返回值
    ///
    /// 全部在时限内完成时返回 true
    pub async fn drain_pending_saves(&self, timeout: Duration) -> bool {
        sweep_drain(&self.instances, timeout).await
    }
}

/// 表后端的类型登记表
///
/// 在工厂构造时一次性给出表后端需要支撑的全部数据类型
/// 及其表名。未登记的类型无法获得表持久化器。
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<TypeId, String>,
}

impl TableRegistry {
    /// 创建空的登记表
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个类型，表名取其存储标识
    pub fn register<T: Persistable>(self) -> Self {
        let table_name = T::storage_name().to_string();
        self.register_as::<T>(&table_name)
    }

    /// 以指定表名登记一个类型
    pub fn register_as<T: Persistable>(mut self, table_name: &str) -> Self {
        self.tables.insert(TypeId::of::<T>(), table_name.to_string());
        self
    }

    fn table_for(&self, type_id: TypeId) -> Option<&str> {
        self.tables.get(&type_id).map(String::as_str)
    }
}

/// 表后端持久化器工厂
///
/// 持有一个SQLite连接和类型登记表；同一类型重复请求返回缓存的
/// 同一实例，未登记的类型返回不支持错误。
pub struct TablePersisterFactory {
    db: DatabaseConnection,
    registry: TableRegistry,
    serializer: SerializerEnum,
    instances: DashMap<TypeId, PersisterEntry>,
}

impl TablePersisterFactory {
    /// 打开数据库并创建表持久化器工厂
    ///
    /// # 参数
    ///
    /// * `config` - 表存储配置
    /// * `serializer` - 行载荷使用的序列化器
    /// * `registry` - 需要支撑的数据类型登记表
    pub async fn connect(
        config: &TableStoreConfig,
        serializer: SerializerEnum,
        registry: TableRegistry,
    ) -> Result<Self> {
        let db = database::connect(&config.connection_string).await?;
        Ok(Self {
            db,
            registry,
            serializer,
            instances: DashMap::new(),
        })
    }

    /// 解析或构造给定类型的表持久化器
    ///
    /// # 返回值
    ///
    /// 同一类型的重复调用返回同一实例；未登记的类型返回
    /// `UnsupportedType` 错误，不影响其他持久化器
    #[instrument(skip(self), level = "debug", fields(data_type = std::any::type_name::<T>()))]
    pub async fn create_persister<T: Persistable>(&self) -> Result<Arc<TablePersister<T>>> {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.instances.get(&type_id) {
            return downcast_entry::<TablePersister<T>>(&existing);
        }

        let table_name = self.registry.table_for(type_id).ok_or_else(|| {
            PersistError::UnsupportedType(format!(
                "no table registered for {}",
                std::any::type_name::<T>()
            ))
        })?;

        let persister = Arc::new(
            TablePersister::<T>::create(self.db.clone(), table_name, self.serializer.clone())
                .await?,
        );
        match self.instances.entry(type_id) {
            Entry::Occupied(existing) => downcast_entry::<TablePersister<T>>(existing.get()),
            Entry::Vacant(slot) => {
                debug!("created table persister for {}", T::storage_name());
                slot.insert(PersisterEntry {
                    instance: persister.clone(),
                    maintenance: persister.clone(),
                });
                Ok(persister)
            }
        }
    }

    /// 删除该工厂所有持久化器的全部条目
    pub async fn remove_all_data(&self) -> Result<()> {
        sweep_remove_all(&self.instances).await
    }

    /// 在限定时间内等待所有持久化器的异步写入排空
    ///
    /// # 返回值
    ///
    /// 全部在时限内完成时返回 true
    pub async fn drain_pending_saves(&self, timeout: Duration) -> bool {
        sweep_drain(&self.instances, timeout).await
    }
}
