//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 关系表后端集成测试

use crate::common::{build_observation, init_tracing, Forecast, Observation, TEST_TEMP, TEST_TEMP2};
use oxpersist::config::TableStoreConfig;
use oxpersist::{
    JsonSerializer, MaxAge, Persister, SerializerEnum, TablePersisterFactory, TableRegistry,
};
use std::any::TypeId;
use std::path::Path;
use std::time::Duration;

#[path = "../common/mod.rs"]
mod common;

fn store_config(dir: &Path) -> TableStoreConfig {
    init_tracing();
    TableStoreConfig {
        connection_string: format!("sqlite:{}", dir.join("cache.db").display()),
    }
}

async fn table_factory(dir: &Path) -> TablePersisterFactory {
    TablePersisterFactory::connect(
        &store_config(dir),
        SerializerEnum::Json(JsonSerializer::new()),
        TableRegistry::new().register::<Observation>(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_can_handle_is_bound_to_the_data_type() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();

    assert!(persister.can_handle(TypeId::of::<Observation>()));
    assert!(!persister.can_handle(TypeId::of::<Forecast>()));
}

#[tokio::test]
async fn test_save_returns_the_data_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    let observation = build_observation(1, TEST_TEMP);

    let returned = persister.save(observation.clone(), 1).await.unwrap();

    assert_eq!(returned, observation);
}

#[tokio::test]
async fn test_load_with_no_expiry_restores_the_object_graph() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    let observation = build_observation(1, TEST_TEMP);
    persister.save(observation.clone(), 1).await.unwrap();

    let loaded = persister.load(1, MaxAge::Always).await.unwrap().unwrap();

    assert_eq!(loaded.id, 1);
    assert_eq!(loaded.readings, observation.readings);
}

#[tokio::test]
async fn test_load_not_expired() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    let observation = build_observation(1, TEST_TEMP);
    persister.save(observation.clone(), 1).await.unwrap();

    let loaded = persister.load(1, MaxAge::ONE_MINUTE).await.unwrap();

    assert_eq!(loaded, Some(observation));
}

#[tokio::test]
async fn test_load_expired_entry_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    persister
        .save(build_observation(1, TEST_TEMP), 1)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let loaded = persister
        .load(1, MaxAge::bounded(Duration::from_millis(100)))
        .await
        .unwrap();

    assert_eq!(loaded, None);
}

#[tokio::test]
async fn test_save_overwrites_the_entry_for_a_key() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    persister
        .save(build_observation(1, TEST_TEMP), 1)
        .await
        .unwrap();
    let updated = build_observation(1, TEST_TEMP2);
    persister.save(updated.clone(), 1).await.unwrap();

    let loaded = persister.load(1, MaxAge::Always).await.unwrap();
    assert_eq!(loaded, Some(updated));

    let all = persister.load_all(MaxAge::Always).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_load_all_with_no_entries() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();

    let all = persister.load_all(MaxAge::Always).await.unwrap();

    assert!(all.is_empty());
}

#[tokio::test]
async fn test_load_all_with_two_entries() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    let first = build_observation(1, TEST_TEMP);
    let second = build_observation(2, TEST_TEMP2);
    persister.save(first.clone(), 1).await.unwrap();
    persister.save(second.clone(), 2).await.unwrap();

    let all = persister.load_all(MaxAge::Always).await.unwrap();

    assert_eq!(all.len(), 2);
    assert!(all.contains(&first));
    assert!(all.contains(&second));
}

#[tokio::test]
async fn test_load_all_filters_expired_entries() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    persister
        .save(build_observation(1, TEST_TEMP), 1)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let fresh = build_observation(2, TEST_TEMP2);
    persister.save(fresh.clone(), 2).await.unwrap();

    let all = persister
        .load_all(MaxAge::bounded(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(all, vec![fresh]);
}

#[tokio::test]
async fn test_remove_one_of_two_entries() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    let first = build_observation(1, TEST_TEMP);
    let second = build_observation(2, TEST_TEMP2);
    persister.save(first.clone(), 1).await.unwrap();
    persister.save(second.clone(), 2).await.unwrap();

    persister.remove(2).await.unwrap();

    let all = persister.load_all(MaxAge::Always).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all.contains(&first));
    assert!(!all.contains(&second));
}

#[tokio::test]
async fn test_remove_missing_key_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();

    persister.remove(42).await.unwrap();
}

#[tokio::test]
async fn test_remove_all_empties_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    persister
        .save(build_observation(1, TEST_TEMP), 1)
        .await
        .unwrap();

    persister.remove_all().await.unwrap();

    assert!(persister.load_all(MaxAge::Always).await.unwrap().is_empty());
    persister.remove_all().await.unwrap();
}

#[tokio::test]
async fn test_entries_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let observation = build_observation(1, TEST_TEMP);

    {
        let factory = table_factory(dir.path()).await;
        let persister = factory.create_persister::<Observation>().await.unwrap();
        persister.save(observation.clone(), 1).await.unwrap();
    }

    // 重新打开同一存储，年龄取自行内时间戳而非进程时钟
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();

    let loaded = persister.load(1, MaxAge::Always).await.unwrap();
    assert_eq!(loaded, Some(observation));

    let still_fresh = persister.load(1, MaxAge::ONE_HOUR).await.unwrap();
    assert!(still_fresh.is_some());
}
