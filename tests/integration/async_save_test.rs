//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 异步写入协调集成测试

use crate::common::{build_observation, init_tracing, Observation, TEST_TEMP, TEST_TEMP2};
use oxpersist::config::{FileStoreConfig, TableStoreConfig};
use oxpersist::{
    FilePersisterFactory, JsonSerializer, MaxAge, Persister, SerializerEnum,
    TablePersisterFactory, TableRegistry,
};
use std::path::Path;
use std::time::Duration;

#[path = "../common/mod.rs"]
mod common;

fn file_factory(root: &Path) -> FilePersisterFactory {
    init_tracing();
    FilePersisterFactory::new(
        FileStoreConfig {
            root: root.to_path_buf(),
        },
        SerializerEnum::Json(JsonSerializer::new()),
    )
    .unwrap()
}

async fn table_factory(dir: &Path) -> TablePersisterFactory {
    init_tracing();
    TablePersisterFactory::connect(
        &TableStoreConfig {
            connection_string: format!("sqlite:{}", dir.join("cache.db").display()),
        },
        SerializerEnum::Json(JsonSerializer::new()),
        TableRegistry::new().register::<Observation>(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_file_async_save_visible_after_drain() {
    let dir = tempfile::tempdir().unwrap();
    let persister = file_factory(dir.path())
        .create_persister::<Observation>()
        .unwrap();
    let observation = build_observation(1, TEST_TEMP);

    persister.set_async_save_enabled(true);
    let returned = persister
        .save(observation.clone(), "weather".to_string())
        .await
        .unwrap();
    assert_eq!(returned, observation);

    assert!(
        persister
            .await_save_async_termination(Duration::from_millis(500))
            .await
    );
    assert_eq!(
        persister
            .load("weather".to_string(), MaxAge::Always)
            .await
            .unwrap(),
        Some(observation)
    );
}

#[tokio::test]
async fn test_table_async_save_visible_after_drain() {
    let dir = tempfile::tempdir().unwrap();
    let factory = table_factory(dir.path()).await;
    let persister = factory.create_persister::<Observation>().await.unwrap();
    let observation = build_observation(1, TEST_TEMP);

    persister.set_async_save_enabled(true);
    let returned = persister.save(observation.clone(), 1).await.unwrap();
    assert_eq!(returned, observation);

    assert!(
        persister
            .await_save_async_termination(Duration::from_millis(500))
            .await
    );
    assert_eq!(
        persister.load(1, MaxAge::Always).await.unwrap(),
        Some(observation)
    );
}

#[tokio::test]
async fn test_async_saves_for_one_key_apply_in_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let persister = file_factory(dir.path())
        .create_persister::<Observation>()
        .unwrap();
    persister.set_async_save_enabled(true);

    let older = build_observation(1, TEST_TEMP);
    let newer = build_observation(1, TEST_TEMP2);
    persister
        .save(older, "toto".to_string())
        .await
        .unwrap();
    persister
        .save(newer.clone(), "toto".to_string())
        .await
        .unwrap();

    assert!(
        persister
            .await_save_async_termination(Duration::from_secs(1))
            .await
    );
    assert_eq!(
        persister
            .load("toto".to_string(), MaxAge::Always)
            .await
            .unwrap(),
        Some(newer)
    );
}

#[tokio::test]
async fn test_await_termination_with_nothing_pending() {
    let dir = tempfile::tempdir().unwrap();
    let persister = file_factory(dir.path())
        .create_persister::<Observation>()
        .unwrap();

    // 从未启用异步写入时立即返回
    assert!(
        persister
            .await_save_async_termination(Duration::from_millis(10))
            .await
    );
}

#[tokio::test]
async fn test_sync_save_is_unaffected_after_disabling_async() {
    let dir = tempfile::tempdir().unwrap();
    let persister = file_factory(dir.path())
        .create_persister::<Observation>()
        .unwrap();
    let observation = build_observation(1, TEST_TEMP);

    persister.set_async_save_enabled(true);
    persister
        .save(observation.clone(), "toto".to_string())
        .await
        .unwrap();
    assert!(
        persister
            .await_save_async_termination(Duration::from_secs(1))
            .await
    );

    persister.set_async_save_enabled(false);
    let updated = build_observation(1, TEST_TEMP2);
    persister
        .save(updated.clone(), "toto".to_string())
        .await
        .unwrap();

    // 同步路径无需排空即可见
    assert_eq!(
        persister
            .load("toto".to_string(), MaxAge::Always)
            .await
            .unwrap(),
        Some(updated)
    );
}

#[tokio::test]
async fn test_failed_async_write_is_counted_and_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let persister = file_factory(dir.path())
        .create_persister::<Observation>()
        .unwrap();
    let observation = build_observation(1, TEST_TEMP);

    // 删除类型目录让物理写入失败
    let type_dir = persister.cache_file("probe");
    let type_dir = type_dir.parent().unwrap().to_path_buf();
    std::fs::remove_dir_all(&type_dir).unwrap();

    persister.set_async_save_enabled(true);
    persister
        .save(observation.clone(), "doomed".to_string())
        .await
        .unwrap();
    assert!(
        persister
            .await_save_async_termination(Duration::from_secs(1))
            .await
    );
    assert_eq!(persister.failed_save_count(), 1);

    // 恢复目录后后续写入不受影响
    std::fs::create_dir_all(&type_dir).unwrap();
    persister
        .save(observation.clone(), "healthy".to_string())
        .await
        .unwrap();
    assert!(
        persister
            .await_save_async_termination(Duration::from_secs(1))
            .await
    );
    assert_eq!(persister.failed_save_count(), 1);
    assert_eq!(
        persister
            .load("healthy".to_string(), MaxAge::Always)
            .await
            .unwrap(),
        Some(observation)
    );
}
