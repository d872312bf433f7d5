//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 集成测试共享的夹具类型和构造函数

#![allow(dead_code)]

use oxpersist::Persistable;
use serde::{Deserialize, Serialize};

pub const TEST_TEMP: &str = "28";
pub const TEST_TEMP2: &str = "30";
pub const TEST_TEMP_UNIT: &str = "C";

/// 单次温度读数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub temp: String,
    pub unit: String,
}

/// 一次观测，内嵌读数列表以覆盖嵌套对象图
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub id: i64,
    pub readings: Vec<Reading>,
}

impl Persistable for Observation {
    fn storage_name() -> &'static str {
        "observation"
    }
}

/// 第二种夹具类型，用于能力判定和未登记类型的场景
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub id: i64,
    pub days: u32,
}

impl Persistable for Forecast {
    fn storage_name() -> &'static str {
        "forecast"
    }
}

pub fn build_observation(id: i64, temp: &str) -> Observation {
    Observation {
        id,
        readings: vec![Reading {
            temp: temp.to_string(),
            unit: TEST_TEMP_UNIT.to_string(),
        }],
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
