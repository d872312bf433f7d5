//! 连接字符串规范化模块
//!
//! 提供SQLite数据库连接字符串的验证、解析和规范化功能，
//! 明确不同环境（开发、测试、生产）的推荐格式。

use crate::error::{PersistError, Result};
use std::path::Path;

/// 连接字符串解析结果
#[derive(Debug, Clone)]
pub struct ParsedConnectionString<'a> {
    /// 原始连接字符串
    pub original: &'a str,
    /// SQLite 文件路径
    pub file_path: Option<String>,
    /// 是否为内存数据库
    pub is_memory: bool,
    /// 连接参数
    pub params: Vec<(String, String)>,
}

impl<'a> ParsedConnectionString<'a> {
    /// 解析连接字符串
    ///
    /// 无 `sqlite:` 前缀的输入按裸文件路径处理
    pub fn parse(s: &'a str) -> Self {
        let is_memory = s.contains(":memory:");
        let (file_path, params) = if let Some(path_with_params) = s.strip_prefix("sqlite:") {
            if is_memory {
                let params = if let Some(qmark_pos) = path_with_params.find('?') {
                    extract_params(&path_with_params[qmark_pos + 1..])
                } else {
                    vec![]
                };
                (None, params)
            } else {
                let parts: Vec<&str> = path_with_params.splitn(2, '?').collect();
                let file_path = if parts[0].starts_with("///") {
                    Some(format!("/{}", parts[0].trim_start_matches("///")))
                } else if parts[0].starts_with("//") {
                    Some(format!("/{}", parts[0].trim_start_matches("//")))
                } else if parts[0].starts_with('/') || parts[0].starts_with("./") {
                    Some(parts[0].to_string())
                } else {
                    Some(format!("./{}", parts[0]))
                };
                (file_path, extract_params(parts.get(1).unwrap_or(&"")))
            }
        } else {
            (Some(s.to_string()), vec![])
        };

        Self {
            original: s,
            file_path,
            is_memory,
            params,
        }
    }
}

/// 从查询字符串提取参数
fn extract_params(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return vec![];
    }
    query
        .split('&')
        .filter_map(|pair| {
            let parts: Vec<&str> = pair.splitn(2, '=').collect();
            if parts.len() == 2 {
                Some((parts[0].to_string(), parts[1].to_string()))
            } else {
                None
            }
        })
        .collect()
}

/// 规范化连接字符串
///
/// # 规范格式说明
///
/// - 绝对路径: `sqlite:/absolute/path/to/db.sqlite`
/// - 相对路径: `sqlite:./relative/path/to/db.sqlite`
/// - 内存数据库: `sqlite::memory:` 或 `sqlite::memory:?cache=shared`
/// - 不推荐: `sqlite:///path` (三个斜杠会被错误解析)
///
/// 文件数据库在未指定 `mode` 参数时补充 `mode=rwc`，
/// 使首次打开时自动创建数据库文件。
///
/// # 环境推荐格式
///
/// - **测试环境**: `sqlite::memory:?cache=shared`
/// - **开发环境**: `sqlite:./dev.db`
/// - **生产环境**: `sqlite:/var/data/oxpersist/prod.db`
pub fn normalize_connection_string(s: &str) -> String {
    let parsed = ParsedConnectionString::parse(s);

    if parsed.is_memory {
        if parsed.params.is_empty() {
            return "sqlite::memory:".to_string();
        }
        let params: Vec<String> = parsed
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        return format!("sqlite::memory:?{}", params.join("&"));
    }

    let path = match &parsed.file_path {
        Some(path) => {
            if path.starts_with('/') || path.starts_with("./") || path.starts_with("../") {
                path.clone()
            } else {
                format!("./{}", path)
            }
        }
        None => return "sqlite::memory:".to_string(),
    };

    let mut params = parsed.params.clone();
    if !params.iter().any(|(k, _)| k == "mode") {
        params.push(("mode".to_string(), "rwc".to_string()));
    }
    let params: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    format!("sqlite:{}?{}", path, params.join("&"))
}

/// 验证连接字符串
///
/// # 验证规则
///
/// - 仅接受SQLite连接字符串
/// - 文件路径的父路径若存在则必须是目录
///
/// # 返回值
///
/// 返回规范化后的连接字符串
pub fn validate_connection_string(s: &str) -> Result<String> {
    let lower = s.to_lowercase();
    if lower.starts_with("mysql") || lower.starts_with("postgres") {
        return Err(PersistError::Config(format!(
            "only sqlite connection strings are supported, got: {}",
            s
        )));
    }

    let parsed = ParsedConnectionString::parse(s);
    if !parsed.is_memory {
        if let Some(path) = &parsed.file_path {
            let full_path = if path.starts_with('/') {
                Path::new(path).to_path_buf()
            } else {
                std::env::current_dir().unwrap_or_default().join(path)
            };
            if let Some(parent) = full_path.parent() {
                if parent.exists() && !parent.is_dir() {
                    return Err(PersistError::Config(format!(
                        "parent path is not a directory: {}",
                        parent.display()
                    )));
                }
            }
        }
    }

    Ok(normalize_connection_string(s))
}

/// 提取 SQLite 数据库文件路径
///
/// 如果连接字符串指向内存数据库，返回 None
pub fn extract_sqlite_path(connection_string: &str) -> Option<String> {
    let parsed = ParsedConnectionString::parse(connection_string);
    if parsed.is_memory {
        return None;
    }
    parsed.file_path
}

/// 确保数据库目录存在
///
/// # 参数
///
/// - `connection_string`: 数据库连接字符串
///
/// # 返回
///
/// 规范化后的连接字符串
pub fn ensure_database_directory(connection_string: &str) -> Result<String> {
    let parsed = ParsedConnectionString::parse(connection_string);

    if parsed.is_memory {
        return Ok(connection_string.to_string());
    }

    if let Some(path) = parsed.file_path {
        let full_path = if path.starts_with('/') {
            Path::new(&path).to_path_buf()
        } else {
            std::env::current_dir()?.join(&path)
        };

        if let Some(parent) = full_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PersistError::Database(format!(
                        "无法创建数据库目录 {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(normalize_connection_string(connection_string))
    } else {
        Ok(connection_string.to_string())
    }
}
