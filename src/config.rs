//! 配置模块，负责加载 SQL 翻译器的 JSON 配置文件
//!
//! ```json
//! {
//!   "dialect": "postgres",
//!   "tables": { "Account": "accounts" },
//!   "columns": { "Name": "full_name" }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {}", .0.display())]
    NotFound(PathBuf),

    #[error("无法读取配置文件 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("无法解析JSON配置: {0}")]
    Json(#[from] serde_json::Error),

    #[error("未知的 SQL 方言: {0}")]
    UnknownDialect(String),
}

/// The SQL flavour rendered by [`SqlTranslator`](crate::sql_translator::SqlTranslator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

impl FromStr for SqlDialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "mysql" => Ok(SqlDialect::Mysql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            _ => Err(ConfigError::UnknownDialect(s.to_string())),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Postgres => f.write_str("postgres"),
            SqlDialect::Mysql => f.write_str("mysql"),
            SqlDialect::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// SQL 翻译器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub dialect: SqlDialect,
    /// 实体名到数据库表名的映射
    pub tables: HashMap<String, String>,
    /// 字段名到列名的映射
    pub columns: HashMap<String, String>,
}

impl TranslatorConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// 获取实体对应的表名，未映射时原样返回实体名
    pub fn table_name<'a>(&'a self, entity: &'a str) -> &'a str {
        self.tables.get(entity).map(String::as_str).unwrap_or(entity)
    }

    /// 获取字段对应的列名，未映射时原样返回字段名
    pub fn column_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.columns.get(field).map(String::as_str).unwrap_or(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "dialect": "sqlite",
                "tables": {{ "Account": "accounts" }},
                "columns": {{ "Name": "full_name" }}
            }}"#
        )
        .unwrap();

        let config = TranslatorConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.dialect, SqlDialect::Sqlite);
        assert_eq!(config.table_name("Account"), "accounts");
        assert_eq!(config.table_name("Contact"), "Contact");
        assert_eq!(config.column_name("Name"), "full_name");
        assert_eq!(config.column_name("Id"), "Id");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = TranslatorConfig::from_json_str(r#"{ "tables": { "A": "a" } }"#).unwrap();
        assert_eq!(config.dialect, SqlDialect::Postgres);
        assert!(config.columns.is_empty());
    }

    #[test]
    fn test_invalid_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = TranslatorConfig::from_json_file(file.path());
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_unknown_dialect_in_json() {
        let result = TranslatorConfig::from_json_str(r#"{ "dialect": "oracle" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = TranslatorConfig::from_json_file("non_existent_file.json");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("Postgres".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
        assert_eq!("MYSQL".parse::<SqlDialect>().unwrap(), SqlDialect::Mysql);
        assert!("oracle".parse::<SqlDialect>().is_err());
    }
}
