// ==========================================
// 设备预约系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)，缺省值在代码中
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, ImportMode};
use crate::db::open_sqlite_connection;
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

pub const DEFAULT_SAMPLE_ROWS: usize = 10;
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

fn config_error(key: &str, err: impl ToString) -> ImportError {
    ImportError::ConfigError {
        key: key.to_string(),
        message: err.to_string(),
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path).map_err(|e| config_error("*", e))?;
        crate::db::init_schema(&conn).map_err(|e| config_error("*", e))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| config_error("*", format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&guard).map_err(|e| config_error("*", e))?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| config_error(key, format!("锁获取失败: {}", e)))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(config_error(key, e)),
        }
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| config_error(key, format!("锁获取失败: {}", e)))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )
        .map_err(|e| config_error(key, e))?;
        Ok(())
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 全部 global 配置（键有序，CLI 展示用）
    pub fn get_config_snapshot(&self) -> ImportResult<BTreeMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| config_error("*", format!("锁获取失败: {}", e)))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")
            .map_err(|e| config_error("*", e))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| config_error("*", e))?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(|e| config_error("*", e))?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_sample_rows(&self) -> ImportResult<usize> {
        let value = self.get_config_or_default(
            config_keys::IMPORT_SAMPLE_ROWS,
            &DEFAULT_SAMPLE_ROWS.to_string(),
        )?;
        match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => {
                warn!(
                    config_key = config_keys::IMPORT_SAMPLE_ROWS,
                    raw_value = %value,
                    "样本行数配置无效，使用默认值"
                );
                Ok(DEFAULT_SAMPLE_ROWS)
            }
        }
    }

    async fn get_import_mode(&self) -> ImportResult<ImportMode> {
        let value = self.get_config_or_default(config_keys::IMPORT_MODE, "local")?;
        value
            .parse::<ImportMode>()
            .map_err(|e| config_error(config_keys::IMPORT_MODE, e))
    }

    async fn get_analysis_endpoint(&self) -> ImportResult<Option<String>> {
        Ok(self
            .get_global_config_value(config_keys::ANALYSIS_ENDPOINT)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    async fn get_api_base_url(&self) -> ImportResult<String> {
        let value = self.get_config_or_default(config_keys::API_BASE_URL, DEFAULT_API_BASE_URL)?;
        Ok(value.trim().trim_end_matches('/').to_string())
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 类型识别
    pub const IMPORT_SAMPLE_ROWS: &str = "import_sample_rows";
    pub const ANALYSIS_ENDPOINT: &str = "analysis_endpoint";

    // 导入后端
    pub const IMPORT_MODE: &str = "import_mode";
    pub const API_BASE_URL: &str = "api_base_url";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn manager() -> (NamedTempFile, ConfigManager) {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, manager)
    }

    #[tokio::test]
    async fn test_defaults() {
        let (_tmp, config) = manager();
        assert_eq!(config.get_sample_rows().await.unwrap(), DEFAULT_SAMPLE_ROWS);
        assert_eq!(config.get_import_mode().await.unwrap(), ImportMode::Local);
        assert_eq!(config.get_analysis_endpoint().await.unwrap(), None);
        assert_eq!(config.get_api_base_url().await.unwrap(), DEFAULT_API_BASE_URL);
    }

    #[tokio::test]
    async fn test_overrides() {
        let (_tmp, config) = manager();
        config
            .set_global_config_value(config_keys::IMPORT_SAMPLE_ROWS, "25")
            .unwrap();
        config
            .set_global_config_value(config_keys::API_BASE_URL, "https://booking.example.ac.uk/")
            .unwrap();
        config
            .set_global_config_value(config_keys::IMPORT_MODE, "remote")
            .unwrap();

        assert_eq!(config.get_sample_rows().await.unwrap(), 25);
        assert_eq!(
            config.get_api_base_url().await.unwrap(),
            "https://booking.example.ac.uk"
        );
        assert_eq!(config.get_import_mode().await.unwrap(), ImportMode::Remote);
        assert_eq!(config.get_config_snapshot().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_values() {
        let (_tmp, config) = manager();
        config
            .set_global_config_value(config_keys::IMPORT_SAMPLE_ROWS, "zero")
            .unwrap();
        config
            .set_global_config_value(config_keys::IMPORT_MODE, "carrier-pigeon")
            .unwrap();

        assert_eq!(config.get_sample_rows().await.unwrap(), DEFAULT_SAMPLE_ROWS);
        assert!(matches!(
            config.get_import_mode().await,
            Err(ImportError::ConfigError { .. })
        ));
    }
}
