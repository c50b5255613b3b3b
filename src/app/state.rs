// ==========================================
// 设备预约系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::Arc;

use crate::api::{ApiResult, ImportApi};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建应用状态
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时自动建表）
    pub fn new(db_path: String) -> ApiResult<Self> {
        tracing::info!("初始化应用状态, db_path={}", db_path);
        let import_api = Arc::new(ImportApi::new(&db_path)?);
        Ok(Self {
            db_path,
            import_api,
        })
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 BOOKING_IMPORT_DB_PATH（非空时优先）
/// - 开发环境: 用户数据目录/booking-import-dev/booking_import.db
/// - 生产环境: 用户数据目录/booking-import/booking_import.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("BOOKING_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./booking_import.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("booking-import-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("booking-import");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("booking_import.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_new() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.import_api.db_path(), db_path);
    }
}
