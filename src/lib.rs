// ==========================================
// 设备预约系统 - 智能导入助手核心库
// ==========================================
// 技术栈: Rust + SQLite（本地演示存储） + 可选远程导入接口
// 系统定位: 用户/设备表格批量导入（人工确认映射与缺失字段）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 类型、schema、导入中间产物
pub mod domain;

// 数据仓储层 - 本地导入记录
pub mod repository;

// 导入层 - 解析、识别、映射、校验、执行
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 文件级接口
pub mod api;

// 应用层 - 导入向导
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AnalysisResult, GapQuestion, ImportConfirmation, ImportRecord, ImportSummary, MappingTarget,
    PreviewReport, RecordType, TargetField, WizardStep,
};

// 向导与 API
pub use api::{ApiError, ApiResult, ImportApi, ImportOptions};
pub use app::ImportWizard;
pub use importer::{ImportError, ImportResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "设备预约系统 - 智能导入助手";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
