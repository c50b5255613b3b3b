// ==========================================
// 设备预约系统 - API 层
// ==========================================
// 职责: 以文件为单位提供分析/预览/导入接口，供命令行调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{AnalyzeResponse, ImportApi, ImportApiResponse, ImportOptions, PreviewResponse};
