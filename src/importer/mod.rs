// ==========================================
// 设备预约系统 - 导入层
// ==========================================
// 职责: 用户/设备批量导入管道
// 流程: 解析 → 模式匹配 → 类型识别 → 字段映射 → 缺失提问 → 预览校验 → 导入
// 支持: CSV / TSV / 粘贴文本, Excel
// ==========================================

// 模块声明
pub mod analysis_service;
pub mod conflict_handler;
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod gap_questions;
pub mod import_backend;
pub mod import_executor;
pub mod importer_trait;
pub mod pattern_matcher;
pub mod type_detector;

// 重导出核心类型
pub use analysis_service::{AnalysisRequest, RemoteAnalysis};
#[cfg(feature = "remote")]
pub use analysis_service::HttpAnalysisService;
pub use conflict_handler::ConflictHandler;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use dq_validator::DqValidator;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapping;
pub use file_parser::{DelimitedTextParser, ExcelParser, UniversalFileParser};
pub use gap_questions::{carry_over_answers, default_answers, generate_questions};
pub use import_backend::LocalImportBackend;
#[cfg(feature = "remote")]
pub use import_backend::HttpImportBackend;
pub use import_executor::ImportExecutor;
pub use type_detector::TypeDetector;

// 重导出 Trait 接口
pub use importer_trait::{AnalysisService, DataCleaner, FileParser, ImportBackend, SubmitMode};
