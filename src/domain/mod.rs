// ==========================================
// 设备预约系统 - 领域模型层
// ==========================================
// 职责: 定义导入领域的类型、schema、中间产物、强类型记录
// 红线: 不含数据访问逻辑，不含管道逻辑
// ==========================================

pub mod import;
pub mod record;
pub mod schema;
pub mod types;

// 重导出核心类型
pub use import::{
    AnalysisResult, AnalysisSource, Answer, Answers, GapQuestion, ImportBatch, ImportConfirmation,
    ImportSummary, MappingTarget, ParsedTable, PreviewReport, PreviewRow, QuestionKind, RawRow,
    RowErrors, RowOutcome,
};
pub use record::{EquipmentRecord, ImportRecord, UserRecord};
pub use schema::TargetSchema;
pub use types::{EquipmentStatus, RecordType, TargetField, UserRole, WizardStep};
