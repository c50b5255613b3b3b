// ==========================================
// 设备预约系统 - 应用层
// ==========================================
// 职责: 导入向导状态机 + 应用级共享状态
// ==========================================

pub mod state;
pub mod wizard;

// 重导出
pub use state::{get_default_db_path, AppState};
pub use wizard::ImportWizard;
