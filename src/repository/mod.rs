// ==========================================
// 设备预约系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供本地导入后端的数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化
// ==========================================

pub mod error;
pub mod imported_record_repo;
pub mod imported_record_repo_impl;

pub use error::{RepositoryError, RepositoryResult};
pub use imported_record_repo::ImportedRecordRepository;
pub use imported_record_repo_impl::ImportedRecordRepositoryImpl;
