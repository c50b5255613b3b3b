// ==========================================
// 设备预约系统 - 导入记录 Repository Trait
// ==========================================
// 职责: 定义本地导入后端的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{EquipmentRecord, ImportBatch, RecordType, UserRecord};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashSet;

// ==========================================
// ImportedRecordRepository Trait
// ==========================================
// 实现者: ImportedRecordRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ImportedRecordRepository: Send + Sync {
    // ===== 主键查询 =====

    /// 主键是否已存在
    ///
    /// # 参数
    /// - key: users → 小写邮箱；equipment → 追踪号
    async fn exists(&self, record_type: RecordType, key: &str) -> RepositoryResult<bool>;

    /// 全部已存在主键（预览阶段提示“将被跳过”）
    async fn existing_keys(&self, record_type: RecordType) -> RepositoryResult<HashSet<String>>;

    // ===== 写入 =====

    /// 插入用户
    ///
    /// # 返回
    /// - Ok(String): 新用户 ID
    /// - Err(UniqueConstraintViolation): 邮箱已存在
    async fn insert_user(&self, user: &UserRecord, batch_id: &str) -> RepositoryResult<String>;

    /// 插入设备
    ///
    /// # 返回
    /// - Ok(String): 新设备 ID
    /// - Err(UniqueConstraintViolation): 追踪号已存在
    async fn insert_equipment(
        &self,
        equipment: &EquipmentRecord,
        batch_id: &str,
    ) -> RepositoryResult<String>;

    // ===== 批次 =====

    async fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()>;

    /// 最近的导入批次（按导入时间倒序）
    async fn list_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>>;

    // ===== 统计 =====

    async fn count(&self, record_type: RecordType) -> RepositoryResult<usize>;
}
