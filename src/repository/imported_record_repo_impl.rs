// ==========================================
// 设备预约系统 - 导入记录 Repository 实现
// ==========================================
// 职责: users / equipment / import_batch 表读写（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::{EquipmentRecord, ImportBatch, RecordType, UserRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::imported_record_repo::ImportedRecordRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// ImportedRecordRepositoryImpl
// ==========================================
pub struct ImportedRecordRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportedRecordRepositoryImpl {
    /// 打开数据库并建表
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn key_column(record_type: RecordType) -> (&'static str, &'static str) {
        match record_type {
            RecordType::Users => ("users", "email"),
            RecordType::Equipment => ("equipment", "tracking_number"),
        }
    }
}

#[async_trait]
impl ImportedRecordRepository for ImportedRecordRepositoryImpl {
    async fn exists(&self, record_type: RecordType, key: &str) -> RepositoryResult<bool> {
        let conn = self.lock()?;
        let (table, column) = Self::key_column(record_type);
        let sql = format!("SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1", table, column);
        let found = conn
            .query_row(&sql, params![key], |_row| Ok(true))
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    async fn existing_keys(&self, record_type: RecordType) -> RepositoryResult<HashSet<String>> {
        let conn = self.lock()?;
        let (table, column) = Self::key_column(record_type);
        let mut stmt = conn.prepare(&format!("SELECT {} FROM {}", column, table))?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(keys)
    }

    async fn insert_user(&self, user: &UserRecord, batch_id: &str) -> RepositoryResult<String> {
        let conn = self.lock()?;
        let user_id = Uuid::new_v4().to_string();
        conn.execute(
            r#"
            INSERT INTO users (
                user_id, email, full_name, first_name, surname, department,
                role, student_id, phone, import_batch_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                user_id,
                user.email.to_lowercase(),
                user.full_name,
                user.first_name,
                user.surname,
                user.department,
                user.role.as_str(),
                user.student_id,
                user.phone,
                batch_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(user_id)
    }

    async fn insert_equipment(
        &self,
        equipment: &EquipmentRecord,
        batch_id: &str,
    ) -> RepositoryResult<String> {
        let conn = self.lock()?;
        let equipment_id = Uuid::new_v4().to_string();
        conn.execute(
            r#"
            INSERT INTO equipment (
                equipment_id, tracking_number, product_name, department, category,
                status, description, location, serial_number, purchase_date,
                condition, import_batch_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                equipment_id,
                equipment.tracking_number,
                equipment.product_name,
                equipment.department,
                equipment.category,
                equipment.status.as_str(),
                equipment.description,
                equipment.location,
                equipment.serial_number,
                equipment.purchase_date,
                equipment.condition,
                batch_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(equipment_id)
    }

    async fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, record_type, file_name, total_rows, imported_rows,
                skipped_rows, error_rows, imported_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                batch.batch_id,
                batch.record_type.as_str(),
                batch.file_name,
                batch.total_rows as i64,
                batch.imported_rows as i64,
                batch.skipped_rows as i64,
                batch.error_rows as i64,
                batch.imported_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn list_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, record_type, file_name, total_rows, imported_rows,
                   skipped_rows, error_rows, imported_at
            FROM import_batch
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut batches = Vec::new();
        for row in rows {
            let (batch_id, record_type, file_name, total, imported, skipped, errors, at) = row?;
            let record_type = record_type.parse::<RecordType>().map_err(|message| {
                RepositoryError::FieldValueError {
                    field: "record_type".to_string(),
                    message,
                }
            })?;
            let imported_at = DateTime::parse_from_rfc3339(&at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RepositoryError::FieldValueError {
                    field: "imported_at".to_string(),
                    message: e.to_string(),
                })?;

            batches.push(ImportBatch {
                batch_id,
                record_type,
                file_name,
                total_rows: total as usize,
                imported_rows: imported as usize,
                skipped_rows: skipped as usize,
                error_rows: errors as usize,
                imported_at,
            });
        }
        Ok(batches)
    }

    async fn count(&self, record_type: RecordType) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let (table, _) = Self::key_column(record_type);
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })?;
        Ok(n as usize)
    }
}
