// ==========================================
// 设备预约系统 - 导入后端实现
// ==========================================
// LocalImportBackend: 逐行写入本地 SQLite（演示模式），已存在主键跳过
// HttpImportBackend : 单次 POST {base}/api/{type}/import（feature = "remote"）
// ==========================================

use crate::domain::{ImportBatch, ImportRecord, ImportSummary, RecordType, RowOutcome};
use crate::importer::error::ImportResult;
use crate::importer::importer_trait::{ImportBackend, SubmitMode};
use crate::repository::{ImportedRecordRepository, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// LocalImportBackend
// ==========================================
pub struct LocalImportBackend<R: ImportedRecordRepository> {
    repo: Arc<R>,
    batch_id: String,
    file_name: Option<String>,
}

impl<R: ImportedRecordRepository> LocalImportBackend<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            batch_id: Uuid::new_v4().to_string(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }
}

#[async_trait]
impl<R: ImportedRecordRepository + 'static> ImportBackend for LocalImportBackend<R> {
    fn submit_mode(&self) -> SubmitMode {
        SubmitMode::PerRow
    }

    async fn submit_row(&self, record: &ImportRecord) -> ImportResult<RowOutcome> {
        let record_type = record.record_type();
        let key = record.natural_key();

        if self.repo.exists(record_type, &key).await? {
            debug!(record_type = %record_type, key = %key, "主键已存在，跳过");
            return Ok(RowOutcome::Skipped);
        }

        let inserted = match record {
            ImportRecord::User(user) => self.repo.insert_user(user, &self.batch_id).await,
            ImportRecord::Equipment(equipment) => {
                self.repo.insert_equipment(equipment, &self.batch_id).await
            }
        };

        match inserted {
            Ok(_) => Ok(RowOutcome::Imported),
            Err(RepositoryError::UniqueConstraintViolation(_)) => Ok(RowOutcome::Skipped),
            Err(RepositoryError::DatabaseQueryError(msg)) => {
                warn!(key = %key, error = %msg, "单行写入失败");
                Ok(RowOutcome::Failed)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn finish(&self, record_type: RecordType, summary: &ImportSummary) -> ImportResult<()> {
        let batch = ImportBatch {
            batch_id: self.batch_id.clone(),
            record_type,
            file_name: self.file_name.clone(),
            total_rows: summary.total,
            imported_rows: summary.imported,
            skipped_rows: summary.skipped,
            error_rows: summary.errors,
            imported_at: Utc::now(),
        };
        self.repo.insert_batch(&batch).await?;
        info!(batch_id = %self.batch_id, "导入批次已记录");
        Ok(())
    }
}

// ==========================================
// HttpImportBackend
// ==========================================
#[cfg(feature = "remote")]
mod http {
    use super::*;
    use crate::importer::error::ImportError;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    struct ImportRequest<'a> {
        data: &'a [ImportRecord],
    }

    /// 接口返回的计数可能缺省
    #[derive(Debug, Default, Deserialize)]
    struct ImportResponse {
        imported: Option<usize>,
        skipped: Option<usize>,
        errors: Option<usize>,
    }

    #[derive(Debug, Clone)]
    pub struct HttpImportBackend {
        client: Client,
        base_url: String,
    }

    impl HttpImportBackend {
        pub fn new(base_url: impl Into<String>) -> Self {
            let base_url = base_url.into().trim_end_matches('/').to_string();
            info!(base_url = %base_url, "初始化远程导入后端");
            Self {
                client: Client::new(),
                base_url,
            }
        }

        pub fn endpoint(&self, record_type: RecordType) -> String {
            format!("{}/api/{}/import", self.base_url, record_type)
        }
    }

    #[async_trait]
    impl ImportBackend for HttpImportBackend {
        fn submit_mode(&self) -> SubmitMode {
            SubmitMode::Batch
        }

        async fn submit_batch(
            &self,
            record_type: RecordType,
            records: &[ImportRecord],
        ) -> ImportResult<ImportSummary> {
            let url = self.endpoint(record_type);
            let response = self
                .client
                .post(&url)
                .json(&ImportRequest { data: records })
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ImportError::TransportError(format!(
                    "Import failed: {}",
                    status.as_u16()
                )));
            }

            let body = response.text().await?;
            let parsed: ImportResponse = if body.trim().is_empty() {
                ImportResponse::default()
            } else {
                serde_json::from_str(&body).map_err(|e| {
                    ImportError::TransportError(format!("导入接口响应解析失败: {}", e))
                })?
            };

            Ok(ImportSummary {
                imported: parsed.imported.unwrap_or(records.len()),
                skipped: parsed.skipped.unwrap_or(0),
                errors: parsed.errors.unwrap_or(0),
                total: records.len(),
            })
        }
    }
}

#[cfg(feature = "remote")]
pub use http::HttpImportBackend;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UserRecord, UserRole};
    use crate::repository::ImportedRecordRepositoryImpl;
    use tempfile::NamedTempFile;

    fn user(email: &str) -> ImportRecord {
        ImportRecord::User(UserRecord {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            department: "Graphic Design".to_string(),
            role: UserRole::Staff,
            first_name: None,
            surname: None,
            student_id: None,
            phone: None,
        })
    }

    #[tokio::test]
    async fn test_local_backend_skips_existing() {
        let temp_file = NamedTempFile::new().unwrap();
        let repo = Arc::new(
            ImportedRecordRepositoryImpl::new(temp_file.path().to_str().unwrap()).unwrap(),
        );
        let backend = LocalImportBackend::new(repo.clone());

        assert_eq!(backend.submit_row(&user("a@x.com")).await.unwrap(), RowOutcome::Imported);
        assert_eq!(backend.submit_row(&user("A@X.com")).await.unwrap(), RowOutcome::Skipped);
        assert_eq!(repo.count(RecordType::Users).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_local_backend_records_batch() {
        let temp_file = NamedTempFile::new().unwrap();
        let repo = Arc::new(
            ImportedRecordRepositoryImpl::new(temp_file.path().to_str().unwrap()).unwrap(),
        );
        let backend = LocalImportBackend::new(repo.clone()).with_file_name("staff.csv");
        let summary = ImportSummary {
            imported: 2,
            skipped: 1,
            errors: 0,
            total: 3,
        };
        backend.finish(RecordType::Users, &summary).await.unwrap();

        let batches = repo.list_batches(5).await.unwrap();
        assert_eq!(batches[0].batch_id, backend.batch_id());
        assert_eq!(batches[0].file_name.as_deref(), Some("staff.csv"));
    }

    #[cfg(feature = "remote")]
    #[test]
    fn test_http_endpoint() {
        let backend = HttpImportBackend::new("https://booking.example.ac.uk/");
        assert_eq!(
            backend.endpoint(RecordType::Equipment),
            "https://booking.example.ac.uk/api/equipment/import"
        );
    }
}
