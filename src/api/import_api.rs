// ==========================================
// 设备预约系统 - 导入API
// ==========================================
// 职责: 以文件为单位驱动导入向导（分析 / 预览 / 导入），供命令行调用
// 后端: 本地 SQLite（默认） / 远程导入接口（import_mode = remote）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::app::wizard::ImportWizard;
use crate::config::{ConfigManager, ImportConfigReader, ImportMode};
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::domain::{
    AnalysisResult, GapQuestion, ImportBatch, ImportConfirmation, ImportSummary, MappingTarget,
    PreviewReport, RecordType, TargetField,
};
use crate::importer::conflict_handler::ConflictHandler;
use crate::importer::import_backend::LocalImportBackend;
use crate::importer::importer_trait::{AnalysisService, ImportBackend};
use crate::repository::{ImportedRecordRepository, ImportedRecordRepositoryImpl};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// 导入选项
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// 人工指定记录类型（覆盖自动识别）
    pub record_type: Option<RecordType>,
    /// 缺失字段的统一取值（对应 Select/Text 问题的“应用到所有行”）
    pub defaults: Vec<(TargetField, String)>,
    /// 存在错误行时仅导入有效行
    pub skip_invalid: bool,
}

/// 分析响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub file_name: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
    /// 列数不符被丢弃的行数
    pub dropped_rows: usize,
    pub analysis: AnalysisResult,
    /// 表头顺序的映射（None 表示未映射）
    pub mapping: Vec<(String, Option<MappingTarget>)>,
    pub questions: Vec<GapQuestion>,
}

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub record_type: RecordType,
    pub questions: Vec<GapQuestion>,
    pub report: PreviewReport,
    /// 本地存储中已存在的行（行索引, 主键），导入时将被跳过
    pub existing: Vec<(usize, String)>,
}

/// 导入响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    pub record_type: RecordType,
    pub summary: ImportSummary,
    /// 本地模式的导入批次ID
    pub batch_id: Option<String>,
    pub mode: ImportMode,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

/// 导入API
pub struct ImportApi {
    db_path: String,
    config: ConfigManager,
    repo: Arc<ImportedRecordRepositoryImpl>,
}

impl ImportApi {
    /// 创建新的ImportApi实例（配置与导入记录共用一个连接）
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        match read_schema_version(&conn) {
            Ok(Some(v)) if v == CURRENT_SCHEMA_VERSION => {}
            Ok(v) => warn!(
                db_path = %db_path,
                found = ?v,
                expected = CURRENT_SCHEMA_VERSION,
                "schema_version 不一致"
            ),
            Err(e) => warn!(db_path = %db_path, error = %e, "schema_version 读取失败"),
        }

        let conn = Arc::new(Mutex::new(conn));
        let config = ConfigManager::from_connection(conn.clone())?;
        let repo = Arc::new(ImportedRecordRepositoryImpl::from_connection(conn)?);

        Ok(Self {
            db_path: db_path.to_string(),
            config,
            repo,
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// 已配置分析端点时创建外部分析服务
    async fn analysis_service(&self) -> ApiResult<Option<Box<dyn AnalysisService>>> {
        let endpoint = self.config.get_analysis_endpoint().await?;

        #[cfg(feature = "remote")]
        let service = endpoint.map(|url| {
            Box::new(crate::importer::HttpAnalysisService::new(url)) as Box<dyn AnalysisService>
        });

        #[cfg(not(feature = "remote"))]
        let service = {
            if endpoint.is_some() {
                warn!("未启用 remote 特性，忽略 analysis_endpoint");
            }
            None
        };

        Ok(service)
    }

    /// 加载文件 → 分析 → 确认，停在 MapFields
    async fn prepare(&self, file_path: &str, options: &ImportOptions) -> ApiResult<ImportWizard> {
        let sample_rows = self.config.get_sample_rows().await?;
        let service = self.analysis_service().await?;

        let mut wizard = ImportWizard::with_sample_rows(sample_rows);
        wizard.load_file(file_path)?;
        wizard.analyze(service.as_deref()).await?;
        wizard.confirm_analysis()?;

        if let Some(record_type) = options.record_type {
            if wizard.record_type() != Some(record_type) {
                wizard.set_detected_type(record_type)?;
            }
        }

        for (field, value) in &options.defaults {
            let idx = wizard
                .questions()
                .iter()
                .position(|q| q.field == Some(*field));
            match idx {
                Some(idx) => wizard.answer(idx, value.clone())?,
                None => warn!(field = %field, "该字段已映射，忽略默认值"),
            }
        }

        Ok(wizard)
    }

    /// 分析文件
    #[instrument(skip(self))]
    pub async fn analyze_file(&self, file_path: &str) -> ApiResult<AnalyzeResponse> {
        let wizard = self.prepare(file_path, &ImportOptions::default()).await?;
        let table = wizard
            .table()
            .ok_or_else(|| ApiError::InternalError("解析结果缺失".to_string()))?;
        let analysis = wizard
            .analysis()
            .cloned()
            .ok_or_else(|| ApiError::InternalError("分析结果缺失".to_string()))?;

        Ok(AnalyzeResponse {
            file_name: wizard.file_name().map(str::to_string),
            headers: table.headers.clone(),
            row_count: table.rows.len(),
            dropped_rows: table.dropped_rows,
            analysis,
            mapping: wizard.mapping().entries(),
            questions: wizard.questions().to_vec(),
        })
    }

    /// 预览文件
    ///
    /// 本地模式下额外标记存储中已存在的行（导入时跳过）
    #[instrument(skip(self, options))]
    pub async fn preview_file(
        &self,
        file_path: &str,
        options: &ImportOptions,
    ) -> ApiResult<PreviewResponse> {
        let mut wizard = self.prepare(file_path, options).await?;
        let mut report = wizard.preview()?.clone();

        let existing = match self.config.get_import_mode().await? {
            ImportMode::Local => self.mark_existing(&mut report).await?,
            ImportMode::Remote => Vec::new(),
        };

        Ok(PreviewResponse {
            record_type: report.record_type,
            questions: wizard.questions().to_vec(),
            report,
            existing,
        })
    }

    async fn mark_existing(&self, report: &mut PreviewReport) -> ApiResult<Vec<(usize, String)>> {
        let record_type = report.record_type;
        let keys = self.repo.existing_keys(record_type).await?;
        let existing = ConflictHandler.detect_existing(record_type, &report.rows, &keys);

        let field = ConflictHandler::key_field(record_type);
        for (row_index, key) in &existing {
            if let Some(row) = report.rows.iter_mut().find(|r| r.row_index == *row_index) {
                row.warnings
                    .push(format!("{} '{}' already exists and will be skipped", field, key));
            }
        }
        if !existing.is_empty() {
            warn!(count = existing.len(), "部分记录已存在于本地存储");
        }
        Ok(existing)
    }

    /// 导入文件
    ///
    /// # 参数
    /// - progress: 进度回调（0..=100）
    #[instrument(skip(self, options, progress))]
    pub async fn import_file<F>(
        &self,
        file_path: &str,
        options: &ImportOptions,
        progress: F,
    ) -> ApiResult<ImportApiResponse>
    where
        F: FnMut(u8) + Send,
    {
        let start = Instant::now();
        let mut wizard = self.prepare(file_path, options).await?;
        let record_type = wizard.preview()?.record_type;

        let confirmation = if options.skip_invalid {
            ImportConfirmation::ValidRowsOnly
        } else {
            ImportConfirmation::AllOrNothing
        };

        let mode = self.config.get_import_mode().await?;
        let (summary, batch_id) = match mode {
            ImportMode::Local => {
                let file_name = Path::new(file_path)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(file_path);
                let backend = LocalImportBackend::new(self.repo.clone()).with_file_name(file_name);
                let summary = wizard.import(&backend, confirmation, progress).await?;
                (summary, Some(backend.batch_id().to_string()))
            }
            ImportMode::Remote => {
                let backend = self.remote_backend().await?;
                let summary = wizard
                    .import(backend.as_ref(), confirmation, progress)
                    .await?;
                (summary, None)
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as i64;
        info!(
            record_type = %record_type,
            mode = %mode,
            imported = summary.imported,
            skipped = summary.skipped,
            elapsed_ms,
            "文件导入完成"
        );

        Ok(ImportApiResponse {
            record_type,
            summary,
            batch_id,
            mode,
            elapsed_ms,
        })
    }

    #[cfg(feature = "remote")]
    async fn remote_backend(&self) -> ApiResult<Box<dyn ImportBackend>> {
        let base_url = self.config.get_api_base_url().await?;
        Ok(Box::new(crate::importer::HttpImportBackend::new(base_url)))
    }

    #[cfg(not(feature = "remote"))]
    async fn remote_backend(&self) -> ApiResult<Box<dyn ImportBackend>> {
        Err(ApiError::ConfigError(
            "import_mode=remote 需要启用 remote 特性".to_string(),
        ))
    }

    /// 最近的导入批次
    pub async fn list_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        let limit = limit.clamp(1, 100);
        Ok(self.repo.list_batches(limit).await?)
    }

    /// 本地存储中某类型的记录数
    pub async fn count(&self, record_type: RecordType) -> ApiResult<usize> {
        Ok(self.repo.count(record_type).await?)
    }
}
