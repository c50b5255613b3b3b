// ==========================================
// 设备预约系统 - 导入执行器
// ==========================================
// 职责: 预览报告中的有效行 → 强类型记录 → 提交导入后端
// 规则:
// - 存在错误行且未确认“仅导入有效行” → 拒绝（不提交任何行）
// - 逐行模式: 按源顺序提交，每行后回调进度 round((i+1)/n*100)
// - 批量模式: 单次提交，成功后进度 100
// - 传输失败直接返回错误，不重试、不回滚
// ==========================================

use crate::domain::{ImportConfirmation, ImportRecord, ImportSummary, PreviewReport};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::{ImportBackend, SubmitMode};
use tracing::{info, instrument, warn};

/// 进度百分比
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

pub struct ImportExecutor;

impl ImportExecutor {
    /// 执行导入
    ///
    /// # 参数
    /// - backend: 导入后端
    /// - report: 预览报告
    /// - confirmation: 存在错误行时的用户确认
    /// - progress: 进度回调（0..=100）
    ///
    /// # 返回
    /// - Ok(ImportSummary): skipped 含后端跳过与校验排除的行；total 为预览总行数
    /// - Err(ConfirmationRequired): 存在错误行且未确认
    /// - Err: 传输失败
    #[instrument(skip(self, backend, report, progress), fields(
        record_type = %report.record_type,
        rows = report.rows.len()
    ))]
    pub async fn execute<F>(
        &self,
        backend: &dyn ImportBackend,
        report: &PreviewReport,
        confirmation: ImportConfirmation,
        mut progress: F,
    ) -> ImportResult<ImportSummary>
    where
        F: FnMut(u8) + Send,
    {
        let invalid_rows = report.invalid_count();
        if invalid_rows > 0 && confirmation != ImportConfirmation::ValidRowsOnly {
            warn!(invalid_rows, "存在错误行，需确认后导入");
            return Err(ImportError::ConfirmationRequired { invalid_rows });
        }

        let records = report
            .valid_rows()
            .map(|row| {
                ImportRecord::project(report.record_type, row).map_err(|message| {
                    ImportError::ProjectionError {
                        row: row.row_number(),
                        message,
                    }
                })
            })
            .collect::<ImportResult<Vec<_>>>()?;

        let mut summary = if records.is_empty() {
            progress(100);
            ImportSummary::default()
        } else {
            match backend.submit_mode() {
                SubmitMode::PerRow => {
                    let total = records.len();
                    let mut summary = ImportSummary::default();
                    for (i, record) in records.iter().enumerate() {
                        summary.record(backend.submit_row(record).await?);
                        progress(progress_percent(i + 1, total));
                        tokio::task::yield_now().await;
                    }
                    summary
                }
                SubmitMode::Batch => {
                    let summary = backend.submit_batch(report.record_type, &records).await?;
                    progress(100);
                    summary
                }
            }
        };

        summary.skipped += invalid_rows;
        summary.total = report.rows.len();

        backend.finish(report.record_type, &summary).await?;

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            errors = summary.errors,
            total = summary.total,
            "导入完成"
        );
        Ok(summary)
    }
}
