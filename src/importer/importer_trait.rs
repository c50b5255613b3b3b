// ==========================================
// 设备预约系统 - 导入管道 Trait
// ==========================================
// 职责: 定义管道各阶段的可替换接口（不包含实现）
// 实现者: file_parser / data_cleaner / analysis_service / import_backend
// ==========================================

use crate::domain::{ImportRecord, ImportSummary, ParsedTable, RecordType, RowOutcome};
use crate::importer::analysis_service::{AnalysisRequest, RemoteAnalysis};
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件 → 表头 + 原始行
// 实现者: DelimitedTextParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件
    ///
    /// # 返回
    /// - Ok(ParsedTable): 表头与原始行（列数不符的行已丢弃并计数）
    /// - Err: 文件不存在 / 格式不支持 / 少于两行有效内容
    fn parse_file(&self, file_path: &Path) -> ImportResult<ParsedTable>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格值标准化（预览前）
pub trait DataCleaner: Send + Sync {
    /// 空字符串/空白 → None
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 由名 + 姓派生全名；任一为空返回 None
    fn derive_full_name(&self, first_name: Option<&str>, surname: Option<&str>) -> Option<String>;
}

// ==========================================
// AnalysisService Trait
// ==========================================
// 用途: 外部语言模型分析（可选增强）
// 约定: 调用方必须在失败时回退到本地启发式结果
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> ImportResult<RemoteAnalysis>;
}

// ==========================================
// ImportBackend Trait
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// 逐行提交，每行后回调进度
    PerRow,
    /// 单次批量提交，完成后进度 100
    Batch,
}

#[async_trait]
pub trait ImportBackend: Send + Sync {
    fn submit_mode(&self) -> SubmitMode;

    /// 提交单条记录
    ///
    /// # 返回
    /// - Ok(RowOutcome): 导入 / 已存在跳过 / 单行失败
    /// - Err: 传输层失败（整个导入中止）
    async fn submit_row(&self, record: &ImportRecord) -> ImportResult<RowOutcome> {
        Err(ImportError::InternalError(format!(
            "后端不支持逐行提交: {}",
            record.natural_key()
        )))
    }

    /// 批量提交
    async fn submit_batch(
        &self,
        _record_type: RecordType,
        records: &[ImportRecord],
    ) -> ImportResult<ImportSummary> {
        let mut summary = ImportSummary {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            summary.record(self.submit_row(record).await?);
        }
        Ok(summary)
    }

    /// 导入结束后回调（最终汇总），默认无操作
    async fn finish(&self, _record_type: RecordType, _summary: &ImportSummary) -> ImportResult<()> {
        Ok(())
    }
}
