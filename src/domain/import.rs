// ==========================================
// 设备预约系统 - 导入管道中间产物
// ==========================================
// 用途: 解析 → 分析 → 映射 → 预览 → 导入 各阶段的数据结构
// 生命周期: 仅在一次导入向导会话内
// ==========================================

use crate::domain::types::{RecordType, TargetField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// RawRow - 原始行
// ==========================================
// 解析后不可变；映射/预览阶段只产出新的派生行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub values: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(|v| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ==========================================
// ParsedTable - 文件/粘贴文本解析结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub delimiter: char,
    /// 列数与表头不一致被丢弃的行数
    pub dropped_rows: usize,
}

impl ParsedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 取前 n 行作为分析样本
    pub fn sample(&self, n: usize) -> &[RawRow] {
        &self.rows[..self.rows.len().min(n)]
    }
}

// ==========================================
// MappingTarget - 单列映射目标
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingTarget {
    Field(TargetField),
    Skip,
}

impl MappingTarget {
    pub fn field(&self) -> Option<TargetField> {
        match self {
            MappingTarget::Field(f) => Some(*f),
            MappingTarget::Skip => None,
        }
    }
}

// ==========================================
// AnalysisResult - 类型识别结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisSource {
    /// 仅本地模式匹配
    Heuristic,
    /// 外部分析服务确认/修正
    Refined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub detected_type: RecordType,
    /// 0..=100
    pub confidence: u8,
    /// 表头 → 建议字段（仅含命中的表头）
    pub field_mappings: BTreeMap<String, MappingTarget>,
    pub explanation: String,
    pub user_score: u32,
    pub equipment_score: u32,
    pub source: AnalysisSource,
}

// ==========================================
// GapQuestion - 缺失字段提问
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Select,
    Text,
    /// 不可作答，仅提示
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapQuestion {
    pub text: String,
    pub field: Option<TargetField>,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub default_value: Option<String>,
    pub apply_to_all: bool,
    pub hint: Option<String>,
    /// 数据大概率无法按现状导入
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Answer {
    /// 统一赋值给所有行
    All(String),
    /// 行索引（0 起）→ 值
    PerRow(BTreeMap<usize, String>),
    /// 统一值，个别行覆盖
    AllWithOverrides {
        all: String,
        per_row: BTreeMap<usize, String>,
    },
}

impl Answer {
    /// 指定行生效的回答值
    pub fn value_for(&self, row_index: usize) -> Option<&str> {
        match self {
            Answer::All(v) => Some(v),
            Answer::PerRow(per_row) => per_row.get(&row_index).map(String::as_str),
            Answer::AllWithOverrides { all, per_row } => {
                Some(per_row.get(&row_index).unwrap_or(all))
            }
        }
    }

    /// 追加单行覆盖，已有统一值保留给其余行
    pub fn with_row(self, row_index: usize, value: String) -> Answer {
        match self {
            Answer::All(all) => {
                let mut per_row = BTreeMap::new();
                per_row.insert(row_index, value);
                Answer::AllWithOverrides { all, per_row }
            }
            Answer::PerRow(mut per_row) => {
                per_row.insert(row_index, value);
                Answer::PerRow(per_row)
            }
            Answer::AllWithOverrides { all, mut per_row } => {
                per_row.insert(row_index, value);
                Answer::AllWithOverrides { all, per_row }
            }
        }
    }
}

/// 问题索引 → 回答
pub type Answers = BTreeMap<usize, Answer>;

// ==========================================
// PreviewRow / PreviewReport
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    /// 原始行索引（0 起）
    pub row_index: usize,
    pub values: BTreeMap<TargetField, String>,
    /// 阻断导入的校验错误
    pub errors: Vec<String>,
    /// 不阻断导入的提示
    pub warnings: Vec<String>,
}

impl PreviewRow {
    pub fn get(&self, field: TargetField) -> Option<&str> {
        self.values.get(&field).map(|v| v.as_str())
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// 1 起的行号（用于用户提示）
    pub fn row_number(&self) -> usize {
        self.row_index + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowErrors {
    pub row_number: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewReport {
    pub record_type: RecordType,
    pub rows: Vec<PreviewRow>,
    pub rows_with_errors: Vec<RowErrors>,
    /// 被多个表头映射的目标字段
    pub duplicate_mappings: Vec<TargetField>,
}

impl PreviewReport {
    pub fn valid_rows(&self) -> impl Iterator<Item = &PreviewRow> {
        self.rows.iter().filter(|r| r.is_valid())
    }

    pub fn invalid_count(&self) -> usize {
        self.rows_with_errors.len()
    }
}

// ==========================================
// 导入执行
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportConfirmation {
    /// 存在错误行时拒绝导入
    AllOrNothing,
    /// 用户已确认：跳过错误行，仅导入有效行
    ValidRowsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowOutcome {
    Imported,
    /// 后端已存在（邮箱/追踪号重复）
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    #[serde(default)]
    pub imported: usize,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub errors: usize,
    #[serde(default)]
    pub total: usize,
}

impl ImportSummary {
    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Imported => self.imported += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Failed => self.errors += 1,
        }
    }
}

// ==========================================
// ImportBatch - 导入批次记录
// ==========================================
// 对齐: import_batch 表（本地后端每次导入一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,              // 批次 ID（UUID）
    pub record_type: RecordType,
    pub file_name: Option<String>,     // 源文件名
    pub total_rows: usize,             // 预览总行数
    pub imported_rows: usize,
    pub skipped_rows: usize,           // 已存在 + 校验排除
    pub error_rows: usize,
    pub imported_at: DateTime<Utc>,
}
