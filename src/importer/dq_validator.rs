// ==========================================
// 设备预约系统 - 预览 / 数据质量校验
// ==========================================
// 职责: 原始行 + 映射 + 回答 → 预览行（值 / 错误 / 警告）
// 流程: 映射（表头顺序，后者覆盖）→ 回答（覆盖映射值）→ 清洗派生 → 校验
// 纯函数：相同输入 → 相同预览，可重复执行
// ==========================================

use crate::domain::schema::{CATEGORIES, VALID_ROLES, VALID_STATUSES};
use crate::domain::{
    Answers, GapQuestion, PreviewReport, PreviewRow, RawRow, RecordType, RowErrors, TargetField,
    TargetSchema,
};
use crate::importer::conflict_handler::ConflictHandler;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::field_mapper::FieldMapping;
use std::collections::BTreeMap;
use tracing::info;

/// 追踪号最短长度（低于此长度仅警告）
const MIN_TRACKING_NUMBER_LEN: usize = 3;

pub struct DqValidator {
    cleaner: DataCleaner,
}

impl Default for DqValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl DqValidator {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 生成预览报告
    pub fn build_preview(
        &self,
        record_type: RecordType,
        rows: &[RawRow],
        mapping: &FieldMapping,
        questions: &[GapQuestion],
        answers: &Answers,
    ) -> PreviewReport {
        let mut preview_rows: Vec<PreviewRow> = rows
            .iter()
            .enumerate()
            .map(|(row_index, raw)| {
                let mut values = mapping.apply(raw);
                apply_answers(row_index, &mut values, questions, answers);
                self.cleaner.clean_row(record_type, &mut values);

                let mut row = PreviewRow {
                    row_index,
                    values,
                    errors: vec![],
                    warnings: vec![],
                };
                self.validate_row(record_type, &mut row);
                row
            })
            .collect();

        // 文件内主键重复：首次出现保留，后续行警告
        let key_field = ConflictHandler::key_field(record_type);
        for (row_index, key, first_row) in
            ConflictHandler.detect_duplicates(record_type, &preview_rows)
        {
            if let Some(row) = preview_rows.get_mut(row_index) {
                row.warnings.push(format!(
                    "Duplicate {} '{}' (first seen on row {})",
                    key_field, key, first_row
                ));
            }
        }

        let rows_with_errors: Vec<RowErrors> = preview_rows
            .iter()
            .filter(|r| !r.is_valid())
            .map(|r| RowErrors {
                row_number: r.row_number(),
                errors: r.errors.clone(),
            })
            .collect();

        let report = PreviewReport {
            record_type,
            rows: preview_rows,
            rows_with_errors,
            duplicate_mappings: mapping.duplicate_targets(),
        };

        info!(
            record_type = %record_type,
            total = report.rows.len(),
            invalid = report.invalid_count(),
            "预览生成完成"
        );
        report
    }

    /// 校验单行（错误与警告写回行内，先清空旧结果）
    pub fn validate_row(&self, record_type: RecordType, row: &mut PreviewRow) {
        let schema = TargetSchema::for_type(record_type);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for field in schema.required {
            let present = row.get(*field).map(|v| !v.trim().is_empty()).unwrap_or(false);
            if !present {
                errors.push(format!("Missing required field: {}", field));
            }
        }

        match record_type {
            RecordType::Users => {
                if let Some(email) = row.get(TargetField::Email) {
                    if !email.contains('@') {
                        errors.push(format!("Invalid email format: {}", email));
                    }
                }
                if let Some(role) = row.get(TargetField::Role) {
                    if !is_allowed(role, &VALID_ROLES) {
                        errors.push(format!("Invalid role: {}", role));
                    }
                }
                if let (Some(first), Some(last), Some(full)) = (
                    row.get(TargetField::FirstName),
                    row.get(TargetField::Surname),
                    row.get(TargetField::FullName),
                ) {
                    let expected = format!("{} {}", first, last);
                    if full != expected {
                        warnings.push(format!(
                            "full_name '{}' doesn't match '{}'",
                            full, expected
                        ));
                    }
                }
            }
            RecordType::Equipment => {
                if let Some(status) = row.get(TargetField::Status) {
                    if !is_allowed(status, &VALID_STATUSES) {
                        errors.push(format!("Invalid status: {}", status));
                    }
                }
                if let Some(category) = row.get(TargetField::Category) {
                    if !CATEGORIES.iter().any(|c| c.eq_ignore_ascii_case(category)) {
                        warnings.push(format!("Category '{}' not in standard list", category));
                    }
                }
                if let Some(tracking) = row.get(TargetField::TrackingNumber) {
                    if tracking.chars().count() < MIN_TRACKING_NUMBER_LEN {
                        warnings.push(format!(
                            "Tracking number '{}' seems too short",
                            tracking
                        ));
                    }
                }
            }
        }

        if let Some(department) = row.get(TargetField::Department) {
            if !schema
                .department_options()
                .iter()
                .any(|d| d.eq_ignore_ascii_case(department))
            {
                warnings.push(format!(
                    "Department '{}' not in standard list",
                    department
                ));
            }
        }

        row.errors = errors;
        row.warnings = warnings;
    }
}

fn is_allowed(value: &str, allowed: &[&str]) -> bool {
    let value = value.trim().to_lowercase();
    allowed.iter().any(|a| *a == value)
}

/// 回答覆盖映射值
///
/// - All: 所有行
/// - PerRow: 仅对应行索引
/// - AllWithOverrides: 对应行用覆盖值，其余行用统一值
/// - Info 类问题或空值忽略
fn apply_answers(
    row_index: usize,
    values: &mut BTreeMap<TargetField, String>,
    questions: &[GapQuestion],
    answers: &Answers,
) {
    for (question_idx, answer) in answers {
        let Some(field) = questions.get(*question_idx).and_then(|q| q.field) else {
            continue;
        };
        if let Some(v) = answer.value_for(row_index).filter(|v| !v.trim().is_empty()) {
            values.insert(field, v.to_string());
        }
    }
}
