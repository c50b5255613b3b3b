// ==========================================
// 设备预约系统 - 冲突处理器实现
// ==========================================
// 职责: 检测文件内重复主键 / 与已有数据重复的主键
// 主键: users → 小写邮箱；equipment → 追踪号
// 策略: 首次出现的行保留，后续行只给警告（后端会按已存在跳过）
// ==========================================

use crate::domain::{PreviewRow, RecordType, TargetField};
use std::collections::{HashMap, HashSet};

pub struct ConflictHandler;

impl ConflictHandler {
    pub fn key_field(record_type: RecordType) -> TargetField {
        match record_type {
            RecordType::Users => TargetField::Email,
            RecordType::Equipment => TargetField::TrackingNumber,
        }
    }

    /// 行的主键（已规范化），缺失返回 None
    pub fn natural_key(record_type: RecordType, row: &PreviewRow) -> Option<String> {
        let value = row.get(Self::key_field(record_type))?;
        let key = match record_type {
            RecordType::Users => value.trim().to_lowercase(),
            RecordType::Equipment => value.trim().to_string(),
        };
        (!key.is_empty()).then_some(key)
    }

    /// 检测文件内重复
    ///
    /// # 返回
    /// - Vec<(行索引, 主键, 首次出现的行号)>: 不包括第一次出现
    pub fn detect_duplicates(
        &self,
        record_type: RecordType,
        rows: &[PreviewRow],
    ) -> Vec<(usize, String, usize)> {
        let mut first_occurrence: HashMap<String, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for row in rows {
            let Some(key) = Self::natural_key(record_type, row) else {
                continue;
            };
            match first_occurrence.get(&key) {
                Some(first_row) => duplicates.push((row.row_index, key, *first_row)),
                None => {
                    first_occurrence.insert(key, row.row_number());
                }
            }
        }

        duplicates
    }

    /// 检测与已有数据重复的行
    ///
    /// # 参数
    /// - existing_keys: 存储中已存在的主键（已规范化）
    pub fn detect_existing(
        &self,
        record_type: RecordType,
        rows: &[PreviewRow],
        existing_keys: &HashSet<String>,
    ) -> Vec<(usize, String)> {
        rows.iter()
            .filter_map(|row| {
                Self::natural_key(record_type, row)
                    .filter(|key| existing_keys.contains(key))
                    .map(|key| (row.row_index, key))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(row_index: usize, field: TargetField, value: &str) -> PreviewRow {
        let mut values = BTreeMap::new();
        values.insert(field, value.to_string());
        PreviewRow {
            row_index,
            values,
            errors: vec![],
            warnings: vec![],
        }
    }

    #[test]
    fn test_detect_duplicates_none() {
        let rows = vec![
            row(0, TargetField::Email, "a@x.com"),
            row(1, TargetField::Email, "b@x.com"),
        ];
        assert!(ConflictHandler
            .detect_duplicates(RecordType::Users, &rows)
            .is_empty());
    }

    #[test]
    fn test_detect_duplicates_email_case_insensitive() {
        let rows = vec![
            row(0, TargetField::Email, "a@x.com"),
            row(1, TargetField::Email, "b@x.com"),
            row(2, TargetField::Email, "A@X.com"),
        ];
        let duplicates = ConflictHandler.detect_duplicates(RecordType::Users, &rows);
        assert_eq!(duplicates, vec![(2, "a@x.com".to_string(), 1)]);
    }

    #[test]
    fn test_detect_duplicates_tracking_number() {
        let rows = vec![
            row(0, TargetField::TrackingNumber, "CAM-001"),
            row(1, TargetField::TrackingNumber, "CAM-001"),
            row(2, TargetField::ProductName, "no key"),
        ];
        let duplicates = ConflictHandler.detect_duplicates(RecordType::Equipment, &rows);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].0, 1);
    }

    #[test]
    fn test_detect_existing() {
        let rows = vec![
            row(0, TargetField::TrackingNumber, "CAM-001"),
            row(1, TargetField::TrackingNumber, "CAM-002"),
        ];
        let existing: HashSet<String> = ["CAM-002".to_string()].into_iter().collect();
        let hits = ConflictHandler.detect_existing(RecordType::Equipment, &rows, &existing);
        assert_eq!(hits, vec![(1, "CAM-002".to_string())]);
    }
}
