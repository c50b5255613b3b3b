// ==========================================
// 设备预约系统 - 字段映射器
// ==========================================
// 职责: 源表头 → 目标字段 | skip 的可编辑映射
// 规则: 按表头顺序应用，同一目标被多列映射时最右一列生效（并报告）
// ==========================================

use crate::domain::{AnalysisResult, MappingTarget, RawRow, TargetField};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// 源表头顺序
    headers: Vec<String>,
    targets: BTreeMap<String, MappingTarget>,
}

impl FieldMapping {
    /// 空映射（所有表头未映射）
    pub fn new(headers: &[String]) -> Self {
        Self {
            headers: headers.to_vec(),
            targets: BTreeMap::new(),
        }
    }

    /// 以分析结果的建议映射初始化
    pub fn from_suggestions(headers: &[String], suggestions: &BTreeMap<String, MappingTarget>) -> Self {
        let mut mapping = Self::new(headers);
        for (header, target) in suggestions {
            if headers.contains(header) {
                mapping.targets.insert(header.clone(), *target);
            }
        }
        mapping
    }

    pub fn from_analysis(headers: &[String], analysis: &AnalysisResult) -> Self {
        Self::from_suggestions(headers, &analysis.field_mappings)
    }

    /// 覆盖某列映射，不做校验
    pub fn set_mapping(&mut self, header: &str, target: MappingTarget) {
        if !self.headers.iter().any(|h| h == header) {
            self.headers.push(header.to_string());
        }
        self.targets.insert(header.to_string(), target);
    }

    /// 取消某列映射
    pub fn clear_mapping(&mut self, header: &str) {
        self.targets.remove(header);
    }

    pub fn get(&self, header: &str) -> Option<MappingTarget> {
        self.targets.get(header).copied()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 按表头顺序迭代（表头, 目标字段），跳过 skip 与未映射
    pub fn field_pairs(&self) -> impl Iterator<Item = (&str, TargetField)> + '_ {
        self.headers.iter().filter_map(move |h| {
            self.targets
                .get(h)
                .and_then(|t| t.field())
                .map(|f| (h.as_str(), f))
        })
    }

    pub fn mapped_fields(&self) -> BTreeSet<TargetField> {
        self.field_pairs().map(|(_, f)| f).collect()
    }

    pub fn is_mapped(&self, field: TargetField) -> bool {
        self.field_pairs().any(|(_, f)| f == field)
    }

    /// 没有任何表头映射到真实字段
    pub fn is_empty(&self) -> bool {
        self.field_pairs().next().is_none()
    }

    /// 被多个表头映射的目标字段
    pub fn duplicate_targets(&self) -> Vec<TargetField> {
        let mut counts: BTreeMap<TargetField, usize> = BTreeMap::new();
        for (_, field) in self.field_pairs() {
            *counts.entry(field).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(f, _)| f)
            .collect()
    }

    /// 将原始行投影到目标字段（空值由清洗阶段移除）
    pub fn apply(&self, row: &RawRow) -> BTreeMap<TargetField, String> {
        let mut values = BTreeMap::new();
        for (header, field) in self.field_pairs() {
            if let Some(value) = row.get(header) {
                values.insert(field, value.to_string());
            }
        }
        values
    }

    /// 导出为 表头 → 目标 的有序列表（展示用）
    pub fn entries(&self) -> Vec<(String, Option<MappingTarget>)> {
        self.headers
            .iter()
            .map(|h| (h.clone(), self.targets.get(h).copied()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_mapping_overwrites() {
        let mut mapping = FieldMapping::new(&headers(&["a", "b"]));
        mapping.set_mapping("a", MappingTarget::Field(TargetField::Email));
        mapping.set_mapping("a", MappingTarget::Skip);
        assert_eq!(mapping.get("a"), Some(MappingTarget::Skip));
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_duplicate_target_last_header_wins() {
        let mut mapping = FieldMapping::new(&headers(&["work_email", "home_email"]));
        mapping.set_mapping("work_email", MappingTarget::Field(TargetField::Email));
        mapping.set_mapping("home_email", MappingTarget::Field(TargetField::Email));

        let row: RawRow = [("work_email", "w@x.com"), ("home_email", "h@x.com")]
            .into_iter()
            .collect();
        let values = mapping.apply(&row);

        assert_eq!(values.get(&TargetField::Email).map(String::as_str), Some("h@x.com"));
        assert_eq!(mapping.duplicate_targets(), vec![TargetField::Email]);
    }

    #[test]
    fn test_from_suggestions_ignores_unknown_headers() {
        let mut suggestions = BTreeMap::new();
        suggestions.insert("email".to_string(), MappingTarget::Field(TargetField::Email));
        suggestions.insert("ghost".to_string(), MappingTarget::Field(TargetField::Role));

        let mapping = FieldMapping::from_suggestions(&headers(&["email", "x"]), &suggestions);
        assert_eq!(mapping.mapped_fields().len(), 1);
        assert!(mapping.is_mapped(TargetField::Email));
        assert_eq!(mapping.get("ghost"), None);
    }
}
