// ==========================================
// 设备预约系统 - 数据清洗器实现
// ==========================================
// 职责: NULL 标准化（含 TRIM）、全名派生、日期标准化
// 调用时机: 映射 + 回答应用之后、校验之前
// ==========================================

use crate::domain::{RecordType, TargetField};
use crate::importer::importer_trait::DataCleaner as DataCleanerTrait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn derive_full_name(&self, first_name: Option<&str>, surname: Option<&str>) -> Option<String> {
        let first = first_name.map(str::trim).filter(|s| !s.is_empty())?;
        let last = surname.map(str::trim).filter(|s| !s.is_empty())?;
        Some(format!("{} {}", first, last))
    }
}

impl DataCleaner {
    /// 购置日期统一为 YYYY-MM-DD；无法识别的格式原样保留
    pub fn clean_purchase_date(&self, value: &str) -> String {
        const FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d", "%d.%m.%Y"];
        let trimmed = value.trim();
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// 清洗一行目标字段值（原地）
    ///
    /// - 全部 TRIM，空值移除（大小写保留，由校验/投影不区分大小写处理）
    /// - users: full_name 为空时由 first_name + surname 派生
    pub fn clean_row(&self, record_type: RecordType, values: &mut BTreeMap<TargetField, String>) {
        let fields: Vec<TargetField> = values.keys().copied().collect();
        for field in fields {
            let raw = values.remove(&field);
            let cleaned = self
                .normalize_null(raw)
                .map(|v| {
                    if field == TargetField::PurchaseDate {
                        self.clean_purchase_date(&v)
                    } else {
                        v
                    }
                });
            if let Some(v) = cleaned {
                values.insert(field, v);
            }
        }

        if record_type == RecordType::Users && !values.contains_key(&TargetField::FullName) {
            let derived = self.derive_full_name(
                values.get(&TargetField::FirstName).map(String::as_str),
                values.get(&TargetField::Surname).map(String::as_str),
            );
            if let Some(full_name) = derived {
                values.insert(TargetField::FullName, full_name);
            }
        }
    }
}
