// ==========================================
// 设备预约系统 - 表头模式匹配
// ==========================================
// 职责: 表头 → 候选目标字段（users / equipment 两套规则表）
// 纯函数，无副作用；无命中即无候选
// ==========================================

use crate::domain::{RecordType, TargetField};
use regex::Regex;
use std::sync::OnceLock;

/// 主标识字段权重（email / full_name / tracking_number / product_name）
pub const PRIMARY_WEIGHT: u32 = 3;
pub const SECONDARY_WEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    pub record_type: RecordType,
    pub field: TargetField,
    pub weight: u32,
}

struct FieldPatterns {
    field: TargetField,
    patterns: Vec<Regex>,
}

/// 规则表顺序即建议优先级：first_name / surname 排在 full_name 之前，
/// 避免被宽泛的 `name` 吞掉
const USER_RULES: &[(TargetField, &[&str])] = &[
    (
        TargetField::Email,
        &[r"email", r"e-?mail", r"mail", r"student.*email"],
    ),
    (
        TargetField::FirstName,
        &[r"first.?name", r"given.?name", r"forename"],
    ),
    (
        TargetField::Surname,
        &[r"surname", r"last.?name", r"family.?name"],
    ),
    (
        TargetField::FullName,
        &[r"full.?name", r"name", r"student.?name", r"display.?name"],
    ),
    (
        TargetField::StudentId,
        &[r"student.?id", r"id.?number", r"student.?number", r"enrollment"],
    ),
    (
        TargetField::Department,
        &[r"department", r"dept", r"course", r"program", r"faculty"],
    ),
    (
        TargetField::Role,
        &[r"role", r"type", r"user.?type", r"account.?type"],
    ),
    (TargetField::Phone, &[r"phone", r"mobile", r"contact", r"tel"]),
];

const EQUIPMENT_RULES: &[(TargetField, &[&str])] = &[
    (
        TargetField::TrackingNumber,
        &[r"tracking", r"track.?id", r"asset.?id", r"barcode", r"inventory"],
    ),
    (
        TargetField::SerialNumber,
        &[r"serial", r"serial.?number", r"\bsn\b", r"s/n"],
    ),
    (
        TargetField::ProductName,
        &[
            r"product.?name",
            r"name",
            r"item",
            r"equipment",
            r"title",
            r"model",
        ],
    ),
    (
        TargetField::Department,
        &[r"department", r"dept", r"location", r"assigned"],
    ),
    (TargetField::Category, &[r"category", r"type", r"kind", r"class"]),
    (
        TargetField::Description,
        &[r"description", r"desc", r"notes", r"details"],
    ),
    (
        TargetField::Status,
        &[r"status", r"state", r"condition", r"availability"],
    ),
    (
        TargetField::Location,
        &[r"location", r"room", r"building", r"storage"],
    ),
    (
        TargetField::PurchaseDate,
        &[r"purchase.?date", r"bought", r"acquired", r"date"],
    ),
];

fn compile(rules: &[(TargetField, &[&str])]) -> Vec<FieldPatterns> {
    rules
        .iter()
        .map(|(field, sources)| FieldPatterns {
            field: *field,
            patterns: sources
                .iter()
                .filter_map(|src| Regex::new(&format!("(?i){}", src)).ok())
                .collect(),
        })
        .collect()
}

fn rules_for(record_type: RecordType) -> &'static [FieldPatterns] {
    static USERS: OnceLock<Vec<FieldPatterns>> = OnceLock::new();
    static EQUIPMENT: OnceLock<Vec<FieldPatterns>> = OnceLock::new();

    match record_type {
        RecordType::Users => USERS.get_or_init(|| compile(USER_RULES)),
        RecordType::Equipment => EQUIPMENT.get_or_init(|| compile(EQUIPMENT_RULES)),
    }
}

/// 字段权重
pub fn field_weight(field: TargetField) -> u32 {
    match field {
        TargetField::Email
        | TargetField::FullName
        | TargetField::TrackingNumber
        | TargetField::ProductName => PRIMARY_WEIGHT,
        _ => SECONDARY_WEIGHT,
    }
}

/// 单个表头在某个 schema 下命中的所有字段（规则表顺序）
pub fn match_header_for(header: &str, record_type: RecordType) -> Vec<PatternMatch> {
    rules_for(record_type)
        .iter()
        .filter(|rule| rule.patterns.iter().any(|p| p.is_match(header)))
        .map(|rule| PatternMatch {
            record_type,
            field: rule.field,
            weight: field_weight(rule.field),
        })
        .collect()
}

/// 单个表头在两套 schema 下的全部命中
pub fn match_header(header: &str) -> Vec<PatternMatch> {
    let mut matches = match_header_for(header, RecordType::Users);
    matches.extend(match_header_for(header, RecordType::Equipment));
    matches
}

/// 建议映射：该 schema 下首个命中的字段
pub fn suggest_field(header: &str, record_type: RecordType) -> Option<TargetField> {
    rules_for(record_type)
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| p.is_match(header)))
        .map(|rule| rule.field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_user_fields() {
        assert_eq!(suggest_field("Email Address", RecordType::Users), Some(TargetField::Email));
        assert_eq!(suggest_field("first_name", RecordType::Users), Some(TargetField::FirstName));
        assert_eq!(suggest_field("Surname", RecordType::Users), Some(TargetField::Surname));
        assert_eq!(suggest_field("name", RecordType::Users), Some(TargetField::FullName));
        assert_eq!(suggest_field("Course", RecordType::Users), Some(TargetField::Department));
        assert_eq!(suggest_field("colour", RecordType::Users), None);
    }

    #[test]
    fn test_suggest_equipment_fields() {
        assert_eq!(
            suggest_field("Asset ID", RecordType::Equipment),
            Some(TargetField::TrackingNumber)
        );
        assert_eq!(
            suggest_field("S/N", RecordType::Equipment),
            Some(TargetField::SerialNumber)
        );
        assert_eq!(
            suggest_field("Item", RecordType::Equipment),
            Some(TargetField::ProductName)
        );
        // location 先命中 department（院系归属）
        assert_eq!(
            suggest_field("Location", RecordType::Equipment),
            Some(TargetField::Department)
        );
    }

    #[test]
    fn test_match_header_weights() {
        let matches = match_header("email");
        assert!(matches.iter().any(|m| m.record_type == RecordType::Users
            && m.field == TargetField::Email
            && m.weight == PRIMARY_WEIGHT));
        assert!(matches.iter().all(|m| m.record_type == RecordType::Users));

        // first_name 同时命中 first_name(1) 与 full_name(3)
        let users: u32 = match_header_for("first_name", RecordType::Users)
            .iter()
            .map(|m| m.weight)
            .sum();
        assert_eq!(users, 4);
    }

    #[test]
    fn test_surname_is_not_serial_number() {
        assert!(match_header_for("surname", RecordType::Equipment)
            .iter()
            .all(|m| m.field != TargetField::SerialNumber));
    }
}
