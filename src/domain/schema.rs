// ==========================================
// 设备预约系统 - 目标 Schema 定义
// ==========================================
// 职责: users / equipment 两套目标 schema（必填/可选字段 + 枚举值表）
// 静态定义，只读
// ==========================================

use crate::domain::types::{RecordType, TargetField};

/// 标准院系列表
pub const DEPARTMENTS: [&str; 5] = [
    "Moving Image Design",
    "Graphic Design",
    "Illustration",
    "Fine Art",
    "Product Design",
];

/// 设备可归属共享院系
pub const SHARED_DEPARTMENT: &str = "Shared";

pub const VALID_ROLES: [&str; 4] = ["student", "staff", "department_admin", "master_admin"];

/// 缺列时可供选择的角色（不含 master_admin）
pub const ASSIGNABLE_ROLES: [&str; 3] = ["student", "staff", "department_admin"];

pub const VALID_STATUSES: [&str; 4] = ["available", "booked", "maintenance", "out_of_service"];

/// 缺列时可供选择的默认状态
pub const DEFAULT_STATUS_OPTIONS: [&str; 3] = ["available", "maintenance", "out_of_service"];

pub const CATEGORIES: [&str; 8] = [
    "Camera",
    "Lens",
    "Lighting",
    "Audio",
    "Tripod",
    "Accessory",
    "Computer",
    "Other",
];

// ==========================================
// TargetSchema
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct TargetSchema {
    pub record_type: RecordType,
    /// 必填字段（有序）
    pub required: &'static [TargetField],
    /// 可选字段（与必填不相交）
    pub optional: &'static [TargetField],
}

static USERS_SCHEMA: TargetSchema = TargetSchema {
    record_type: RecordType::Users,
    required: &[
        TargetField::Email,
        TargetField::FullName,
        TargetField::Department,
        TargetField::Role,
    ],
    optional: &[
        TargetField::FirstName,
        TargetField::Surname,
        TargetField::StudentId,
        TargetField::Phone,
    ],
};

static EQUIPMENT_SCHEMA: TargetSchema = TargetSchema {
    record_type: RecordType::Equipment,
    required: &[
        TargetField::ProductName,
        TargetField::TrackingNumber,
        TargetField::Department,
        TargetField::Category,
    ],
    optional: &[
        TargetField::Description,
        TargetField::Status,
        TargetField::Location,
        TargetField::SerialNumber,
        TargetField::PurchaseDate,
        TargetField::Condition,
    ],
};

impl TargetSchema {
    pub fn for_type(record_type: RecordType) -> &'static TargetSchema {
        match record_type {
            RecordType::Users => &USERS_SCHEMA,
            RecordType::Equipment => &EQUIPMENT_SCHEMA,
        }
    }

    /// 字段是否属于该 schema（必填或可选）
    pub fn contains(&self, field: TargetField) -> bool {
        self.required.contains(&field) || self.optional.contains(&field)
    }

    /// 院系标准列表（设备额外允许 Shared）
    pub fn department_options(&self) -> Vec<String> {
        let mut options: Vec<String> = DEPARTMENTS.iter().map(|d| d.to_string()).collect();
        if self.record_type == RecordType::Equipment {
            options.push(SHARED_DEPARTMENT.to_string());
        }
        options
    }
}
