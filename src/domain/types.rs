// ==========================================
// 设备预约系统 - 导入领域类型
// ==========================================
// 职责: 记录类型 / 目标字段 / 枚举值 / 向导步骤
// 红线: 纯类型定义，不含解析或校验逻辑
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// RecordType - 导入记录类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Users,
    Equipment,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Users => "users",
            RecordType::Equipment => "equipment",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "users" | "user" => Ok(RecordType::Users),
            "equipment" => Ok(RecordType::Equipment),
            other => Err(format!("未知记录类型: {}", other)),
        }
    }
}

// ==========================================
// TargetField - 目标字段（两套 schema 的并集）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    // ===== users =====
    Email,
    FullName,
    FirstName,
    Surname,
    StudentId,
    Phone,
    Role,

    // ===== 共用 =====
    Department,

    // ===== equipment =====
    ProductName,
    TrackingNumber,
    Category,
    Description,
    Status,
    Location,
    SerialNumber,
    PurchaseDate,
    Condition,
}

impl TargetField {
    pub const ALL: [TargetField; 17] = [
        TargetField::Email,
        TargetField::FullName,
        TargetField::FirstName,
        TargetField::Surname,
        TargetField::StudentId,
        TargetField::Phone,
        TargetField::Role,
        TargetField::Department,
        TargetField::ProductName,
        TargetField::TrackingNumber,
        TargetField::Category,
        TargetField::Description,
        TargetField::Status,
        TargetField::Location,
        TargetField::SerialNumber,
        TargetField::PurchaseDate,
        TargetField::Condition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::Email => "email",
            TargetField::FullName => "full_name",
            TargetField::FirstName => "first_name",
            TargetField::Surname => "surname",
            TargetField::StudentId => "student_id",
            TargetField::Phone => "phone",
            TargetField::Role => "role",
            TargetField::Department => "department",
            TargetField::ProductName => "product_name",
            TargetField::TrackingNumber => "tracking_number",
            TargetField::Category => "category",
            TargetField::Description => "description",
            TargetField::Status => "status",
            TargetField::Location => "location",
            TargetField::SerialNumber => "serial_number",
            TargetField::PurchaseDate => "purchase_date",
            TargetField::Condition => "condition",
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        TargetField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| format!("未知目标字段: {}", s))
    }
}

// ==========================================
// UserRole - 用户角色
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Staff,
    DepartmentAdmin,
    MasterAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Staff => "staff",
            UserRole::DepartmentAdmin => "department_admin",
            UserRole::MasterAdmin => "master_admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "staff" => Ok(UserRole::Staff),
            "department_admin" => Ok(UserRole::DepartmentAdmin),
            "master_admin" => Ok(UserRole::MasterAdmin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// ==========================================
// EquipmentStatus - 设备状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    Available,
    Booked,
    Maintenance,
    OutOfService,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Available => "available",
            EquipmentStatus::Booked => "booked",
            EquipmentStatus::Maintenance => "maintenance",
            EquipmentStatus::OutOfService => "out_of_service",
        }
    }
}

impl FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(EquipmentStatus::Available),
            "booked" => Ok(EquipmentStatus::Booked),
            "maintenance" => Ok(EquipmentStatus::Maintenance),
            "out_of_service" => Ok(EquipmentStatus::OutOfService),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

// ==========================================
// WizardStep - 导入向导步骤
// ==========================================
// 严格线性前进: Upload → Analyze → MapFields → Preview → Complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    Upload,
    Analyze,
    MapFields,
    Preview,
    Complete,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::Upload => "Upload",
            WizardStep::Analyze => "Analyze",
            WizardStep::MapFields => "MapFields",
            WizardStep::Preview => "Preview",
            WizardStep::Complete => "Complete",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
