// ==========================================
// 设备预约系统 - 强类型导入记录
// ==========================================
// 用途: 预览行（无错误）→ 按识别类型投影为强类型记录
// 对齐: users / equipment 导入接口的行结构
// ==========================================

use crate::domain::import::PreviewRow;
use crate::domain::types::{EquipmentStatus, RecordType, TargetField, UserRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub full_name: String,
    pub department: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub product_name: String,
    pub tracking_number: String,
    pub department: String,
    pub category: String,
    pub status: EquipmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportRecord {
    User(UserRecord),
    Equipment(EquipmentRecord),
}

impl ImportRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            ImportRecord::User(_) => RecordType::Users,
            ImportRecord::Equipment(_) => RecordType::Equipment,
        }
    }

    /// 主键（users: 小写邮箱；equipment: 追踪号）
    pub fn natural_key(&self) -> String {
        match self {
            ImportRecord::User(u) => u.email.to_lowercase(),
            ImportRecord::Equipment(e) => e.tracking_number.clone(),
        }
    }

    /// 将预览行投影为强类型记录
    ///
    /// # 返回
    /// - Err(String): 必填缺失或枚举值非法（正常情况下预览校验已拦截）
    pub fn project(record_type: RecordType, row: &PreviewRow) -> Result<Self, String> {
        match record_type {
            RecordType::Users => {
                let role_raw = require(row, TargetField::Role)?;
                Ok(ImportRecord::User(UserRecord {
                    email: require(row, TargetField::Email)?.to_lowercase(),
                    full_name: require(row, TargetField::FullName)?,
                    department: require(row, TargetField::Department)?,
                    role: role_raw.parse()?,
                    first_name: optional(row, TargetField::FirstName),
                    surname: optional(row, TargetField::Surname),
                    student_id: optional(row, TargetField::StudentId),
                    phone: optional(row, TargetField::Phone),
                }))
            }
            RecordType::Equipment => {
                let status = match optional(row, TargetField::Status) {
                    Some(s) => s.parse()?,
                    None => EquipmentStatus::default(),
                };
                Ok(ImportRecord::Equipment(EquipmentRecord {
                    product_name: require(row, TargetField::ProductName)?,
                    tracking_number: require(row, TargetField::TrackingNumber)?,
                    department: require(row, TargetField::Department)?,
                    category: require(row, TargetField::Category)?,
                    status,
                    description: optional(row, TargetField::Description),
                    location: optional(row, TargetField::Location),
                    serial_number: optional(row, TargetField::SerialNumber),
                    purchase_date: optional(row, TargetField::PurchaseDate),
                    condition: optional(row, TargetField::Condition),
                }))
            }
        }
    }
}

fn optional(row: &PreviewRow, field: TargetField) -> Option<String> {
    row.get(field)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn require(row: &PreviewRow, field: TargetField) -> Result<String, String> {
    optional(row, field).ok_or_else(|| format!("Missing required field: {}", field))
}
