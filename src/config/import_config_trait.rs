// ==========================================
// 设备预约系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 导入后端模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// 本地 SQLite（演示模式）
    #[default]
    Local,
    /// 远程导入接口
    Remote,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Local => f.write_str("local"),
            ImportMode::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "demo" => Ok(ImportMode::Local),
            "remote" | "api" => Ok(ImportMode::Remote),
            other => Err(format!("未知导入模式: {}", other)),
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 类型识别使用的样本行数
    ///
    /// # 默认值
    /// - 10
    async fn get_sample_rows(&self) -> ImportResult<usize>;

    /// 导入后端模式
    ///
    /// # 默认值
    /// - Local
    async fn get_import_mode(&self) -> ImportResult<ImportMode>;

    /// 外部分析服务地址
    ///
    /// # 返回
    /// - None: 未配置，仅使用本地启发式
    async fn get_analysis_endpoint(&self) -> ImportResult<Option<String>>;

    /// 远程导入接口基础地址
    ///
    /// # 默认值
    /// - http://localhost:3000
    async fn get_api_base_url(&self) -> ImportResult<String>;
}
