// ==========================================
// 设备预约系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 校验违规/分析服务失败不走错误通道，只在本地处理
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件/文本相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.tsv/.txt/.xlsx/.xls）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("数据为空: 至少需要一行表头和一行数据")]
    EmptyInput,

    #[error("没有可分析的数据行")]
    NoRows,

    // ===== 向导状态错误 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("字段映射为空: 至少需要一列映射到目标字段")]
    EmptyMapping,

    #[error("问题不存在: index={0}")]
    UnknownQuestion(usize),

    #[error("该问题不可作答: index={0}")]
    QuestionNotAnswerable(usize),

    // ===== 导入执行错误 =====
    #[error("存在 {invalid_rows} 行校验错误，需确认仅导入有效行")]
    ConfirmationRequired { invalid_rows: usize },

    #[error("记录投影失败 (行 {row}): {message}")]
    ProjectionError { row: usize, message: String },

    #[error("分析服务调用失败: {0}")]
    AnalysisServiceError(String),

    #[error("导入接口调用失败: {0}")]
    TransportError(String),

    #[error("本地存储失败: {0}")]
    RepositoryError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigError { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<crate::repository::error::RepositoryError> for ImportError {
    fn from(err: crate::repository::error::RepositoryError) -> Self {
        ImportError::RepositoryError(err.to_string())
    }
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::TransportError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
