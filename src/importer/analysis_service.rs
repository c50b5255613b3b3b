// ==========================================
// 设备预约系统 - 外部分析服务
// ==========================================
// 职责: 构造分析提示词 / 从自由文本中抽取 JSON 结果 / HTTP 调用
// 约定: 任何失败都由 TypeDetector 回退到启发式结果
// ==========================================

use crate::domain::RawRow;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// 提示词中使用的样本行数
pub const PROMPT_SAMPLE_ROWS: usize = 3;

pub const SYSTEM_PROMPT: &str =
    "You are a data analysis assistant that helps identify CSV data types and field mappings.";

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub headers: Vec<String>,
    pub sample: Vec<RawRow>,
}

/// 外部服务返回的分析结果（字段全部可缺省）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteAnalysis {
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub mappings: Option<HashMap<String, String>>,
    #[serde(default)]
    pub missing: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// 构造分析提示词
pub fn build_analysis_prompt(request: &AnalysisRequest) -> String {
    let sample = request
        .sample
        .iter()
        .take(PROMPT_SAMPLE_ROWS)
        .map(|row| {
            request
                .headers
                .iter()
                .map(|h| {
                    let value = row.get(h).filter(|v| !v.is_empty()).unwrap_or("empty");
                    format!("{}: {}", h, value)
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze this CSV data and determine if it contains USERS or EQUIPMENT.

COLUMNS: {columns}

SAMPLE DATA:
{sample}

Respond in JSON format:
{{
  "type": "users" or "equipment",
  "confidence": 0-100,
  "mappings": {{"column_name": "field_name"}},
  "missing": ["list of required fields not found"],
  "explanation": "brief explanation"
}}

For USERS, required fields are: email, full_name, department, role
For EQUIPMENT, required fields are: product_name, tracking_number, department, category"#,
        columns = request.headers.join(", "),
        sample = sample,
    )
}

fn json_object_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("json object pattern"))
}

/// 从自由文本中抽取第一个 `{` 到最后一个 `}` 之间的 JSON
///
/// 抽取或反序列化失败返回 None
pub fn parse_ai_response(text: &str) -> Option<RemoteAnalysis> {
    let matched = json_object_pattern().find(text)?;
    match serde_json::from_str::<RemoteAnalysis>(matched.as_str()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(error = %e, "分析响应 JSON 解析失败");
            None
        }
    }
}

// ==========================================
// HttpAnalysisService - 聊天接口实现
// ==========================================
#[cfg(feature = "remote")]
mod http {
    use super::*;
    use crate::importer::error::{ImportError, ImportResult};
    use crate::importer::importer_trait::AnalysisService;
    use async_trait::async_trait;
    use reqwest::Client;
    use tracing::info;

    #[derive(Debug, Serialize)]
    struct ChatMessage<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Debug, Serialize)]
    struct ChatRequest<'a> {
        messages: Vec<ChatMessage<'a>>,
        stream: bool,
    }

    #[derive(Debug, Deserialize)]
    struct ChatResponse {
        #[serde(default)]
        message: Option<String>,
    }

    /// POST {endpoint}，请求体 `{messages, stream: false}`，响应 `{message}`
    #[derive(Debug, Clone)]
    pub struct HttpAnalysisService {
        client: Client,
        endpoint: String,
    }

    impl HttpAnalysisService {
        pub fn new(endpoint: impl Into<String>) -> Self {
            let endpoint = endpoint.into();
            info!(endpoint = %endpoint, "初始化外部分析服务");
            Self {
                client: Client::new(),
                endpoint,
            }
        }
    }

    #[async_trait]
    impl AnalysisService for HttpAnalysisService {
        async fn analyze(&self, request: &AnalysisRequest) -> ImportResult<RemoteAnalysis> {
            let prompt = build_analysis_prompt(request);
            let body = ChatRequest {
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: SYSTEM_PROMPT,
                    },
                    ChatMessage {
                        role: "user",
                        content: &prompt,
                    },
                ],
                stream: false,
            };

            let response = self.client.post(&self.endpoint).json(&body).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ImportError::AnalysisServiceError(format!(
                    "HTTP {}",
                    status.as_u16()
                )));
            }

            let chat: ChatResponse = response.json().await?;
            let message = chat
                .message
                .ok_or_else(|| ImportError::AnalysisServiceError("响应缺少 message".to_string()))?;

            parse_ai_response(&message).ok_or_else(|| {
                ImportError::AnalysisServiceError("响应中没有可解析的 JSON".to_string())
            })
        }
    }
}

#[cfg(feature = "remote")]
pub use http::HttpAnalysisService;
