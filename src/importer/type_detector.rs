// ==========================================
// 设备预约系统 - 启发式类型识别
// ==========================================
// 职责: 表头得分 + 样本取值信号 → 识别类型 / 置信度 / 建议映射
// 流程: 本地启发式 → （可选）外部分析服务修正 → 失败回退本地结果
// ==========================================

use crate::domain::{
    AnalysisResult, AnalysisSource, MappingTarget, RawRow, RecordType, TargetField, TargetSchema,
};
use crate::importer::analysis_service::{AnalysisRequest, RemoteAnalysis};
use crate::importer::importer_trait::AnalysisService;
use crate::importer::pattern_matcher::{match_header_for, suggest_field};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// 置信度上限
pub const MAX_CONFIDENCE: u8 = 95;

/// 取值信号加分
pub const VALUE_SIGNAL_BONUS: u32 = 5;

fn tracking_number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z]{2,4}[-\s]?\d{3,6}$").expect("tracking number pattern")
    })
}

/// 平局处理：得分严格更高才判为 users，平局归 equipment
pub fn resolve_tie(user_score: u32, equipment_score: u32) -> RecordType {
    if user_score > equipment_score {
        RecordType::Users
    } else {
        RecordType::Equipment
    }
}

/// min(95, round(max / (sum + 1) * 100))
pub fn confidence(user_score: u32, equipment_score: u32) -> u8 {
    let max = user_score.max(equipment_score) as f64;
    let total = (user_score + equipment_score + 1) as f64;
    let pct = (max / total * 100.0).round() as u32;
    pct.min(MAX_CONFIDENCE as u32) as u8
}

/// 按识别类型生成建议映射（每个表头首个命中字段）
pub fn suggest_mappings(
    headers: &[String],
    record_type: RecordType,
) -> BTreeMap<String, MappingTarget> {
    let mut mappings = BTreeMap::new();
    for header in headers {
        if mappings.contains_key(header) {
            continue;
        }
        if let Some(field) = suggest_field(header, record_type) {
            mappings.insert(header.clone(), MappingTarget::Field(field));
        }
    }
    mappings
}

// ==========================================
// TypeDetector
// ==========================================
pub struct TypeDetector;

impl TypeDetector {
    /// 纯本地启发式分析
    pub fn analyze_with_patterns(&self, headers: &[String], sample: &[RawRow]) -> AnalysisResult {
        let mut user_score = 0u32;
        let mut equipment_score = 0u32;

        for header in headers {
            user_score += match_header_for(header, RecordType::Users)
                .iter()
                .map(|m| m.weight)
                .sum::<u32>();
            equipment_score += match_header_for(header, RecordType::Equipment)
                .iter()
                .map(|m| m.weight)
                .sum::<u32>();
        }

        // 取值信号：命中数超过样本行数的一半
        if !sample.is_empty() {
            let threshold = sample.len() as f64 * 0.5;
            let values: Vec<&str> = sample
                .iter()
                .flat_map(|row| row.values.values().map(|v| v.as_str()))
                .filter(|v| !v.is_empty())
                .collect();

            let emails = values.iter().filter(|v| v.contains('@')).count();
            if emails as f64 > threshold {
                user_score += VALUE_SIGNAL_BONUS;
            }

            let pattern = tracking_number_pattern();
            let tracking = values.iter().filter(|v| pattern.is_match(v)).count();
            if tracking as f64 > threshold {
                equipment_score += VALUE_SIGNAL_BONUS;
            }
        }

        let detected_type = resolve_tie(user_score, equipment_score);
        let confidence = confidence(user_score, equipment_score);

        debug!(
            user_score,
            equipment_score,
            detected = %detected_type,
            confidence,
            "启发式识别完成"
        );

        AnalysisResult {
            detected_type,
            confidence,
            field_mappings: suggest_mappings(headers, detected_type),
            explanation: format!(
                "Detected {} based on column headers and data patterns. User indicators: {}, Equipment indicators: {}.",
                detected_type, user_score, equipment_score
            ),
            user_score,
            equipment_score,
            source: AnalysisSource::Heuristic,
        }
    }

    /// 启发式 + 外部分析服务
    ///
    /// 外部服务失败或响应不可用时原样返回启发式结果，不向上抛错
    pub async fn analyze(
        &self,
        headers: &[String],
        sample: &[RawRow],
        service: Option<&dyn AnalysisService>,
    ) -> AnalysisResult {
        let heuristic = self.analyze_with_patterns(headers, sample);

        let Some(service) = service else {
            return heuristic;
        };

        let request = AnalysisRequest {
            headers: headers.to_vec(),
            sample: sample.to_vec(),
        };

        match service.analyze(&request).await {
            Ok(remote) => {
                let merged = merge_remote(heuristic, remote, headers);
                info!(
                    detected = %merged.detected_type,
                    confidence = merged.confidence,
                    "外部分析服务结果已合并"
                );
                merged
            }
            Err(e) => {
                warn!(error = %e, "外部分析失败，使用启发式结果");
                heuristic
            }
        }
    }
}

/// 合并外部分析结果
///
/// 只接受表头存在、且目标字段属于最终 schema（或 skip）的映射
fn merge_remote(
    heuristic: AnalysisResult,
    remote: RemoteAnalysis,
    headers: &[String],
) -> AnalysisResult {
    let detected_type = remote
        .record_type
        .as_deref()
        .and_then(|t| t.parse::<RecordType>().ok())
        .unwrap_or(heuristic.detected_type);

    let confidence = remote
        .confidence
        .filter(|c| c.is_finite() && *c > 0.0)
        .map(|c| c.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(heuristic.confidence);

    let schema = TargetSchema::for_type(detected_type);
    let remote_mappings: BTreeMap<String, MappingTarget> = remote
        .mappings
        .unwrap_or_default()
        .into_iter()
        .filter(|(header, _)| headers.contains(header))
        .filter_map(|(header, target)| {
            let target = target.trim().to_lowercase();
            if target == "skip" {
                return Some((header, MappingTarget::Skip));
            }
            target
                .parse::<TargetField>()
                .ok()
                .filter(|f| schema.contains(*f))
                .map(|f| (header, MappingTarget::Field(f)))
        })
        .collect();

    // 类型被外部改判时，本地建议需按新类型重算
    let field_mappings = if !remote_mappings.is_empty() {
        remote_mappings
    } else if detected_type != heuristic.detected_type {
        suggest_mappings(headers, detected_type)
    } else {
        heuristic.field_mappings
    };

    let explanation = remote
        .explanation
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(heuristic.explanation);

    AnalysisResult {
        detected_type,
        confidence,
        field_mappings,
        explanation,
        user_score: heuristic.user_score,
        equipment_score: heuristic.equipment_score,
        source: AnalysisSource::Refined,
    }
}
