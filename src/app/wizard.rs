// ==========================================
// 设备预约系统 - 导入向导状态机
// ==========================================
// 步骤: Upload → Analyze → MapFields → Preview → Complete
// 规则:
// - 每个操作只在指定步骤可用，非法转换返回 InvalidStateTransition
// - back_to 只能回到更早的步骤，不丢弃数据；Complete 只能 reset
// - Preview 中的任何编辑都会作废预览并回到 MapFields
// - 重新加载数据会清空所有下游状态
// ==========================================

use crate::domain::{
    AnalysisResult, Answer, Answers, GapQuestion, ImportConfirmation, ImportSummary,
    MappingTarget, ParsedTable, PreviewReport, QuestionKind, RecordType, WizardStep,
};
use crate::importer::dq_validator::DqValidator;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapping;
use crate::importer::file_parser::{DelimitedTextParser, UniversalFileParser};
use crate::importer::gap_questions::{carry_over_answers, default_answers, generate_questions};
use crate::importer::import_executor::ImportExecutor;
use crate::importer::importer_trait::{AnalysisService, ImportBackend};
use crate::importer::type_detector::{suggest_mappings, TypeDetector};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_SAMPLE_ROWS: usize = 10;

// ==========================================
// ImportWizard
// ==========================================
pub struct ImportWizard {
    step: WizardStep,
    sample_rows: usize,

    // ===== Upload =====
    file_name: Option<String>,
    table: Option<ParsedTable>,

    // ===== Analyze =====
    analysis: Option<AnalysisResult>,

    // ===== MapFields =====
    record_type: Option<RecordType>,
    mapping: FieldMapping,
    questions: Vec<GapQuestion>,
    answers: Answers,

    // ===== Preview / Complete =====
    preview: Option<PreviewReport>,
    summary: Option<ImportSummary>,

    detector: TypeDetector,
    validator: DqValidator,
    executor: ImportExecutor,
}

impl Default for ImportWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportWizard {
    pub fn new() -> Self {
        Self::with_sample_rows(DEFAULT_SAMPLE_ROWS)
    }

    pub fn with_sample_rows(sample_rows: usize) -> Self {
        Self {
            step: WizardStep::Upload,
            sample_rows: sample_rows.max(1),
            file_name: None,
            table: None,
            analysis: None,
            record_type: None,
            mapping: FieldMapping::default(),
            questions: Vec::new(),
            answers: Answers::new(),
            preview: None,
            summary: None,
            detector: TypeDetector,
            validator: DqValidator::new(),
            executor: ImportExecutor,
        }
    }

    // ===== 只读访问 =====

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn table(&self) -> Option<&ParsedTable> {
        self.table.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn record_type(&self) -> Option<RecordType> {
        self.record_type
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn questions(&self) -> &[GapQuestion] {
        &self.questions
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn preview_report(&self) -> Option<&PreviewReport> {
        self.preview.as_ref()
    }

    pub fn summary(&self) -> Option<&ImportSummary> {
        self.summary.as_ref()
    }

    // ===== 守卫 =====

    fn guard(&self, allowed: &[WizardStep], to: WizardStep) -> ImportResult<()> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(ImportError::InvalidStateTransition {
                from: self.step.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn transition(&mut self, to: WizardStep) {
        debug!(from = %self.step, to = %to, "向导步骤切换");
        self.step = to;
    }

    fn clear_downstream(&mut self) {
        self.analysis = None;
        self.record_type = None;
        self.mapping = FieldMapping::default();
        self.questions.clear();
        self.answers.clear();
        self.preview = None;
        self.summary = None;
    }

    /// 作废已有预览；在 Preview 中编辑时回到 MapFields
    fn invalidate_preview(&mut self) {
        self.preview = None;
        if self.step == WizardStep::Preview {
            self.transition(WizardStep::MapFields);
        }
    }

    fn current_type(&self) -> ImportResult<RecordType> {
        self.record_type
            .ok_or_else(|| ImportError::InternalError("尚未识别记录类型".to_string()))
    }

    // ===== Upload =====

    /// 加载粘贴文本（仅 Upload）
    pub fn load_text(&mut self, text: &str) -> ImportResult<&ParsedTable> {
        self.guard(&[WizardStep::Upload], WizardStep::Upload)?;
        let table = DelimitedTextParser.parse_text(text)?;
        self.clear_downstream();
        self.file_name = None;
        Ok(self.table.insert(table))
    }

    /// 加载文件（仅 Upload）
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> ImportResult<&ParsedTable> {
        self.guard(&[WizardStep::Upload], WizardStep::Upload)?;
        let path = path.as_ref();
        let table = UniversalFileParser.parse(path)?;
        self.clear_downstream();
        self.file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        info!(
            file = ?self.file_name,
            rows = table.rows.len(),
            dropped = table.dropped_rows,
            "文件已加载"
        );
        Ok(self.table.insert(table))
    }

    // ===== Analyze =====

    /// Upload → Analyze
    ///
    /// 守卫: 已加载且至少一行数据
    pub async fn analyze(
        &mut self,
        service: Option<&dyn AnalysisService>,
    ) -> ImportResult<&AnalysisResult> {
        self.guard(&[WizardStep::Upload], WizardStep::Analyze)?;
        let table = self
            .table
            .as_ref()
            .filter(|t| !t.is_empty())
            .ok_or(ImportError::NoRows)?;

        let result = self
            .detector
            .analyze(&table.headers, table.sample(self.sample_rows), service)
            .await;

        let mapping = FieldMapping::from_analysis(&table.headers, &result);
        let questions = generate_questions(result.detected_type, &mapping);

        self.record_type = Some(result.detected_type);
        self.answers = default_answers(&questions);
        self.questions = questions;
        self.mapping = mapping;
        self.preview = None;
        self.summary = None;
        self.transition(WizardStep::Analyze);
        Ok(self.analysis.insert(result))
    }

    /// Analyze → MapFields
    pub fn confirm_analysis(&mut self) -> ImportResult<()> {
        self.guard(&[WizardStep::Analyze], WizardStep::MapFields)?;
        self.transition(WizardStep::MapFields);
        Ok(())
    }

    // ===== MapFields =====

    /// 编辑映射后回到 MapFields，重新生成问题并按字段迁移回答
    fn regenerate_questions(&mut self) -> ImportResult<()> {
        let record_type = self.current_type()?;
        let questions = generate_questions(record_type, &self.mapping);
        self.answers = carry_over_answers(&self.questions, &self.answers, &questions);
        self.questions = questions;
        self.invalidate_preview();
        Ok(())
    }

    pub fn set_mapping(&mut self, header: &str, target: MappingTarget) -> ImportResult<()> {
        self.guard(&[WizardStep::MapFields, WizardStep::Preview], WizardStep::MapFields)?;
        self.mapping.set_mapping(header, target);
        self.regenerate_questions()
    }

    /// 取消某列映射（回到未映射状态）
    pub fn clear_mapping(&mut self, header: &str) -> ImportResult<()> {
        self.guard(&[WizardStep::MapFields, WizardStep::Preview], WizardStep::MapFields)?;
        self.mapping.clear_mapping(header);
        self.regenerate_questions()
    }

    /// 人工改判记录类型：按新类型重新建议映射，问题与回答重置
    pub fn set_detected_type(&mut self, record_type: RecordType) -> ImportResult<()> {
        self.guard(&[WizardStep::MapFields, WizardStep::Preview], WizardStep::MapFields)?;
        let headers = self
            .table
            .as_ref()
            .map(|t| t.headers.clone())
            .unwrap_or_default();

        self.record_type = Some(record_type);
        self.mapping = FieldMapping::from_suggestions(&headers, &suggest_mappings(&headers, record_type));
        self.questions = generate_questions(record_type, &self.mapping);
        self.answers = default_answers(&self.questions);
        self.invalidate_preview();
        info!(record_type = %record_type, "记录类型已人工改判");
        Ok(())
    }

    fn answerable(&self, question_idx: usize) -> ImportResult<&GapQuestion> {
        let question = self
            .questions
            .get(question_idx)
            .ok_or(ImportError::UnknownQuestion(question_idx))?;
        if question.kind == QuestionKind::Info || question.field.is_none() {
            return Err(ImportError::QuestionNotAnswerable(question_idx));
        }
        Ok(question)
    }

    /// 统一回答（应用到所有行，替换此前的逐行覆盖）
    pub fn answer(&mut self, question_idx: usize, value: impl Into<String>) -> ImportResult<()> {
        self.guard(&[WizardStep::MapFields, WizardStep::Preview], WizardStep::MapFields)?;
        self.answerable(question_idx)?;
        self.answers.insert(question_idx, Answer::All(value.into()));
        self.invalidate_preview();
        Ok(())
    }

    /// 逐行回答（只覆盖指定行索引，已有统一值对其余行保持有效）
    pub fn answer_row(
        &mut self,
        question_idx: usize,
        row_index: usize,
        value: impl Into<String>,
    ) -> ImportResult<()> {
        self.guard(&[WizardStep::MapFields, WizardStep::Preview], WizardStep::MapFields)?;
        self.answerable(question_idx)?;

        let value = value.into();
        let answer = match self.answers.remove(&question_idx) {
            Some(existing) => existing.with_row(row_index, value),
            None => Answer::PerRow(BTreeMap::from([(row_index, value)])),
        };
        self.answers.insert(question_idx, answer);
        self.invalidate_preview();
        Ok(())
    }

    // ===== Preview =====

    /// MapFields | Preview → Preview
    ///
    /// 守卫: 至少一列映射到真实字段
    pub fn preview(&mut self) -> ImportResult<&PreviewReport> {
        self.guard(&[WizardStep::MapFields, WizardStep::Preview], WizardStep::Preview)?;
        if self.mapping.is_empty() {
            return Err(ImportError::EmptyMapping);
        }
        let record_type = self.current_type()?;
        let rows = self.table.as_ref().map(|t| t.rows.as_slice()).unwrap_or(&[]);

        let report = self.validator.build_preview(
            record_type,
            rows,
            &self.mapping,
            &self.questions,
            &self.answers,
        );
        self.transition(WizardStep::Preview);
        Ok(self.preview.insert(report))
    }

    // ===== Complete =====

    /// Preview → Complete；失败时停留在 Preview
    pub async fn import<F>(
        &mut self,
        backend: &dyn ImportBackend,
        confirmation: ImportConfirmation,
        progress: F,
    ) -> ImportResult<ImportSummary>
    where
        F: FnMut(u8) + Send,
    {
        self.guard(&[WizardStep::Preview], WizardStep::Complete)?;
        let report = self
            .preview
            .as_ref()
            .ok_or_else(|| ImportError::InternalError("预览结果缺失".to_string()))?;

        let summary = self
            .executor
            .execute(backend, report, confirmation, progress)
            .await?;

        self.summary = Some(summary);
        self.transition(WizardStep::Complete);
        Ok(summary)
    }

    // ===== 导航 =====

    /// 回到更早的步骤，数据保留
    ///
    /// Complete 为终态，只能通过 reset 离开
    pub fn back_to(&mut self, step: WizardStep) -> ImportResult<()> {
        if step >= self.step || self.step == WizardStep::Complete {
            return Err(ImportError::InvalidStateTransition {
                from: self.step.to_string(),
                to: step.to_string(),
            });
        }
        self.transition(step);
        Ok(())
    }

    /// 回到 Upload 并清空全部状态
    pub fn reset(&mut self) {
        self.clear_downstream();
        self.table = None;
        self.file_name = None;
        self.transition(WizardStep::Upload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TargetField;

    const USERS_CSV: &str = "first_name,surname,email,department,role\nAda,Lovelace,ada@uni.ac.uk,Fine Art,student\n";

    #[tokio::test]
    async fn test_happy_path_steps() {
        let mut wizard = ImportWizard::new();
        wizard.load_text(USERS_CSV).unwrap();
        assert_eq!(wizard.step(), WizardStep::Upload);

        let analysis = wizard.analyze(None).await.unwrap();
        assert_eq!(analysis.detected_type, RecordType::Users);
        assert_eq!(wizard.step(), WizardStep::Analyze);

        wizard.confirm_analysis().unwrap();
        assert_eq!(wizard.step(), WizardStep::MapFields);
        assert!(wizard.questions().is_empty());

        let report = wizard.preview().unwrap();
        assert_eq!(report.invalid_count(), 0);
        assert_eq!(report.rows[0].get(TargetField::FullName), Some("Ada Lovelace"));
        assert_eq!(wizard.step(), WizardStep::Preview);
    }

    #[tokio::test]
    async fn test_illegal_transitions() {
        let mut wizard = ImportWizard::new();
        assert!(matches!(
            wizard.preview(),
            Err(ImportError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            wizard.confirm_analysis(),
            Err(ImportError::InvalidStateTransition { .. })
        ));
        assert!(matches!(wizard.analyze(None).await, Err(ImportError::NoRows)));

        wizard.load_text(USERS_CSV).unwrap();
        wizard.analyze(None).await.unwrap();
        // Analyze 步骤不能再次加载数据
        assert!(matches!(
            wizard.load_text(USERS_CSV),
            Err(ImportError::InvalidStateTransition { .. })
        ));
        // 不能前进到相同或更晚的步骤
        assert!(wizard.back_to(WizardStep::Preview).is_err());
        assert!(wizard.back_to(WizardStep::Analyze).is_err());
    }

    #[tokio::test]
    async fn test_empty_mapping_guard() {
        let mut wizard = ImportWizard::new();
        wizard.load_text("colour,size\nred,XL\n").unwrap();
        wizard.analyze(None).await.unwrap();
        wizard.confirm_analysis().unwrap();
        assert!(matches!(wizard.preview(), Err(ImportError::EmptyMapping)));
        assert_eq!(wizard.step(), WizardStep::MapFields);
    }

    #[tokio::test]
    async fn test_back_to_keeps_data_and_reset_clears() {
        let mut wizard = ImportWizard::new();
        wizard.load_text(USERS_CSV).unwrap();
        wizard.analyze(None).await.unwrap();
        wizard.confirm_analysis().unwrap();
        wizard.preview().unwrap();

        wizard.back_to(WizardStep::MapFields).unwrap();
        assert!(wizard.preview_report().is_some());
        assert!(wizard.analysis().is_some());

        wizard.reset();
        assert_eq!(wizard.step(), WizardStep::Upload);
        assert!(wizard.table().is_none());
        assert!(wizard.analysis().is_none());
    }

    #[tokio::test]
    async fn test_answers_and_mapping_edits() {
        let mut wizard = ImportWizard::new();
        wizard
            .load_text("name,email\nAda Lovelace,ada@uni.ac.uk\nAlan Turing,alan@uni.ac.uk\n")
            .unwrap();
        wizard.analyze(None).await.unwrap();
        wizard.confirm_analysis().unwrap();

        // department + role（role 默认 student）
        assert_eq!(wizard.questions().len(), 2);
        assert_eq!(wizard.answers().get(&1), Some(&Answer::All("student".to_string())));
        assert!(matches!(wizard.answer(9, "x"), Err(ImportError::UnknownQuestion(9))));

        wizard.answer(0, "Illustration").unwrap();
        wizard.answer_row(1, 1, "staff").unwrap();
        let report = wizard.preview().unwrap();
        // 逐行覆盖只改第二行，第一行仍用默认 student
        assert!(report.rows[0].is_valid());
        assert_eq!(report.rows[0].get(TargetField::Role), Some("student"));
        assert!(report.rows[1].is_valid());
        assert_eq!(report.rows[1].get(TargetField::Role), Some("staff"));

        // 预览后修改映射会回到 MapFields
        wizard.set_mapping("email", MappingTarget::Skip).unwrap();
        assert_eq!(wizard.step(), WizardStep::MapFields);
        assert_eq!(wizard.questions()[0].field, Some(TargetField::Email));
        // department 回答随字段迁移
        assert_eq!(
            wizard.answers().get(&1),
            Some(&Answer::All("Illustration".to_string()))
        );
    }

    #[tokio::test]
    async fn test_clear_mapping_raises_question() {
        let mut wizard = ImportWizard::new();
        wizard.load_text(USERS_CSV).unwrap();
        wizard.analyze(None).await.unwrap();
        wizard.confirm_analysis().unwrap();

        wizard.clear_mapping("department").unwrap();
        assert_eq!(wizard.mapping().get("department"), None);
        assert_eq!(wizard.questions().len(), 1);
        assert_eq!(wizard.questions()[0].field, Some(TargetField::Department));
    }

    #[tokio::test]
    async fn test_set_detected_type_resuggests_mapping() {
        let mut wizard = ImportWizard::new();
        wizard.load_text(USERS_CSV).unwrap();
        wizard.analyze(None).await.unwrap();
        wizard.confirm_analysis().unwrap();

        wizard.set_detected_type(RecordType::Equipment).unwrap();
        assert_eq!(wizard.record_type(), Some(RecordType::Equipment));
        assert_eq!(
            wizard.mapping().get("department"),
            Some(MappingTarget::Field(TargetField::Department))
        );
        assert!(wizard
            .questions()
            .iter()
            .any(|q| q.field == Some(TargetField::TrackingNumber)));
    }
}
