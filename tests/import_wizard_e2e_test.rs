// ==========================================
// 端到端集成测试 - 导入向导完整流程
// ==========================================
// 测试目标: 上传 → 分析 → 映射 → 预览 → 导入（本地 SQLite 后端）
// 覆盖范围: ImportWizard + TypeDetector + DqValidator + ImportExecutor + LocalImportBackend
// ==========================================


use async_trait::async_trait;
use booking_import::domain::{
    AnalysisSource, Answer, ImportConfirmation, MappingTarget, QuestionKind, RecordType,
    TargetField, WizardStep,
};
use booking_import::importer::{
    AnalysisRequest, AnalysisService, ImportBackend, ImportError, ImportResult,
    LocalImportBackend, RemoteAnalysis, SubmitMode,
};
use booking_import::logging;
use booking_import::repository::ImportedRecordRepository;
use booking_import::ImportWizard;
use std::collections::HashMap;

// ==========================================
// 测试辅助
// ==========================================

/// 加载文本并推进到 MapFields
async fn wizard_at_map_fields(text: &str) -> ImportWizard {
    let mut wizard = ImportWizard::new();
    wizard.load_text(text).expect("加载失败");
    wizard.analyze(None).await.expect("分析失败");
    wizard.confirm_analysis().expect("确认失败");
    wizard
}

fn question_index(wizard: &ImportWizard, field: TargetField) -> usize {
    wizard
        .questions()
        .iter()
        .position(|q| q.field == Some(field))
        .unwrap_or_else(|| panic!("缺少 {} 问题", field))
}

struct FailingAnalysis;

#[async_trait]
impl AnalysisService for FailingAnalysis {
    async fn analyze(&self, _request: &AnalysisRequest) -> ImportResult<RemoteAnalysis> {
        Err(ImportError::AnalysisServiceError("connection refused".to_string()))
    }
}

struct EquipmentAnalysis;

#[async_trait]
impl AnalysisService for EquipmentAnalysis {
    async fn analyze(&self, request: &AnalysisRequest) -> ImportResult<RemoteAnalysis> {
        assert!(!request.sample.is_empty());
        let mut mappings = HashMap::new();
        mappings.insert("Label".to_string(), "product_name".to_string());
        mappings.insert("Code".to_string(), "tracking_number".to_string());
        // 不存在的表头会被丢弃
        mappings.insert("Ghost".to_string(), "category".to_string());
        Ok(RemoteAnalysis {
            record_type: Some("equipment".to_string()),
            confidence: Some(88.0),
            mappings: Some(mappings),
            missing: vec!["department".to_string()],
            explanation: Some("Looks like an equipment inventory.".to_string()),
        })
    }
}

struct RejectingBackend;

#[async_trait]
impl ImportBackend for RejectingBackend {
    fn submit_mode(&self) -> SubmitMode {
        SubmitMode::Batch
    }

    async fn submit_batch(
        &self,
        _record_type: RecordType,
        _records: &[booking_import::domain::ImportRecord],
    ) -> ImportResult<booking_import::domain::ImportSummary> {
        Err(ImportError::TransportError("Import failed: 503".to_string()))
    }
}

// ==========================================
// 场景 1: 字段齐全的用户 CSV
// ==========================================

#[tokio::test]
async fn test_clean_users_csv_imports_one_row() {
    logging::init_test();

    let (_db, repo) = test_helpers::create_test_repo().expect("创建仓储失败");
    let mut wizard = ImportWizard::new();
    wizard
        .load_text(
            "first_name,surname,email,department,role\nJohn,Doe,john@x.com,Illustration,student\n",
        )
        .unwrap();

    let analysis = wizard.analyze(None).await.unwrap();
    assert_eq!(analysis.detected_type, RecordType::Users);
    assert_eq!(analysis.source, AnalysisSource::Heuristic);

    wizard.confirm_analysis().unwrap();
    for header in ["first_name", "surname", "email", "department", "role"] {
        assert!(wizard.mapping().get(header).is_some(), "{} 未映射", header);
    }

    let report = wizard.preview().unwrap();
    assert_eq!(report.invalid_count(), 0);
    assert_eq!(report.rows[0].get(TargetField::FullName), Some("John Doe"));

    let backend = LocalImportBackend::new(repo.clone()).with_file_name("users.csv");
    let mut ticks = Vec::new();
    let summary = wizard
        .import(&backend, ImportConfirmation::AllOrNothing, |p| ticks.push(p))
        .await
        .unwrap();

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.total, 1);
    assert_eq!(ticks, vec![100]);
    assert_eq!(wizard.step(), WizardStep::Complete);
    assert_eq!(repo.count(RecordType::Users).await.unwrap(), 1);

    let batches = repo.list_batches(5).await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].imported_rows, 1);
}

// ==========================================
// 场景 2: 缺少院系列
// ==========================================

#[tokio::test]
async fn test_missing_department_question_and_error() {
    let mut wizard =
        wizard_at_map_fields("first_name,surname,email,role\nJohn,Doe,john@x.com,student\n").await;

    let idx = question_index(&wizard, TargetField::Department);
    let question = &wizard.questions()[idx];
    assert_eq!(question.kind, QuestionKind::Select);
    assert!(question.options.contains(&"Illustration".to_string()));
    assert!(!question.options.contains(&"Shared".to_string()));

    // 不作答直接预览
    let report = wizard.preview().unwrap();
    assert_eq!(
        report.rows[0].errors,
        vec!["Missing required field: department".to_string()]
    );

    // 作答后错误消失
    wizard.answer(idx, "Illustration").unwrap();
    let report = wizard.preview().unwrap();
    assert_eq!(report.invalid_count(), 0);
    assert_eq!(report.rows[0].get(TargetField::Department), Some("Illustration"));
}

// ==========================================
// 场景 3: 邮箱格式错误
// ==========================================

#[tokio::test]
async fn test_invalid_email_excluded_from_import() {
    let (_db, repo) = test_helpers::create_test_repo().unwrap();
    let mut wizard = wizard_at_map_fields(
        "first_name,surname,email,department,role\n\
         John,Doe,john@x.com,Illustration,student\n\
         Jane,Roe,not-an-email,Illustration,student\n",
    )
    .await;

    let report = wizard.preview().unwrap();
    assert_eq!(report.rows_with_errors.len(), 1);
    assert_eq!(report.rows_with_errors[0].row_number, 2);
    assert!(report.rows_with_errors[0]
        .errors
        .iter()
        .any(|e| e.contains("Invalid email format")));

    let backend = LocalImportBackend::new(repo.clone());

    // 未确认 → 拒绝，停留在 Preview
    let err = wizard
        .import(&backend, ImportConfirmation::AllOrNothing, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::ConfirmationRequired { invalid_rows: 1 }));
    assert_eq!(wizard.step(), WizardStep::Preview);
    assert_eq!(repo.count(RecordType::Users).await.unwrap(), 0);

    // 确认仅导入有效行
    let summary = wizard
        .import(&backend, ImportConfirmation::ValidRowsOnly, |_| {})
        .await
        .unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.total, 2);
    assert!(!repo.exists(RecordType::Users, "not-an-email").await.unwrap());
}

// ==========================================
// 场景 4: 仅 name / email 两列
// ==========================================

#[tokio::test]
async fn test_name_email_detected_as_users() {
    let mut wizard = ImportWizard::new();
    wizard
        .load_text("name,email\nJohn Doe,john@x.com\nJane Roe,jane@x.com\n")
        .unwrap();
    let analysis = wizard.analyze(None).await.unwrap();
    assert_eq!(analysis.detected_type, RecordType::Users);
    assert!(analysis.confidence > 50, "confidence={}", analysis.confidence);
    assert!(analysis.confidence <= 95);
}

// ==========================================
// 场景 5: 平局归设备
// ==========================================

#[tokio::test]
async fn test_unrecognised_headers_tie_to_equipment() {
    let mut wizard = ImportWizard::new();
    wizard.load_text("colour,size\nred,XL\n").unwrap();
    let analysis = wizard.analyze(None).await.unwrap();
    assert_eq!(analysis.detected_type, RecordType::Equipment);
    assert_eq!(analysis.confidence, 0);
}

// ==========================================
// 场景 6: 设备导入 + 已存在主键跳过
// ==========================================

#[tokio::test]
async fn test_equipment_import_skips_existing_tracking_numbers() {
    let (_db, repo) = test_helpers::create_test_repo().unwrap();

    for expected_imported in [3, 0] {
        let mut wizard = wizard_at_map_fields(test_helpers::CLEAN_EQUIPMENT_CSV).await;
        assert_eq!(wizard.record_type(), Some(RecordType::Equipment));
        assert!(wizard.questions().is_empty());

        let report = wizard.preview().unwrap();
        assert_eq!(report.invalid_count(), 0);

        let backend = LocalImportBackend::new(repo.clone());
        let mut ticks = Vec::new();
        let summary = wizard
            .import(&backend, ImportConfirmation::AllOrNothing, |p| ticks.push(p))
            .await
            .unwrap();
        assert_eq!(ticks, vec![33, 67, 100]);
        assert_eq!(summary.imported, expected_imported);
        assert_eq!(summary.skipped, 3 - expected_imported);
    }
    assert_eq!(repo.count(RecordType::Equipment).await.unwrap(), 3);
}

// ==========================================
// 场景 7: 统一回答覆盖所有行
// ==========================================

#[tokio::test]
async fn test_apply_to_all_sets_every_row() {
    let mut wizard = wizard_at_map_fields(
        "Item,Asset ID,Category\nTripod A,TRI-001,Tripod\nTripod B,TRI-002,Tripod\nTripod C,TRI-003,Tripod\n",
    )
    .await;

    let dept = question_index(&wizard, TargetField::Department);
    assert!(wizard.questions()[dept].apply_to_all);
    wizard.answer(dept, "Shared").unwrap();

    // status 默认 available
    let status = question_index(&wizard, TargetField::Status);
    assert_eq!(
        wizard.answers().get(&status),
        Some(&Answer::All("available".to_string()))
    );

    let report = wizard.preview().unwrap();
    assert_eq!(report.rows.len(), 3);
    for row in &report.rows {
        assert_eq!(row.get(TargetField::Department), Some("Shared"));
        assert_eq!(row.get(TargetField::Status), Some("available"));
        assert!(row.is_valid(), "{:?}", row.errors);
    }
}

// ==========================================
// 场景 8: 外部分析服务
// ==========================================

#[tokio::test]
async fn test_analysis_service_failure_falls_back() {
    let mut wizard = ImportWizard::new();
    wizard.load_text(test_helpers::CLEAN_USERS_CSV).unwrap();
    let analysis = wizard.analyze(Some(&FailingAnalysis)).await.unwrap();
    assert_eq!(analysis.detected_type, RecordType::Users);
    assert_eq!(analysis.source, AnalysisSource::Heuristic);
    assert_eq!(wizard.step(), WizardStep::Analyze);
}

#[tokio::test]
async fn test_analysis_service_refines_result() {
    let mut wizard = ImportWizard::new();
    wizard.load_text("Label,Code\nCanon EOS,CAM-001\n").unwrap();
    let analysis = wizard.analyze(Some(&EquipmentAnalysis)).await.unwrap();
    assert_eq!(analysis.detected_type, RecordType::Equipment);
    assert_eq!(analysis.confidence, 88);
    assert_eq!(analysis.source, AnalysisSource::Refined);
    assert!(!analysis.field_mappings.contains_key("Ghost"));

    wizard.confirm_analysis().unwrap();
    assert_eq!(
        wizard.mapping().get("Code"),
        Some(MappingTarget::Field(TargetField::TrackingNumber))
    );
}

// ==========================================
// 场景 9: 传输失败停留在 Preview
// ==========================================

#[tokio::test]
async fn test_transport_failure_keeps_preview_step() {
    let mut wizard = wizard_at_map_fields(test_helpers::CLEAN_USERS_CSV).await;
    wizard.preview().unwrap();

    let err = wizard
        .import(&RejectingBackend, ImportConfirmation::AllOrNothing, |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "导入接口调用失败: Import failed: 503");
    assert_eq!(wizard.step(), WizardStep::Preview);
    assert!(wizard.summary().is_none());
    assert!(wizard.preview_report().is_some());
}

// ==========================================
// 场景 10: 向导守卫与回退
// ==========================================

#[tokio::test]
async fn test_wizard_guards_and_navigation() {
    let mut wizard = ImportWizard::new();

    // 未加载数据
    assert!(matches!(wizard.analyze(None).await, Err(ImportError::NoRows)));
    // 仅有表头的文本在解析阶段即被拒绝
    assert!(matches!(wizard.load_text("email,name\n"), Err(ImportError::EmptyInput)));

    wizard.load_text(test_helpers::CLEAN_USERS_CSV).unwrap();
    wizard.analyze(None).await.unwrap();
    assert!(matches!(
        wizard.preview(),
        Err(ImportError::InvalidStateTransition { .. })
    ));
    wizard.confirm_analysis().unwrap();
    wizard.preview().unwrap();

    // 回到 MapFields 修改映射，回答与映射保留
    wizard.back_to(WizardStep::MapFields).unwrap();
    wizard.set_mapping("role", MappingTarget::Skip).unwrap();
    let role = question_index(&wizard, TargetField::Role);
    wizard.answer(role, "staff").unwrap();
    let report = wizard.preview().unwrap();
    assert_eq!(report.rows[0].get(TargetField::Role), Some("staff"));

    // Info 问题不可作答
    wizard.back_to(WizardStep::MapFields).unwrap();
    wizard.set_mapping("email", MappingTarget::Skip).unwrap();
    wizard.set_mapping("first_name", MappingTarget::Skip).unwrap();
    let info = wizard
        .questions()
        .iter()
        .position(|q| q.kind == QuestionKind::Info)
        .expect("缺少提示问题");
    assert!(wizard.questions()[info].critical);
    assert!(matches!(
        wizard.answer(info, "x"),
        Err(ImportError::QuestionNotAnswerable(_))
    ));

    wizard.reset();
    assert_eq!(wizard.step(), WizardStep::Upload);
    assert!(wizard.questions().is_empty());
}

// ==========================================
// 预览后编辑回答 / 终态
// ==========================================

#[tokio::test]
async fn test_row_override_keeps_apply_to_all_value() {
    let mut wizard = wizard_at_map_fields(
        "name,email\nAda Lovelace,ada@uni.ac.uk\nAlan Turing,alan@uni.ac.uk\n",
    )
    .await;
    let department = question_index(&wizard, TargetField::Department);
    let role = question_index(&wizard, TargetField::Role);

    wizard.answer(department, "Fine Art").unwrap();
    wizard.answer(role, "staff").unwrap();
    wizard.answer_row(role, 0, "department_admin").unwrap();
    assert_eq!(
        wizard.answers().get(&role).and_then(|a| a.value_for(1)),
        Some("staff")
    );

    let report = wizard.preview().unwrap();
    assert_eq!(report.invalid_count(), 0);
    assert_eq!(report.rows[0].get(TargetField::Role), Some("department_admin"));
    assert_eq!(report.rows[1].get(TargetField::Role), Some("staff"));
}

#[tokio::test]
async fn test_answer_in_preview_requires_new_preview() {
    let (_db, repo) = test_helpers::create_test_repo().expect("创建仓储失败");
    let backend = LocalImportBackend::new(repo.clone());

    let mut wizard = wizard_at_map_fields("name,email\nAda Lovelace,ada@uni.ac.uk\n").await;
    let department = question_index(&wizard, TargetField::Department);
    let role = question_index(&wizard, TargetField::Role);
    wizard.answer(department, "Fine Art").unwrap();
    wizard.preview().unwrap();

    // 统一回答: 预览作废，回到 MapFields，导入被守卫拒绝
    wizard.answer(department, "Illustration").unwrap();
    assert_eq!(wizard.step(), WizardStep::MapFields);
    assert!(wizard.preview_report().is_none());
    assert!(matches!(
        wizard
            .import(&backend, ImportConfirmation::AllOrNothing, |_| {})
            .await,
        Err(ImportError::InvalidStateTransition { .. })
    ));

    // 逐行回答同理
    wizard.preview().unwrap();
    wizard.answer_row(role, 0, "staff").unwrap();
    assert_eq!(wizard.step(), WizardStep::MapFields);
    assert!(wizard.preview_report().is_none());

    let report = wizard.preview().unwrap();
    assert_eq!(report.rows[0].get(TargetField::Department), Some("Illustration"));
    assert_eq!(report.rows[0].get(TargetField::Role), Some("staff"));

    let summary = wizard
        .import(&backend, ImportConfirmation::AllOrNothing, |_| {})
        .await
        .unwrap();
    assert_eq!(summary.imported, 1);
}

#[tokio::test]
async fn test_complete_only_leaves_through_reset() {
    let (_db, repo) = test_helpers::create_test_repo().expect("创建仓储失败");
    let backend = LocalImportBackend::new(repo.clone());

    let mut wizard = wizard_at_map_fields(test_helpers::CLEAN_USERS_CSV).await;
    wizard.preview().unwrap();
    wizard
        .import(&backend, ImportConfirmation::AllOrNothing, |_| {})
        .await
        .unwrap();
    assert_eq!(wizard.step(), WizardStep::Complete);

    for step in [WizardStep::Preview, WizardStep::MapFields, WizardStep::Upload] {
        assert!(matches!(
            wizard.back_to(step),
            Err(ImportError::InvalidStateTransition { .. })
        ));
    }
    assert!(wizard
        .import(&backend, ImportConfirmation::AllOrNothing, |_| {})
        .await
        .is_err());
    assert_eq!(repo.count(RecordType::Users).await.unwrap(), 1);
    assert_eq!(repo.list_batches(5).await.unwrap().len(), 1);

    wizard.reset();
    assert_eq!(wizard.step(), WizardStep::Upload);
    assert!(wizard.summary().is_none());
}
