// ==========================================
// 设备预约系统 - 缺失字段提问生成
// ==========================================
// 职责: 按 schema 必填字段顺序，为每个未映射的必填字段生成一个问题
// 纯函数：相同 (类型, 映射) → 相同问题列表
// ==========================================

use crate::domain::schema::{ASSIGNABLE_ROLES, CATEGORIES, DEFAULT_STATUS_OPTIONS};
use crate::domain::{Answer, Answers, GapQuestion, QuestionKind, RecordType, TargetField, TargetSchema};
use crate::importer::field_mapper::FieldMapping;
use tracing::debug;

fn select(
    text: &str,
    field: TargetField,
    options: Vec<String>,
    default_value: Option<&str>,
    hint: Option<&str>,
) -> GapQuestion {
    GapQuestion {
        text: text.to_string(),
        field: Some(field),
        kind: QuestionKind::Select,
        options,
        default_value: default_value.map(str::to_string),
        apply_to_all: true,
        hint: hint.map(str::to_string),
        critical: false,
    }
}

/// 逐行填写的文本问题（标识类字段）
fn per_row_text(field: TargetField, text: &str) -> GapQuestion {
    GapQuestion {
        text: text.to_string(),
        field: Some(field),
        kind: QuestionKind::Text,
        options: vec![],
        default_value: None,
        apply_to_all: false,
        hint: Some("Enter a value for each row in the preview.".to_string()),
        critical: false,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// full_name 已映射，或可由 first_name + surname 派生
pub fn full_name_covered(mapping: &FieldMapping) -> bool {
    mapping.is_mapped(TargetField::FullName)
        || (mapping.is_mapped(TargetField::FirstName) && mapping.is_mapped(TargetField::Surname))
}

fn is_covered(record_type: RecordType, field: TargetField, mapping: &FieldMapping) -> bool {
    match (record_type, field) {
        (RecordType::Users, TargetField::FullName) => full_name_covered(mapping),
        _ => mapping.is_mapped(field),
    }
}

/// 生成缺失字段问题
pub fn generate_questions(record_type: RecordType, mapping: &FieldMapping) -> Vec<GapQuestion> {
    let schema = TargetSchema::for_type(record_type);
    let mut questions = Vec::new();

    match record_type {
        RecordType::Users => {
            let email_missing = !is_covered(record_type, TargetField::Email, mapping);
            let name_missing = !is_covered(record_type, TargetField::FullName, mapping);

            for field in schema.required {
                if is_covered(record_type, *field, mapping) {
                    continue;
                }
                match field {
                    TargetField::Email | TargetField::FullName if email_missing && name_missing => {
                        // 两者都缺只提示一次
                        if *field == TargetField::Email {
                            questions.push(GapQuestion {
                                text: "Could not detect email or name columns. Please ensure your file has these columns and re-upload.".to_string(),
                                field: None,
                                kind: QuestionKind::Info,
                                options: vec![],
                                default_value: None,
                                apply_to_all: false,
                                hint: None,
                                critical: true,
                            });
                        }
                    }
                    TargetField::Email => questions.push(per_row_text(
                        TargetField::Email,
                        "No email column was detected. Enter an email address for each user.",
                    )),
                    TargetField::FullName => questions.push(per_row_text(
                        TargetField::FullName,
                        "No name column was detected. Enter a full name for each user.",
                    )),
                    TargetField::Department => questions.push(select(
                        "No department column was detected. What department should these users be assigned to?",
                        TargetField::Department,
                        schema.department_options(),
                        None,
                        Some("This will be applied to all imported users."),
                    )),
                    TargetField::Role => questions.push(select(
                        "No role column was detected. What role should these users have?",
                        TargetField::Role,
                        strings(&ASSIGNABLE_ROLES),
                        Some("student"),
                        Some("Default: student. Select \"staff\" for faculty members."),
                    )),
                    _ => {}
                }
            }
        }
        RecordType::Equipment => {
            for field in schema.required {
                if mapping.is_mapped(*field) {
                    continue;
                }
                match field {
                    TargetField::ProductName => questions.push(per_row_text(
                        TargetField::ProductName,
                        "No product name column was detected. Enter a name for each item.",
                    )),
                    TargetField::TrackingNumber => questions.push(per_row_text(
                        TargetField::TrackingNumber,
                        "No tracking number column was detected. Enter a tracking number for each item.",
                    )),
                    TargetField::Department => questions.push(select(
                        "No department column was detected. Which department owns this equipment?",
                        TargetField::Department,
                        schema.department_options(),
                        None,
                        None,
                    )),
                    TargetField::Category => questions.push(select(
                        "No category column was detected. What category is this equipment?",
                        TargetField::Category,
                        strings(&CATEGORIES),
                        None,
                        None,
                    )),
                    _ => {}
                }
            }

            // 可选字段 status：缺列时询问默认值
            if !mapping.is_mapped(TargetField::Status) {
                questions.push(select(
                    "No status column was detected. What should be the default status?",
                    TargetField::Status,
                    strings(&DEFAULT_STATUS_OPTIONS),
                    Some("available"),
                    None,
                ));
            }
        }
    }

    debug!(record_type = %record_type, count = questions.len(), "生成缺失字段问题");
    questions
}

/// 带默认值的问题预填回答
pub fn default_answers(questions: &[GapQuestion]) -> Answers {
    questions
        .iter()
        .enumerate()
        .filter_map(|(idx, q)| {
            q.default_value
                .as_ref()
                .map(|v| (idx, Answer::All(v.clone())))
        })
        .collect()
}

/// 映射变化后重新生成问题：按目标字段把旧回答迁移到新问题索引，
/// 新出现的问题使用默认值
pub fn carry_over_answers(
    old_questions: &[GapQuestion],
    old_answers: &Answers,
    new_questions: &[GapQuestion],
) -> Answers {
    let mut answers = default_answers(new_questions);
    for (new_idx, question) in new_questions.iter().enumerate() {
        let Some(field) = question.field else {
            continue;
        };
        let previous = old_questions
            .iter()
            .position(|q| q.field == Some(field))
            .and_then(|old_idx| old_answers.get(&old_idx));
        if let Some(answer) = previous {
            answers.insert(new_idx, answer.clone());
        }
    }
    answers
}
