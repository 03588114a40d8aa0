//! 题目导入服务
//!
//! 流程：解析原始文本 → 草稿逐个落成规范题目（校验失败的并入
//! 跳过计数）→ 标签名解析成引用 → 批量持久化。整批零个有效题目
//! 才算失败。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::codecs::{self, ExportFormat};
use crate::error::{AppError, AppResult};
use crate::models::{Question, QuestionDraft, QuestionSource, QuestionType};
use crate::services::TaxonomyService;
use crate::store::{BankStore, QuestionStore};

/// 一次导入的结果
#[derive(Debug)]
pub struct ImportReport {
    /// 已持久化的题目
    pub questions: Vec<Question>,
    /// 跳过的块数（解析失败 + 校验失败）
    pub skipped_count: usize,
}

/// 题目导入服务
pub struct ImportService {
    banks: Arc<dyn BankStore>,
    questions: Arc<dyn QuestionStore>,
    taxonomy: Arc<TaxonomyService>,
}

impl ImportService {
    pub fn new(
        banks: Arc<dyn BankStore>,
        questions: Arc<dyn QuestionStore>,
        taxonomy: Arc<TaxonomyService>,
    ) -> Self {
        Self {
            banks,
            questions,
            taxonomy,
        }
    }

    /// 导入一批题目到指定题库
    ///
    /// # 参数
    /// - `user_id`: 调用者（必须是题库拥有者）
    /// - `bank_id`: 目标题库
    /// - `format`: gift / aiken / moodle
    /// - `raw`: 原始文件内容
    pub async fn import(
        &self,
        user_id: &str,
        bank_id: &str,
        format: ExportFormat,
        raw: &str,
    ) -> AppResult<ImportReport> {
        let bank = self
            .banks
            .find_bank(bank_id)
            .await?
            .ok_or_else(|| AppError::not_found("bank", bank_id))?;
        if !bank.is_owned_by(user_id) {
            return Err(AppError::permission("só o dono do banco pode importar"));
        }

        let outcome = codecs::parse(format, raw);
        let mut skipped = outcome.skipped_count;
        let mut questions = Vec::new();

        for draft in outcome.drafts {
            match self.materialize(user_id, bank_id, draft).await? {
                Some(question) => questions.push(question),
                None => skipped += 1,
            }
        }

        if questions.is_empty() {
            return Err(AppError::validation(
                "nenhuma questão válida encontrada no ficheiro",
            ));
        }

        let questions = self.questions.insert_questions(questions).await?;
        info!(
            "✅ 导入完成: 题库 {}，入库 {} 题，跳过 {} 块",
            bank_id,
            questions.len(),
            skipped
        );

        Ok(ImportReport {
            questions,
            skipped_count: skipped,
        })
    }

    /// 把草稿落成规范题目；校验不过返回 None
    async fn materialize(
        &self,
        user_id: &str,
        bank_id: &str,
        draft: QuestionDraft,
    ) -> AppResult<Option<Question>> {
        let question_type = draft.question_type.unwrap_or(QuestionType::MultipleChoice);
        let labels = self
            .taxonomy
            .resolve_label_ids(user_id, &draft.labels)
            .await?;
        let chapter_tags = self
            .taxonomy
            .resolve_chapter_tag_ids(user_id, &draft.chapter_tags)
            .await?;

        let now = Utc::now();
        let question = Question {
            id: crate::models::new_id(),
            bank_id: bank_id.to_string(),
            question_type,
            stem: draft.stem.trim().to_string(),
            options: draft.options,
            acceptable_answers: draft.acceptable_answers,
            difficulty: draft.difficulty.unwrap_or(2),
            usage_count: 0,
            labels,
            chapter_tags,
            source: QuestionSource::Imported,
            created_by: user_id.to_string(),
            explanation: draft.explanation,
            feedback_correct: None,
            feedback_incorrect: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = question.validate_for_persistence() {
            warn!("导入的题目未通过校验，跳过: {}", e);
            return Ok(None);
        }
        Ok(Some(question))
    }
}
