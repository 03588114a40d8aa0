//! 题目导出服务
//!
//! 流程：权限检查 → 取题（可按 ID 列表过滤）→ 反查标签显示名 →
//! 按格式序列化 → 递增 usage_count。计数在序列化成功后才递增，
//! 失败的导出不计使用。

use std::sync::Arc;

use tracing::info;

use crate::codecs::{self, ExportEntry, ExportFormat};
use crate::error::{AppError, AppResult};
use crate::models::Id;
use crate::services::TaxonomyService;
use crate::store::{BankStore, QuestionStore};

/// 导出产物
#[derive(Debug)]
pub struct ExportPayload {
    pub content: String,
    /// HTTP 响应用的 Content-Type
    pub content_type: &'static str,
    /// 建议的下载文件名（含扩展名）
    pub filename: String,
    /// 实际导出的题目数
    pub question_count: usize,
}

/// 题目导出服务
pub struct ExportService {
    banks: Arc<dyn BankStore>,
    questions: Arc<dyn QuestionStore>,
    taxonomy: Arc<TaxonomyService>,
}

impl ExportService {
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

    /// 导出题库（或其中指定的题目）
    ///
    /// # 参数
    /// - `ids`: 为 `Some` 时只导出列表里的题目，顺序按题库存储顺序；
    ///   不属于该题库的 ID 静默忽略
    pub async fn export(
        &self,
        user_id: &str,
        bank_id: &str,
        format: ExportFormat,
        ids: Option<&[Id]>,
    ) -> AppResult<ExportPayload> {
        let bank = self
            .banks
            .find_bank(bank_id)
            .await?
            .ok_or_else(|| AppError::not_found("bank", bank_id))?;
        if !bank.is_owned_by(user_id) {
            return Err(AppError::permission("só o dono do banco pode exportar"));
        }

        let mut selected = self.questions.list_questions_by_bank(bank_id).await?;
        if let Some(ids) = ids {
            selected.retain(|q| ids.contains(&q.id));
        }
        if selected.is_empty() {
            return Err(AppError::validation("não há questões para exportar"));
        }

        let mut entries = Vec::with_capacity(selected.len());
        for question in selected {
            let label_names = self.taxonomy.label_names(&question.labels).await?;
            let chapter_tag_names = self
                .taxonomy
                .chapter_tag_names(&question.chapter_tags)
                .await?;
            entries.push(ExportEntry {
                question,
                label_names,
                chapter_tag_names,
            });
        }

        let content = codecs::serialize(format, &entries, &bank.title);

        let exported_ids: Vec<Id> = entries.iter().map(|e| e.question.id.clone()).collect();
        self.questions.increment_usage(&exported_ids).await?;

        let filename = format!("{}.{}", bank.export_filename(), format.file_extension());
        info!(
            "✅ 导出完成: 题库 {}，{} 题，格式 {:?}",
            bank_id,
            exported_ids.len(),
            format
        );

        Ok(ExportPayload {
            content,
            content_type: format.content_type(),
            filename,
            question_count: exported_ids.len(),
        })
    }
}
