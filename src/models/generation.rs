//! AI 生成批次模型
//!
//! 一次生成请求的持久化记录：挂起的建议题目、审批后创建的题目引用，
//! 以及 PENDING → APPLIED / REJECTED 的终态状态机。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Id, QuestionDraft, QuestionType};

/// 生成批次状态
///
/// PENDING 是唯一的非终态；一旦离开就不再回来。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    /// 建议已保存，等待人工决定
    Pending,
    /// 部分或全部建议已转为持久化题目（终态）
    Applied,
    /// 全部建议被显式拒绝（终态）
    Rejected,
}

/// 生成请求参数（持久化在批次记录里，便于追溯）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub num_questions: usize,
    pub types: Vec<QuestionType>,
    pub difficulties: Vec<u8>,
    pub language: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            num_questions: 5,
            types: vec![QuestionType::MultipleChoice],
            difficulties: vec![2],
            language: "pt-PT".to_string(),
        }
    }
}

/// AI 生成批次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiGeneration {
    pub id: Id,
    pub user: Id,
    /// 目标题库
    pub bank: Id,
    /// 发给 AI 的请求描述（topic 或 content 摘要）
    pub prompt: String,
    pub params: GenerationParams,
    /// AI 建议的题目草稿（尚未持久化）
    pub suggested_questions: Vec<QuestionDraft>,
    /// 审批通过后创建的题目 ID
    #[serde(default)]
    pub question_ids: Vec<Id>,
    pub status: GenerationStatus,
    /// 实际使用的模型（含降级后的选择）
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AiGeneration {
    pub fn new_pending(
        user: impl Into<Id>,
        bank: impl Into<Id>,
        prompt: impl Into<String>,
        params: GenerationParams,
        suggested_questions: Vec<QuestionDraft>,
        model: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::models::new_id(),
            user: user.into(),
            bank: bank.into(),
            prompt: prompt.into(),
            params,
            suggested_questions,
            question_ids: Vec::new(),
            status: GenerationStatus::Pending,
            model: model.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
