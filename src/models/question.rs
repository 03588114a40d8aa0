//! 题目模型
//!
//! 系统内所有组件共享的规范题目表示。导入、AI 生成、手工录入
//! 三条路径都先归一化成这里的结构再持久化。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};
use crate::models::Id;

/// 难度等级显示名（1-4）
pub static DIFFICULTY_LABELS: phf::Map<u8, &'static str> = phf::phf_map! {
    1u8 => "Básico",
    2u8 => "Normal",
    3u8 => "Difícil",
    4u8 => "Muito Difícil",
};

/// 题目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Open,
}

impl QuestionType {
    /// 该类型是否依赖选项列表
    pub fn requires_options(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }

    /// 提示词里使用的类型描述
    pub fn prompt_label(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "escolha múltipla (4 opções, apenas 1 correta)",
            QuestionType::TrueFalse => "verdadeiro ou falso",
            QuestionType::ShortAnswer => "resposta curta",
            QuestionType::Open => "resposta aberta/desenvolvimento",
        }
    }

    /// 从外部字符串解析类型（大小写不敏感）
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "MULTIPLE_CHOICE" => Some(QuestionType::MultipleChoice),
            "TRUE_FALSE" => Some(QuestionType::TrueFalse),
            "SHORT_ANSWER" => Some(QuestionType::ShortAnswer),
            "OPEN" => Some(QuestionType::Open),
            _ => None,
        }
    }
}

/// 题目来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionSource {
    Manual,
    Ai,
    Imported,
}

/// 单个选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl AnswerOption {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

/// 规范题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Id,
    /// 所属题库（必填）
    pub bank_id: Id,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// 题干
    pub stem: String,
    /// 选项（仅 MULTIPLE_CHOICE / TRUE_FALSE 有意义）
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// 可接受答案（仅 SHORT_ANSWER 有意义）
    #[serde(default)]
    pub acceptable_answers: Vec<String>,
    /// 难度 [1,4]
    pub difficulty: u8,
    /// 每次导出递增
    #[serde(default)]
    pub usage_count: u64,
    /// 标签引用（已解析的 Label ID）
    #[serde(default)]
    pub labels: Vec<Id>,
    /// 章节标签引用（已解析的 ChapterTag ID）
    #[serde(default)]
    pub chapter_tags: Vec<Id>,
    pub source: QuestionSource,
    pub created_by: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_correct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_incorrect: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 题目草稿
///
/// 导入解析和 AI 生成产出的中间形态：标签还是自由文本名称，
/// 尚未经过持久化校验。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    /// 题干（AI 偶尔把字段写成 question，兼容处理）
    #[serde(alias = "question")]
    pub stem: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    #[serde(default)]
    pub acceptable_answers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    /// 标签名称（自由文本，持久化时再解析成引用）
    #[serde(default)]
    pub labels: Vec<String>,
    /// 章节标签名称（自由文本）
    #[serde(default)]
    pub chapter_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// 把松散的数值规约为 [1,4] 的难度
///
/// # 参数
/// - `value`: 任意 JSON 值（数字、数字字符串、垃圾值）
/// - `fallback`: 无法解释时的默认值（批量生成时按请求的难度列表轮转）
pub fn normalize_difficulty(value: &JsonValue, fallback: u8) -> u8 {
    let num = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match num {
        Some(n) if n.is_finite() => (n.round() as i64).clamp(1, 4) as u8,
        _ => fallback,
    }
}

impl QuestionDraft {
    /// 从 AI 返回的 JSON 元素构建草稿
    ///
    /// 缺失的类型 / 难度按请求参数轮转补齐，标签数组做去空清洗。
    pub fn from_ai_json(
        value: &JsonValue,
        index: usize,
        requested_types: &[QuestionType],
        requested_difficulties: &[u8],
    ) -> Self {
        let fallback_type = requested_types
            .get(index % requested_types.len().max(1))
            .copied()
            .unwrap_or(QuestionType::MultipleChoice);
        let fallback_difficulty = requested_difficulties
            .get(index % requested_difficulties.len().max(1))
            .copied()
            .unwrap_or(2);

        let question_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .and_then(QuestionType::parse)
            .unwrap_or(fallback_type);

        let stem = value
            .get("stem")
            .or_else(|| value.get("question"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();

        let options = value
            .get("options")
            .and_then(|v| v.as_array())
            .map(|opts| {
                opts.iter()
                    .filter_map(|o| {
                        let text = o.get("text").and_then(|t| t.as_str())?.to_string();
                        let is_correct = o
                            .get("isCorrect")
                            .or_else(|| o.get("is_correct"))
                            .and_then(|c| c.as_bool())
                            .unwrap_or(false);
                        Some(AnswerOption { text, is_correct })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let acceptable_answers = clean_string_array(value.get("acceptableAnswers"));
        let difficulty = normalize_difficulty(
            value.get("difficulty").unwrap_or(&JsonValue::Null),
            fallback_difficulty,
        );

        Self {
            question_type: Some(question_type),
            stem,
            options,
            acceptable_answers,
            difficulty: Some(difficulty),
            labels: clean_string_array(value.get("labels")),
            chapter_tags: clean_string_array(value.get("chapterTags")),
            explanation: value
                .get("explanation")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
        }
    }

    /// 草稿是否有机会通过持久化校验（题干预检）
    pub fn has_stem(&self) -> bool {
        !self.stem.trim().is_empty()
    }
}

/// 清洗字符串数组：仅保留非空字符串并去掉首尾空白
fn clean_string_array(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Question {
    /// 持久化前校验
    ///
    /// 校验只拒绝不猜测；没有正确选项时由导入/生成路径的编解码器
    /// 决定是否自动修正，校验器本身不改数据。
    pub fn validate_for_persistence(&self) -> AppResult<()> {
        if self.stem.trim().is_empty() {
            return Err(AppError::validation("stem (enunciado) é obrigatório"));
        }

        if self.question_type.requires_options() {
            let valid_options = self
                .options
                .iter()
                .filter(|o| !o.text.trim().is_empty())
                .count();
            if valid_options < 2 {
                return Err(AppError::validation(format!(
                    "{:?} 类型题目至少需要 2 个有效选项",
                    self.question_type
                )));
            }
            if !self.options.iter().any(|o| o.is_correct) {
                return Err(AppError::validation("至少要有一个选项标记为正确"));
            }
        }

        if self.question_type == QuestionType::ShortAnswer
            && !self
                .acceptable_answers
                .iter()
                .any(|a| !a.trim().is_empty())
        {
            return Err(AppError::validation(
                "SHORT_ANSWER 类型题目至少需要一个可接受答案",
            ));
        }

        if !(1..=4).contains(&self.difficulty) {
            return Err(AppError::validation(format!(
                "难度 {} 超出 [1,4]",
                self.difficulty
            )));
        }

        Ok(())
    }
}

/// 若没有任何选项标记为正确，则把第一个选项置为正确
///
/// 供编解码器在导入/序列化前做宽松修正用。
pub fn force_first_correct(options: &mut [AnswerOption]) {
    if !options.is_empty() && !options.iter().any(|o| o.is_correct) {
        options[0].is_correct = true;
    }
}
