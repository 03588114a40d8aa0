//! 题目格式互换层
//!
//! 每个编解码器是一对纯函数：`parse(原始文本) -> 草稿列表` 与
//! `serialize(题目列表, 题库名) -> 原始文本`。三种格式对"正确性"
//! 和"元数据"的表达方式各不相同，这层把阻抗差异隔离掉，系统其余
//! 部分只跟规范 Question 形态打交道。
//!
//! 解析刻意宽松：手写的源文件常有杂散块，坏块跳过并计数，
//! 不让整批导入失败。

pub mod aiken;
pub mod gift;
pub mod moodle;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{Question, QuestionDraft};

/// 支持的互换格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Gift,
    Aiken,
    Moodle,
}

impl ExportFormat {
    /// 解析格式标识（大小写不敏感）
    pub fn parse(token: &str) -> AppResult<Self> {
        match token.trim().to_lowercase().as_str() {
            "gift" => Ok(ExportFormat::Gift),
            "aiken" => Ok(ExportFormat::Aiken),
            "moodle" => Ok(ExportFormat::Moodle),
            other => Err(AppError::validation(format!(
                "Formato inválido: {}. Use gift, aiken ou moodle",
                other
            ))),
        }
    }

    /// 导出响应的 Content-Type
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Gift | ExportFormat::Aiken => "text/plain; charset=utf-8",
            ExportFormat::Moodle => "application/xml; charset=utf-8",
        }
    }

    /// 导出文件扩展名
    pub fn file_extension(self) -> &'static str {
        match self {
            ExportFormat::Gift => "gift",
            ExportFormat::Aiken => "txt",
            ExportFormat::Moodle => "xml",
        }
    }
}

/// 一次导入解析的结果
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// 成功解析的草稿
    pub drafts: Vec<QuestionDraft>,
    /// 跳过的坏块数量
    pub skipped_count: usize,
}

/// 待序列化的题目及其已解析的元数据名称
///
/// 题目本身只存标签 ID，导出服务先把名称查出来再交给编解码器。
#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub question: Question,
    /// 标签显示名
    pub label_names: Vec<String>,
    /// 章节标签显示名
    pub chapter_tag_names: Vec<String>,
}

impl ExportEntry {
    pub fn bare(question: Question) -> Self {
        Self {
            question,
            label_names: Vec::new(),
            chapter_tag_names: Vec::new(),
        }
    }
}

/// 按格式解析导入文本
pub fn parse(format: ExportFormat, raw: &str) -> ParseOutcome {
    match format {
        ExportFormat::Gift => gift::parse(raw),
        ExportFormat::Aiken => aiken::parse(raw),
        ExportFormat::Moodle => moodle::parse(raw),
    }
}

/// 按格式序列化题目列表
pub fn serialize(format: ExportFormat, entries: &[ExportEntry], bank_name: &str) -> String {
    match format {
        ExportFormat::Gift => gift::serialize(entries),
        ExportFormat::Aiken => aiken::serialize(entries),
        ExportFormat::Moodle => moodle::serialize(entries, bank_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_token_case_insensitive() {
        assert_eq!(ExportFormat::parse("GIFT").unwrap(), ExportFormat::Gift);
        assert_eq!(ExportFormat::parse(" Aiken ").unwrap(), ExportFormat::Aiken);
        assert_eq!(ExportFormat::parse("moodle").unwrap(), ExportFormat::Moodle);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(ExportFormat::parse("qti").is_err());
        assert!(ExportFormat::parse("").is_err());
    }

    #[test]
    fn test_content_types() {
        assert!(ExportFormat::Gift.content_type().starts_with("text/plain"));
        assert!(ExportFormat::Moodle
            .content_type()
            .starts_with("application/xml"));
    }
}
