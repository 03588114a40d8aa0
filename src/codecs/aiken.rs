//! Aiken 编解码器
//!
//! 每题一个文本块：题干一行、每个选项一行（`A. 文本`），最后
//! `ANSWER: <字母>` 指明正确选项。Aiken 只能表达带选项的题型，
//! 选项不足 2 个的题目在序列化时直接略过。
//!
//! 字母表 A–F，超出后按 ASCII 顺延（G、H、…）。

use regex::Regex;
use std::sync::OnceLock;

use crate::codecs::{ExportEntry, ParseOutcome};
use crate::models::{AnswerOption, QuestionDraft, QuestionType};

/// 序列化题目列表为 Aiken 文本
pub fn serialize(entries: &[ExportEntry]) -> String {
    entries
        .iter()
        .filter_map(serialize_entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn option_letter(index: usize) -> char {
    // A-F 常规，之后按 ASCII 偏移顺延；封顶在 '~'，不回绕
    let offset = index.min((b'~' - b'A') as usize) as u8;
    (b'A' + offset) as char
}

fn serialize_entry(entry: &ExportEntry) -> Option<String> {
    let q = &entry.question;
    if q.options.len() < 2 {
        // Aiken 无法表达没有选项的题目
        return None;
    }

    let mut lines = Vec::new();
    if !entry.label_names.is_empty() {
        lines.push(format!("// Etiquetas: {}", entry.label_names.join(", ")));
    }
    if !entry.chapter_tag_names.is_empty() {
        lines.push(format!("// Capítulos: {}", entry.chapter_tag_names.join(", ")));
    }

    lines.push(q.stem.clone());
    for (idx, opt) in q.options.iter().enumerate() {
        lines.push(format!("{}. {}", option_letter(idx), opt.text));
    }

    // 多个正确选项时取第一个；一个都没有时退化为 A
    let correct_index = q.options.iter().position(|o| o.is_correct).unwrap_or(0);
    lines.push(format!("ANSWER: {}", option_letter(correct_index)));

    Some(lines.join("\n"))
}

fn option_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z])[.)]\s+(.*)$").unwrap())
}

fn answer_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ANSWER\s*:\s*([A-Za-z])").unwrap())
}

/// 解析 Aiken 文本为题目草稿
///
/// 没有 ANSWER 行或选项不足 2 个的块跳过计数；ANSWER 指向不存在的
/// 字母时强制第一个选项为正确，而不是让导入失败。
pub fn parse(raw: &str) -> ParseOutcome {
    static SEP: OnceLock<Regex> = OnceLock::new();
    let sep = SEP.get_or_init(|| Regex::new(r"\n\s*\n").unwrap());

    let mut drafts = Vec::new();
    let mut skipped = 0usize;

    for block in sep.split(raw) {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        match parse_block(block) {
            ParsedBlock::Question(draft) => drafts.push(draft),
            ParsedBlock::Skip => skipped += 1,
            ParsedBlock::CommentOnly => {}
        }
    }

    ParseOutcome {
        drafts,
        skipped_count: skipped,
    }
}

enum ParsedBlock {
    Question(QuestionDraft),
    Skip,
    CommentOnly,
}

fn parse_block(block: &str) -> ParsedBlock {
    let mut stem: Option<String> = None;
    let mut options: Vec<AnswerOption> = Vec::new();
    let mut answer_letter: Option<char> = None;
    let mut labels = Vec::new();
    let mut chapter_tags = Vec::new();

    for line in block.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("// Etiquetas:") {
            labels.extend(split_names(rest));
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("// Capítulos:") {
            chapter_tags.extend(split_names(rest));
            continue;
        }
        if trimmed.starts_with("//") {
            continue;
        }

        if let Some(caps) = answer_line_regex().captures(trimmed) {
            answer_letter = caps[1].chars().next().map(|c| c.to_ascii_uppercase());
            continue;
        }

        if stem.is_some() {
            if let Some(caps) = option_line_regex().captures(trimmed) {
                options.push(AnswerOption::new(caps[2].trim(), false));
                continue;
            }
        }

        match &mut stem {
            None => stem = Some(trimmed.to_string()),
            // 题干后的非选项行并入题干（多行题干）
            Some(s) => {
                s.push(' ');
                s.push_str(trimmed);
            }
        }
    }

    let Some(stem) = stem else {
        return if labels.is_empty() && chapter_tags.is_empty() {
            ParsedBlock::Skip
        } else {
            ParsedBlock::CommentOnly
        };
    };

    let Some(letter) = answer_letter else {
        return ParsedBlock::Skip;
    };
    if options.len() < 2 {
        return ParsedBlock::Skip;
    }

    let index = (letter as usize).wrapping_sub('A' as usize);
    if index < options.len() {
        options[index].is_correct = true;
    } else {
        // ANSWER 指向不存在的选项：退化为第一个
        options[0].is_correct = true;
    }

    ParsedBlock::Question(QuestionDraft {
        question_type: Some(QuestionType::MultipleChoice),
        stem,
        options,
        labels,
        chapter_tags,
        ..QuestionDraft::default()
    })
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}
