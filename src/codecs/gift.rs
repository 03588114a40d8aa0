//! GIFT 编解码器
//!
//! 序列化形如 `::标题:: 题干 {=正确 ~错误 ~错误}`，正确性用 `=` / `~`
//! 前缀表达。短答案题的全部可接受答案都用 `=` 前缀；开放题花括号留空。
//! 题目前可带 `// Etiquetas: ...` / `// Capítulos: ...` 注释行承载元数据。
//!
//! 解析宽松：块内没有任何 `=` 标记时强制第一个选项为正确；
//! 有效选项不足 2 个的块整体跳过（计数，不报错）。

use regex::Regex;
use std::sync::OnceLock;

use crate::codecs::{ExportEntry, ParseOutcome};
use crate::models::{AnswerOption, QuestionDraft, QuestionType};

/// 无标题时的默认标题
const DEFAULT_TITLE: &str = "Pergunta";

/// 标签注释行前缀
const LABELS_PREFIX: &str = "// Etiquetas:";
/// 章节标签注释行前缀
const CHAPTERS_PREFIX: &str = "// Capítulos:";

/// 序列化题目列表为 GIFT 文本
pub fn serialize(entries: &[ExportEntry]) -> String {
    entries
        .iter()
        .map(serialize_entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn serialize_entry(entry: &ExportEntry) -> String {
    let q = &entry.question;
    let mut lines = Vec::new();

    if !entry.label_names.is_empty() {
        lines.push(format!("{} {}", LABELS_PREFIX, entry.label_names.join(", ")));
    }
    if !entry.chapter_tag_names.is_empty() {
        lines.push(format!(
            "{} {}",
            CHAPTERS_PREFIX,
            entry.chapter_tag_names.join(", ")
        ));
    }

    let body = match q.question_type {
        QuestionType::ShortAnswer => q
            .acceptable_answers
            .iter()
            .filter(|a| !a.trim().is_empty())
            .map(|a| format!("={}", a.trim()))
            .collect::<Vec<_>>()
            .join(" "),
        QuestionType::Open => String::new(),
        _ => q
            .options
            .iter()
            .map(|opt| {
                let prefix = if opt.is_correct { '=' } else { '~' };
                format!("{}{}", prefix, opt.text)
            })
            .collect::<Vec<_>>()
            .join(" "),
    };

    lines.push(format!("::{}:: {} {{{}}}", DEFAULT_TITLE, q.stem, body));
    lines.join("\n")
}

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^(?:::(?:[^:]|:[^:])*?::)?\s*(?P<stem>[^{]+)\{(?P<body>[^}]*)\}").unwrap()
    })
}

/// 解析 GIFT 文本为题目草稿
pub fn parse(raw: &str) -> ParseOutcome {
    let mut drafts = Vec::new();
    let mut skipped = 0usize;

    for block in split_blocks(raw) {
        let (labels, chapter_tags, content) = extract_metadata(&block);
        if content.trim().is_empty() {
            // 纯注释块不算坏块
            continue;
        }

        match parse_block(&content) {
            Some(mut draft) => {
                draft.labels = labels;
                draft.chapter_tags = chapter_tags;
                drafts.push(draft);
            }
            None => skipped += 1,
        }
    }

    ParseOutcome {
        drafts,
        skipped_count: skipped,
    }
}

/// 按空行切块
fn split_blocks(raw: &str) -> Vec<String> {
    static SEP: OnceLock<Regex> = OnceLock::new();
    let sep = SEP.get_or_init(|| Regex::new(r"\n\s*\n").unwrap());
    sep.split(raw)
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .collect()
}

/// 把注释行里的元数据剥出来，返回 (labels, chapter_tags, 剩余内容)
fn extract_metadata(block: &str) -> (Vec<String>, Vec<String>, String) {
    let mut labels = Vec::new();
    let mut chapter_tags = Vec::new();
    let mut content_lines = Vec::new();

    for line in block.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(LABELS_PREFIX) {
            labels.extend(split_names(rest));
        } else if let Some(rest) = trimmed.strip_prefix(CHAPTERS_PREFIX) {
            chapter_tags.extend(split_names(rest));
        } else if trimmed.starts_with("//") {
            // 其它注释忽略
        } else {
            content_lines.push(line);
        }
    }

    (labels, chapter_tags, content_lines.join("\n"))
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// 解析单个题目块；无法解析时返回 None
fn parse_block(content: &str) -> Option<QuestionDraft> {
    let caps = block_regex().captures(content.trim())?;
    let stem = caps.name("stem")?.as_str().trim().to_string();
    if stem.is_empty() {
        return None;
    }
    let body = caps.name("body")?.as_str().trim();

    // 空花括号：开放题
    if body.is_empty() {
        return Some(QuestionDraft {
            question_type: Some(QuestionType::Open),
            stem,
            ..QuestionDraft::default()
        });
    }

    let tokens = tokenize_body(body);
    if tokens.is_empty() {
        return None;
    }

    // 全部 `=` 前缀：GIFT 的短答案语义
    if tokens.iter().all(|(correct, _)| *correct) {
        return Some(QuestionDraft {
            question_type: Some(QuestionType::ShortAnswer),
            stem,
            acceptable_answers: tokens.into_iter().map(|(_, text)| text).collect(),
            ..QuestionDraft::default()
        });
    }

    let mut options: Vec<AnswerOption> = tokens
        .into_iter()
        .map(|(correct, text)| AnswerOption::new(text, correct))
        .collect();

    if options.len() < 2 {
        return None;
    }

    // 没有任何正确标记时，第一个存活选项视为正确
    if !options.iter().any(|o| o.is_correct) {
        options[0].is_correct = true;
    }

    Some(QuestionDraft {
        question_type: Some(QuestionType::MultipleChoice),
        stem,
        options,
        ..QuestionDraft::default()
    })
}

/// 把花括号体切成 (是否正确, 文本) 令牌
///
/// 不以 `=` / `~` 开头的前导内容直接丢弃。
fn tokenize_body(body: &str) -> Vec<(bool, String)> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let token = TOKEN.get_or_init(|| Regex::new(r"[=~][^=~]*").unwrap());

    token
        .find_iter(body)
        .filter_map(|m| {
            let s = m.as_str();
            let correct = s.starts_with('=');
            let text = s[1..].trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some((correct, text))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Question, QuestionSource};
    use chrono::Utc;

    fn question(question_type: QuestionType) -> Question {
        Question {
            id: "q1".to_string(),
            bank_id: "b1".to_string(),
            question_type,
            stem: "2+2?".to_string(),
            options: Vec::new(),
            acceptable_answers: Vec::new(),
            difficulty: 2,
            usage_count: 0,
            labels: Vec::new(),
            chapter_tags: Vec::new(),
            source: QuestionSource::Manual,
            created_by: "u1".to_string(),
            explanation: None,
            feedback_correct: None,
            feedback_incorrect: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_spec_example() {
        let outcome = parse("::Q1:: 2+2? {=4 ~5 ~3}");
        assert_eq!(outcome.skipped_count, 0);
        assert_eq!(outcome.drafts.len(), 1);

        let draft = &outcome.drafts[0];
        assert_eq!(draft.question_type, Some(QuestionType::MultipleChoice));
        assert_eq!(draft.stem, "2+2?");
        assert_eq!(draft.options.len(), 3);
        assert!(draft.options[0].is_correct);
        assert_eq!(draft.options[0].text, "4");
        assert!(!draft.options[1].is_correct);
    }

    #[test]
    fn test_parse_without_title() {
        let outcome = parse("Capital de Portugal? {=Lisboa ~Porto ~Braga}");
        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(outcome.drafts[0].stem, "Capital de Portugal?");
    }

    #[test]
    fn test_no_correct_marker_forces_first() {
        let outcome = parse("::Q:: Escolhe {~a ~b ~c}");
        let draft = &outcome.drafts[0];
        assert!(draft.options[0].is_correct);
        assert!(!draft.options[1].is_correct);
    }

    #[test]
    fn test_block_with_one_option_skipped() {
        let outcome = parse("::Q:: só uma {~a}\n\n::Q2:: ok {=x ~y}");
        assert_eq!(outcome.skipped_count, 1);
        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(outcome.drafts[0].stem, "ok");
    }

    #[test]
    fn test_garbage_token_discarded() {
        let outcome = parse("::Q:: stem {lixo =a ~b}");
        let draft = &outcome.drafts[0];
        assert_eq!(draft.options.len(), 2);
        assert_eq!(draft.options[0].text, "a");
    }

    #[test]
    fn test_all_equals_is_short_answer() {
        let outcome = parse("::Q:: Capital? {=Lisboa =lisboa}");
        let draft = &outcome.drafts[0];
        assert_eq!(draft.question_type, Some(QuestionType::ShortAnswer));
        assert_eq!(draft.acceptable_answers, vec!["Lisboa", "lisboa"]);
    }

    #[test]
    fn test_empty_braces_is_open() {
        let outcome = parse("::Q:: Desenvolve o tema {}");
        assert_eq!(
            outcome.drafts[0].question_type,
            Some(QuestionType::Open)
        );
    }

    #[test]
    fn test_metadata_comments_recovered() {
        let raw = "// Etiquetas: Época Normal, Recurso\n// Capítulos: HTML\n::Q:: stem {=a ~b}";
        let outcome = parse(raw);
        let draft = &outcome.drafts[0];
        assert_eq!(draft.labels, vec!["Época Normal", "Recurso"]);
        assert_eq!(draft.chapter_tags, vec!["HTML"]);
    }

    #[test]
    fn test_serialize_multiple_choice() {
        let mut q = question(QuestionType::MultipleChoice);
        q.options = vec![
            AnswerOption::new("4", true),
            AnswerOption::new("5", false),
            AnswerOption::new("3", false),
        ];
        let text = serialize(&[ExportEntry::bare(q)]);
        assert_eq!(text, "::Pergunta:: 2+2? {=4 ~5 ~3}");
    }

    #[test]
    fn test_serialize_with_metadata_comments() {
        let mut q = question(QuestionType::MultipleChoice);
        q.options = vec![AnswerOption::new("a", true), AnswerOption::new("b", false)];
        let entry = ExportEntry {
            question: q,
            label_names: vec!["Exame Final".to_string()],
            chapter_tag_names: vec!["CSS".to_string(), "HTML".to_string()],
        };
        let text = serialize(&[entry]);
        assert!(text.starts_with("// Etiquetas: Exame Final\n// Capítulos: CSS, HTML\n"));
    }

    #[test]
    fn test_round_trip_short_answer() {
        let mut q = question(QuestionType::ShortAnswer);
        q.acceptable_answers = vec!["quatro".to_string(), "4".to_string()];
        let text = serialize(&[ExportEntry::bare(q)]);
        let outcome = parse(&text);
        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(
            outcome.drafts[0].acceptable_answers,
            vec!["quatro", "4"]
        );
    }

    #[test]
    fn test_round_trip_preserves_correctness() {
        let mut q = question(QuestionType::MultipleChoice);
        q.options = vec![
            AnswerOption::new("errada", false),
            AnswerOption::new("certa", true),
            AnswerOption::new("também errada", false),
        ];
        let text = serialize(&[ExportEntry::bare(q.clone())]);
        let outcome = parse(&text);
        let parsed = &outcome.drafts[0];
        assert_eq!(parsed.stem, q.stem);
        assert_eq!(parsed.options, q.options);
    }
}
