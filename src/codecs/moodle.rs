//! Moodle XML 编解码器
//!
//! 序列化：所有题目包在 `<quiz>` 里，开头一个 `type="category"` 块
//! 承载题库名，之后每题一个 `<question>` 块。正确性用 `fraction`
//! 属性表达：100% 在所有正确选项间均分，其余为 0。判断题固定输出
//! true/false 两个 answer；短答案每个可接受答案一个 fraction=100
//! 的 answer，列表为空的题无法表达，直接从输出里去掉。
//!
//! 解析用 quick-xml 事件流读 `<quiz><question>`；category 和不可作答
//! 的类型跳过计数，题干/标题里的 HTML 标签剥掉。

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::OnceLock;

use crate::codecs::{ExportEntry, ParseOutcome};
use crate::models::{AnswerOption, QuestionDraft, QuestionType};

const DEFAULT_GRADE: &str = "1.0000000";
const PENALTY: &str = "0.0000000";
const HIDDEN: &str = "0";
const DEFAULT_NAME: &str = "Pergunta";

/// XML 实体转义（& < > " '）
fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn text_tag(value: &str) -> String {
    format!("<text>{}</text>", escape_xml(value))
}

/// fraction 属性值：整数时不带小数部分
fn format_fraction(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// 序列化题目列表为 Moodle XML
pub fn serialize(entries: &[ExportEntry], bank_name: &str) -> String {
    let mut blocks = vec![build_category(bank_name)];
    blocks.extend(entries.iter().filter_map(build_question));

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<quiz>\n{}\n</quiz>",
        blocks.join("\n")
    )
}

fn build_category(name: &str) -> String {
    let name = if name.trim().is_empty() { "Banco" } else { name };
    format!(
        "  <question type=\"category\">\n    <category>\n      <text>$course$/top/{}</text>\n    </category>\n  </question>",
        escape_xml(name)
    )
}

/// 题目级元数据块：`label:` / `chapter:` 前缀区分两类名称
fn build_tags(entry: &ExportEntry) -> String {
    if entry.label_names.is_empty() && entry.chapter_tag_names.is_empty() {
        return String::new();
    }
    let mut tags = Vec::new();
    for name in &entry.label_names {
        tags.push(format!(
            "      <tag><text>label:{}</text></tag>",
            escape_xml(name)
        ));
    }
    for name in &entry.chapter_tag_names {
        tags.push(format!(
            "      <tag><text>chapter:{}</text></tag>",
            escape_xml(name)
        ));
    }
    format!("\n    <tags>\n{}\n    </tags>", tags.join("\n"))
}

fn question_name(entry: &ExportEntry) -> String {
    let stem = entry.question.stem.trim();
    if stem.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        stem.to_string()
    }
}

fn build_question(entry: &ExportEntry) -> Option<String> {
    match entry.question.question_type {
        QuestionType::MultipleChoice => build_multichoice(entry),
        QuestionType::TrueFalse => Some(build_truefalse(entry)),
        QuestionType::ShortAnswer => build_shortanswer(entry),
        QuestionType::Open => Some(build_essay(entry)),
    }
}

fn build_multichoice(entry: &ExportEntry) -> Option<String> {
    let q = &entry.question;
    if q.options.is_empty() {
        // Moodle 会忽略没有答案的题；不生成非法 XML
        return None;
    }

    // 服务端先修正：没有正确选项时把第一个当正确
    let mut options = q.options.clone();
    crate::models::question::force_first_correct(&mut options);

    let correct_count = options.iter().filter(|o| o.is_correct).count().max(1);
    let single = if correct_count == 1 { "true" } else { "false" };

    let answers = options
        .iter()
        .map(|opt| {
            let fraction = if opt.is_correct {
                100.0 / correct_count as f64
            } else {
                0.0
            };
            format!(
                "    <answer fraction=\"{}\" format=\"html\">\n      {}\n      <feedback format=\"html\"><text></text></feedback>\n    </answer>",
                format_fraction(fraction),
                text_tag(&opt.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(format!(
        "  <question type=\"multichoice\">\n    <name>{name}</name>\n    <questiontext format=\"html\">{stem}</questiontext>\n    <generalfeedback format=\"html\"><text></text></generalfeedback>\n    <defaultgrade>{grade}</defaultgrade>\n    <penalty>{penalty}</penalty>\n    <hidden>{hidden}</hidden>\n    <single>{single}</single>\n    <shuffleanswers>1</shuffleanswers>\n    <answernumbering>abc</answernumbering>\n{answers}{tags}\n  </question>",
        name = text_tag(&question_name(entry)),
        stem = text_tag(&q.stem),
        grade = DEFAULT_GRADE,
        penalty = PENALTY,
        hidden = HIDDEN,
        single = single,
        answers = answers,
        tags = build_tags(entry),
    ))
}

fn truefalse_regex() -> (&'static Regex, &'static Regex) {
    static TRUE_RE: OnceLock<Regex> = OnceLock::new();
    static FALSE_RE: OnceLock<Regex> = OnceLock::new();
    (
        TRUE_RE.get_or_init(|| Regex::new(r"(?i)^(true|verdadeiro)$").unwrap()),
        FALSE_RE.get_or_init(|| Regex::new(r"(?i)^(false|falso)$").unwrap()),
    )
}

fn build_truefalse(entry: &ExportEntry) -> String {
    let q = &entry.question;
    let (true_re, false_re) = truefalse_regex();

    let has_true_correct = q
        .options
        .iter()
        .any(|o| o.is_correct && true_re.is_match(o.text.trim()));
    let has_false_correct = q
        .options
        .iter()
        .any(|o| o.is_correct && false_re.is_match(o.text.trim()));

    // 两边都没匹配上时默认 true 为正确
    let correct_is_true = has_true_correct || !has_false_correct;

    format!(
        "  <question type=\"truefalse\">\n    <name>{name}</name>\n    <questiontext format=\"html\">{stem}</questiontext>\n    <generalfeedback format=\"html\"><text></text></generalfeedback>\n    <defaultgrade>{grade}</defaultgrade>\n    <penalty>{penalty}</penalty>\n    <hidden>{hidden}</hidden>\n    <answer fraction=\"{tf}\" format=\"html\">\n      <text>true</text>\n      <feedback format=\"html\"><text></text></feedback>\n    </answer>\n    <answer fraction=\"{ff}\" format=\"html\">\n      <text>false</text>\n      <feedback format=\"html\"><text></text></feedback>\n    </answer>{tags}\n  </question>",
        name = text_tag(&question_name(entry)),
        stem = text_tag(&q.stem),
        grade = DEFAULT_GRADE,
        penalty = PENALTY,
        hidden = HIDDEN,
        tf = if correct_is_true { "100" } else { "0" },
        ff = if correct_is_true { "0" } else { "100" },
        tags = build_tags(entry),
    )
}

fn build_shortanswer(entry: &ExportEntry) -> Option<String> {
    let q = &entry.question;
    let answers: Vec<&str> = q
        .acceptable_answers
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();

    if answers.is_empty() {
        return None;
    }

    let answers_xml = answers
        .iter()
        .map(|ans| {
            format!(
                "    <answer fraction=\"100\" format=\"moodle_auto_format\">\n      {}\n      <feedback format=\"html\"><text></text></feedback>\n    </answer>",
                text_tag(ans)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(format!(
        "  <question type=\"shortanswer\">\n    <name>{name}</name>\n    <questiontext format=\"html\">{stem}</questiontext>\n    <generalfeedback format=\"html\"><text></text></generalfeedback>\n    <defaultgrade>{grade}</defaultgrade>\n    <penalty>{penalty}</penalty>\n    <hidden>{hidden}</hidden>\n    <usecase>0</usecase>\n{answers}{tags}\n  </question>",
        name = text_tag(&question_name(entry)),
        stem = text_tag(&q.stem),
        grade = DEFAULT_GRADE,
        penalty = PENALTY,
        hidden = HIDDEN,
        answers = answers_xml,
        tags = build_tags(entry),
    ))
}

fn build_essay(entry: &ExportEntry) -> String {
    let q = &entry.question;
    format!(
        "  <question type=\"essay\">\n    <name>{name}</name>\n    <questiontext format=\"html\">{stem}</questiontext>\n    <generalfeedback format=\"html\"><text></text></generalfeedback>\n    <defaultgrade>{grade}</defaultgrade>\n    <penalty>{penalty}</penalty>\n    <hidden>{hidden}</hidden>\n    <responseformat>editor</responseformat>\n    <responserequired>1</responserequired>\n    <responsefieldlines>10</responsefieldlines>\n    <attachments>0</attachments>\n    <attachmentsrequired>0</attachmentsrequired>\n    <graderinfo format=\"html\"><text></text></graderinfo>\n    <responsetemplate format=\"html\"><text></text></responsetemplate>{tags}\n  </question>",
        name = text_tag(&question_name(entry)),
        stem = text_tag(&q.stem),
        grade = DEFAULT_GRADE,
        penalty = PENALTY,
        hidden = HIDDEN,
        tags = build_tags(entry),
    )
}

// ========== 解析 ==========

/// 解析中的单个 question 元素
#[derive(Default)]
struct RawQuestion {
    qtype: String,
    name: String,
    stem: String,
    answers: Vec<RawAnswer>,
    tags: Vec<String>,
}

#[derive(Default)]
struct RawAnswer {
    fraction: f64,
    text: String,
}

/// 剥掉 HTML 标签
fn strip_html(raw: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
    re.replace_all(raw, "").trim().to_string()
}

/// 解析 Moodle XML 为题目草稿
pub fn parse(raw: &str) -> ParseOutcome {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut drafts = Vec::new();
    let mut skipped = 0usize;
    let mut current: Option<RawQuestion> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "question" {
                    let qtype = e
                        .try_get_attribute("type")
                        .ok()
                        .flatten()
                        .and_then(|a| a.unescape_value().ok())
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    current = Some(RawQuestion {
                        qtype,
                        ..RawQuestion::default()
                    });
                } else if name == "answer" {
                    let fraction = e
                        .try_get_attribute("fraction")
                        .ok()
                        .flatten()
                        .and_then(|a| a.unescape_value().ok())
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(0.0);
                    if let Some(q) = current.as_mut() {
                        q.answers.push(RawAnswer {
                            fraction,
                            text: String::new(),
                        });
                    }
                }
                path.push(name);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map(|v| v.to_string()).unwrap_or_default();
                if let Some(q) = current.as_mut() {
                    route_text(q, &path, &text);
                }
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c).to_string();
                if let Some(q) = current.as_mut() {
                    route_text(q, &path, &text);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                path.pop();
                if name == "question" {
                    if let Some(q) = current.take() {
                        match finish_question(q) {
                            Finished::Draft(d) => drafts.push(d),
                            Finished::Skipped => skipped += 1,
                            Finished::Category => {}
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Moodle XML 解析中断: {}", e);
                break;
            }
        }
    }

    ParseOutcome {
        drafts,
        skipped_count: skipped,
    }
}

/// 根据元素路径把文本分发到对应字段
fn route_text(q: &mut RawQuestion, path: &[String], text: &str) {
    let ends_with = |suffix: &[&str]| {
        path.len() >= suffix.len()
            && path[path.len() - suffix.len()..]
                .iter()
                .zip(suffix)
                .all(|(a, b)| a == b)
    };

    if ends_with(&["question", "name", "text"]) {
        q.name.push_str(text);
    } else if ends_with(&["question", "questiontext", "text"]) {
        q.stem.push_str(text);
    } else if ends_with(&["answer", "text"]) {
        if let Some(ans) = q.answers.last_mut() {
            ans.text.push_str(text);
        }
    } else if ends_with(&["tags", "tag", "text"]) {
        q.tags.push(text.to_string());
    } else if ends_with(&["question", "category", "text"]) {
        // category 路径，忽略
    }
}

enum Finished {
    Draft(QuestionDraft),
    Skipped,
    Category,
}

fn finish_question(q: RawQuestion) -> Finished {
    if q.qtype == "category" {
        return Finished::Category;
    }

    let stem = {
        let s = strip_html(&q.stem);
        if s.is_empty() {
            strip_html(&q.name)
        } else {
            s
        }
    };
    if stem.is_empty() {
        return Finished::Skipped;
    }

    let mut labels = Vec::new();
    let mut chapter_tags = Vec::new();
    for tag in &q.tags {
        if let Some(name) = tag.strip_prefix("label:") {
            labels.push(name.trim().to_string());
        } else if let Some(name) = tag.strip_prefix("chapter:") {
            chapter_tags.push(name.trim().to_string());
        }
    }

    let draft = match q.qtype.as_str() {
        "multichoice" => {
            let mut options: Vec<AnswerOption> = q
                .answers
                .iter()
                .filter(|a| !a.text.trim().is_empty())
                .map(|a| AnswerOption::new(strip_html(&a.text), a.fraction > 0.0))
                .collect();
            if options.len() < 2 {
                return Finished::Skipped;
            }
            crate::models::question::force_first_correct(&mut options);
            QuestionDraft {
                question_type: Some(QuestionType::MultipleChoice),
                stem,
                options,
                labels,
                chapter_tags,
                ..QuestionDraft::default()
            }
        }
        "truefalse" => {
            let mut options: Vec<AnswerOption> = q
                .answers
                .iter()
                .map(|a| AnswerOption::new(strip_html(&a.text), a.fraction > 0.0))
                .collect();
            if options.is_empty() {
                return Finished::Skipped;
            }
            crate::models::question::force_first_correct(&mut options);
            QuestionDraft {
                question_type: Some(QuestionType::TrueFalse),
                stem,
                options,
                labels,
                chapter_tags,
                ..QuestionDraft::default()
            }
        }
        "shortanswer" => {
            let acceptable: Vec<String> = q
                .answers
                .iter()
                .map(|a| strip_html(&a.text))
                .filter(|a| !a.is_empty())
                .collect();
            if acceptable.is_empty() {
                return Finished::Skipped;
            }
            QuestionDraft {
                question_type: Some(QuestionType::ShortAnswer),
                stem,
                acceptable_answers: acceptable,
                labels,
                chapter_tags,
                ..QuestionDraft::default()
            }
        }
        "essay" => QuestionDraft {
            question_type: Some(QuestionType::Open),
            stem,
            labels,
            chapter_tags,
            ..QuestionDraft::default()
        },
        // cloze / matching 等不可作答类型
        _ => return Finished::Skipped,
    };

    Finished::Draft(draft)
}
