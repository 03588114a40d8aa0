pub mod bank;
pub mod generation;
pub mod question;
pub mod taxonomy;

pub use bank::{BankStatus, QuestionBank};
pub use generation::{AiGeneration, GenerationParams, GenerationStatus};
pub use question::{
    normalize_difficulty, AnswerOption, Question, QuestionDraft, QuestionSource, QuestionType,
};
pub use taxonomy::{normalize_key, ChapterTag, ChapterTagFolder, Label};

/// 实体标识类型（文档库的 ObjectId 在这里以字符串形式出现）
pub type Id = String;

/// 生成新的实体 ID
pub fn new_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
