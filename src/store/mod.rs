//! 持久化抽象层
//!
//! 文档库是外部协作者，这里只声明服务层需要的最小原语集合：
//! 查找、插入、按 (owner, normalizedName) 的幂等 upsert、
//! usage_count 的原子递增，以及生成批次的 CAS 状态翻转。
//! 内存实现用于测试和单机运行。

pub mod memory;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    AiGeneration, ChapterTag, ChapterTagFolder, GenerationStatus, Id, Label, Question,
    QuestionBank,
};

pub use memory::MemoryStore;

/// 题库存取
#[async_trait]
pub trait BankStore: Send + Sync {
    async fn insert_bank(&self, bank: QuestionBank) -> AppResult<QuestionBank>;
    async fn find_bank(&self, id: &str) -> AppResult<Option<QuestionBank>>;
    async fn update_bank(&self, bank: &QuestionBank) -> AppResult<()>;
    async fn list_banks_by_owner(&self, owner: &str) -> AppResult<Vec<QuestionBank>>;
}

/// 题目存取
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn insert_questions(&self, questions: Vec<Question>) -> AppResult<Vec<Question>>;
    async fn find_question(&self, id: &str) -> AppResult<Option<Question>>;
    /// 按题库列出（插入顺序）
    async fn list_questions_by_bank(&self, bank_id: &str) -> AppResult<Vec<Question>>;
    async fn update_question(&self, question: &Question) -> AppResult<()>;
    async fn delete_question(&self, id: &str) -> AppResult<bool>;
    /// 原子递增 usage_count，导出成功后调用
    async fn increment_usage(&self, ids: &[Id]) -> AppResult<()>;
}

/// 分类实体存取（标签 / 章节标签 / 文件夹）
///
/// 解析用的是 upsert 原语而不是"先查后插"：查找与插入必须在同一
/// 临界区（Mongo 的 `findOneAndUpdate(upsert)` 对应物），并发解析
/// 同一个 (owner, normalizedName) 才不会产生重复实体。
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// 原子 upsert 标签：按 (owner, normalizedName) 命中则复用
    /// （软删除的复活），未命中才插入 `candidate`
    async fn upsert_label(&self, owner: &str, key: &str, candidate: Label) -> AppResult<Label>;
    async fn update_label(&self, label: &Label) -> AppResult<()>;
    async fn list_labels(&self, owner: &str) -> AppResult<Vec<Label>>;
    async fn find_label(&self, id: &str) -> AppResult<Option<Label>>;

    /// 原子 upsert 章节标签；命中且已有标签无文件夹归属时，用
    /// `candidate.folder` 回填
    async fn upsert_chapter_tag(
        &self,
        owner: &str,
        key: &str,
        candidate: ChapterTag,
    ) -> AppResult<ChapterTag>;
    async fn update_chapter_tag(&self, tag: &ChapterTag) -> AppResult<()>;
    async fn list_chapter_tags(&self, owner: &str) -> AppResult<Vec<ChapterTag>>;
    async fn find_chapter_tag(&self, id: &str) -> AppResult<Option<ChapterTag>>;

    /// 原子 upsert 文件夹；新建时 `position` 由存储层在临界区内按
    /// 当前文件夹数量分配，`candidate.position` 被忽略
    async fn upsert_folder(
        &self,
        owner: &str,
        key: &str,
        candidate: ChapterTagFolder,
    ) -> AppResult<ChapterTagFolder>;
    async fn update_folder(&self, folder: &ChapterTagFolder) -> AppResult<()>;
    async fn list_folders(&self, owner: &str) -> AppResult<Vec<ChapterTagFolder>>;
}

/// AI 生成批次存取
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn insert_generation(&self, generation: AiGeneration) -> AppResult<AiGeneration>;
    async fn find_generation(&self, id: &str) -> AppResult<Option<AiGeneration>>;
    async fn list_generations_by_user(&self, user: &str) -> AppResult<Vec<AiGeneration>>;

    /// CAS 状态翻转：仅当当前状态等于 `expected` 时写入 `next` 和
    /// `question_ids`，返回是否命中。并发的重复审批只有一个会成功。
    async fn set_generation_status_if(
        &self,
        id: &str,
        expected: GenerationStatus,
        next: GenerationStatus,
        question_ids: Vec<Id>,
    ) -> AppResult<bool>;
}
