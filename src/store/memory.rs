//! 内存存储实现
//!
//! 每类实体一个 `RwLock<HashMap>`，插入顺序用递增序号单独记录。
//! 单进程内的锁保证了 upsert 和 CAS 的原子性。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::models::{
    AiGeneration, ChapterTag, ChapterTagFolder, GenerationStatus, Id, Label, Question,
    QuestionBank,
};
use crate::store::{BankStore, GenerationStore, QuestionStore, TaxonomyStore};

#[derive(Default)]
pub struct MemoryStore {
    banks: RwLock<HashMap<Id, QuestionBank>>,
    questions: RwLock<HashMap<Id, (u64, Question)>>,
    labels: RwLock<HashMap<Id, Label>>,
    chapter_tags: RwLock<HashMap<Id, ChapterTag>>,
    folders: RwLock<HashMap<Id, ChapterTagFolder>>,
    generations: RwLock<HashMap<Id, AiGeneration>>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl BankStore for MemoryStore {
    async fn insert_bank(&self, bank: QuestionBank) -> AppResult<QuestionBank> {
        self.banks
            .write()
            .await
            .insert(bank.id.clone(), bank.clone());
        Ok(bank)
    }

    async fn find_bank(&self, id: &str) -> AppResult<Option<QuestionBank>> {
        Ok(self.banks.read().await.get(id).cloned())
    }

    async fn update_bank(&self, bank: &QuestionBank) -> AppResult<()> {
        self.banks
            .write()
            .await
            .insert(bank.id.clone(), bank.clone());
        Ok(())
    }

    async fn list_banks_by_owner(&self, owner: &str) -> AppResult<Vec<QuestionBank>> {
        let mut banks: Vec<QuestionBank> = self
            .banks
            .read()
            .await
            .values()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect();
        banks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(banks)
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn insert_questions(&self, questions: Vec<Question>) -> AppResult<Vec<Question>> {
        let mut map = self.questions.write().await;
        for q in &questions {
            map.insert(q.id.clone(), (self.next_seq(), q.clone()));
        }
        Ok(questions)
    }

    async fn find_question(&self, id: &str) -> AppResult<Option<Question>> {
        Ok(self.questions.read().await.get(id).map(|(_, q)| q.clone()))
    }

    async fn list_questions_by_bank(&self, bank_id: &str) -> AppResult<Vec<Question>> {
        let map = self.questions.read().await;
        let mut rows: Vec<(u64, Question)> = map
            .values()
            .filter(|(_, q)| q.bank_id == bank_id)
            .cloned()
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, q)| q).collect())
    }

    async fn update_question(&self, question: &Question) -> AppResult<()> {
        let mut map = self.questions.write().await;
        let seq = map
            .get(&question.id)
            .map(|(seq, _)| *seq)
            .unwrap_or_else(|| self.next_seq());
        map.insert(question.id.clone(), (seq, question.clone()));
        Ok(())
    }

    async fn delete_question(&self, id: &str) -> AppResult<bool> {
        Ok(self.questions.write().await.remove(id).is_some())
    }

    async fn increment_usage(&self, ids: &[Id]) -> AppResult<()> {
        let mut map = self.questions.write().await;
        for id in ids {
            if let Some((_, q)) = map.get_mut(id) {
                q.usage_count += 1;
                q.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TaxonomyStore for MemoryStore {
    async fn upsert_label(&self, owner: &str, key: &str, candidate: Label) -> AppResult<Label> {
        // 查找和插入共用同一把写锁，并发 upsert 不会各自插一行
        let mut map = self.labels.write().await;
        if let Some(existing) = map
            .values_mut()
            .find(|l| l.owner == owner && l.normalized_name == key)
        {
            if !existing.is_active {
                existing.is_active = true;
                existing.updated_at = Utc::now();
            }
            return Ok(existing.clone());
        }
        map.insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn update_label(&self, label: &Label) -> AppResult<()> {
        self.labels
            .write()
            .await
            .insert(label.id.clone(), label.clone());
        Ok(())
    }

    async fn list_labels(&self, owner: &str) -> AppResult<Vec<Label>> {
        let mut rows: Vec<Label> = self
            .labels
            .read()
            .await
            .values()
            .filter(|l| l.owner == owner && l.is_active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn find_label(&self, id: &str) -> AppResult<Option<Label>> {
        Ok(self.labels.read().await.get(id).cloned())
    }

    async fn upsert_chapter_tag(
        &self,
        owner: &str,
        key: &str,
        candidate: ChapterTag,
    ) -> AppResult<ChapterTag> {
        let mut map = self.chapter_tags.write().await;
        if let Some(existing) = map
            .values_mut()
            .find(|t| t.owner == owner && t.normalized_name == key)
        {
            let mut dirty = false;
            if !existing.is_active {
                existing.is_active = true;
                dirty = true;
            }
            // 已有标签还没归属文件夹时补上；已属于其他文件夹的不动
            if existing.folder.is_none() && candidate.folder.is_some() {
                existing.folder = candidate.folder.clone();
                dirty = true;
            }
            if dirty {
                existing.updated_at = Utc::now();
            }
            return Ok(existing.clone());
        }
        map.insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn update_chapter_tag(&self, tag: &ChapterTag) -> AppResult<()> {
        self.chapter_tags
            .write()
            .await
            .insert(tag.id.clone(), tag.clone());
        Ok(())
    }

    async fn list_chapter_tags(&self, owner: &str) -> AppResult<Vec<ChapterTag>> {
        let mut rows: Vec<ChapterTag> = self
            .chapter_tags
            .read()
            .await
            .values()
            .filter(|t| t.owner == owner && t.is_active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn find_chapter_tag(&self, id: &str) -> AppResult<Option<ChapterTag>> {
        Ok(self.chapter_tags.read().await.get(id).cloned())
    }

    async fn upsert_folder(
        &self,
        owner: &str,
        key: &str,
        mut candidate: ChapterTagFolder,
    ) -> AppResult<ChapterTagFolder> {
        let mut map = self.folders.write().await;
        if let Some(existing) = map
            .values_mut()
            .find(|f| f.owner == owner && f.normalized_name == key)
        {
            if !existing.is_active {
                existing.is_active = true;
                existing.updated_at = Utc::now();
            }
            return Ok(existing.clone());
        }
        // position 在同一临界区内分配，并发创建不会撞号
        candidate.position = map
            .values()
            .filter(|f| f.owner == owner && f.is_active)
            .count() as i64;
        map.insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn update_folder(&self, folder: &ChapterTagFolder) -> AppResult<()> {
        self.folders
            .write()
            .await
            .insert(folder.id.clone(), folder.clone());
        Ok(())
    }

    async fn list_folders(&self, owner: &str) -> AppResult<Vec<ChapterTagFolder>> {
        let mut rows: Vec<ChapterTagFolder> = self
            .folders
            .read()
            .await
            .values()
            .filter(|f| f.owner == owner && f.is_active)
            .cloned()
            .collect();
        rows.sort_by_key(|f| f.position);
        Ok(rows)
    }
}

#[async_trait]
impl GenerationStore for MemoryStore {
    async fn insert_generation(&self, generation: AiGeneration) -> AppResult<AiGeneration> {
        self.generations
            .write()
            .await
            .insert(generation.id.clone(), generation.clone());
        Ok(generation)
    }

    async fn find_generation(&self, id: &str) -> AppResult<Option<AiGeneration>> {
        Ok(self.generations.read().await.get(id).cloned())
    }

    async fn list_generations_by_user(&self, user: &str) -> AppResult<Vec<AiGeneration>> {
        let mut rows: Vec<AiGeneration> = self
            .generations
            .read()
            .await
            .values()
            .filter(|g| g.user == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn set_generation_status_if(
        &self,
        id: &str,
        expected: GenerationStatus,
        next: GenerationStatus,
        question_ids: Vec<Id>,
    ) -> AppResult<bool> {
        let mut map = self.generations.write().await;
        match map.get_mut(id) {
            Some(g) if g.status == expected => {
                g.status = next;
                g.question_ids = question_ids;
                g.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
