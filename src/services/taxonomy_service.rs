//! 分类解析服务
//!
//! 导入和 AI 审批产出的都是自由文本标签名，持久化前要换成引用。
//! 解析按 (owner, normalizedName) 幂等：已存在就复用（软删除的先
//! 复活），不存在才创建。幂等性由存储层的原子 upsert 保证，并发
//! 解析同一名称也只产生一个实体。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{normalize_key, ChapterTag, ChapterTagFolder, Id, Label};
use crate::store::TaxonomyStore;

/// 分类解析服务
pub struct TaxonomyService {
    store: Arc<dyn TaxonomyStore>,
}

impl TaxonomyService {
    pub fn new(store: Arc<dyn TaxonomyStore>) -> Self {
        Self { store }
    }

    /// 解析或创建单个标签
    ///
    /// # 返回
    /// 已存在（含复活的）或新建的标签
    pub async fn resolve_label(&self, owner: &str, name: &str) -> AppResult<Label> {
        let clean = name.trim();
        if clean.is_empty() {
            return Err(AppError::validation("name é obrigatório"));
        }
        let key = normalize_key(clean);

        let candidate = Label::new(clean, owner);
        let candidate_id = candidate.id.clone();
        let label = self.store.upsert_label(owner, &key, candidate).await?;
        if label.id == candidate_id {
            info!("标签已创建: {}", label.name);
        }
        Ok(label)
    }

    /// 解析或创建单个章节标签
    pub async fn resolve_chapter_tag(&self, owner: &str, name: &str) -> AppResult<ChapterTag> {
        self.resolve_chapter_tag_in_folder(owner, name, None).await
    }

    /// 解析或创建章节标签并归入文件夹
    ///
    /// 标签已存在但还没有文件夹时补上归属；已属于其他文件夹的不动。
    pub async fn resolve_chapter_tag_in_folder(
        &self,
        owner: &str,
        name: &str,
        folder: Option<Id>,
    ) -> AppResult<ChapterTag> {
        let clean = name.trim();
        if clean.is_empty() {
            return Err(AppError::validation("name é obrigatório"));
        }
        let key = normalize_key(clean);

        let candidate = ChapterTag::new(clean, owner, folder);
        let candidate_id = candidate.id.clone();
        let tag = self.store.upsert_chapter_tag(owner, &key, candidate).await?;
        if tag.id == candidate_id {
            info!("章节标签已创建: {}", tag.name);
        }
        Ok(tag)
    }

    /// 解析或创建文件夹（同样按归一化名称幂等）
    pub async fn resolve_folder(&self, owner: &str, name: &str) -> AppResult<ChapterTagFolder> {
        let clean = name.trim();
        if clean.is_empty() {
            return Err(AppError::validation("name é obrigatório"));
        }
        let key = normalize_key(clean);

        // position 由存储层在 upsert 临界区内分配
        self.store
            .upsert_folder(owner, &key, ChapterTagFolder::new(clean, owner, 0))
            .await
    }

    /// 批量解析标签名 → ID 列表（去重，空名跳过）
    pub async fn resolve_label_ids(&self, owner: &str, names: &[String]) -> AppResult<Vec<Id>> {
        let mut seen: HashMap<String, Id> = HashMap::new();
        let mut ids = Vec::new();
        for name in names {
            if name.trim().is_empty() {
                continue;
            }
            let key = normalize_key(name);
            if let Some(id) = seen.get(&key) {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
                continue;
            }
            let label = self.resolve_label(owner, name).await?;
            seen.insert(key, label.id.clone());
            if !ids.contains(&label.id) {
                ids.push(label.id);
            }
        }
        Ok(ids)
    }

    /// 批量解析章节标签名 → ID 列表
    pub async fn resolve_chapter_tag_ids(
        &self,
        owner: &str,
        names: &[String],
    ) -> AppResult<Vec<Id>> {
        let mut seen: HashMap<String, Id> = HashMap::new();
        let mut ids = Vec::new();
        for name in names {
            if name.trim().is_empty() {
                continue;
            }
            let key = normalize_key(name);
            if let Some(id) = seen.get(&key) {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
                continue;
            }
            let tag = self.resolve_chapter_tag(owner, name).await?;
            seen.insert(key, tag.id.clone());
            if !ids.contains(&tag.id) {
                ids.push(tag.id);
            }
        }
        Ok(ids)
    }

    /// 按 ID 反查标签显示名（导出时用，缺失的 ID 静默跳过）
    pub async fn label_names(&self, ids: &[Id]) -> AppResult<Vec<String>> {
        let mut names = Vec::new();
        for id in ids {
            if let Some(label) = self.store.find_label(id).await? {
                names.push(label.name);
            }
        }
        Ok(names)
    }

    /// 按 ID 反查章节标签显示名
    pub async fn chapter_tag_names(&self, ids: &[Id]) -> AppResult<Vec<String>> {
        let mut names = Vec::new();
        for id in ids {
            if let Some(tag) = self.store.find_chapter_tag(id).await? {
                names.push(tag.name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> (TaxonomyService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (TaxonomyService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_across_case_variants() {
        let (service, _) = service();
        let names = vec!["CSS".to_string(), "css ".to_string(), " CSS".to_string()];
        let ids = service.resolve_label_ids("u1", &names).await.unwrap();
        assert_eq!(ids.len(), 1);

        // 再解析一遍还是同一个 ID
        let again = service
            .resolve_label_ids("u1", &["css".to_string()])
            .await
            .unwrap();
        assert_eq!(again, ids);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_variants_resolve_to_one_label() {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(TaxonomyService::new(store.clone()));

        // 同一名称的大小写/空白变体并发解析，只能出现一行
        let mut handles = Vec::new();
        for name in ["CSS", "css ", " CSS", "css", "Css"] {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.resolve_label("u1", name).await.unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(store.list_labels("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_first_spelling_wins() {
        let (service, _) = service();
        let first = service.resolve_label("u1", "Época Normal").await.unwrap();
        let second = service.resolve_label("u1", "ÉPOCA NORMAL").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Época Normal");
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let (service, _) = service();
        let a = service.resolve_label("u1", "Recurso").await.unwrap();
        let b = service.resolve_label("u2", "Recurso").await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_inactive_label_reactivated() {
        let (service, store) = service();
        let mut label = service.resolve_label("u1", "Exame Final").await.unwrap();
        label.is_active = false;
        store.update_label(&label).await.unwrap();

        let revived = service.resolve_label("u1", "exame final").await.unwrap();
        assert_eq!(revived.id, label.id);
        assert!(revived.is_active);
    }

    #[tokio::test]
    async fn test_chapter_tag_folder_backfill() {
        let (service, _) = service();
        let tag = service.resolve_chapter_tag("u1", "Simplex").await.unwrap();
        assert!(tag.folder.is_none());

        let folder = service.resolve_folder("u1", "Otimização").await.unwrap();
        let tagged = service
            .resolve_chapter_tag_in_folder("u1", "Simplex", Some(folder.id.clone()))
            .await
            .unwrap();
        assert_eq!(tagged.id, tag.id);
        assert_eq!(tagged.folder, Some(folder.id));
    }

    #[tokio::test]
    async fn test_folder_positions_increment() {
        let (service, _) = service();
        let a = service.resolve_folder("u1", "A").await.unwrap();
        let b = service.resolve_folder("u1", "B").await.unwrap();
        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let (service, _) = service();
        assert!(service.resolve_label("u1", "   ").await.is_err());
    }
}
