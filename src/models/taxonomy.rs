//! 分类实体模型
//!
//! Label（标签）与 ChapterTag（章节标签）都按 (owner, normalizedName)
//! 去重，删除是软删除（isActive=false），重复创建时幂等复活。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Id;

/// 归一化名称：去首尾空白后转小写，作为唯一性键
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// 标签（如 "Época Normal"、"Recurso"）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: Id,
    /// 显示名
    pub name: String,
    /// 唯一性键（小写去空白）
    pub normalized_name: String,
    pub owner: Id,
    /// 软删除标记
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Label {
    pub fn new(name: &str, owner: impl Into<Id>) -> Self {
        let now = Utc::now();
        let clean = name.trim().to_string();
        Self {
            id: crate::models::new_id(),
            normalized_name: normalize_key(&clean),
            name: clean,
            owner: owner.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 章节标签（如 "HTML Básico"、"Método Simplex"），可归入文件夹
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterTag {
    pub id: Id,
    pub name: String,
    pub normalized_name: String,
    pub owner: Id,
    pub is_active: bool,
    /// 所属文件夹（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChapterTag {
    pub fn new(name: &str, owner: impl Into<Id>, folder: Option<Id>) -> Self {
        let now = Utc::now();
        let clean = name.trim().to_string();
        Self {
            id: crate::models::new_id(),
            normalized_name: normalize_key(&clean),
            name: clean,
            owner: owner.into(),
            is_active: true,
            folder,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 章节标签文件夹
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterTagFolder {
    pub id: Id,
    pub name: String,
    pub normalized_name: String,
    #[serde(default)]
    pub description: String,
    /// 控制文件夹排序（拖拽调整）
    pub position: i64,
    pub owner: Id,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChapterTagFolder {
    pub fn new(name: &str, owner: impl Into<Id>, position: i64) -> Self {
        let now = Utc::now();
        let clean = name.trim().to_string();
        Self {
            id: crate::models::new_id(),
            normalized_name: normalize_key(&clean),
            name: clean,
            description: String::new(),
            position,
            owner: owner.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
