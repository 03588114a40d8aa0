//! 题库模型
//!
//! 题库是题目的归属容器，带一个简单的发布生命周期。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::Id;

/// 题库生命周期状态
///
/// DRAFT → IN_REVIEW → OFFICIAL → ARCHIVED，只允许 IN_REVIEW 退回 DRAFT，
/// 其余方向单调向前。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankStatus {
    Draft,
    InReview,
    Official,
    Archived,
}

impl BankStatus {
    fn rank(self) -> u8 {
        match self {
            BankStatus::Draft => 0,
            BankStatus::InReview => 1,
            BankStatus::Official => 2,
            BankStatus::Archived => 3,
        }
    }

    /// 目标状态是否需要提升后的角色（协调员/管理员）
    pub fn requires_elevated_role(self) -> bool {
        matches!(self, BankStatus::Official | BankStatus::Archived)
    }

    /// 校验一次状态迁移
    ///
    /// # 参数
    /// - `to`: 目标状态
    /// - `elevated`: 调用者是否具有提升角色
    pub fn check_transition(self, to: BankStatus, elevated: bool) -> AppResult<()> {
        if self == to {
            return Err(AppError::validation("状态未变化"));
        }

        // 唯一允许的回退：IN_REVIEW → DRAFT
        let backward_ok = self == BankStatus::InReview && to == BankStatus::Draft;
        if to.rank() < self.rank() && !backward_ok {
            return Err(AppError::validation(format!(
                "不允许从 {:?} 回退到 {:?}",
                self, to
            )));
        }

        if to.requires_elevated_role() && !elevated {
            return Err(AppError::permission(format!(
                "迁移到 {:?} 需要协调员角色",
                to
            )));
        }

        Ok(())
    }
}

/// 题库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: Id,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 默认 pt-PT，生成提示词时使用
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discipline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    pub owner: Id,
    pub status: BankStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionBank {
    pub fn new(title: impl Into<String>, owner: impl Into<Id>) -> Self {
        let now = Utc::now();
        Self {
            id: crate::models::new_id(),
            title: title.into(),
            description: String::new(),
            language: "pt-PT".to_string(),
            discipline: None,
            academic_year: None,
            owner: owner.into(),
            status: BankStatus::Draft,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 调用者是否是题库拥有者
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner == user_id
    }

    /// 执行一次状态迁移
    pub fn transition(&mut self, to: BankStatus, elevated: bool) -> AppResult<()> {
        self.status.check_transition(to, elevated)?;
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 导出文件名：标题里非 [A-Za-z0-9_-] 的字符全部替换为下划线
    pub fn export_filename(&self) -> String {
        let base: String = self
            .title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if base.is_empty() {
            "banco".to_string()
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(BankStatus::Draft
            .check_transition(BankStatus::InReview, false)
            .is_ok());
        assert!(BankStatus::InReview
            .check_transition(BankStatus::Official, true)
            .is_ok());
        assert!(BankStatus::Official
            .check_transition(BankStatus::Archived, true)
            .is_ok());
    }

    #[test]
    fn test_review_can_return_to_draft() {
        assert!(BankStatus::InReview
            .check_transition(BankStatus::Draft, false)
            .is_ok());
    }

    #[test]
    fn test_no_other_backward_moves() {
        assert!(BankStatus::Official
            .check_transition(BankStatus::Draft, true)
            .is_err());
        assert!(BankStatus::Archived
            .check_transition(BankStatus::Official, true)
            .is_err());
    }

    #[test]
    fn test_elevated_role_gate() {
        let err = BankStatus::InReview
            .check_transition(BankStatus::Official, false)
            .unwrap_err();
        assert!(matches!(err, crate::error::AppError::Permission(_)));
    }

    #[test]
    fn test_export_filename_sanitized() {
        let mut bank = QuestionBank::new("Banco de Questões 2024/25", "u1");
        assert_eq!(bank.export_filename(), "Banco_de_Quest_es_2024_25");
        bank.title = "".to_string();
        assert_eq!(bank.export_filename(), "banco");
    }
}
