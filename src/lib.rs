//! # QForge
//!
//! 题库后端核心：题目格式互换（GIFT / Aiken / Moodle XML）与
//! AI 题目生成审批工作流。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 模型层（Models）
//! - `models/` - 规范题目表示，所有路径先归一化再持久化
//! - `Question` / `QuestionDraft` - 持久化形态与中间草稿
//! - `QuestionBank` - 题库及其发布生命周期
//! - `Label` / `ChapterTag` - 按 (owner, normalizedName) 去重的分类实体
//! - `AiGeneration` - PENDING → APPLIED / REJECTED 的生成批次
//!
//! ### ② 编解码层（Codecs）
//! - `codecs/` - 三种外部格式与规范形态之间的纯函数互换
//! - 解析刻意宽松：坏块跳过计数，不让整批失败
//!
//! ### ③ 存储层（Store）
//! - `store/` - 文档库的最小原语抽象（upsert / CAS / 原子计数）
//! - `MemoryStore` - 测试与单机运行用的内存实现
//!
//! ### ④ 业务能力层（Services）
//! - `ImportService` / `ExportService` - 导入导出流程
//! - `TaxonomyService` - 自由文本标签名 → 稳定引用
//! - `GenerationService` - 生成 / 审批状态机
//!
//! ### ⑤ 客户端层（Clients）
//! - `ProviderClient` - chat-completions 网关：超时、重试、模型降级

pub mod clients;
pub mod codecs;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

// 重新导出常用类型
pub use clients::{ChatClient, ChatRequest, ChatResponse, ProviderClient};
pub use codecs::ExportFormat;
pub use config::{Config, ProviderConfig};
pub use error::{AppError, AppResult, ProviderError};
pub use models::{Question, QuestionBank, QuestionDraft, QuestionType};
pub use services::{
    ExportService, GenerationRequest, GenerationService, ImportService, TaxonomyService,
};
pub use store::MemoryStore;
