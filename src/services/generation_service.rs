//! AI 生成与审批工作流
//!
//! 两个阶段：`generate` 调供应商拿回草稿（可选落成 PENDING 批次），
//! `approve` 对批次逐条 批准/编辑/拒绝 后落库。PENDING 是唯一非终态，
//! 状态翻转走存储层的 CAS，并发的重复审批只有一个会成功。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::clients::{ChatClient, ChatRequest};
use crate::error::{AppError, AppResult};
use crate::models::{
    AiGeneration, AnswerOption, GenerationStatus, Id, Question, QuestionDraft, QuestionSource,
    QuestionType,
};
use crate::services::prompt::{self, GenerationRequest};
use crate::services::TaxonomyService;
use crate::store::{BankStore, GenerationStore, QuestionStore};

/// 一次生成的结果
#[derive(Debug)]
pub enum GenerationOutcome {
    /// 只生成草稿，未持久化任何东西
    Drafts {
        drafts: Vec<QuestionDraft>,
        model: String,
    },
    /// 草稿已存为 PENDING 批次，等待审批
    Pending { generation: AiGeneration },
    /// 未要求审批，题目已直接入库
    Saved {
        generation: AiGeneration,
        questions: Vec<Question>,
    },
}

/// 对单条建议的审批决定
#[derive(Debug, Clone)]
pub struct Approval {
    pub index: usize,
    pub approved: bool,
    pub edits: Option<DraftEdits>,
}

impl Approval {
    pub fn accept(index: usize) -> Self {
        Self {
            index,
            approved: true,
            edits: None,
        }
    }

    pub fn reject(index: usize) -> Self {
        Self {
            index,
            approved: false,
            edits: None,
        }
    }

    pub fn accept_with(index: usize, edits: DraftEdits) -> Self {
        Self {
            index,
            approved: true,
            edits: Some(edits),
        }
    }
}

/// 审批时允许覆盖的草稿字段（None = 保留原值）
#[derive(Debug, Clone, Default)]
pub struct DraftEdits {
    pub stem: Option<String>,
    pub options: Option<Vec<AnswerOption>>,
    pub acceptable_answers: Option<Vec<String>>,
    pub difficulty: Option<u8>,
    pub explanation: Option<String>,
    pub labels: Option<Vec<String>>,
    pub chapter_tags: Option<Vec<String>>,
}

impl DraftEdits {
    fn merge_into(&self, draft: &mut QuestionDraft) {
        if let Some(stem) = &self.stem {
            draft.stem = stem.clone();
        }
        if let Some(options) = &self.options {
            draft.options = options.clone();
        }
        if let Some(answers) = &self.acceptable_answers {
            draft.acceptable_answers = answers.clone();
        }
        if let Some(difficulty) = self.difficulty {
            draft.difficulty = Some(difficulty);
        }
        if let Some(explanation) = &self.explanation {
            draft.explanation = Some(explanation.clone());
        }
        if let Some(labels) = &self.labels {
            draft.labels = labels.clone();
        }
        if let Some(tags) = &self.chapter_tags {
            draft.chapter_tags = tags.clone();
        }
    }
}

/// 一次审批的结果
#[derive(Debug)]
pub struct ApprovalReport {
    pub created_question_ids: Vec<Id>,
    pub rejected_indexes: Vec<usize>,
    pub status: GenerationStatus,
}

/// AI 生成服务
pub struct GenerationService {
    banks: Arc<dyn BankStore>,
    questions: Arc<dyn QuestionStore>,
    generations: Arc<dyn GenerationStore>,
    taxonomy: Arc<TaxonomyService>,
    client: Arc<dyn ChatClient>,
}

impl GenerationService {
    pub fn new(
        banks: Arc<dyn BankStore>,
        questions: Arc<dyn QuestionStore>,
        generations: Arc<dyn GenerationStore>,
        taxonomy: Arc<TaxonomyService>,
        client: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            banks,
            questions,
            generations,
            taxonomy,
            client,
        }
    }

    /// 生成题目草稿
    ///
    /// # 参数
    /// - `bank_id`: 目标题库；`require_approval` 或直接入库时必填
    /// - `require_approval`: 为 true 时草稿存成 PENDING 批次，不直接建题
    pub async fn generate(
        &self,
        user_id: &str,
        bank_id: Option<&str>,
        request: GenerationRequest,
        require_approval: bool,
    ) -> AppResult<GenerationOutcome> {
        let request = request.normalize()?;

        if require_approval && bank_id.is_none() {
            return Err(AppError::validation(
                "aprovação requer um banco de destino (bankId)",
            ));
        }

        // 有目标题库时先做权限检查，失败就不花钱调模型
        let bank = match bank_id {
            Some(id) => {
                let bank = self
                    .banks
                    .find_bank(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("bank", id))?;
                if !bank.is_owned_by(user_id) {
                    return Err(AppError::permission(
                        "não tens permissão para adicionar questões a este banco",
                    ));
                }
                Some(bank)
            }
            None => None,
        };

        let chat = ChatRequest {
            system: prompt::build_system_prompt(&request.language),
            user: prompt::build_user_prompt(&request),
            json_mode: true,
        };
        let response = self.client.chat(&chat).await?;

        let payload = prompt::extract_json(&response.content)?;
        let items = payload
            .get("questions")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AppError::validation("Formato de resposta inválido"))?;

        let mut drafts: Vec<QuestionDraft> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                QuestionDraft::from_ai_json(item, idx, &request.types, &request.difficulties)
            })
            .collect();

        // 用户提供的章节标签优先于 AI 生成的；labels 只在 AI 没给时回填
        for draft in &mut drafts {
            if !request.chapter_tags.is_empty() {
                draft.chapter_tags = request.chapter_tags.clone();
            }
            if draft.labels.is_empty() {
                draft.labels = request.labels.clone();
            }
        }

        info!(
            "✅ AI 生成完成: {} 条草稿，模型 {}",
            drafts.len(),
            response.model
        );

        let Some(bank) = bank else {
            return Ok(GenerationOutcome::Drafts {
                drafts,
                model: response.model,
            });
        };

        if require_approval {
            let generation = self
                .generations
                .insert_generation(AiGeneration::new_pending(
                    user_id,
                    bank.id.clone(),
                    request.summary(),
                    request.params(),
                    drafts,
                    response.model,
                ))
                .await?;
            return Ok(GenerationOutcome::Pending { generation });
        }

        // 不要求审批：全部直接入库，批次记录落成 APPLIED 供追溯
        let mut questions = Vec::new();
        for draft in &drafts {
            questions.push(self.materialize(user_id, &bank.id, draft.clone()).await?);
        }
        let questions = self.questions.insert_questions(questions).await?;

        let mut generation = AiGeneration::new_pending(
            user_id,
            bank.id.clone(),
            request.summary(),
            request.params(),
            drafts,
            response.model,
        );
        generation.status = GenerationStatus::Applied;
        generation.question_ids = questions.iter().map(|q| q.id.clone()).collect();
        let generation = self.generations.insert_generation(generation).await?;

        Ok(GenerationOutcome::Saved {
            generation,
            questions,
        })
    }

    /// 审批一个 PENDING 批次
    ///
    /// # 参数
    /// - `approvals`: 为 `None` 时视为"全部批准"；列表里没提到的下标
    ///   既不建题也不算拒绝；越界下标静默忽略
    pub async fn approve(
        &self,
        user_id: &str,
        generation_id: &str,
        approvals: Option<&[Approval]>,
    ) -> AppResult<ApprovalReport> {
        let generation = self
            .generations
            .find_generation(generation_id)
            .await?
            .ok_or_else(|| AppError::not_found("generation", generation_id))?;

        if generation.user != user_id {
            return Err(AppError::permission(
                "só o autor da geração pode aprová-la",
            ));
        }
        if generation.status != GenerationStatus::Pending {
            return Err(AppError::validation("a geração já não está PENDING"));
        }

        let total = generation.suggested_questions.len();
        let decisions: HashMap<usize, &Approval> = approvals
            .map(|list| {
                list.iter()
                    .filter(|a| a.index < total)
                    .map(|a| (a.index, a))
                    .collect()
            })
            .unwrap_or_default();

        let mut to_create: Vec<QuestionDraft> = Vec::new();
        let mut rejected_indexes: Vec<usize> = Vec::new();

        for (idx, draft) in generation.suggested_questions.iter().enumerate() {
            match (approvals.is_some(), decisions.get(&idx)) {
                // 未提供 approvals 列表：全部批准
                (false, _) => to_create.push(draft.clone()),
                (true, Some(approval)) if approval.approved => {
                    let mut draft = draft.clone();
                    if let Some(edits) = &approval.edits {
                        edits.merge_into(&mut draft);
                    }
                    to_create.push(draft);
                }
                (true, Some(_)) => rejected_indexes.push(idx),
                // 列表里没提到的下标：不动
                (true, None) => {}
            }
        }

        // 全部建议都被显式拒绝时，批次进入 REJECTED 而不是空的 APPLIED
        let next_status = if to_create.is_empty() && rejected_indexes.len() == total && total > 0 {
            GenerationStatus::Rejected
        } else {
            GenerationStatus::Applied
        };

        // 先在内存里把题目全部落成并校验，失败时批次保持 PENDING
        let mut questions = Vec::new();
        for draft in to_create {
            questions.push(
                self.materialize(user_id, &generation.bank, draft)
                    .await?,
            );
        }
        let question_ids: Vec<Id> = questions.iter().map(|q| q.id.clone()).collect();

        // CAS 翻转状态；没命中说明有并发审批抢先了
        let flipped = self
            .generations
            .set_generation_status_if(
                generation_id,
                GenerationStatus::Pending,
                next_status,
                question_ids.clone(),
            )
            .await?;
        if !flipped {
            warn!("生成批次 {} 的并发审批冲突", generation_id);
            return Err(AppError::validation("a geração já não está PENDING"));
        }

        if !questions.is_empty() {
            if let Err(err) = self.questions.insert_questions(questions).await {
                // 题目没落下去：把批次翻回 PENDING，保留可重审的状态，
                // 避免留下引用不存在题目的终态批次
                let restored = self
                    .generations
                    .set_generation_status_if(
                        generation_id,
                        next_status,
                        GenerationStatus::Pending,
                        Vec::new(),
                    )
                    .await
                    .unwrap_or(false);
                if !restored {
                    error!("批次 {} 回滚到 PENDING 失败", generation_id);
                }
                return Err(err);
            }
        }

        info!(
            "✅ 审批完成: 批次 {}，建题 {}，拒绝 {}，状态 {:?}",
            generation_id,
            question_ids.len(),
            rejected_indexes.len(),
            next_status
        );

        Ok(ApprovalReport {
            created_question_ids: question_ids,
            rejected_indexes,
            status: next_status,
        })
    }

    /// 把草稿落成规范题目（source=AI），校验失败即整体失败
    async fn materialize(
        &self,
        user_id: &str,
        bank_id: &str,
        draft: QuestionDraft,
    ) -> AppResult<Question> {
        let labels = self
            .taxonomy
            .resolve_label_ids(user_id, &draft.labels)
            .await?;
        let chapter_tags = self
            .taxonomy
            .resolve_chapter_tag_ids(user_id, &draft.chapter_tags)
            .await?;

        let now = Utc::now();
        let question = Question {
            id: crate::models::new_id(),
            bank_id: bank_id.to_string(),
            question_type: draft.question_type.unwrap_or(QuestionType::MultipleChoice),
            stem: draft.stem.trim().to_string(),
            options: draft.options,
            acceptable_answers: draft.acceptable_answers,
            difficulty: draft.difficulty.unwrap_or(2),
            usage_count: 0,
            labels,
            chapter_tags,
            source: QuestionSource::Ai,
            created_by: user_id.to_string(),
            explanation: draft.explanation,
            feedback_correct: None,
            feedback_incorrect: None,
            created_at: now,
            updated_at: now,
        };
        question.validate_for_persistence()?;
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ChatResponse;
    use crate::error::ProviderError;
    use crate::models::QuestionBank;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    /// 按脚本依次吐响应的假客户端
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    }

    impl ScriptedClient {
        fn with_json(payload: serde_json::Value) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from([Ok(ChatResponse {
                    content: payload.to_string(),
                    model: "llama-3.3-70b-versatile".to_string(),
                })])),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Unknown("脚本耗尽".to_string())))
        }
    }

    /// 下一次 insert_questions 返回存储错误的包装
    struct FlakyQuestionStore {
        inner: Arc<MemoryStore>,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl QuestionStore for FlakyQuestionStore {
        async fn insert_questions(&self, questions: Vec<Question>) -> AppResult<Vec<Question>> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AppError::Store("ligação perdida".to_string()));
            }
            self.inner.insert_questions(questions).await
        }

        async fn find_question(&self, id: &str) -> AppResult<Option<Question>> {
            self.inner.find_question(id).await
        }

        async fn list_questions_by_bank(&self, bank_id: &str) -> AppResult<Vec<Question>> {
            self.inner.list_questions_by_bank(bank_id).await
        }

        async fn update_question(&self, question: &Question) -> AppResult<()> {
            self.inner.update_question(question).await
        }

        async fn delete_question(&self, id: &str) -> AppResult<bool> {
            self.inner.delete_question(id).await
        }

        async fn increment_usage(&self, ids: &[crate::models::Id]) -> AppResult<()> {
            self.inner.increment_usage(ids).await
        }
    }

    fn three_suggestions() -> serde_json::Value {
        json!({
            "questions": [
                {
                    "type": "MULTIPLE_CHOICE",
                    "stem": "Qual é a capital de Portugal?",
                    "difficulty": 2,
                    "options": [
                        { "text": "Lisboa", "isCorrect": true },
                        { "text": "Porto", "isCorrect": false }
                    ],
                    "chapterTags": ["Geografia"]
                },
                {
                    "type": "TRUE_FALSE",
                    "stem": "O Tejo nasce em Espanha.",
                    "difficulty": 1,
                    "options": [
                        { "text": "Verdadeiro", "isCorrect": true },
                        { "text": "Falso", "isCorrect": false }
                    ]
                },
                {
                    "type": "OPEN",
                    "stem": "Explica o ciclo da água.",
                    "difficulty": 3
                }
            ]
        })
    }

    async fn setup(
        payload: serde_json::Value,
    ) -> (GenerationService, Arc<MemoryStore>, String) {
        let store = Arc::new(MemoryStore::new());
        let bank = store
            .insert_bank(QuestionBank::new("Banco IA", "u1"))
            .await
            .unwrap();
        let taxonomy = Arc::new(TaxonomyService::new(store.clone()));
        let service = GenerationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            taxonomy,
            Arc::new(ScriptedClient::with_json(payload)),
        );
        (service, store, bank.id)
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            topic: "geografia de Portugal".to_string(),
            num_questions: 3,
            ..GenerationRequest::default()
        }
    }

    async fn pending_generation(
        service: &GenerationService,
        bank_id: &str,
    ) -> AiGeneration {
        match service
            .generate("u1", Some(bank_id), request(), true)
            .await
            .unwrap()
        {
            GenerationOutcome::Pending { generation } => generation,
            _ => panic!("esperava PENDING"),
        }
    }

    #[tokio::test]
    async fn test_generate_drafts_only() {
        let (service, _, _) = setup(three_suggestions()).await;
        let outcome = service.generate("u1", None, request(), false).await.unwrap();
        match outcome {
            GenerationOutcome::Drafts { drafts, model } => {
                assert_eq!(drafts.len(), 3);
                assert_eq!(model, "llama-3.3-70b-versatile");
                assert_eq!(drafts[0].chapter_tags, vec!["Geografia"]);
            }
            _ => panic!("esperava apenas drafts"),
        }
    }

    #[tokio::test]
    async fn test_generate_requires_bank_for_approval() {
        let (service, _, _) = setup(three_suggestions()).await;
        let err = service
            .generate("u1", None, request(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_generate_checks_ownership_before_provider() {
        let (service, _, bank_id) = setup(three_suggestions()).await;
        let err = service
            .generate("u2", Some(&bank_id), request(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
    }

    #[tokio::test]
    async fn test_user_chapter_tags_take_precedence() {
        let (service, _, _) = setup(three_suggestions()).await;
        let req = GenerationRequest {
            chapter_tags: vec!["Hidrografia".to_string()],
            ..request()
        };
        let outcome = service.generate("u1", None, req, false).await.unwrap();
        match outcome {
            GenerationOutcome::Drafts { drafts, .. } => {
                for draft in &drafts {
                    assert_eq!(draft.chapter_tags, vec!["Hidrografia"]);
                }
            }
            _ => panic!("esperava drafts"),
        }
    }

    #[tokio::test]
    async fn test_partial_approval() {
        let (service, store, bank_id) = setup(three_suggestions()).await;
        let generation = pending_generation(&service, &bank_id).await;

        let approvals = vec![Approval::accept(0), Approval::reject(1)];
        let report = service
            .approve("u1", &generation.id, Some(&approvals))
            .await
            .unwrap();

        // 下标 2 没被提到：既不建题也不算拒绝
        assert_eq!(report.created_question_ids.len(), 1);
        assert_eq!(report.rejected_indexes, vec![1]);
        assert_eq!(report.status, GenerationStatus::Applied);

        let questions = store.list_questions_by_bank(&bank_id).await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].stem, "Qual é a capital de Portugal?");
        assert_eq!(questions[0].source, QuestionSource::Ai);
    }

    #[tokio::test]
    async fn test_approve_twice_fails() {
        let (service, _, bank_id) = setup(three_suggestions()).await;
        let generation = pending_generation(&service, &bank_id).await;

        service.approve("u1", &generation.id, None).await.unwrap();
        let err = service
            .approve("u1", &generation.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_omitted_approvals_approve_all() {
        let (service, store, bank_id) = setup(three_suggestions()).await;
        let generation = pending_generation(&service, &bank_id).await;

        let report = service.approve("u1", &generation.id, None).await.unwrap();
        assert_eq!(report.created_question_ids.len(), 3);
        assert!(report.rejected_indexes.is_empty());

        let stored = store
            .find_generation(&generation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, GenerationStatus::Applied);
        assert_eq!(stored.question_ids, report.created_question_ids);
    }

    #[tokio::test]
    async fn test_all_rejected_becomes_rejected() {
        let (service, store, bank_id) = setup(three_suggestions()).await;
        let generation = pending_generation(&service, &bank_id).await;

        let approvals = vec![
            Approval::reject(0),
            Approval::reject(1),
            Approval::reject(2),
        ];
        let report = service
            .approve("u1", &generation.id, Some(&approvals))
            .await
            .unwrap();
        assert_eq!(report.status, GenerationStatus::Rejected);
        assert!(report.created_question_ids.is_empty());

        let stored = store
            .find_generation(&generation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, GenerationStatus::Rejected);
        assert!(store
            .list_questions_by_bank(&bank_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_index_ignored() {
        let (service, _, bank_id) = setup(three_suggestions()).await;
        let generation = pending_generation(&service, &bank_id).await;

        let approvals = vec![Approval::accept(0), Approval::reject(99)];
        let report = service
            .approve("u1", &generation.id, Some(&approvals))
            .await
            .unwrap();
        assert_eq!(report.created_question_ids.len(), 1);
        assert!(report.rejected_indexes.is_empty());
    }

    #[tokio::test]
    async fn test_approval_edits_merged() {
        let (service, store, bank_id) = setup(three_suggestions()).await;
        let generation = pending_generation(&service, &bank_id).await;

        let edits = DraftEdits {
            stem: Some("Qual é a capital de Portugal? (revista)".to_string()),
            difficulty: Some(4),
            ..DraftEdits::default()
        };
        let approvals = vec![Approval::accept_with(0, edits)];
        let report = service
            .approve("u1", &generation.id, Some(&approvals))
            .await
            .unwrap();
        assert_eq!(report.created_question_ids.len(), 1);

        let q = store
            .find_question(&report.created_question_ids[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(q.stem, "Qual é a capital de Portugal? (revista)");
        assert_eq!(q.difficulty, 4);
        // 未编辑的字段保留原草稿值
        assert!(q.options[0].is_correct);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_to_pending() {
        let store = Arc::new(MemoryStore::new());
        let bank = store
            .insert_bank(QuestionBank::new("Banco IA", "u1"))
            .await
            .unwrap();
        let flaky = Arc::new(FlakyQuestionStore {
            inner: store.clone(),
            fail_next: AtomicBool::new(false),
        });
        let taxonomy = Arc::new(TaxonomyService::new(store.clone()));
        let service = GenerationService::new(
            store.clone(),
            flaky.clone(),
            store.clone(),
            taxonomy,
            Arc::new(ScriptedClient::with_json(three_suggestions())),
        );
        let generation = pending_generation(&service, &bank.id).await;

        flaky.fail_next.store(true, Ordering::SeqCst);
        let err = service.approve("u1", &generation.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));

        // 批次翻回 PENDING，不会留下引用幽灵题目的 APPLIED 终态
        let stored = store
            .find_generation(&generation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, GenerationStatus::Pending);
        assert!(stored.question_ids.is_empty());

        // 重审成功
        let report = service.approve("u1", &generation.id, None).await.unwrap();
        assert_eq!(report.created_question_ids.len(), 3);
        assert_eq!(
            store.list_questions_by_bank(&bank.id).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_approve_foreign_generation_denied() {
        let (service, _, bank_id) = setup(three_suggestions()).await;
        let generation = pending_generation(&service, &bank_id).await;

        let err = service
            .approve("u2", &generation.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
    }

    #[tokio::test]
    async fn test_save_without_approval() {
        let (service, store, bank_id) = setup(three_suggestions()).await;
        let outcome = service
            .generate("u1", Some(&bank_id), request(), false)
            .await
            .unwrap();
        match outcome {
            GenerationOutcome::Saved {
                generation,
                questions,
            } => {
                assert_eq!(questions.len(), 3);
                assert_eq!(generation.status, GenerationStatus::Applied);
                assert_eq!(generation.question_ids.len(), 3);
            }
            _ => panic!("esperava Saved"),
        }
        assert_eq!(store.list_questions_by_bank(&bank_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_ai_payload() {
        let (service, _, _) = setup(json!({ "resposta": "sem questões" })).await;
        let err = service
            .generate("u1", None, request(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
