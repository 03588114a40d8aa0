//! 生成题目的提示词构造
//!
//! 系统提示固定输出格式（JSON 包 questions 数组），用户提示拼接
//! 主题 / 参考内容 / 类型与难度要求。模型偶尔在 JSON 外面包一层
//! 客套话，`extract_json` 负责把大括号区间抠出来。

use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};
use crate::models::question::DIFFICULTY_LABELS;
use crate::models::{GenerationParams, QuestionType};

/// 生成请求的完整描述（服务层入口参数）
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// 主题（topic 与 content 至少一个非空）
    pub topic: String,
    /// 参考内容（讲义、教材节选）
    pub content: String,
    pub num_questions: usize,
    pub types: Vec<QuestionType>,
    pub difficulties: Vec<u8>,
    /// 建议的章节标签名称
    pub chapter_tags: Vec<String>,
    /// 建议的标签名称（AI 没返回 labels 时的回填值）
    pub labels: Vec<String>,
    pub additional_instructions: String,
    pub language: String,
}

impl GenerationRequest {
    /// 填充缺省值并校验
    pub fn normalize(mut self) -> AppResult<Self> {
        if self.topic.trim().is_empty() && self.content.trim().is_empty() {
            return Err(AppError::validation(
                "É necessário fornecer 'topic' ou 'content'",
            ));
        }
        if self.num_questions == 0 {
            self.num_questions = 5;
        }
        if self.types.is_empty() {
            self.types.push(QuestionType::MultipleChoice);
        }
        if self.difficulties.is_empty() {
            self.difficulties.push(2);
        }
        if self.language.trim().is_empty() {
            self.language = "pt-PT".to_string();
        }
        Ok(self)
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            num_questions: self.num_questions,
            types: self.types.clone(),
            difficulties: self.difficulties.clone(),
            language: self.language.clone(),
        }
    }

    /// 持久化到批次记录里的请求摘要
    pub fn summary(&self) -> String {
        if !self.topic.trim().is_empty() {
            self.topic.trim().to_string()
        } else {
            let content = self.content.trim();
            content.chars().take(200).collect()
        }
    }
}

/// 系统提示词
pub fn build_system_prompt(language: &str) -> String {
    let lang = if language == "pt-PT" {
        "português de Portugal"
    } else {
        language
    };

    format!(
        r#"És um especialista em criação de questões educativas para avaliação académica.
Gera questões de alta qualidade em {lang}.

REGRAS IMPORTANTES:
1. As questões devem ser claras, precisas e sem ambiguidades
2. Para escolha múltipla: cria 4 opções com distratores plausíveis (apenas 1 correta)
3. Para verdadeiro/falso: a afirmação deve ser claramente verdadeira OU falsa
4. Adapta a complexidade ao nível de dificuldade pedido
5. Responde SEMPRE em JSON válido

FORMATO DE RESPOSTA (JSON):
{{
  "questions": [
    {{
      "type": "MULTIPLE_CHOICE|TRUE_FALSE|SHORT_ANSWER|OPEN",
      "stem": "Enunciado da questão",
      "difficulty": 1,
      "labels": ["Época Normal"],
      "chapterTags": ["HTML", "CSS"],
      "options": [
        {{ "text": "Opção A", "isCorrect": false }},
        {{ "text": "Opção B", "isCorrect": true }},
        {{ "text": "Opção C", "isCorrect": false }},
        {{ "text": "Opção D", "isCorrect": false }}
      ],
      "acceptableAnswers": ["resposta1", "resposta2"],
      "explanation": "Explicação da resposta correta"
    }}
  ]
}}

NOTAS:
- "options" só é usado em MULTIPLE_CHOICE e TRUE_FALSE
- "acceptableAnswers" só é usado em SHORT_ANSWER e OPEN
- "difficulty" deve ser um inteiro: 1=Básico, 2=Normal, 3=Difícil, 4=Muito Difícil
- "labels" deve ser array de strings descritivas como ["Época Normal", "Recurso", "Exame Final"]
- "chapterTags" deve ser array de strings com tópicos/conceitos relevantes (ex: ["HTML", "CSS", "JavaScript"])
  IMPORTANTE: Os chapterTags devem ser nomes descritivos e específicos do conteúdo/tópico da questão
  Não uses IDs ou códigos, apenas nomes legíveis como "Programação Linear", "Método Simplex", "HTML Básico", etc.
- Inclui sempre "explanation" para feedback ao aluno"#
    )
}

/// 用户提示词
pub fn build_user_prompt(request: &GenerationRequest) -> String {
    let type_descriptions = request
        .types
        .iter()
        .map(|t| t.prompt_label())
        .collect::<Vec<_>>()
        .join(", ");

    let difficulty_descriptions = request
        .difficulties
        .iter()
        .map(|d| {
            let label = DIFFICULTY_LABELS.get(d).copied().unwrap_or("?");
            format!("{} ({})", d, label)
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = format!(
        "Gera {} questão(ões) sobre o seguinte:\n\n",
        request.num_questions
    );

    if !request.topic.trim().is_empty() {
        prompt.push_str(&format!("TÓPICO: {}\n", request.topic.trim()));
    }

    if !request.chapter_tags.is_empty() {
        prompt.push_str(&format!(
            "CAPÍTULOS/TAGS SUGERIDOS: {} (usa estes como referência mas podes adicionar outros relevantes)\n",
            request.chapter_tags.join(", ")
        ));
    }

    if !request.content.trim().is_empty() {
        prompt.push_str(&format!(
            "\nCONTEÚDO DE REFERÊNCIA:\n{}\n",
            request.content.trim()
        ));
    }

    prompt.push_str(&format!(
        "\nREQUISITOS:\n\
         - Tipos de questão: {}\n\
         - Níveis de dificuldade: {}\n\
         - Distribui as questões pelos tipos e dificuldades pedidos\n\
         - Para cada questão, identifica 1-3 chapter tags relevantes (tópicos/conceitos abordados)\n\
         - Usa nomes descritivos para os chapter tags (ex: \"HTML Básico\", \"CSS Flexbox\", \"JavaScript Arrays\")",
        type_descriptions, difficulty_descriptions
    ));

    if !request.additional_instructions.trim().is_empty() {
        prompt.push_str(&format!(
            "\n\nINSTRUÇÕES ADICIONAIS: {}",
            request.additional_instructions.trim()
        ));
    }

    prompt.push_str("\n\nResponde APENAS com o JSON, sem texto adicional.");
    prompt
}

/// 从模型响应里提取 JSON
///
/// 先整体解析；失败时取第一个 `{` 到最后一个 `}` 的区间再试。
pub fn extract_json(raw: &str) -> AppResult<JsonValue> {
    if let Ok(value) = serde_json::from_str::<JsonValue>(raw) {
        return Ok(value);
    }

    let start = raw.find('{');
    let end = raw.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<JsonValue>(&raw[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(AppError::validation("Resposta da IA não é JSON válido"))
}
