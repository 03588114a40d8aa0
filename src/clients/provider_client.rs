/// LLM 供应商网关
///
/// 封装所有与 chat-completions 接口相关的调用逻辑：超时、重试、
/// 模型降级、response_format 降级和错误分类。服务层只依赖
/// `ChatClient` trait，测试时注入脚本化实现。
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::ProviderError;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 4096;

/// 一次聊天请求
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// 系统消息（可为空）
    pub system: String,
    /// 用户消息
    pub user: String,
    /// 是否要求 JSON 输出（response_format: json_object）
    pub json_mode: bool,
}

/// 聊天响应
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    /// 实际响应的模型（降级后可能不是首选模型）
    pub model: String,
}

/// 聊天客户端接口
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// 基于 reqwest 的供应商客户端
pub struct ProviderClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

/// 单次调用的失败形态
enum CallFailure {
    /// 供应商不支持 response_format，可去掉后重试一次
    JsonModeRejected,
    /// 传输层失败（连接、超时），整请求可重试
    Transport(ProviderError),
    /// 供应商返回的业务错误（4xx/5xx），不做同模型重试
    Provider(ProviderError),
}

impl ProviderClient {
    /// 创建新的供应商客户端
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Unknown(format!("HTTP 客户端初始化失败: {}", e)))?;
        Ok(Self { http, config })
    }

    fn build_body(&self, model: &str, request: &ChatRequest, json_mode: bool) -> JsonValue {
        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(json!({ "role": "system", "content": request.system }));
        }
        messages.push(json!({ "role": "user", "content": request.user }));

        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    /// 对单个模型发起一次调用
    async fn call_model(
        &self,
        model: &str,
        request: &ChatRequest,
        json_mode: bool,
    ) -> Result<ChatResponse, CallFailure> {
        debug!("正在调用 LLM API，模型: {}", model);

        let url = format!("{}/chat/completions", self.config.base_url);
        let mut req = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_body(model, request, json_mode));
        for (key, value) in &self.config.extra_headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                CallFailure::Transport(ProviderError::Timeout)
            } else {
                CallFailure::Transport(ProviderError::Unknown(format!("请求发送失败: {}", e)))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::BAD_REQUEST && json_mode && body.contains("response_format") {
                return Err(CallFailure::JsonModeRejected);
            }
            return Err(CallFailure::Provider(classify_status(status, &body, model)));
        }

        let payload: JsonValue = response.json().await.map_err(|e| {
            CallFailure::Provider(ProviderError::Unknown(format!("响应解析失败: {}", e)))
        })?;

        let content = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                CallFailure::Provider(ProviderError::Unknown("LLM 返回内容为空".to_string()))
            })?;

        let responded_model = payload
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(model)
            .to_string();

        debug!("LLM API 调用成功，模型: {}", responded_model);
        Ok(ChatResponse {
            content: content.trim().to_string(),
            model: responded_model,
        })
    }

    /// 单模型调用，带 response_format 降级和超时重试
    async fn call_with_retries(
        &self,
        model: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        let mut json_mode = request.json_mode;
        let mut attempt = 0u32;

        loop {
            match self.call_model(model, request, json_mode).await {
                Ok(response) => return Ok(response),
                Err(CallFailure::JsonModeRejected) => {
                    // 只降级一次，降级后 json_mode 不会再被拒
                    warn!("模型 {} 不支持 response_format，改用纯文本模式重试", model);
                    json_mode = false;
                }
                Err(CallFailure::Transport(err)) => {
                    if attempt < self.config.max_retries {
                        attempt += 1;
                        warn!("模型 {} 调用失败（第 {} 次重试）: {}", model, attempt, err);
                        continue;
                    }
                    return Err(err);
                }
                Err(CallFailure::Provider(err)) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl ChatClient for ProviderClient {
    /// 发送聊天请求
    ///
    /// 首选模型失败且错误可重试时，沿降级模型列表依次尝试；
    /// 全部失败返回最后一个错误。
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut models = vec![self.config.model.as_str()];
        models.extend(self.config.fallback_models.iter().map(String::as_str));

        let mut last_err = ProviderError::Unknown("未配置任何模型".to_string());
        for model in models {
            match self.call_with_retries(model, request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retriable() => {
                    warn!("模型 {} 不可用，尝试下一个降级模型: {}", model, err);
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err)
    }
}

/// 按状态码和响应体分类供应商错误
fn classify_status(status: StatusCode, body: &str, model: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::InvalidCredentials,
        402 => ProviderError::NoCredits,
        404 => ProviderError::ModelUnavailable(model.to_string()),
        429 => {
            let lower = body.to_lowercase();
            if lower.contains("credit") || lower.contains("quota") {
                ProviderError::NoCredits
            } else {
                // 速率限制：换模型继续
                ProviderError::ModelUnavailable(model.to_string())
            }
        }
        code => ProviderError::Unknown(format!("HTTP {}: {}", code, truncate_body(body))),
    }
}

fn truncate_body(body: &str) -> &str {
    let limit = 200;
    match body.char_indices().nth(limit) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderName;
    use std::time::Duration;

    fn config() -> ProviderConfig {
        ProviderConfig {
            name: ProviderName::Groq,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: "gk".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            fallback_models: Vec::new(),
            extra_headers: vec![("X-Title".to_string(), "QForge".to_string())],
            timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }

    #[test]
    fn test_build_body_json_mode() {
        let client = ProviderClient::new(config()).unwrap();
        let request = ChatRequest {
            system: "és um professor".to_string(),
            user: "gera perguntas".to_string(),
            json_mode: true,
        };
        let body = client.build_body("m1", &request, true);
        assert_eq!(body["model"], "m1");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["max_tokens"], 4096);
    }

    #[test]
    fn test_build_body_without_system() {
        let client = ProviderClient::new(config()).unwrap();
        let request = ChatRequest {
            system: String::new(),
            user: "olá".to_string(),
            json_mode: false,
        };
        let body = client.build_body("m1", &request, false);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_classify_auth_errors() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "", "m"),
            ProviderError::InvalidCredentials
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "", "m"),
            ProviderError::InvalidCredentials
        ));
    }

    #[test]
    fn test_classify_credits_and_rate_limit() {
        assert!(matches!(
            classify_status(StatusCode::PAYMENT_REQUIRED, "", "m"),
            ProviderError::NoCredits
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "out of credits", "m"),
            ProviderError::NoCredits
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "rate limited", "m"),
            ProviderError::ModelUnavailable(_)
        ));
    }

    #[test]
    fn test_classify_model_unavailable() {
        let err = classify_status(StatusCode::NOT_FOUND, "", "modelo-x");
        assert!(matches!(err, ProviderError::ModelUnavailable(m) if m == "modelo-x"));
    }
}
