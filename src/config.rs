//! 程序配置
//!
//! 所有供应商相关配置在这里集中定义，构造时显式注入 Provider 网关，
//! 降级模型列表是有序的可注入参数，不在调用链里到处读环境变量。

use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- Groq 配置 ---
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub groq_model: String,
    // --- OpenRouter 配置 ---
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    pub openrouter_model: String,
    /// OpenRouter 降级模型列表（按顺序尝试）
    pub openrouter_fallback_models: Vec<String>,
    /// OpenRouter 要求的来源站点头（HTTP-Referer）
    pub openrouter_site: String,
    /// OpenRouter 应用名头（X-Title）
    pub openrouter_title: String,
    // --- 请求策略 ---
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 网络/超时错误的整请求重试次数（不含 4xx）
    pub max_retries: u32,
    /// 生成题目的默认语言
    pub default_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groq_api_key: String::new(),
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            groq_model: "llama-3.3-70b-versatile".to_string(),
            openrouter_api_key: String::new(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            openrouter_model: "arcee-ai/trinity-large-preview:free".to_string(),
            openrouter_fallback_models: vec![
                "meta-llama/llama-3.3-70b-instruct:free".to_string(),
                "google/gemma-2-9b-it:free".to_string(),
                "mistralai/mistral-7b-instruct:free".to_string(),
            ],
            openrouter_site: "http://localhost:5173".to_string(),
            openrouter_title: "QForge".to_string(),
            request_timeout_secs: 60,
            max_retries: 2,
            default_language: "pt-PT".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            groq_api_key: std::env::var("GROQ_API_KEY").unwrap_or(default.groq_api_key),
            groq_base_url: std::env::var("GROQ_BASE_URL").unwrap_or(default.groq_base_url),
            groq_model: std::env::var("GROQ_MODEL").unwrap_or(default.groq_model),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or(default.openrouter_api_key),
            openrouter_base_url: std::env::var("OPENROUTER_BASE_URL").unwrap_or(default.openrouter_base_url),
            openrouter_model: std::env::var("OPENROUTER_MODEL").unwrap_or(default.openrouter_model),
            openrouter_fallback_models: std::env::var("OPENROUTER_FALLBACK_MODELS")
                .map(|v| v.split(',').map(|m| m.trim().to_string()).filter(|m| !m.is_empty()).collect())
                .unwrap_or(default.openrouter_fallback_models),
            openrouter_site: std::env::var("OPENROUTER_SITE").unwrap_or(default.openrouter_site),
            openrouter_title: std::env::var("OPENROUTER_TITLE").unwrap_or(default.openrouter_title),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            default_language: std::env::var("DEFAULT_LANGUAGE").unwrap_or(default.default_language),
        }
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Store(format!("读取配置文件失败 ({}): {}", path, e)))?;
        toml::from_str(&raw)
            .map_err(|e| AppError::validation(format!("配置文件解析失败: {}", e)))
    }

    /// 选择当前可用的供应商（Groq 优先，其次 OpenRouter）
    ///
    /// # 返回
    /// 两个密钥都未配置时返回 `None`
    pub fn active_provider(&self) -> Option<ProviderConfig> {
        if !self.groq_api_key.is_empty() {
            return Some(ProviderConfig {
                name: ProviderName::Groq,
                base_url: self.groq_base_url.clone(),
                api_key: self.groq_api_key.clone(),
                model: self.groq_model.clone(),
                fallback_models: Vec::new(),
                extra_headers: Vec::new(),
                timeout: Duration::from_secs(self.request_timeout_secs),
                max_retries: self.max_retries,
            });
        }

        if !self.openrouter_api_key.is_empty() {
            return Some(ProviderConfig {
                name: ProviderName::OpenRouter,
                base_url: self.openrouter_base_url.clone(),
                api_key: self.openrouter_api_key.clone(),
                model: self.openrouter_model.clone(),
                fallback_models: self.openrouter_fallback_models.clone(),
                extra_headers: vec![
                    ("HTTP-Referer".to_string(), self.openrouter_site.clone()),
                    ("X-Title".to_string(), self.openrouter_title.clone()),
                ],
                timeout: Duration::from_secs(self.request_timeout_secs),
                max_retries: self.max_retries,
            });
        }

        None
    }
}

/// 供应商标识
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderName {
    Groq,
    OpenRouter,
}

/// 单个供应商的完整调用配置
///
/// 网关只认识这个结构，不关心配置来自环境变量还是文件。
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub base_url: String,
    pub api_key: String,
    /// 首选模型
    pub model: String,
    /// 首选模型失败后按顺序尝试的模型
    pub fallback_models: Vec<String>,
    /// 附加请求头（OpenRouter 的归因头等）
    pub extra_headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub max_retries: u32,
}
