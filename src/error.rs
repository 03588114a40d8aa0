//! 应用程序错误类型
//!
//! 错误分类原则：
//! - `Validation`：调用方输入有问题，修正输入即可恢复
//! - `NotFound` / `Permission`：资源不存在 / 无权访问
//! - `Provider`：LLM 供应商调用失败，细分为超时、密钥无效、额度不足等
//! - `Store`：持久化层故障
//!
//! 单个 GIFT/Aiken/Moodle 块的解析失败不属于错误，导入时只计数跳过；
//! 只有整批导入零个有效题目时才返回 `Validation`。

use thiserror::Error;

/// 应用程序错误
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验失败（题目结构不完整、格式不支持等）
    #[error("校验失败: {0}")]
    Validation(String),

    /// 资源不存在
    #[error("{kind} 不存在: {id}")]
    NotFound {
        /// 资源类型（bank / question / generation / tag 等）
        kind: &'static str,
        id: String,
    },

    /// 无权访问目标资源
    #[error("无权限: {0}")]
    Permission(String),

    /// LLM 供应商调用失败
    #[error("LLM 供应商错误: {0}")]
    Provider(#[from] ProviderError),

    /// 持久化层错误
    #[error("存储错误: {0}")]
    Store(String),
}

/// LLM 供应商错误
///
/// 对外只暴露这几种稳定的错误类别，不泄漏底层传输错误细节。
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 请求超时（连接或响应超出时限）
    #[error("LLM 请求超时")]
    Timeout,

    /// API 密钥无效
    #[error("LLM API 密钥无效")]
    InvalidCredentials,

    /// 账户额度不足
    #[error("LLM 账户额度不足")]
    NoCredits,

    /// 模型不可用
    #[error("模型不可用: {0}")]
    ModelUnavailable(String),

    /// 其他未分类错误
    #[error("LLM 调用失败: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// 是否值得换模型重试
    ///
    /// 超时、模型不可用、额度不足（OpenRouter 免费模型常见）可以沿
    /// 降级模型列表继续尝试；密钥无效则立即放弃。
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout
                | ProviderError::ModelUnavailable(_)
                | ProviderError::NoCredits
        )
    }
}

impl AppError {
    /// 创建资源不存在错误
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        AppError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// 创建校验错误
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// 创建权限错误
    pub fn permission(msg: impl Into<String>) -> Self {
        AppError::Permission(msg.into())
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_retriable() {
        assert!(ProviderError::Timeout.is_retriable());
        assert!(ProviderError::NoCredits.is_retriable());
        assert!(ProviderError::ModelUnavailable("m".into()).is_retriable());
        assert!(!ProviderError::InvalidCredentials.is_retriable());
        assert!(!ProviderError::Unknown("x".into()).is_retriable());
    }

    #[test]
    fn test_not_found_display() {
        let err = AppError::not_found("bank", "abc123");
        assert_eq!(err.to_string(), "bank 不存在: abc123");
    }
}
