// AI Service Error Types

use thiserror::Error;

use crate::models::Language;

/// AI Service Error
#[derive(Error, Debug)]
pub enum AIError {
    /// Nothing to summarize
    #[error("Content is empty")]
    EmptyContent,

    /// Provider config has no API key
    #[error("API key is not configured")]
    MissingApiKey,

    /// No adapter registered under this provider id
    #[error("Unsupported AI provider: {0}")]
    UnknownProvider(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Local rate window exhausted
    #[error("Too many requests, retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Authentication failed
    #[error("{0}")]
    AuthFailed(String),

    /// Non-2xx response; `message` is the provider's own text or "API error: <status>"
    #[error("{message}")]
    ApiError { status: u16, message: String },

    /// Connection failed
    #[error("Cannot connect to AI service: {0}")]
    ConnectionFailed(String),

    /// Request timeout
    #[error("AI service response timeout")]
    Timeout,

    /// Provider reported an error inside the stream
    #[error("Stream error: {0}")]
    StreamError(String),

    /// JSON parsing error
    #[error("Response parse error: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for AIError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AIError::Timeout
        } else {
            AIError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AIError {
    fn from(err: serde_json::Error) -> Self {
        AIError::ParseError(err.to_string())
    }
}

/// Result type for AI operations
pub type AIResult<T> = Result<T, AIError>;

/// Stable error codes for hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIErrorCode {
    EmptyContent,
    MissingApiKey,
    UnknownProvider,
    InvalidConfig,
    RateLimited,
    AuthFailed,
    ModelNotFound,
    ProviderRateLimited,
    ServerError,
    ApiError,
    ConnectionFailed,
    Timeout,
    StreamError,
    ParseError,
}

impl AIErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AIErrorCode::EmptyContent => "AI_EMPTY_CONTENT",
            AIErrorCode::MissingApiKey => "AI_MISSING_API_KEY",
            AIErrorCode::UnknownProvider => "AI_UNKNOWN_PROVIDER",
            AIErrorCode::InvalidConfig => "AI_INVALID_CONFIG",
            AIErrorCode::RateLimited => "AI_RATE_LIMITED",
            AIErrorCode::AuthFailed => "AI_AUTH_FAILED",
            AIErrorCode::ModelNotFound => "AI_MODEL_NOT_FOUND",
            AIErrorCode::ProviderRateLimited => "AI_PROVIDER_RATE_LIMITED",
            AIErrorCode::ServerError => "AI_SERVER_ERROR",
            AIErrorCode::ApiError => "AI_API_ERROR",
            AIErrorCode::ConnectionFailed => "AI_CONNECTION_FAILED",
            AIErrorCode::Timeout => "AI_TIMEOUT",
            AIErrorCode::StreamError => "AI_STREAM_ERROR",
            AIErrorCode::ParseError => "AI_PARSE_ERROR",
        }
    }
}

impl AIError {
    /// Map a non-2xx status and the provider's message (if any) to an error
    pub fn from_status(status: u16, provider_message: Option<String>) -> Self {
        let message = provider_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("API error: {}", status));
        match status {
            401 | 403 => AIError::AuthFailed(message),
            _ => AIError::ApiError { status, message },
        }
    }

    pub fn code(&self) -> AIErrorCode {
        match self {
            AIError::EmptyContent => AIErrorCode::EmptyContent,
            AIError::MissingApiKey => AIErrorCode::MissingApiKey,
            AIError::UnknownProvider(_) => AIErrorCode::UnknownProvider,
            AIError::InvalidConfig(_) => AIErrorCode::InvalidConfig,
            AIError::RateLimited { .. } => AIErrorCode::RateLimited,
            AIError::AuthFailed(_) => AIErrorCode::AuthFailed,
            AIError::ApiError { status, .. } => match status {
                404 => AIErrorCode::ModelNotFound,
                429 => AIErrorCode::ProviderRateLimited,
                500..=599 => AIErrorCode::ServerError,
                _ => AIErrorCode::ApiError,
            },
            AIError::ConnectionFailed(_) => AIErrorCode::ConnectionFailed,
            AIError::Timeout => AIErrorCode::Timeout,
            AIError::StreamError(_) => AIErrorCode::StreamError,
            AIError::ParseError(_) => AIErrorCode::ParseError,
        }
    }

    /// Transient failures worth retrying later
    pub fn is_retryable(&self) -> bool {
        match self {
            AIError::RateLimited { .. } | AIError::ConnectionFailed(_) | AIError::Timeout => true,
            AIError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short localized message without provider payloads
    pub fn to_user_message(&self, language: Language) -> String {
        let zh = !matches!(language, Language::En);
        match (self.code(), zh) {
            (AIErrorCode::EmptyContent, true) => "内容为空，无法生成摘要".to_string(),
            (AIErrorCode::EmptyContent, false) => "There is no content to summarize".to_string(),
            (AIErrorCode::MissingApiKey, true) => "请先配置 API 密钥".to_string(),
            (AIErrorCode::MissingApiKey, false) => "Please configure an API key first".to_string(),
            (AIErrorCode::UnknownProvider, true) => "不支持的 AI 提供商".to_string(),
            (AIErrorCode::UnknownProvider, false) => "Unsupported AI provider".to_string(),
            (AIErrorCode::InvalidConfig, true) => "配置无效".to_string(),
            (AIErrorCode::InvalidConfig, false) => "Invalid configuration".to_string(),
            (AIErrorCode::RateLimited, _) => {
                let secs = match self {
                    AIError::RateLimited { retry_after_secs } => *retry_after_secs,
                    _ => 0,
                };
                if zh {
                    format!("请求过于频繁，请 {} 秒后重试", secs)
                } else {
                    format!("Too many requests, please retry in {} seconds", secs)
                }
            }
            (AIErrorCode::AuthFailed, true) => "API 密钥无效或已过期".to_string(),
            (AIErrorCode::AuthFailed, false) => "Invalid or expired API key".to_string(),
            (AIErrorCode::ModelNotFound, true) => "模型不存在".to_string(),
            (AIErrorCode::ModelNotFound, false) => "Model not found".to_string(),
            (AIErrorCode::ProviderRateLimited, true) => "AI 服务限流，请稍后重试".to_string(),
            (AIErrorCode::ProviderRateLimited, false) => {
                "The AI service is rate limiting requests, please retry later".to_string()
            }
            (AIErrorCode::ServerError, true) => "AI 服务暂时不可用".to_string(),
            (AIErrorCode::ServerError, false) => "The AI service is temporarily unavailable".to_string(),
            (AIErrorCode::ApiError, true) => "AI 服务返回错误".to_string(),
            (AIErrorCode::ApiError, false) => "The AI service returned an error".to_string(),
            (AIErrorCode::ConnectionFailed, true) => "无法连接到 AI 服务".to_string(),
            (AIErrorCode::ConnectionFailed, false) => "Cannot connect to the AI service".to_string(),
            (AIErrorCode::Timeout, true) => "AI 服务响应超时".to_string(),
            (AIErrorCode::Timeout, false) => "The AI service timed out".to_string(),
            (AIErrorCode::StreamError, true) => "流式响应中断".to_string(),
            (AIErrorCode::StreamError, false) => "The response stream was interrupted".to_string(),
            (AIErrorCode::ParseError, true) => "无法解析 AI 服务响应".to_string(),
            (AIErrorCode::ParseError, false) => "Could not read the AI service response".to_string(),
        }
    }
}

impl From<AIError> for String {
    fn from(err: AIError) -> Self {
        err.to_string()
    }
}
