//! Gemini API 客户端
//!
//! 调用 generateContent 接口对剪贴板文本做分类与摘要。
//! HTTP 状态码与响应体被映射为类型化错误（`ClassifyError`），
//! 重试与模型回退策略由 Analyzer 决定，客户端本身不重试。

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ai::types::AnalysisResult;

/// Gemini API 基础 URL
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// 默认模型
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// 默认请求超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// 分类调用的类型化错误
///
/// 每个变体对应 Analyzer 的一种处置方式：
/// 仅 `RateLimited { quota_exhausted: false }` 会对同一模型重试。
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// HTTP 429；quota_exhausted 表示配额为零，本次运行内该模型不可恢复
    #[error("rate limited (quota exhausted: {quota_exhausted})")]
    RateLimited { quota_exhausted: bool },
    /// 模型不存在（HTTP 404 / NOT_FOUND）
    #[error("model not found")]
    ModelNotFound,
    /// 其他失败，保留完整信息
    #[error("{0}")]
    Other(String),
}

/// 分类后端抽象
///
/// Analyzer 依赖该 trait 而非具体客户端，测试时注入脚本化实现。
pub trait ClassifyBackend: Send {
    fn classify(&self, model: &str, text: &str) -> Result<AnalysisResult, ClassifyError>;
}

/// Gemini 客户端配置
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API 密钥
    pub api_key: String,
    /// API 基础 URL（支持代理）
    pub base_url: String,
    /// 请求超时（毫秒）
    pub timeout_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: GEMINI_API_BASE.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// generateContent 请求体
#[derive(Serialize)]
pub(crate) struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct Part {
    pub text: String,
}

/// generateContent 响应体
#[derive(Deserialize)]
pub(crate) struct GenerateResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Deserialize)]
pub(crate) struct CandidateContent {
    pub parts: Option<Vec<Part>>,
}

/// API 错误响应
#[derive(Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ApiError,
}

#[derive(Deserialize)]
pub(crate) struct ApiError {
    pub status: Option<String>,
    pub message: String,
}

/// Gemini API 客户端
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| anyhow!("Cannot create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// 构造分类提示词
    pub fn build_prompt(text: &str) -> String {
        format!(
            "Analyze this clipboard text. Classify it strictly as one of the following: \
             [CODE, URL, ADDRESS, TASK, GENERAL]. \
             Then provide a 1-sentence summary. Text: {}",
            text
        )
    }
}

impl ClassifyBackend for GeminiClient {
    fn classify(&self, model: &str, text: &str) -> Result<AnalysisResult, ClassifyError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Self::build_prompt(text),
                }],
            }],
        };

        debug!(
            model = %model,
            text_len = text.len(),
            timeout_ms = self.config.timeout_ms,
            "Sending request to Gemini API"
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| {
                ClassifyError::Other(format!(
                    "API request failed after {}ms: {}",
                    start.elapsed().as_millis(),
                    e
                ))
            })?;

        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "API request completed");

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ClassifyError::Other(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(classify_api_error(status.as_u16(), &body));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifyError::Other(format!("Failed to parse response: {}", e)))?;

        let raw = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.content)
            .filter_map(|c| c.parts)
            .flatten()
            .map(|p| p.text)
            .collect::<Vec<String>>()
            .join("");

        if raw.trim().is_empty() {
            warn!(model = %model, "Empty response from Gemini API");
            return Err(ClassifyError::Other("empty response".to_string()));
        }

        Ok(AnalysisResult::from_response(model, &raw))
    }
}

/// 将 HTTP 错误响应映射为类型化错误
///
/// 429 的响应体里出现 "limit: 0" 说明免费额度为零（服务端 QuotaFailure 详情），
/// 视为本次运行内不可恢复；其余 429 视为瞬时限流。
pub fn classify_api_error(status: u16, body: &str) -> ClassifyError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        404 => ClassifyError::ModelNotFound,
        429 => ClassifyError::RateLimited {
            quota_exhausted: message.contains("limit: 0"),
        },
        _ if message.contains("NOT_FOUND") => ClassifyError::ModelNotFound,
        _ if message.contains("RESOURCE_EXHAUSTED") => ClassifyError::RateLimited {
            quota_exhausted: message.contains("limit: 0"),
        },
        _ => ClassifyError::Other(format!("API error ({}): {}", status, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = GeminiConfig::default();
        assert_eq!(config.base_url, GEMINI_API_BASE);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_endpoint_includes_model() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            format!("{}/models/gemini-2.5-flash:generateContent", GEMINI_API_BASE)
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new(GeminiConfig {
            base_url: "https://proxy.example.com/v1beta/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("m"),
            "https://proxy.example.com/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn test_prompt_mentions_all_labels() {
        let prompt = GeminiClient::build_prompt("hello");
        for label in ["CODE", "URL", "ADDRESS", "TASK", "GENERAL"] {
            assert!(prompt.contains(label));
        }
        assert!(prompt.contains("hello"));
    }
}
