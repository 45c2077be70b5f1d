//! AI 集成 - Gemini generateContent 客户端与模型优先级列表

pub mod client;
pub mod types;

pub use client::{
    classify_api_error, ClassifyBackend, ClassifyError, GeminiClient, GeminiConfig, DEFAULT_MODEL,
    DEFAULT_TIMEOUT_MS, GEMINI_API_BASE,
};
pub use types::{AnalysisResult, Classification};

/// 模型优先级列表
///
/// 启动时构建，之后不可变；Analyzer 对每个条目严格按序尝试。
#[derive(Debug, Clone)]
pub struct ModelPriorityList {
    models: Vec<String>,
}

impl ModelPriorityList {
    /// 用户覆盖在前，默认模型在后；保序去重
    pub fn new(override_model: Option<&str>) -> Self {
        let mut models = Vec::new();
        if let Some(m) = override_model {
            let m = m.trim();
            if !m.is_empty() {
                models.push(m.to_string());
            }
        }
        models.push(DEFAULT_MODEL.to_string());
        Self::from_models(models)
    }

    /// 从显式列表构建（测试与自定义列表）
    pub fn from_models(models: Vec<String>) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(models.len());
        for model in models {
            if !deduped.contains(&model) {
                deduped.push(model);
            }
        }
        Self { models: deduped }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
