//! AI 类型定义 - 分类标签与分析结果
//!
//! 从 client.rs 拆出的共享类型，分析流水线与 CLI 输出共同使用。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 剪贴板内容分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Code,
    Url,
    Address,
    Task,
    General,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::Code,
        Classification::Url,
        Classification::Address,
        Classification::Task,
        Classification::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Code => "CODE",
            Classification::Url => "URL",
            Classification::Address => "ADDRESS",
            Classification::Task => "TASK",
            Classification::General => "GENERAL",
        }
    }

    /// 从模型回复中的标签词解析，无法识别时返回 None
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "CODE" => Some(Classification::Code),
            "URL" => Some(Classification::Url),
            "ADDRESS" => Some(Classification::Address),
            "TASK" => Some(Classification::Task),
            "GENERAL" => Some(Classification::General),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Classification {
    fn default() -> Self {
        Classification::General
    }
}

/// 单条剪贴板内容的分析结果
///
/// 每个去重后的剪贴板值至多产生一个结果，交给通知出口后即丢弃，不持久化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub classification: Classification,
    /// 一句话摘要
    pub summary: String,
    /// 产生该结果的模型
    pub model: String,
}

impl AnalysisResult {
    /// 解析模型的原始回复
    ///
    /// 期望「分类标签 + 一句话摘要」，容忍常见变体（前缀、标点、换行）。
    /// 找不到已知标签时归为 GENERAL，整段原文作为摘要。
    pub fn from_response(model: &str, raw: &str) -> Self {
        let trimmed = raw.trim();
        // ASCII 大写转换不改变字节长度，偏移量可直接用于原文切片
        let upper = trimmed.to_ascii_uppercase();

        let mut best: Option<(usize, Classification)> = None;
        for candidate in Classification::ALL {
            if let Some(pos) = upper.find(candidate.as_str()) {
                if best.map_or(true, |(p, _)| pos < p) {
                    best = Some((pos, candidate));
                }
            }
        }

        let (classification, summary) = match best {
            Some((pos, classification)) => {
                let rest = trimmed[pos + classification.as_str().len()..]
                    .trim_start_matches(|c: char| {
                        c.is_whitespace() || matches!(c, ':' | '.' | ',' | '-' | ']' | ')')
                    })
                    .trim();
                let rest = rest
                    .strip_prefix("Summary:")
                    .or_else(|| rest.strip_prefix("summary:"))
                    .unwrap_or(rest)
                    .trim();
                let summary = if rest.is_empty() { trimmed } else { rest };
                (classification, summary.to_string())
            }
            None => (Classification::General, trimmed.to_string()),
        };

        Self {
            classification,
            summary,
            model: model.to_string(),
        }
    }
}
