//! AI metadata suggestion
//!
//! Asks a Gemini model for keywords, a short summary, a quote and a type
//! guess for a title/author pair. Any failure yields the fallback value so
//! the book form always has something to show.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-2.5-flash";
const USER_AGENT: &str = concat!("readlog/", env!("CARGO_PKG_VERSION"));

/// Type guess returned when the model is unreachable
pub const FALLBACK_TYPE: &str = "其它";

const SYSTEM_INSTRUCTION: &str = "你是一個復古圖書館的管理員，喜歡用打字機記錄書籍資訊。";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    pub keywords: Vec<String>,
    pub summary: String,
    pub quotes: Vec<String>,
    pub type_recommendation: String,
}

impl AiSuggestion {
    pub fn fallback() -> Self {
        Self {
            keywords: Vec::new(),
            summary: String::new(),
            quotes: Vec::new(),
            type_recommendation: FALLBACK_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No response text generated")]
    EmptyResponse,
}

/// Source of book metadata suggestions
#[async_trait]
pub trait MetadataSuggester: Send + Sync {
    /// Never fails; errors degrade to `AiSuggestion::fallback()`
    async fn suggest(&self, title: &str, author: &str) -> AiSuggestion;
}

pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, SuggestError> {
        Self::with_base_url(api_key, GEMINI_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, SuggestError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SuggestError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            GEMINI_MODEL
        )
    }

    /// Ask the model; errors are returned rather than swallowed
    pub async fn generate(&self, title: &str, author: &str) -> Result<AiSuggestion, SuggestError> {
        debug!(title = %title, author = %author, "Requesting metadata suggestion");

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(title, author))
            .send()
            .await
            .map_err(|e| SuggestError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SuggestError::ApiError(status.as_u16(), error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SuggestError::ParseError(e.to_string()))?;

        let suggestion = parse_response(&body)?;
        info!(
            title = %title,
            keywords = suggestion.keywords.len(),
            "Metadata suggestion received"
        );
        Ok(suggestion)
    }
}

#[async_trait]
impl MetadataSuggester for GeminiClient {
    async fn suggest(&self, title: &str, author: &str) -> AiSuggestion {
        match self.generate(title, author).await {
            Ok(suggestion) => suggestion,
            Err(e) => {
                warn!(title = %title, error = %e, "Metadata suggestion failed; using fallback");
                AiSuggestion::fallback()
            }
        }
    }
}

fn prompt(title: &str, author: &str) -> String {
    format!(
        "我正在整理我的閱讀清單 (Reading Tracker)。請根據書名 \"{title}\" 和作者 \"{author}\"，提供以下資訊：\n\
         1. 3-5 個精簡的風格關鍵字 (keywords)。\n\
         2. 一個簡短的書籍摘要或介紹 (summary)，約 30 字，非常簡潔。\n\
         3. 1 句這本書的經典名言 (quotes)。\n\
         4. 推測這本書的類型 (typeRecommendation)，請從以下選項中選擇一個最接近的：小說、漫畫、非虛構、其它。\n\n\
         請使用繁體中文回答，風格偏向復古、文學。"
    )
}

fn request_body(title: &str, author: &str) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt(title, author) }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "keywords": { "type": "ARRAY", "items": { "type": "STRING" }, "description": "相關關鍵字列表" },
                    "summary": { "type": "STRING", "description": "書籍簡短摘要" },
                    "quotes": { "type": "ARRAY", "items": { "type": "STRING" }, "description": "名言佳句列表" },
                    "typeRecommendation": { "type": "STRING", "description": "推測的書籍類型" }
                },
                "required": ["keywords", "summary", "quotes", "typeRecommendation"]
            }
        }
    })
}

/// Pull the JSON answer out of a `generateContent` response
fn parse_response(body: &Value) -> Result<AiSuggestion, SuggestError> {
    let text = body
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or(SuggestError::EmptyResponse)?;

    serde_json::from_str(text).map_err(|e| SuggestError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_value() {
        let fallback = AiSuggestion::fallback();
        assert!(fallback.keywords.is_empty());
        assert!(fallback.quotes.is_empty());
        assert_eq!(fallback.summary, "");
        assert_eq!(fallback.type_recommendation, "其它");
    }

    #[test]
    fn test_client_creation() {
        assert!(GeminiClient::new("test_key".to_string()).is_ok());
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client =
            GeminiClient::with_base_url("k".to_string(), "http://localhost:9/models/".to_string())
                .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_body_mentions_title_and_schema() {
        let body = request_body("挪威的森林", "村上春樹");
        let text = body
            .pointer("/contents/0/parts/0/text")
            .and_then(Value::as_str)
            .unwrap();
        assert!(text.contains("挪威的森林"));
        assert!(text.contains("村上春樹"));
        assert_eq!(
            body.pointer("/generationConfig/responseMimeType"),
            Some(&json!("application/json"))
        );
    }

    #[test]
    fn test_parse_response() {
        let inner = json!({
            "keywords": ["青春", "失落"],
            "summary": "一段關於成長的故事。",
            "quotes": ["死並非生的對立面，而是作為生的一部分永存。"],
            "typeRecommendation": "小說"
        });
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": inner.to_string() }] } }]
        });

        let suggestion = parse_response(&body).unwrap();
        assert_eq!(suggestion.keywords, vec!["青春", "失落"]);
        assert_eq!(suggestion.type_recommendation, "小說");
    }

    #[test]
    fn test_parse_response_errors() {
        assert!(matches!(
            parse_response(&json!({ "candidates": [] })),
            Err(SuggestError::EmptyResponse)
        ));

        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "not json" }] } }]
        });
        assert!(matches!(
            parse_response(&body),
            Err(SuggestError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades_to_fallback() {
        // Port 9 (discard) is not listening on test machines
        let client =
            GeminiClient::with_base_url("k".to_string(), "http://127.0.0.1:9".to_string())
                .unwrap();
        assert_eq!(client.suggest("t", "a").await, AiSuggestion::fallback());
    }
}
