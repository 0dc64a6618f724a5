use serde_json::{json, Value};
use std::time::Duration;

// ── Constants ──────────────────────────────────────────────────────────────

/// Body written into a card when the lookup fails. Kept bit-exact: existing
/// vaults contain this string and tooling greps for it.
pub const FALLBACK_EXPLANATION: &str = "Error retrieving information from GPT.";

/// Body written when the API answered but sent no usable text.
pub const NO_RESPONSE: &str = "No response";

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const TIMEOUT_SECS: u64 = 60;
const WORD_MAX_TOKENS: u32 = 1000;
const IMAGE_MAX_TOKENS: u32 = 300;
const WORD_TEMPERATURE: f64 = 0.7;

// ── Outcomes ───────────────────────────────────────────────────────────────

/// Result of a word lookup. A failed call degrades to a fallback body
/// instead of erroring (a broken API must not block card creation), but the
/// three cases stay distinguishable so callers and tests can tell a real
/// answer from a degraded one from a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Explanation {
    /// Non-empty answer from the model.
    Generated(String),
    /// The API succeeded but returned no usable text.
    Empty,
    /// Transport or API failure; renders as the fallback body.
    Unavailable,
}

impl Explanation {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Explanation::Generated(_))
    }

    /// The card body this outcome renders as.
    pub fn into_body(self) -> String {
        match self {
            Explanation::Generated(text) => text,
            Explanation::Empty => NO_RESPONSE.to_string(),
            Explanation::Unavailable => FALLBACK_EXPLANATION.to_string(),
        }
    }
}

/// Parsed `word|explanation` answer from the vision request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescription {
    pub word: String,
    pub explanation: String,
}

// ── Client ─────────────────────────────────────────────────────────────────

pub struct GptClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GptClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Ask for a dictionary-style explanation of `word`. Fail-open: any
    /// transport or API failure becomes `Explanation::Unavailable`.
    pub async fn describe_word(
        &self,
        word: &str,
        target_language: &str,
        prompt_template: &str,
    ) -> Explanation {
        let body = word_request(&self.model, word, target_language, prompt_template);

        match self.post_chat(&body).await {
            Ok(response) => {
                let content = extract_content(&response)
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty());
                match content {
                    Some(content) => Explanation::Generated(content),
                    None => Explanation::Empty,
                }
            }
            Err(e) => {
                eprintln!("Warning: word lookup for '{}' failed: {}", word, e);
                Explanation::Unavailable
            }
        }
    }

    /// Ask the vision model to name the dominant subject of the image in the
    /// source language and describe it, as `word|explanation`. Unlike
    /// `describe_word` this is a hard error on failure: without a word name
    /// there is no card to create.
    pub async fn describe_image(
        &self,
        image_url: &str,
        source_language: &str,
        target_language: &str,
        prompt_template: &str,
    ) -> Result<ImageDescription, String> {
        let body = image_request(
            &self.model,
            image_url,
            source_language,
            target_language,
            prompt_template,
        );

        let response = self.post_chat(&body).await?;
        let content = extract_content(&response)
            .ok_or_else(|| "completions response missing choices[0].message.content".to_string())?;
        Ok(split_description(&content))
    }

    async fn post_chat(&self, body: &Value) -> Result<Value, String> {
        let resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        // Read as text first so HTTP errors keep their body message.
        let text = resp.text().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            return Err(api_error_message(status, &text));
        }

        serde_json::from_str(&text).map_err(|_| "invalid JSON from the completions API".to_string())
    }
}

// ── Request bodies ─────────────────────────────────────────────────────────

fn word_request(model: &str, word: &str, target_language: &str, prompt_template: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": format!(
                    "You are a dictionary that provides comprehensive and authoritative word information. Avoid small talk and unnecessary replies. Respond in {}.",
                    target_language
                )
            },
            {
                "role": "user",
                "content": format!(
                    "Please analyze the word {} and output in the following format. Output format: {}",
                    word, prompt_template
                )
            }
        ],
        "max_tokens": WORD_MAX_TOKENS,
        "temperature": WORD_TEMPERATURE
    })
}

fn image_request(
    model: &str,
    image_url: &str,
    source_language: &str,
    target_language: &str,
    prompt_template: &str,
) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": "You are a dictionary that provides comprehensive and authoritative word information. Avoid small talk and unnecessary replies."
            },
            {
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": format!(
                            "Describe the main subject or text in the image using a single {} word. Output format: {} word|{}. Respond in {}.",
                            source_language, source_language, prompt_template, target_language
                        )
                    },
                    {
                        "type": "image_url",
                        "image_url": { "url": image_url }
                    }
                ]
            }
        ],
        "max_tokens": IMAGE_MAX_TOKENS
    })
}

// ── Response handling ──────────────────────────────────────────────────────

fn extract_content(response: &Value) -> Option<String> {
    response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
}

/// Split a `word|explanation` answer on the first pipe. A pipe-less answer
/// is treated as a bare word with an empty explanation.
pub fn split_description(raw: &str) -> ImageDescription {
    match raw.split_once('|') {
        Some((word, explanation)) => ImageDescription {
            word: word.trim().to_string(),
            explanation: explanation.trim().to_string(),
        },
        None => ImageDescription {
            word: raw.trim().to_string(),
            explanation: String::new(),
        },
    }
}

fn api_error_message(status: reqwest::StatusCode, body_text: &str) -> String {
    // Common shape: { "error": { "message": "..." } }
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let snippet: String = trimmed.chars().take(200).collect();
    format!("HTTP {}: {}", status.as_u16(), snippet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let response = json!({
            "choices": [{ "message": { "content": "  ## Translation\nword stuff  " } }]
        });
        assert_eq!(
            extract_content(&response).unwrap(),
            "  ## Translation\nword stuff  "
        );
    }

    #[test]
    fn test_extract_content_missing() {
        assert_eq!(extract_content(&json!({})), None);
        assert_eq!(extract_content(&json!({ "choices": [] })), None);
        assert_eq!(
            extract_content(&json!({ "choices": [{ "message": {} }] })),
            None
        );
    }

    #[test]
    fn test_split_description() {
        let desc = split_description("APPLE | A common fruit.");
        assert_eq!(desc.word, "APPLE");
        assert_eq!(desc.explanation, "A common fruit.");
    }

    #[test]
    fn test_split_description_keeps_later_pipes() {
        let desc = split_description("CAT|feline|small");
        assert_eq!(desc.word, "CAT");
        assert_eq!(desc.explanation, "feline|small");
    }

    #[test]
    fn test_split_description_without_pipe() {
        let desc = split_description("ORPHAN");
        assert_eq!(desc.word, "ORPHAN");
        assert_eq!(desc.explanation, "");
    }

    #[test]
    fn test_word_request_embeds_settings() {
        let body = word_request("gpt-4o", "SERENDIPITY", "Chinese", "## Translation");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1000);
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("Respond in Chinese"));
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("SERENDIPITY"));
        assert!(user.contains("## Translation"));
    }

    #[test]
    fn test_image_request_carries_image_url() {
        let body = image_request("gpt-4o", "https://img.example/x.png", "English", "Chinese", "## T");
        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts[1]["image_url"]["url"], "https://img.example/x.png");
        assert_eq!(body["max_tokens"], 300);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_outcome_bodies_are_literal() {
        assert_eq!(
            Explanation::Unavailable.into_body(),
            "Error retrieving information from GPT."
        );
        assert_eq!(Explanation::Empty.into_body(), "No response");
        assert_eq!(Explanation::Generated("body".into()).into_body(), "body");
    }

    #[test]
    fn test_degraded_outcomes() {
        assert!(Explanation::Unavailable.is_degraded());
        assert!(Explanation::Empty.is_degraded());
        assert!(!Explanation::Generated("x".into()).is_degraded());
    }

    #[test]
    fn test_api_error_message_extracts_api_shape() {
        let msg = api_error_message(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{ "error": { "message": "bad key" } }"#,
        );
        assert_eq!(msg, "HTTP 401: bad key");
    }
}
