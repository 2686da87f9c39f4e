//! Chat completion backend

use async_trait::async_trait;

use crate::{Error, Result};

/// Obtains a reply for an accepted query
///
/// Implementations may fail; the pipeline converts failures into an
/// error-text reply rather than propagating them.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Complete a query under the given personality tag
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or replies malformed
    async fn complete(&self, query: &str, personality: &str) -> Result<String>;
}

/// Response from an `OpenAI`-compatible chat completions API
#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(serde::Deserialize)]
struct ChatMessage {
    content: String,
}

/// Chat completions over an `OpenAI`-compatible HTTP API
pub struct OpenAiInference {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiInference {
    /// Create a new inference client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for chat completions".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        })
    }
}

#[async_trait]
impl Inference for OpenAiInference {
    async fn complete(&self, query: &str, personality: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
        }

        // Time queries are answered locally
        if let Some(answer) = answer_time_query(query) {
            return Ok(answer);
        }

        let system = personality_prompt(personality);
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: query,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "chat completions error {status}: {body}"
            )));
        }

        let result: ChatResponse = response.json().await?;
        let reply = result
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| Error::Inference("empty completion response".to_string()))?;

        Ok(reply)
    }
}

/// Map a personality tag to a system prompt
fn personality_prompt(personality: &str) -> &'static str {
    match personality {
        "Friendly" => "You are a friendly assistant.",
        "Professional" => "You are a professional assistant.",
        _ => "",
    }
}

/// Answer "what's the time" style queries without the backend
fn answer_time_query(query: &str) -> Option<String> {
    let lower = query.to_lowercase();
    if lower.contains("what's the time") || lower.contains("what is the time") {
        let now = chrono::Local::now().format("%I:%M %p");
        return Some(format!("The current time is {now}."));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personality_prompt() {
        assert_eq!(personality_prompt("Friendly"), "You are a friendly assistant.");
        assert_eq!(personality_prompt("Default"), "");
    }

    #[test]
    fn test_time_query_shortcut() {
        assert!(answer_time_query("What's the time?").is_some());
        assert!(answer_time_query("WHAT IS THE TIME").is_some());
        assert!(answer_time_query("what time is the train").is_none());
    }
}
