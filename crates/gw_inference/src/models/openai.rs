use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use gw_core::{source_domain, CommentaryModel, Error, Result};

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4.1-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Chat-completions commentary client. Works against any
/// OpenAI-compatible endpoint via `base_url`.
pub struct OpenAiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiModel {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| Error::Inference("OpenAI API key is required".to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model,
            base_url: config.base_url,
            timeout: config.timeout,
        })
    }

    async fn chat(&self, prompt: &str, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
            max_tokens: 280,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout("commentary request timed out".to_string())
                } else {
                    Error::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "chat completion failed: {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(Error::Inference(
                "chat completion returned no content".to_string(),
            ));
        }
        Ok(content)
    }
}

fn prompt_for(title: &str, url: &str, host: &str) -> String {
    format!(
        "You write one-paragraph commentary for a wry bad-news digest.\n\
        You only know the HEADLINE and LINK below. Do NOT invent details, \
        numbers, locations, motives, quotes, or identities not present in \
        the headline. If the headline is vague, speak in general terms and \
        say what is unclear.\n\
        Style: sharp columnist, not neutral reporter. Short sentences. \
        Fragments are fine. Imply more than you explain. No moralizing.\n\n\
        OUTPUT FORMAT (exact):\n\
        1) One-line strapline (max 12 words).\n\
        2) One short paragraph (3-5 sentences) written as a reaction, not \
        a summary.\n\
        3) Final line: Source: {host}\n\
        Never include the full link anywhere in your output.\n\n\
        Headline: {title}\n\
        Link: {url}"
    )
}

/// Rewrites any `Source:` line to name the domain and appends one when
/// missing. The raw link never reaches the stored commentary.
fn enforce_source_line(text: &str, host: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut seen_source = false;

    for line in text.trim().lines() {
        if line.trim_start().to_lowercase().starts_with("source:") {
            seen_source = true;
            if host.is_empty() {
                lines.push("Source:".to_string());
            } else {
                lines.push(format!("Source: {host}"));
            }
        } else {
            lines.push(line.to_string());
        }
    }

    if !seen_source && !host.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("Source: {host}"));
    }

    lines.join("\n")
}

#[async_trait]
impl CommentaryModel for OpenAiModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn commentary(&self, title: &str, url: &str) -> Result<String> {
        let host = source_domain(url).unwrap_or_default();
        let prompt = prompt_for(title, url, &host);

        let mut out = self.chat(&prompt, 0.6).await?;

        // Format guard: one retry when the model drops the Source line.
        if !out.contains("Source:") {
            debug!(title, "commentary missing Source line, retrying");
            let retry = format!("{prompt}\n\nDO NOT OMIT THE FINAL 'Source:' LINE.");
            if let Ok(second) = self.chat(&retry, 0.5).await {
                out = second;
            }
        }

        Ok(enforce_source_line(&out, &host))
    }
}
