use limbu_core::{ServiceError, Summarizer};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::LlmSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini `generateContent`
    Gemini,
    /// Any OpenAI-compatible `/v1/chat/completions`
    Openai,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::Openai => "https://api.openai.com",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::Openai => write!(f, "openai"),
        }
    }
}

/// Hosted model behind the insight generator.
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: Provider,
    model: String,
    base_url: String,
    temperature: f32,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(cfg: &LlmSection, api_key: Option<String>) -> Self {
        Self {
            provider: cfg.provider,
            model: cfg.model.clone(),
            base_url: cfg.base_url().trim_end_matches('/').to_string(),
            temperature: cfg.temperature,
            api_key,
        }
    }

    async fn complete_async(&self, key: &str, prompt: &str) -> Result<String, ServiceError> {
        debug!(provider = %self.provider, model = %self.model, "text generation request");
        match self.provider {
            Provider::Gemini => gemini_generate(&self.base_url, &self.model, self.temperature, key, prompt).await,
            Provider::Openai => openai_complete(&self.base_url, &self.model, self.temperature, key, prompt).await,
        }
    }
}

impl Summarizer for LlmClient {
    fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::MissingCredential(self.provider.to_string()))?;

        // The CLI runs under #[tokio::main]; calling block_on on the current
        // runtime would panic, so hop out with block_in_place first.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(self.complete_async(key, prompt)))
        } else {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| ServiceError::Transport(format!("create tokio runtime: {e}")))?;
            rt.block_on(self.complete_async(key, prompt))
        }
    }
}

fn transport(e: reqwest::Error) -> ServiceError {
    ServiceError::Transport(e.to_string())
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiReq {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Deserialize, Default)]
struct GeminiResp {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentOut>,
}

#[derive(Deserialize)]
struct GeminiContentOut {
    #[serde(default)]
    parts: Vec<GeminiPartOut>,
}

#[derive(Deserialize)]
struct GeminiPartOut {
    text: Option<String>,
}

impl GeminiResp {
    /// Text of the first candidate, parts concatenated
    fn text(self) -> String {
        let mut s = String::new();
        if let Some(content) = self.candidates.into_iter().next().and_then(|c| c.content) {
            for p in content.parts {
                if let Some(t) = p.text {
                    s.push_str(&t);
                }
            }
        }
        s.trim().to_string()
    }
}

async fn gemini_generate(
    base_url: &str,
    model: &str,
    temperature: f32,
    key: &str,
    prompt: &str,
) -> Result<String, ServiceError> {
    let body = GeminiReq {
        contents: vec![GeminiContent {
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }],
        generation_config: GeminiGenerationConfig { temperature },
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        "x-goog-api-key",
        HeaderValue::from_str(key).map_err(|e| ServiceError::Transport(e.to_string()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/v1beta/models/{model}:generateContent"))
        .headers(headers)
        .json(&body)
        .send()
        .await
        .map_err(transport)?;

    let out: GeminiResp = check_status(resp)
        .await?
        .json()
        .await
        .map_err(|e| ServiceError::Decode(e.to_string()))?;
    Ok(out.text())
}

#[derive(Serialize)]
struct OaiMsg {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OaiReq {
    model: String,
    messages: Vec<OaiMsg>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OaiResp {
    choices: Vec<OaiChoice>,
}

#[derive(Deserialize)]
struct OaiChoice {
    message: OaiMsgOut,
}

#[derive(Deserialize)]
struct OaiMsgOut {
    content: Option<String>,
}

impl OaiResp {
    fn text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

async fn openai_complete(
    base_url: &str,
    model: &str,
    temperature: f32,
    key: &str,
    prompt: &str,
) -> Result<String, ServiceError> {
    let body = OaiReq {
        model: model.to_string(),
        messages: vec![OaiMsg {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        temperature,
    };

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/v1/chat/completions"))
        .header(AUTHORIZATION, format!("Bearer {key}"))
        .json(&body)
        .send()
        .await
        .map_err(transport)?;

    let out: OaiResp = check_status(resp)
        .await?
        .json()
        .await
        .map_err(|e| ServiceError::Decode(e.to_string()))?;
    Ok(out.text())
}
