use std::env;
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use crate::oracle::{ImageOracle, OracleError, TextOracle};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

const PROVIDER: &str = "Gemini";

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn gemini_api_key() -> Option<String> {
    API_KEY_ENV_VARS.iter().find_map(|key| non_empty_env(key))
}

/// Shared HTTP plumbing for the text and image oracles.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    api_base: String,
    api_key: String,
    http: HttpClient,
}

impl GeminiTransport {
    pub fn from_env() -> Result<Self, OracleError> {
        let api_key = gemini_api_key().ok_or_else(|| OracleError::MissingCredentials {
            provider: PROVIDER.to_string(),
            hint: format!("set {}", API_KEY_ENV_VARS.join(" or ")),
        })?;
        let api_base = non_empty_env("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());
        Self::new(api_base, api_key)
    }

    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Result<Self, OracleError> {
        // Calls wait as long as the service takes.
        let http = HttpClient::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| OracleError::transport(PROVIDER, format!("client setup failed: {err}")))?;
        Ok(Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            http,
        })
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn generate(&self, model: &str, payload: &Value) -> Result<Value, OracleError> {
        let endpoint = self.endpoint_for_model(model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .map_err(|err| OracleError::transport(PROVIDER, format!("{endpoint}: {err}")))?;
        response_json_or_error(response)
    }
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, OracleError> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| OracleError::transport(PROVIDER, format!("response body read failed: {err}")))?;
    if !status.is_success() {
        return Err(OracleError::Api {
            provider: PROVIDER.to_string(),
            status: status.as_u16(),
            body: truncate_text(&body, 512),
        });
    }
    serde_json::from_str(&body)
        .map_err(|err| OracleError::payload(PROVIDER, format!("invalid JSON payload: {err}")))
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn user_contents(prompt: &str) -> Value {
    json!([{
        "role": "user",
        "parts": [{ "text": prompt }],
    }])
}

pub fn build_text_payload(prompt: &str, schema: &Value) -> Value {
    let mut payload = Map::new();
    payload.insert("contents".to_string(), user_contents(prompt));
    payload.insert(
        "generationConfig".to_string(),
        json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        }),
    );
    Value::Object(payload)
}

pub fn build_image_payload(prompt: &str, system_instruction: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("contents".to_string(), user_contents(prompt));
    if !system_instruction.trim().is_empty() {
        payload.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": system_instruction }] }),
        );
    }
    payload.insert(
        "generationConfig".to_string(),
        json!({ "responseModalities": ["IMAGE"] }),
    );
    Value::Object(payload)
}

fn candidate_parts(candidate: &Value) -> &[Value] {
    candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Concatenated text of the first candidate, `None` when it has no text parts.
pub fn extract_response_text(response: &Value) -> Option<String> {
    let candidate = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())?;
    let texts: Vec<&str> = candidate_parts(candidate)
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        return None;
    }
    Some(texts.concat())
}

/// First non-empty inline image payload across all candidates.
pub fn extract_inline_image(response: &Value) -> Option<String> {
    let candidates = response.get("candidates").and_then(Value::as_array)?;
    candidates
        .iter()
        .flat_map(candidate_parts)
        .filter_map(|part| part.get("inlineData").or_else(|| part.get("inline_data")))
        .filter_map(|inline| inline.get("data").and_then(Value::as_str))
        .find(|data| !data.is_empty())
        .map(str::to_string)
}

pub struct GeminiTextOracle {
    transport: GeminiTransport,
    model: String,
}

impl GeminiTextOracle {
    pub fn new(transport: GeminiTransport, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }
}

impl TextOracle for GeminiTextOracle {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete_json(&self, prompt: &str, schema: &Value) -> Result<String, OracleError> {
        let response = self
            .transport
            .generate(&self.model, &build_text_payload(prompt, schema))?;
        Ok(extract_response_text(&response).unwrap_or_default())
    }
}

pub struct GeminiImageOracle {
    transport: GeminiTransport,
    model: String,
}

impl GeminiImageOracle {
    pub fn new(transport: GeminiTransport, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }
}

impl ImageOracle for GeminiImageOracle {
    fn name(&self) -> &str {
        &self.model
    }

    fn render(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<Option<String>, OracleError> {
        let response = self
            .transport
            .generate(&self.model, &build_image_payload(prompt, system_instruction))?;
        Ok(extract_inline_image(&response))
    }
}
