use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::ChatMessage;
use crate::completion::CompletionResult;
use crate::config::Config;
use crate::providers::http_errors::completion_request_error;

const API_KEY_HEADER: &str = "api-key";

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: i32,
    presence_penalty: i32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl From<ChatCompletionsResponse> for CompletionResult {
    fn from(response: ChatCompletionsResponse) -> Self {
        Self {
            choices: response
                .choices
                .into_iter()
                .map(|choice| {
                    choice
                        .message
                        .and_then(|message| message.content)
                        .unwrap_or_default()
                })
                .collect(),
        }
    }
}

fn chat_completions_url(cfg: &Config) -> Result<Url> {
    let base = cfg.api_uri.trim();
    let mut url =
        Url::parse(base).with_context(|| format!("Invalid chat completion endpoint '{base}'"))?;

    url.path_segments_mut()
        .map_err(|_| anyhow!("Chat completion endpoint '{base}' cannot be used as a base URI"))?
        .pop_if_empty()
        .extend([
            "openai",
            "deployments",
            cfg.model_name.as_str(),
            "chat",
            "completions",
        ]);
    url.query_pairs_mut()
        .append_pair("api-version", &cfg.api_version);

    Ok(url)
}

fn request_body<'a>(cfg: &Config, messages: &'a [ChatMessage]) -> ChatCompletionsRequest<'a> {
    ChatCompletionsRequest {
        messages: messages
            .iter()
            .map(|msg| WireMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            })
            .collect(),
        temperature: cfg.sampling.temperature,
        max_tokens: cfg.sampling.max_tokens,
        top_p: cfg.sampling.nucleus_sampling_factor,
        frequency_penalty: cfg.sampling.frequency_penalty,
        presence_penalty: cfg.sampling.presence_penalty,
    }
}

/// Sends one chat-completions request and collects the text of every choice.
pub async fn chat_completions(
    client: &Client,
    cfg: &Config,
    messages: &[ChatMessage],
) -> Result<CompletionResult> {
    let api_url = chat_completions_url(cfg)?;
    let body = request_body(cfg, messages);
    debug!(
        api_url = %api_url,
        model = %cfg.model_name,
        message_count = messages.len(),
        "sending chat completion request"
    );

    let response = client
        .post(api_url.clone())
        .header(API_KEY_HEADER, &cfg.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(
                api_url = %api_url,
                model = %cfg.model_name,
                error = %err,
                "chat completion request failed"
            );
            completion_request_error(err, api_url.as_str())
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let response_body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        warn!(
            api_url = %api_url,
            model = %cfg.model_name,
            status = %status,
            response_body_len = response_body.len(),
            "chat completion endpoint returned non-success status"
        );
        return Err(anyhow!(
            "Chat completion request failed with status {}: {}",
            status,
            response_body
        ));
    }

    let parsed: ChatCompletionsResponse = response
        .json()
        .await
        .context("Failed to parse chat completion response")?;
    let result = CompletionResult::from(parsed);
    debug!(
        model = %cfg.model_name,
        choice_count = result.choices.len(),
        "received chat completion response"
    );
    Ok(result)
}
