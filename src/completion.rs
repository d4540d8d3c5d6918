use anyhow::Result;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

use crate::chat::{self, ChatMessage};
use crate::config::Config;
use crate::providers;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
}

/// Text of every choice the service returned, in service order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResult {
    pub choices: Vec<String>,
}

impl CompletionResult {
    pub fn text(&self) -> String {
        self.choices.concat()
    }
}

pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<CompletionResult>> + 'a>>;

pub trait CompletionBackend {
    fn complete<'a>(
        &'a self,
        cfg: &'a Config,
        request: &'a CompletionRequest,
    ) -> CompletionFuture<'a>;
}

/// Talks to an Azure OpenAI chat-completions deployment over HTTPS.
#[derive(Debug, Clone)]
pub struct AzureOpenAiBackend {
    client: Client,
}

impl AzureOpenAiBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl CompletionBackend for AzureOpenAiBackend {
    fn complete<'a>(
        &'a self,
        cfg: &'a Config,
        request: &'a CompletionRequest,
    ) -> CompletionFuture<'a> {
        Box::pin(async move {
            providers::azure_openai::chat_completions(&self.client, cfg, &request.messages).await
        })
    }
}

/// Classifies `args` into messages and performs a single completion call.
pub async fn chat_once<B, S>(backend: &B, cfg: &Config, args: &[S]) -> Result<String>
where
    B: CompletionBackend + ?Sized,
    S: AsRef<str>,
{
    let request = CompletionRequest {
        messages: chat::classify(args),
    };
    debug!(
        argument_count = args.len(),
        message_count = request.messages.len(),
        "classified chat messages"
    );

    let result = backend.complete(cfg, &request).await?;
    debug!(
        choice_count = result.choices.len(),
        "received completion choices"
    );
    Ok(result.text())
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use std::cell::RefCell;

    use super::{
        CompletionBackend, CompletionFuture, CompletionRequest, CompletionResult, chat_once,
    };
    use crate::chat::{ChatMessage, Role};
    use crate::config::{Config, SamplingParams};

    #[derive(Debug)]
    enum StubOutcome {
        Ok(Vec<String>),
        Err(String),
    }

    #[derive(Debug)]
    struct StubBackend {
        calls: RefCell<Vec<CompletionRequest>>,
        outcome: StubOutcome,
    }

    impl StubBackend {
        fn ok(choices: &[&str]) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                outcome: StubOutcome::Ok(choices.iter().map(|c| (*c).to_string()).collect()),
            }
        }

        fn err(message: impl Into<String>) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                outcome: StubOutcome::Err(message.into()),
            }
        }
    }

    impl CompletionBackend for StubBackend {
        fn complete<'a>(
            &'a self,
            _cfg: &'a Config,
            request: &'a CompletionRequest,
        ) -> CompletionFuture<'a> {
            self.calls.borrow_mut().push(request.clone());
            let result = match &self.outcome {
                StubOutcome::Ok(choices) => Ok(CompletionResult {
                    choices: choices.clone(),
                }),
                StubOutcome::Err(message) => Err(anyhow!(message.clone())),
            };
            Box::pin(async move { result })
        }
    }

    fn test_config() -> Config {
        Config {
            api_uri: "https://example.openai.azure.com".to_string(),
            api_key: "secret".to_string(),
            model_name: "gpt-35-turbo".to_string(),
            api_version: "2024-02-01".to_string(),
            sampling: SamplingParams::default(),
        }
    }

    #[test]
    fn completion_text_concatenates_choices_without_separator() {
        let result = CompletionResult {
            choices: vec!["Hello, ".to_string(), "world!".to_string()],
        };
        assert_eq!(result.text(), "Hello, world!");
        assert_eq!(CompletionResult::default().text(), "");
    }

    #[tokio::test]
    async fn chat_once_joins_all_returned_choices() {
        let backend = StubBackend::ok(&["Hello, ", "world!"]);

        let text = chat_once(&backend, &test_config(), &["hi"])
            .await
            .expect("chat should succeed");

        assert_eq!(text, "Hello, world!");
    }

    #[tokio::test]
    async fn chat_once_sends_classified_messages_in_order() {
        let backend = StubBackend::ok(&["ok"]);

        chat_once(
            &backend,
            &test_config(),
            &["--system", "be brief", "hi", "--assistant", "hello", "--user", "bye"],
        )
        .await
        .expect("chat should succeed");

        let calls = backend.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].messages,
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::system("hi"),
                ChatMessage::assistant("hello"),
                ChatMessage::user("bye"),
            ]
        );
        assert_eq!(calls[0].messages[3].role, Role::User);
    }

    #[tokio::test]
    async fn chat_once_passes_backend_errors_through() {
        let backend = StubBackend::err("service unavailable");

        let err = chat_once(&backend, &test_config(), &["ping"])
            .await
            .expect_err("chat should fail");

        let msg = format!("{err:#}");
        assert!(
            msg.contains("service unavailable"),
            "unexpected error message: {msg}"
        );
        assert_eq!(backend.calls.borrow().len(), 1);
    }
}
