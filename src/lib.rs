pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod logging;
pub mod providers;

use anyhow::{Context, Result};
use reqwest::Client;
use std::process::ExitCode;
use tracing::{debug, info};

use cli::Cli;
use completion::{AzureOpenAiBackend, chat_once};
use config::Config;

/// Resolves configuration, sends the messages from the command line and
/// prints the reply. Missing credentials are reported on standard error and
/// yield a failing exit code without any network traffic.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::from_env_args();
    let cfg = Config::from_env(&cli.overrides());
    info!(
        model = %cfg.model_name,
        api_version = %cfg.api_version,
        temperature = cfg.sampling.temperature,
        max_tokens = cfg.sampling.max_tokens,
        nucleus_sampling_factor = cfg.sampling.nucleus_sampling_factor,
        frequency_penalty = cfg.sampling.frequency_penalty,
        presence_penalty = cfg.sampling.presence_penalty,
        "loaded runtime configuration"
    );

    if let Err(err) = cfg.validate() {
        debug!(error = %err, "configuration is incomplete");
        eprintln!("{err}");
        return Ok(ExitCode::FAILURE);
    }

    let client = Client::builder()
        .build()
        .context("Failed to initialize HTTP client")?;
    let backend = AzureOpenAiBackend::new(client);

    let answer = chat_once(&backend, &cfg, cli.conversation()).await?;
    println!("{answer}");
    Ok(ExitCode::SUCCESS)
}
