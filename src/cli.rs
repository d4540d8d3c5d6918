use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;

use crate::config::CliOverrides;

const ROLE_SWITCHES: [(&str, &str); 3] = [
    ("system", "--system"),
    ("user", "--user"),
    ("assistant", "--assistant"),
];

/// Send chat messages to an Azure OpenAI deployment and print the reply.
///
/// Messages are sent as the user unless preceded by `--system`, `--user` or
/// `--assistant`, which switch the role for every following message. Options
/// may appear anywhere. Put messages that start with `-` after `--`.
#[derive(Debug, Parser)]
#[command(name = "aoai-chat", version)]
pub struct Cli {
    /// Endpoint of the Azure OpenAI resource, including protocol and host,
    /// for example https://my-resource.openai.azure.com [env: AOAI_API_URI]
    #[arg(long)]
    pub api_uri: Option<String>,

    /// Key credential for the Azure OpenAI resource [env: AOAI_API_KEY]
    #[arg(long)]
    pub api_key: Option<String>,

    /// Deployment or model name [env: AOAI_MODEL_NAME] [default: gpt-35-turbo]
    #[arg(long)]
    pub model_name: Option<String>,

    /// Sampling temperature, 0.0 to 2.0 [env: AOAI_TEMPERATURE] [default: 1.0]
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate [env: AOAI_MAX_TOKENS] [default: 800]
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Top-p probability mass considered when sampling tokens
    /// [env: AOAI_NUCLEUS_SAMPLING_FACTOR] [default: 0.95]
    #[arg(long)]
    pub nucleus_sampling_factor: Option<f32>,

    /// Send the following messages as the system
    #[arg(long, help_heading = "Roles", action = ArgAction::Append, num_args = 0..=1,
          require_equals = true, default_missing_value = "")]
    system: Vec<String>,

    /// Send the following messages as the user (the initial role)
    #[arg(long, help_heading = "Roles", action = ArgAction::Append, num_args = 0..=1,
          require_equals = true, default_missing_value = "")]
    user: Vec<String>,

    /// Send the following messages as the assistant
    #[arg(long, help_heading = "Roles", action = ArgAction::Append, num_args = 0..=1,
          require_equals = true, default_missing_value = "")]
    assistant: Vec<String>,

    /// Chat messages
    #[arg(value_name = "MESSAGES")]
    messages: Vec<String>,

    #[arg(skip)]
    conversation: Vec<String>,
}

impl Cli {
    /// Parses the process arguments, exiting with clap's usage error on failure.
    pub fn from_env_args() -> Self {
        Self::try_from_args(std::env::args_os()).unwrap_or_else(|err| err.exit())
    }

    pub fn try_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut cli = Self::from_arg_matches(&matches)?;
        cli.conversation = conversation_tokens(&matches);
        Ok(cli)
    }

    /// Role switches and messages in command-line order, options removed.
    pub fn conversation(&self) -> &[String] {
        &self.conversation
    }

    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            api_uri: self.api_uri.clone(),
            api_key: self.api_key.clone(),
            model_name: self.model_name.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            nucleus_sampling_factor: self.nucleus_sampling_factor,
        }
    }
}

// clap indices grow monotonically across argv, so sorting by them restores
// the order in which switches and messages were written.
fn conversation_tokens(matches: &ArgMatches) -> Vec<String> {
    let mut tokens: Vec<(usize, String)> = Vec::new();

    for (id, switch) in ROLE_SWITCHES {
        if let Some(indices) = matches.indices_of(id) {
            tokens.extend(indices.map(|idx| (idx, switch.to_string())));
        }
    }
    if let (Some(indices), Some(values)) = (
        matches.indices_of("messages"),
        matches.get_many::<String>("messages"),
    ) {
        tokens.extend(indices.zip(values.cloned()));
    }

    tokens.sort_by_key(|(idx, _)| *idx);
    tokens.into_iter().map(|(_, token)| token).collect()
}
