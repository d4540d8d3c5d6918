use std::env;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

const ENV_API_URI: &str = "AOAI_API_URI";
const ENV_API_KEY: &str = "AOAI_API_KEY";
const ENV_MODEL_NAME: &str = "AOAI_MODEL_NAME";
const ENV_API_VERSION: &str = "AOAI_API_VERSION";
const ENV_TEMPERATURE: &str = "AOAI_TEMPERATURE";
const ENV_MAX_TOKENS: &str = "AOAI_MAX_TOKENS";
const ENV_NUCLEUS_SAMPLING_FACTOR: &str = "AOAI_NUCLEUS_SAMPLING_FACTOR";
const ENV_FREQUENCY_PENALTY: &str = "AOAI_FREQUENCY_PENALTY";
const ENV_PRESENCE_PENALTY: &str = "AOAI_PRESENCE_PENALTY";

const DEFAULT_MODEL_NAME: &str = "gpt-35-turbo";
const DEFAULT_API_VERSION: &str = "2024-02-01";
const DEFAULT_TEMPERATURE: f32 = 1.0;
const DEFAULT_MAX_TOKENS: u32 = 800;
const DEFAULT_NUCLEUS_SAMPLING_FACTOR: f32 = 0.95;
const DEFAULT_FREQUENCY_PENALTY: i32 = 0;
const DEFAULT_PRESENCE_PENALTY: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub nucleus_sampling_factor: f32,
    pub frequency_penalty: i32,
    pub presence_penalty: i32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            nucleus_sampling_factor: DEFAULT_NUCLEUS_SAMPLING_FACTOR,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
        }
    }
}

/// Values supplied explicitly on the command line. `None` means the option
/// was not given and the environment or built-in default applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub api_uri: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub nucleus_sampling_factor: Option<f32>,
}

#[derive(Clone, PartialEq)]
pub struct Config {
    pub api_uri: String,
    pub api_key: String,
    pub model_name: String,
    pub api_version: String,
    pub sampling: SamplingParams,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("Config")
            .field("api_uri", &self.api_uri)
            .field("api_key", &api_key)
            .field("model_name", &self.model_name)
            .field("api_version", &self.api_version)
            .field("sampling", &self.sampling)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiUri,
    MissingApiKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiUri => write!(
                f,
                "Value cannot be null. {ENV_API_URI} or --api-uri is required."
            ),
            Self::MissingApiKey => write!(
                f,
                "Value cannot be null. {ENV_API_KEY} or --api-key is required."
            ),
        }
    }
}

impl Error for ConfigError {}

impl Config {
    pub fn from_env(overrides: &CliOverrides) -> Self {
        Self::resolve(overrides, |key| env::var(key).ok())
    }

    /// Merges command-line overrides over `get_var` lookups over defaults.
    pub fn resolve(
        overrides: &CliOverrides,
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> Self {
        let mut env_value = |key: &str| get_var(key).filter(|value| !value.trim().is_empty());

        let api_uri = overrides
            .api_uri
            .clone()
            .or_else(|| env_value(ENV_API_URI))
            .unwrap_or_default();
        let api_key = overrides
            .api_key
            .clone()
            .or_else(|| env_value(ENV_API_KEY))
            .unwrap_or_default();
        let model_name = overrides
            .model_name
            .clone()
            .or_else(|| env_value(ENV_MODEL_NAME))
            .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());
        let api_version = env_value(ENV_API_VERSION)
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let sampling = SamplingParams {
            temperature: overrides.temperature.unwrap_or_else(|| {
                parse_env_number(
                    ENV_TEMPERATURE,
                    env_value(ENV_TEMPERATURE).as_deref(),
                    DEFAULT_TEMPERATURE,
                )
            }),
            max_tokens: overrides.max_tokens.unwrap_or_else(|| {
                parse_env_number(
                    ENV_MAX_TOKENS,
                    env_value(ENV_MAX_TOKENS).as_deref(),
                    DEFAULT_MAX_TOKENS,
                )
            }),
            nucleus_sampling_factor: overrides.nucleus_sampling_factor.unwrap_or_else(|| {
                parse_env_number(
                    ENV_NUCLEUS_SAMPLING_FACTOR,
                    env_value(ENV_NUCLEUS_SAMPLING_FACTOR).as_deref(),
                    DEFAULT_NUCLEUS_SAMPLING_FACTOR,
                )
            }),
            // No command-line options exist for the penalties.
            frequency_penalty: parse_env_number(
                ENV_FREQUENCY_PENALTY,
                env_value(ENV_FREQUENCY_PENALTY).as_deref(),
                DEFAULT_FREQUENCY_PENALTY,
            ),
            presence_penalty: parse_env_number(
                ENV_PRESENCE_PENALTY,
                env_value(ENV_PRESENCE_PENALTY).as_deref(),
                DEFAULT_PRESENCE_PENALTY,
            ),
        };

        Self {
            api_uri,
            api_key,
            model_name,
            api_version,
            sampling,
        }
    }

    /// Fails when the endpoint URI or API key is empty or whitespace-only.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_uri.trim().is_empty() {
            return Err(ConfigError::MissingApiUri);
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }
}

fn parse_env_number<T>(key: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr + Copy + fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(
                variable = key,
                value = raw,
                default = %default,
                "ignoring unparseable {key}={raw:?}, using default {default}"
            );
            default
        }
    }
}
