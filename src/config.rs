use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_MODEL: &str = "groq-1";
const DEFAULT_API_URL: &str = "https://api.groq.ai/v1/models/{model}/completions";
const DEFAULT_MAX_TOKENS: u32 = 512;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MOCK: bool = false;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MIN_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 60;
const MAX_TEMPERATURE: f32 = 2.0;
const DEFAULT_SECRETS_PATH: &str = ".gordon/secrets.toml";

pub const API_KEY_VAR: &str = "GROQ_API_KEY";
const MODEL_VAR: &str = "GROQ_MODEL";

/// Request body layout sent to the completion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `{input, max_output_tokens, temperature}` with a single prompt string.
    Completion,
    /// `{model, messages, temperature, max_tokens}` with a system and a user message.
    Chat,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completion => "completion",
            Self::Chat => "chat",
        }
    }
}

/// Which JSON layout the completion endpoint is expected to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Auto,
    Chat,
    Choice,
    Output,
}

impl ResponseShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Chat => "chat",
            Self::Choice => "choice",
            Self::Output => "output",
        }
    }
}

/// An API key that never prints itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOrigin {
    Environment,
    SecretsFile,
}

impl SecretOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::SecretsFile => "secrets file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    Environment,
    File(PathBuf),
}

/// Ordered list of places a secret may live. The first non-blank value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretChain {
    sources: Vec<SecretSource>,
}

impl SecretChain {
    pub fn new(sources: Vec<SecretSource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[SecretSource] {
        &self.sources
    }

    pub fn resolve(
        &self,
        key: &str,
        mut get_var: impl FnMut(&str) -> Option<String>,
        mut read_file: impl FnMut(&Path) -> Option<String>,
    ) -> Option<(String, SecretOrigin)> {
        for source in &self.sources {
            let found = match source {
                SecretSource::Environment => {
                    get_var(key).map(|value| (value, SecretOrigin::Environment))
                }
                SecretSource::File(path) => read_file(path)
                    .and_then(|contents| lookup_toml_string(&contents, key))
                    .map(|value| (value, SecretOrigin::SecretsFile)),
            };

            if let Some((value, origin)) = found {
                let value = value.trim();
                if !value.is_empty() {
                    return Some((value.to_string(), origin));
                }
            }
        }

        None
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<ApiKey>,
    pub api_key_origin: Option<SecretOrigin>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub mock: bool,
    pub timeout_secs: u64,
    pub wire_format: WireFormat,
    pub response_shape: ResponseShape,
    pub style_directive: Option<String>,
    pub secrets: SecretChain,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_sources(|key| env::var(key).ok(), |path| fs::read_to_string(path).ok())
    }

    fn from_sources(
        mut get_var: impl FnMut(&str) -> Option<String>,
        mut read_file: impl FnMut(&Path) -> Option<String>,
    ) -> Self {
        let secrets_path = get_var("GORDON_SECRETS_PATH")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SECRETS_PATH.to_string());
        let secrets = SecretChain::new(vec![
            SecretSource::Environment,
            SecretSource::File(PathBuf::from(secrets_path)),
        ]);

        let (api_key, api_key_origin) = match secrets.resolve(API_KEY_VAR, &mut get_var, &mut read_file) {
            Some((value, origin)) => (Some(ApiKey::new(value)), Some(origin)),
            None => (None, None),
        };
        let model = secrets
            .resolve(MODEL_VAR, &mut get_var, &mut read_file)
            .map(|(value, _)| value)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            api_key,
            api_key_origin,
            api_url: get_var("GROQ_API_URL")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model,
            max_tokens: parse_max_tokens(get_var("GROQ_MAX_TOKENS").as_deref()),
            temperature: parse_temperature(get_var("GROQ_TEMPERATURE").as_deref()),
            mock: parse_bool(get_var("GROQ_MOCK").as_deref(), DEFAULT_MOCK),
            timeout_secs: parse_timeout_secs(get_var("GROQ_TIMEOUT_SECS").as_deref()),
            wire_format: parse_wire_format(get_var("GROQ_WIRE_FORMAT").as_deref()),
            response_shape: parse_response_shape(get_var("GROQ_RESPONSE_SHAPE").as_deref()),
            style_directive: get_var("GROQ_STYLE_DIRECTIVE")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            secrets,
        }
    }

    /// The endpoint URL with `{model}` filled in.
    pub fn endpoint_url(&self) -> String {
        self.api_url.replace("{model}", &self.model)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn lookup_toml_string(contents: &str, key: &str) -> Option<String> {
    let table: toml::Table = contents.parse().ok()?;
    table.get(key)?.as_str().map(str::to_string)
}

fn parse_max_tokens(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_TOKENS)
}

fn parse_temperature(raw: Option<&str>) -> f32 {
    raw.and_then(|value| value.trim().parse::<f32>().ok())
        .filter(|value| value.is_finite() && (0.0..=MAX_TEMPERATURE).contains(value))
        .unwrap_or(DEFAULT_TEMPERATURE)
}

fn parse_timeout_secs(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
        .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn parse_wire_format(raw: Option<&str>) -> WireFormat {
    match raw
        .unwrap_or("completion")
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "chat" => WireFormat::Chat,
        _ => WireFormat::Completion,
    }
}

fn parse_response_shape(raw: Option<&str>) -> ResponseShape {
    match raw.unwrap_or("auto").trim().to_ascii_lowercase().as_str() {
        "chat" => ResponseShape::Chat,
        "choice" => ResponseShape::Choice,
        "output" => ResponseShape::Output,
        _ => ResponseShape::Auto,
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api_key: Some(ApiKey::new("test-key")),
        api_key_origin: Some(SecretOrigin::Environment),
        api_url: DEFAULT_API_URL.to_string(),
        model: DEFAULT_MODEL.to_string(),
        max_tokens: DEFAULT_MAX_TOKENS,
        temperature: DEFAULT_TEMPERATURE,
        mock: false,
        timeout_secs: DEFAULT_TIMEOUT_SECS,
        wire_format: WireFormat::Completion,
        response_shape: ResponseShape::Auto,
        style_directive: None,
        secrets: SecretChain::new(vec![SecretSource::Environment]),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use super::{
        ApiKey, Config, DEFAULT_API_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SECRETS_PATH,
        DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS, ResponseShape, SecretChain,
        SecretOrigin, SecretSource, WireFormat, parse_bool, parse_max_tokens,
        parse_response_shape, parse_temperature, parse_timeout_secs, parse_wire_format,
    };

    fn config_from_pairs(pairs: &[(&str, &str)], files: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        let files: HashMap<PathBuf, String> = files
            .iter()
            .map(|(path, contents)| (PathBuf::from(path), (*contents).to_string()))
            .collect();
        Config::from_sources(
            |key| vars.get(key).cloned(),
            |path: &Path| files.get(path).cloned(),
        )
    }

    #[test]
    fn from_env_uses_defaults_when_vars_are_missing() {
        let cfg = config_from_pairs(&[], &[]);
        assert!(cfg.api_key.is_none());
        assert!(cfg.api_key_origin.is_none());
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(cfg.temperature, DEFAULT_TEMPERATURE);
        assert!(!cfg.mock);
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.wire_format, WireFormat::Completion);
        assert_eq!(cfg.response_shape, ResponseShape::Auto);
        assert!(cfg.style_directive.is_none());
        assert_eq!(
            cfg.secrets.sources(),
            &[
                SecretSource::Environment,
                SecretSource::File(PathBuf::from(DEFAULT_SECRETS_PATH)),
            ]
        );
    }

    #[test]
    fn from_env_reads_configured_values() {
        let cfg = config_from_pairs(
            &[
                ("GROQ_API_KEY", "sk-env"),
                ("GROQ_MODEL", "llama-3.1-8b-instant"),
                ("GROQ_API_URL", "https://api.groq.com/openai/v1/chat/completions"),
                ("GROQ_MAX_TOKENS", "256"),
                ("GROQ_TEMPERATURE", "0.2"),
                ("GROQ_MOCK", "yes"),
                ("GROQ_TIMEOUT_SECS", "45"),
                ("GROQ_WIRE_FORMAT", "chat"),
                ("GROQ_RESPONSE_SHAPE", "chat"),
                ("GROQ_STYLE_DIRECTIVE", "Reply in English."),
            ],
            &[],
        );

        assert_eq!(cfg.api_key, Some(ApiKey::new("sk-env")));
        assert_eq!(cfg.api_key_origin, Some(SecretOrigin::Environment));
        assert_eq!(cfg.model, "llama-3.1-8b-instant");
        assert_eq!(
            cfg.api_url,
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(cfg.max_tokens, 256);
        assert_eq!(cfg.temperature, 0.2);
        assert!(cfg.mock);
        assert_eq!(cfg.timeout_secs, 45);
        assert_eq!(cfg.wire_format, WireFormat::Chat);
        assert_eq!(cfg.response_shape, ResponseShape::Chat);
        assert_eq!(cfg.style_directive.as_deref(), Some("Reply in English."));
    }

    #[test]
    fn environment_key_takes_priority_over_secrets_file() {
        let cfg = config_from_pairs(
            &[("GROQ_API_KEY", "sk-env")],
            &[(DEFAULT_SECRETS_PATH, "GROQ_API_KEY = \"sk-file\"")],
        );
        assert_eq!(cfg.api_key, Some(ApiKey::new("sk-env")));
        assert_eq!(cfg.api_key_origin, Some(SecretOrigin::Environment));
    }

    #[test]
    fn secrets_file_supplies_key_and_model_when_environment_is_silent() {
        let cfg = config_from_pairs(
            &[("GORDON_SECRETS_PATH", "conf/secrets.toml"), ("GROQ_API_KEY", "   ")],
            &[(
                "conf/secrets.toml",
                "GROQ_API_KEY = \"sk-file\"\nGROQ_MODEL = \"from-file\"\n",
            )],
        );
        assert_eq!(cfg.api_key, Some(ApiKey::new("sk-file")));
        assert_eq!(cfg.api_key_origin, Some(SecretOrigin::SecretsFile));
        assert_eq!(cfg.model, "from-file");
    }

    #[test]
    fn malformed_secrets_file_is_ignored() {
        let cfg = config_from_pairs(&[], &[(DEFAULT_SECRETS_PATH, "GROQ_API_KEY = ")]);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn secret_chain_skips_non_string_values() {
        let chain = SecretChain::new(vec![SecretSource::File(PathBuf::from("s.toml"))]);
        let resolved = chain.resolve(
            "GROQ_API_KEY",
            |_| None,
            |_| Some("GROQ_API_KEY = 42".to_string()),
        );
        assert!(resolved.is_none());
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-very-secret");
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("sk-very-secret"));

        let cfg = config_from_pairs(&[("GROQ_API_KEY", "sk-very-secret")], &[]);
        assert!(!format!("{cfg:?}").contains("sk-very-secret"));
    }

    #[test]
    fn endpoint_url_substitutes_model() {
        let cfg = config_from_pairs(&[("GROQ_MODEL", "mixtral")], &[]);
        assert_eq!(
            cfg.endpoint_url(),
            "https://api.groq.ai/v1/models/mixtral/completions"
        );
    }

    #[test]
    fn parse_max_tokens_uses_default_for_missing_or_invalid_values() {
        assert_eq!(parse_max_tokens(None), DEFAULT_MAX_TOKENS);
        assert_eq!(parse_max_tokens(Some("0")), DEFAULT_MAX_TOKENS);
        assert_eq!(parse_max_tokens(Some("-5")), DEFAULT_MAX_TOKENS);
        assert_eq!(parse_max_tokens(Some(" 1024 ")), 1024);
    }

    #[test]
    fn parse_temperature_rejects_out_of_range_values() {
        assert_eq!(parse_temperature(None), DEFAULT_TEMPERATURE);
        assert_eq!(parse_temperature(Some("hot")), DEFAULT_TEMPERATURE);
        assert_eq!(parse_temperature(Some("NaN")), DEFAULT_TEMPERATURE);
        assert_eq!(parse_temperature(Some("3.5")), DEFAULT_TEMPERATURE);
        assert_eq!(parse_temperature(Some("0")), 0.0);
        assert_eq!(parse_temperature(Some("1.3")), 1.3);
    }

    #[test]
    fn parse_timeout_secs_clamps_into_fixed_window() {
        assert_eq!(parse_timeout_secs(None), DEFAULT_TIMEOUT_SECS);
        assert_eq!(parse_timeout_secs(Some("0")), DEFAULT_TIMEOUT_SECS);
        assert_eq!(parse_timeout_secs(Some("5")), DEFAULT_TIMEOUT_SECS);
        assert_eq!(parse_timeout_secs(Some("45")), 45);
        assert_eq!(parse_timeout_secs(Some("600")), MAX_TIMEOUT_SECS);
    }

    #[test]
    fn parse_bool_respects_truthy_and_falsy_values() {
        assert!(parse_bool(Some("true"), false));
        assert!(parse_bool(Some(" YES "), false));
        assert!(!parse_bool(Some("off"), true));
        assert!(!parse_bool(Some(" 0 "), true));
        assert!(parse_bool(Some("maybe"), true));
        assert!(!parse_bool(None, false));
    }

    #[test]
    fn parse_wire_format_defaults_to_completion() {
        assert_eq!(parse_wire_format(None), WireFormat::Completion);
        assert_eq!(parse_wire_format(Some("grpc")), WireFormat::Completion);
        assert_eq!(parse_wire_format(Some(" CHAT ")), WireFormat::Chat);
    }

    #[test]
    fn parse_response_shape_defaults_to_auto() {
        assert_eq!(parse_response_shape(None), ResponseShape::Auto);
        assert_eq!(parse_response_shape(Some("weird")), ResponseShape::Auto);
        assert_eq!(parse_response_shape(Some("choice")), ResponseShape::Choice);
        assert_eq!(parse_response_shape(Some(" Output ")), ResponseShape::Output);
    }
}
