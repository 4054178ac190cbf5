use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::reply::{Provider, ReplySettings, ReplySourceKind};
use crate::theme::Theme;

/// Config file picked up from the working directory when none is given.
const CWD_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Reply source: `stub` or `chat_completions`
    #[arg(long, env = "REPLY_SOURCE")]
    pub reply_source: Option<String>,

    /// Where the chosen theme is persisted
    #[arg(long, env = "THEME_STORE")]
    pub theme_store: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub reply: ReplyConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub max_message_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplyConfig {
    pub source: ReplySourceKind,
    pub stub_delay_ms: u64,
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    #[serde(default)]
    pub azure_deployment: Option<String>,
    #[serde(default)]
    pub azure_api_version: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThemeConfig {
    pub store_path: PathBuf,
    pub default: Theme,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layered load: defaults, then the YAML file, then `OPENAI_API_KEY`, then
    /// `CHAT_*` environment variables, then CLI flags.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 8080)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("chat.max_message_chars", 1000)?
            .set_default("reply.source", "stub")?
            .set_default("reply.stub_delay_ms", 700)?
            .set_default("reply.base_url", "https://api.openai.com")?
            .set_default("reply.model", "gpt-3.5-turbo")?
            .set_default("reply.max_tokens", 500)?
            .set_default("reply.temperature", 0.7)?
            .set_default("reply.timeout_secs", 30)?
            .set_default("theme.store_path", ".htmx-chat/theme.json")?
            .set_default("theme.default", "light")?;

        match &cli.config {
            Some(path) => builder = builder.add_source(File::with_name(path).required(true)),
            None if Path::new(CWD_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(CWD_CONFIG_FILE).required(false));
            }
            None => {}
        }

        // The conventional key variable beats the file; CHAT_REPLY__API_KEY beats both.
        let openai_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        if let Some(key) = openai_key.filter(|_| std::env::var_os("CHAT_REPLY__API_KEY").is_none()) {
            builder = builder.set_override("reply.api_key", key)?;
        }

        // E.g. CHAT_SERVER__PORT=9000, CHAT_REPLY__SOURCE=chat_completions
        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(source) = cli.reply_source {
            builder = builder.set_override("reply.source", source)?;
        }
        if let Some(path) = cli.theme_store {
            builder = builder.set_override("theme.store_path", path)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Settings for the chat completions reply source.
    #[must_use]
    pub fn reply_settings(&self) -> ReplySettings {
        let reply = &self.reply;
        let provider = Provider::detect_from_url(&reply.base_url)
            .with_azure_deployment(reply.azure_deployment.clone(), reply.azure_api_version.clone());

        ReplySettings {
            base_url: reply.base_url.clone(),
            api_key: reply.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: reply.model.clone(),
            provider,
            max_tokens: reply.max_tokens,
            temperature: reply.temperature,
            timeout: Duration::from_secs(reply.timeout_secs),
        }
    }

    #[must_use]
    pub fn stub_delay(&self) -> Duration {
        Duration::from_millis(self.reply.stub_delay_ms)
    }
}
