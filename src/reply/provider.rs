//! Provider differences for chat completions endpoints.
//!
//! Providers differ in URL layout and in how the API key is sent; the
//! request and response bodies are the same `OpenAI` shape everywhere.

/// Default Azure API version when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";

/// Supported chat completions providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// Deployment name (used in place of the model in the URL)
        deployment_name: String,
        /// API version query parameter
        api_version: String,
    },
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Groq (groq.com)
    Groq,
    /// Generic OpenAI-compatible server (local gateways, proxies)
    Generic,
}

impl Provider {
    /// Detect the provider from a base URL.
    ///
    /// Azure deployments need a deployment name; detection leaves it empty
    /// and [`Provider::with_azure_deployment`] fills it in.
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("openai.azure.com") || lower.contains("azure.com") {
            Self::AzureOpenAI {
                deployment_name: String::new(),
                api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            }
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Fill in Azure deployment details; other providers are returned as is.
    #[must_use]
    pub fn with_azure_deployment(self, deployment: Option<String>, api_version: Option<String>) -> Self {
        match (self, deployment.filter(|d| !d.trim().is_empty())) {
            (Self::AzureOpenAI { api_version: detected, .. }, Some(deployment_name)) => {
                Self::AzureOpenAI {
                    deployment_name,
                    api_version: api_version.unwrap_or(detected),
                }
            }
            (other, _) => other,
        }
    }

    /// The setting this provider still needs before it can be called.
    #[must_use]
    pub fn missing_setting(&self) -> Option<&'static str> {
        match self {
            Self::AzureOpenAI {
                deployment_name, ..
            } if deployment_name.is_empty() => Some("Azure deployment name"),
            _ => None,
        }
    }

    /// Build the chat completions URL for this provider.
    #[must_use]
    pub fn chat_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => format!(
                "{base}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}"
            ),
            Self::OpenRouter => format!("{base}/api/v1/chat/completions"),
            Self::OpenAI | Self::Groq | Self::Generic => {
                if base.ends_with("/v1") {
                    format!("{base}/chat/completions")
                } else {
                    format!("{base}/v1/chat/completions")
                }
            }
        }
    }

    /// Attach the API key the way this provider expects it.
    #[must_use]
    pub fn authorize(&self, rb: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        match self {
            Self::AzureOpenAI { .. } => rb.header("api-key", api_key),
            _ => rb.bearer_auth(api_key),
        }
    }
}
