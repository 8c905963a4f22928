//! AI provider configuration model.
//!
//! # Responsibility
//! - Define the singleton configuration record shape.
//! - Provide the public projection handed to API callers.
//!
//! # Invariants
//! - At most one config row exists; the store enforces this.
//! - A non-empty `config_data` blob supersedes the legacy discrete fields.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// AI provider identifier.
///
/// Built-in providers are closed variants; anything else (for example a
/// user-defined provider id) is carried verbatim in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AiProviderType {
    #[default]
    Gemini,
    Qwen,
    Doubao,
    OpenAi,
    Custom(String),
}

impl AiProviderType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gemini => "GEMINI",
            Self::Qwen => "QWEN",
            Self::Doubao => "DOUBAO",
            Self::OpenAi => "OPENAI",
            Self::Custom(value) => value.as_str(),
        }
    }

    /// Parses provider text. Unknown values become `Custom`, blank becomes default.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" => Self::default(),
            "GEMINI" => Self::Gemini,
            "QWEN" => Self::Qwen,
            "DOUBAO" => Self::Doubao,
            "OPENAI" => Self::OpenAi,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl Serialize for AiProviderType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AiProviderType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// Persisted AI configuration singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(rename = "type", default)]
    pub provider: AiProviderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Opaque full client configuration (JSON text owned by the frontend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_data: Option<String>,
}

/// Caller-facing projection of [`AiConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AiConfigView {
    /// Blob format: the opaque document is returned as stored.
    #[serde(rename_all = "camelCase")]
    Blob { config_data: String },
    /// Legacy discrete format. The API key is never exposed here.
    #[serde(rename_all = "camelCase")]
    Legacy {
        #[serde(rename = "type")]
        provider: AiProviderType,
        base_url: Option<String>,
        model_name: Option<String>,
        system_prompt: Option<String>,
    },
}

impl AiConfig {
    pub fn view(&self) -> AiConfigView {
        match self.config_data.as_deref() {
            Some(blob) if !blob.is_empty() => AiConfigView::Blob {
                config_data: blob.to_string(),
            },
            _ => AiConfigView::Legacy {
                provider: self.provider.clone(),
                base_url: self.base_url.clone(),
                model_name: self.model_name.clone(),
                system_prompt: self.system_prompt.clone(),
            },
        }
    }
}
