use std::env;
use std::time::Duration;

use botanist_contracts::models::{
    ModelSelector, CAPABILITY_CHAT, CAPABILITY_IMAGE, CAPABILITY_STRUCTURED,
};

use crate::error::{GatewayError, Result};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_STAGE_DELAY: Duration = Duration::from_millis(2000);

const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Model choice after registry resolution, with the reason when the
/// requested model was replaced. `registered` is false for a model name
/// the registry does not list; such names are sent to the API as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub capability: &'static str,
    pub name: String,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
    pub registered: bool,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub api_base: String,
    pub text_model: ResolvedModel,
    pub image_model: ResolvedModel,
    pub chat_model: ResolvedModel,
    pub request_timeout: Option<Duration>,
}

/// Raw settings before validation; CLI flags are layered over the
/// environment through this type.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub chat_model: Option<String>,
    pub request_timeout_s: Option<f64>,
}

impl ConfigOverrides {
    pub fn from_env() -> Self {
        Self {
            api_key: API_KEY_VARS.iter().find_map(|key| non_empty_env(key)),
            api_base: non_empty_env("GEMINI_API_BASE"),
            text_model: non_empty_env("BOTANIST_TEXT_MODEL"),
            image_model: non_empty_env("BOTANIST_IMAGE_MODEL"),
            chat_model: non_empty_env("BOTANIST_CHAT_MODEL"),
            request_timeout_s: non_empty_env("BOTANIST_REQUEST_TIMEOUT")
                .and_then(|raw| raw.parse::<f64>().ok()),
        }
    }

    /// Values set in `other` win over values set here.
    pub fn merged(self, other: ConfigOverrides) -> Self {
        Self {
            api_key: other.api_key.or(self.api_key),
            api_base: other.api_base.or(self.api_base),
            text_model: other.text_model.or(self.text_model),
            image_model: other.image_model.or(self.image_model),
            chat_model: other.chat_model.or(self.chat_model),
            request_timeout_s: other.request_timeout_s.or(self.request_timeout_s),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_overrides(ConfigOverrides::from_env())
    }

    pub fn from_overrides(overrides: ConfigOverrides) -> Result<Self> {
        let api_key = overrides
            .api_key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                GatewayError::Configuration(format!(
                    "API key not found; set one of {}",
                    API_KEY_VARS.join(", ")
                ))
            })?;
        let api_base = overrides
            .api_base
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let request_timeout = overrides
            .request_timeout_s
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(|seconds| {
                Duration::try_from_secs_f64(seconds).map_err(|err| {
                    GatewayError::Configuration(format!(
                        "invalid request timeout {seconds}s: {err}"
                    ))
                })
            })
            .transpose()?;

        let selector = ModelSelector::new(None);
        Ok(Self {
            api_key,
            api_base,
            text_model: resolve_model(&selector, overrides.text_model, CAPABILITY_STRUCTURED)?,
            image_model: resolve_model(&selector, overrides.image_model, CAPABILITY_IMAGE)?,
            chat_model: resolve_model(&selector, overrides.chat_model, CAPABILITY_CHAT)?,
            request_timeout,
        })
    }

    pub fn resolved_models(&self) -> [&ResolvedModel; 3] {
        [&self.text_model, &self.image_model, &self.chat_model]
    }
}

fn resolve_model(
    selector: &ModelSelector,
    requested: Option<String>,
    capability: &'static str,
) -> Result<ResolvedModel> {
    let selection = selector
        .select(requested.as_deref(), capability)
        .map_err(GatewayError::Configuration)?;
    Ok(ResolvedModel {
        capability,
        name: selection.model.name,
        requested: selection.requested,
        fallback_reason: selection.fallback_reason,
        registered: selection.registered,
    })
}

/// Inter-request delay for the stage illustrator.
pub fn stage_delay_from_env() -> Duration {
    non_empty_env("BOTANIST_STAGE_DELAY_MS")
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_STAGE_DELAY)
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ConfigOverrides, GatewayConfig, DEFAULT_API_BASE};
    use crate::error::GatewayError;

    fn with_key() -> ConfigOverrides {
        ConfigOverrides {
            api_key: Some("  secret  ".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = GatewayConfig::from_overrides(ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let blank = ConfigOverrides {
            api_key: Some("   ".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(GatewayConfig::from_overrides(blank).is_err());
    }

    #[test]
    fn defaults_resolve_from_registry() -> anyhow::Result<()> {
        let config = GatewayConfig::from_overrides(with_key())?;
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.text_model.name, "gemini-2.5-flash");
        assert_eq!(config.image_model.name, "gemini-2.5-flash-image");
        assert_eq!(config.chat_model.name, "gemini-2.5-flash");
        assert!(config.request_timeout.is_none());
        assert!(config
            .resolved_models()
            .iter()
            .all(|model| model.fallback_reason.is_none()));
        Ok(())
    }

    #[test]
    fn incapable_model_falls_back_with_reason() -> anyhow::Result<()> {
        let overrides = ConfigOverrides {
            image_model: Some("gemini-2.5-flash".to_string()),
            text_model: Some("gemini-2.5-pro".to_string()),
            ..with_key()
        };
        let config = GatewayConfig::from_overrides(overrides)?;
        assert_eq!(config.text_model.name, "gemini-2.5-pro");
        assert_eq!(config.image_model.name, "gemini-2.5-flash-image");
        assert_eq!(
            config.image_model.fallback_reason.as_deref(),
            Some("Requested model 'gemini-2.5-flash' unavailable for capability 'image'.")
        );
        Ok(())
    }

    #[test]
    fn unlisted_model_is_used_as_given() -> anyhow::Result<()> {
        let overrides = ConfigOverrides {
            text_model: Some("gemini-3.0-flash-exp".to_string()),
            image_model: Some("models/gemini-2.5-flash-image".to_string()),
            ..with_key()
        };
        let config = GatewayConfig::from_overrides(overrides)?;
        assert_eq!(config.text_model.name, "gemini-3.0-flash-exp");
        assert!(!config.text_model.registered);
        assert!(config.text_model.fallback_reason.is_none());
        assert_eq!(config.image_model.name, "gemini-2.5-flash-image");
        assert!(config.image_model.registered);
        assert!(config.chat_model.registered);
        Ok(())
    }

    #[test]
    fn out_of_range_timeout_is_a_configuration_error() {
        let overrides = ConfigOverrides {
            request_timeout_s: Some(1e20),
            ..with_key()
        };
        let err = GatewayConfig::from_overrides(overrides).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
        assert!(err.to_string().contains("request timeout"));
    }

    #[test]
    fn later_overrides_win_and_base_is_trimmed() -> anyhow::Result<()> {
        let env_like = ConfigOverrides {
            api_base: Some("https://env.example/v1/".to_string()),
            request_timeout_s: Some(30.0),
            ..with_key()
        };
        let flags = ConfigOverrides {
            request_timeout_s: Some(5.0),
            ..ConfigOverrides::default()
        };
        let config = GatewayConfig::from_overrides(env_like.merged(flags))?;
        assert_eq!(config.api_base, "https://env.example/v1");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.api_key, "secret");
        Ok(())
    }

    #[test]
    fn non_positive_timeout_means_no_timeout() -> anyhow::Result<()> {
        let overrides = ConfigOverrides {
            request_timeout_s: Some(0.0),
            ..with_key()
        };
        assert!(GatewayConfig::from_overrides(overrides)?
            .request_timeout
            .is_none());
        Ok(())
    }
}
