use super::registry::{ModelRegistry, ModelSpec};

const RESOURCE_PREFIX: &str = "models/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
    /// False when the requested name is not in the registry and is passed
    /// through untouched.
    pub registered: bool,
}

/// Picks the Gemini model used for one capability.
///
/// Requested names may carry the API's `models/` resource prefix and
/// surrounding whitespace. A registered model that lacks the capability
/// falls back to the capability's default with a reason. A name the
/// registry does not know is trusted as-is: Gemini ships new model ids
/// faster than the registry is updated.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_else(|| ModelRegistry::new(None)),
        }
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        let Some(name) = requested.map(normalize_name).filter(|name| !name.is_empty()) else {
            return self.default_for(capability, None, None);
        };
        let requested = Some(name.to_string());

        match self.registry.get(name) {
            Some(model) if model.supports(capability) => Ok(ModelSelection {
                model: model.clone(),
                requested,
                fallback_reason: None,
                registered: true,
            }),
            Some(_) => {
                let reason = format!(
                    "Requested model '{name}' unavailable for capability '{capability}'."
                );
                self.default_for(capability, requested, Some(reason))
            }
            None => Ok(ModelSelection {
                model: ModelSpec {
                    name: name.to_string(),
                    capabilities: vec![capability.to_string()],
                },
                requested,
                fallback_reason: None,
                registered: false,
            }),
        }
    }

    fn default_for(
        &self,
        capability: &str,
        requested: Option<String>,
        fallback_reason: Option<String>,
    ) -> Result<ModelSelection, String> {
        let Some(model) = self.registry.by_capability(capability).into_iter().next() else {
            return Err(format!(
                "No models available for capability '{capability}'."
            ));
        };
        Ok(ModelSelection {
            model,
            requested,
            fallback_reason,
            registered: true,
        })
    }
}

fn normalize_name(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix(RESOURCE_PREFIX).unwrap_or(trimmed).trim()
}
