use indexmap::IndexMap;

pub const CAPABILITY_STRUCTURED: &str = "structured";
pub const CAPABILITY_IMAGE: &str = "image";
pub const CAPABILITY_CHAT: &str = "chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub capabilities: Vec<String>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

/// Ordered catalogue of generative models; the first model registered for a
/// capability is that capability's default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        let model = self.get(name)?;
        if model.supports(capability) {
            return Some(model.clone());
        }
        None
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, capabilities: &[&str]| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
            },
        );
    };

    insert(
        "gemini-2.5-flash",
        &[CAPABILITY_STRUCTURED, CAPABILITY_CHAT],
    );
    insert("gemini-2.5-flash-image", &[CAPABILITY_IMAGE]);
    insert(
        "gemini-2.5-pro",
        &[CAPABILITY_STRUCTURED, CAPABILITY_CHAT],
    );
    insert(
        "gemini-2.0-flash",
        &[CAPABILITY_STRUCTURED, CAPABILITY_CHAT],
    );
    insert("gemini-2.5-flash-image-preview", &[CAPABILITY_IMAGE]);

    map
}
