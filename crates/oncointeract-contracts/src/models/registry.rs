use std::fmt;

use indexmap::IndexMap;

/// What a model is asked to do within one analysis cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Structured JSON docking report.
    Analysis,
    /// One biomedical illustration per prompt.
    Image,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    /// Offline and deterministic, needs no credentials.
    Dryrun,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Dryrun => "dryrun",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: Provider,
    pub capability: Capability,
    pub description: String,
}

impl ModelSpec {
    fn new(name: &str, provider: Provider, capability: Capability, description: &str) -> Self {
        Self {
            name: name.to_string(),
            provider,
            capability,
            description: description.to_string(),
        }
    }
}

/// Known models in preference order. The first model registered for a
/// capability is its default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::from_models([
            ModelSpec::new(
                "gemini-2.5-flash",
                Provider::Gemini,
                Capability::Analysis,
                "Structured JSON docking report",
            ),
            ModelSpec::new(
                "gemini-2.5-pro",
                Provider::Gemini,
                Capability::Analysis,
                "Slower, more thorough docking report",
            ),
            ModelSpec::new(
                "gemini-2.5-flash-image",
                Provider::Gemini,
                Capability::Image,
                "Biomedical illustrations",
            ),
            ModelSpec::new(
                "dryrun-text-1",
                Provider::Dryrun,
                Capability::Analysis,
                "Offline deterministic report (no credentials)",
            ),
            ModelSpec::new(
                "dryrun-image-1",
                Provider::Dryrun,
                Capability::Image,
                "Offline solid-colour placeholder PNG",
            ),
        ])
    }
}

impl ModelRegistry {
    pub fn from_models(models: impl IntoIterator<Item = ModelSpec>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|model| (model.name.clone(), model))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim())
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn default_for(&self, capability: Capability) -> Option<&ModelSpec> {
        self.models
            .values()
            .find(|model| model.capability == capability)
    }
}
