pub mod analysis;
pub mod dryrun;
pub mod gemini;
pub mod imaging;
pub mod oracle;
pub mod orchestrator;
pub mod presentation;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use oncointeract_contracts::models::{
    select_model, Capability, ModelRegistry, ModelSpec, Provider,
};

use crate::dryrun::{DryrunImageOracle, DryrunTextOracle};
use crate::gemini::{GeminiImageOracle, GeminiTextOracle, GeminiTransport};
use crate::oracle::{ImageOracle, TextOracle};

pub use crate::orchestrator::{Orchestrator, Outcome, Phase, ViewState};

pub const TEXT_MODEL_ENV: &str = "ONCOINTERACT_TEXT_MODEL";
pub const IMAGE_MODEL_ENV: &str = "ONCOINTERACT_IMAGE_MODEL";

/// The two oracles one session talks to, plus any model-selection notes
/// worth showing the user.
pub struct OracleSet {
    pub text: Arc<dyn TextOracle>,
    pub image: Arc<dyn ImageOracle>,
    pub text_model: ModelSpec,
    pub image_model: ModelSpec,
    pub warnings: Vec<String>,
}

/// Explicit request first, then the environment default. Only an explicit
/// request that cannot be honoured produces a warning.
fn resolve(
    registry: &ModelRegistry,
    requested: Option<&str>,
    env_key: &str,
    capability: Capability,
    warnings: &mut Vec<String>,
) -> Result<ModelSpec> {
    let requested = requested
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let explicit = requested.is_some();
    let name = requested.or_else(|| gemini::non_empty_env(env_key));
    let selection = select_model(registry, name.as_deref(), capability)?;
    if explicit {
        warnings.extend(selection.warning());
    }
    Ok(selection.model)
}

/// Resolves both models through the registry and builds their oracles.
/// Gemini models share one transport, so credentials are checked once.
pub fn connect_oracles(text_model: Option<&str>, image_model: Option<&str>) -> Result<OracleSet> {
    let registry = ModelRegistry::default();
    let mut warnings = Vec::new();
    let text = resolve(
        &registry,
        text_model,
        TEXT_MODEL_ENV,
        Capability::Analysis,
        &mut warnings,
    )?;
    let image = resolve(
        &registry,
        image_model,
        IMAGE_MODEL_ENV,
        Capability::Image,
        &mut warnings,
    )?;

    let transport = if [&text, &image]
        .iter()
        .any(|model| model.provider == Provider::Gemini)
    {
        Some(GeminiTransport::from_env()?)
    } else {
        None
    };

    let text_oracle: Arc<dyn TextOracle> = match (text.provider, transport.clone()) {
        (Provider::Dryrun, _) => Arc::new(DryrunTextOracle::new(&text.name)),
        (Provider::Gemini, Some(transport)) => Arc::new(GeminiTextOracle::new(transport, &text.name)),
        (Provider::Gemini, None) => return Err(anyhow!("Gemini transport unavailable")),
    };
    let image_oracle: Arc<dyn ImageOracle> = match (image.provider, transport) {
        (Provider::Dryrun, _) => Arc::new(DryrunImageOracle::new(&image.name)),
        (Provider::Gemini, Some(transport)) => Arc::new(GeminiImageOracle::new(transport, &image.name)),
        (Provider::Gemini, None) => return Err(anyhow!("Gemini transport unavailable")),
    };

    Ok(OracleSet {
        text: text_oracle,
        image: image_oracle,
        text_model: text,
        image_model: image,
        warnings,
    })
}
