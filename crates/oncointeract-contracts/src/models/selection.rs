use std::fmt;

use thiserror::Error;

use super::registry::{Capability, ModelRegistry, ModelSpec};

/// Why a named model was passed over for the capability default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    Unregistered { requested: String },
    WrongCapability { requested: String, capability: Capability },
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered { requested } => write!(f, "Model '{requested}' is not registered."),
            Self::WrongCapability {
                requested,
                capability,
            } => write!(f, "Model '{requested}' cannot serve {capability} requests."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub fallback: Option<Fallback>,
}

impl ModelSelection {
    /// User-facing note when the requested model was replaced.
    pub fn warning(&self) -> Option<String> {
        self.fallback
            .as_ref()
            .map(|fallback| format!("{fallback} Using {}.", self.model.name))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no {0} model is registered")]
    NoModels(Capability),
}

/// Resolves `requested` for `capability`, falling back to the registry
/// default. A blank request counts as no request.
pub fn select_model(
    registry: &ModelRegistry,
    requested: Option<&str>,
    capability: Capability,
) -> Result<ModelSelection, SelectionError> {
    let requested = requested.map(str::trim).filter(|name| !name.is_empty());
    let fallback = match requested {
        None => None,
        Some(name) => match registry.get(name) {
            Some(model) if model.capability == capability => {
                return Ok(ModelSelection {
                    model: model.clone(),
                    fallback: None,
                });
            }
            Some(_) => Some(Fallback::WrongCapability {
                requested: name.to_string(),
                capability,
            }),
            None => Some(Fallback::Unregistered {
                requested: name.to_string(),
            }),
        },
    };

    let model = registry
        .default_for(capability)
        .cloned()
        .ok_or(SelectionError::NoModels(capability))?;
    Ok(ModelSelection { model, fallback })
}
