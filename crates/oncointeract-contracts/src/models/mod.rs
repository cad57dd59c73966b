mod registry;
mod selection;

pub use registry::{Capability, ModelRegistry, ModelSpec, Provider};
pub use selection::{select_model, Fallback, ModelSelection, SelectionError};
