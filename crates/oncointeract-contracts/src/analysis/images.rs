use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::ImagePrompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualizationKey {
    MolecularViz,
    PathwayMap,
    CellularResponse,
}

impl VisualizationKey {
    pub const ALL: [VisualizationKey; 3] = [
        VisualizationKey::MolecularViz,
        VisualizationKey::PathwayMap,
        VisualizationKey::CellularResponse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MolecularViz => "molecularViz",
            Self::PathwayMap => "pathwayMap",
            Self::CellularResponse => "cellularResponse",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::MolecularViz => "Docked Complex (Surface/Sticks)",
            Self::PathwayMap => "Pathway Diagram",
            Self::CellularResponse => "Cellular Phenotype",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::MolecularViz => "docking_complex.png",
            Self::PathwayMap => "pathway_map.png",
            Self::CellularResponse => "cellular_response.png",
        }
    }

    pub fn prompt(self, prompts: &ImagePrompts) -> &str {
        match self {
            Self::MolecularViz => &prompts.molecular_viz,
            Self::PathwayMap => &prompts.pathway_map,
            Self::CellularResponse => &prompts.cellular_response,
        }
    }
}

impl fmt::Display for VisualizationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualizationKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let needle = raw.trim();
        Self::ALL
            .into_iter()
            .find(|key| {
                key.as_str().eq_ignore_ascii_case(needle)
                    || key.file_name().trim_end_matches(".png") == needle
            })
            .ok_or_else(|| format!("unknown visualization '{needle}'"))
    }
}

/// Base64 image payloads keyed by visualization. Keys only ever get added;
/// an empty payload never creates a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImages {
    payloads: BTreeMap<VisualizationKey, String>,
}

impl GeneratedImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `payload` under `key`. Returns `false` (and stores nothing) for
    /// an empty payload.
    pub fn insert(&mut self, key: VisualizationKey, payload: impl Into<String>) -> bool {
        let payload = payload.into();
        if payload.is_empty() {
            return false;
        }
        self.payloads.insert(key, payload);
        true
    }

    pub fn get(&self, key: VisualizationKey) -> Option<&str> {
        self.payloads.get(&key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = VisualizationKey> + '_ {
        self.payloads.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VisualizationKey, &str)> {
        self.payloads.iter().map(|(key, value)| (*key, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.payloads.len() == VisualizationKey::ALL.len()
    }
}
