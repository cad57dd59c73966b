use std::ops::RangeInclusive;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub const CORRELATION_SCORE_RANGE: RangeInclusive<f64> = 0.0..=1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One docking pose as reported in the Vina-style score table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingMode {
    #[serde(deserialize_with = "deserialize_mode_index")]
    pub mode: u32,
    pub affinity: f64,
    pub rmsd_lower_bound: f64,
    pub rmsd_upper_bound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridBox {
    pub center: Vec3,
    pub size: Vec3,
    pub spacing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractingResidue {
    pub name: String,
    pub xyz: String,
    #[serde(rename = "type")]
    pub interaction_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrompts {
    pub molecular_viz: String,
    pub pathway_map: String,
    pub cellular_response: String,
}

/// Complete report returned by the analysis model. Field names on the wire
/// follow the model's JSON schema (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub binding_energy: f64,
    pub rmsd: f64,
    pub ligand_centroid: String,
    pub docking_modes: Vec<BindingMode>,
    pub grid_box: GridBox,
    pub interacting_residues: Vec<InteractingResidue>,
    pub pathway_name: String,
    pub genes_activated: Vec<String>,
    pub enzymes_involved: Vec<String>,
    pub cell_response: String,
    pub receptor: String,
    pub cancer_type: String,
    pub cancer_class: String,
    pub mutation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental_correlation_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_summary: Option<String>,
    pub summary: String,
    pub detailed_analysis: String,
    pub image_prompts: ImagePrompts,
}

impl AnalysisResult {
    /// Checks constraints the JSON shape alone cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(score) = self.experimental_correlation_score {
            if !CORRELATION_SCORE_RANGE.contains(&score) {
                return Err(format!(
                    "experimentalCorrelationScore {score} outside [0, 1]"
                ));
            }
        }
        Ok(())
    }
}

fn deserialize_mode_index<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw.fract() != 0.0 || raw < 0.0 || raw > f64::from(u32::MAX) {
        return Err(D::Error::custom(format!(
            "mode index must be a non-negative integer, got {raw}"
        )));
    }
    Ok(raw as u32)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::AnalysisResult;
    use crate::analysis::sample_result_payload as sample_payload;

    #[test]
    fn parses_camel_case_payload_and_integral_float_mode() -> anyhow::Result<()> {
        let result: AnalysisResult = serde_json::from_value(sample_payload())?;
        assert_eq!(result.docking_modes[1].mode, 2);
        assert_eq!(result.interacting_residues[0].interaction_type, "Hydrogen Bond");
        assert_eq!(result.experimental_correlation_score, None);
        assert!(result.validate().is_ok());
        Ok(())
    }

    #[test]
    fn rejects_fractional_mode_and_missing_fields() {
        let mut payload = sample_payload();
        payload["dockingModes"][0]["mode"] = json!(1.5);
        assert!(serde_json::from_value::<AnalysisResult>(payload).is_err());

        let mut payload = sample_payload();
        if let Some(object) = payload.as_object_mut() {
            object.remove("imagePrompts");
        }
        assert!(serde_json::from_value::<AnalysisResult>(payload).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_correlation() -> anyhow::Result<()> {
        let mut payload = sample_payload();
        payload["experimentalCorrelationScore"] = json!(1.4);
        let result: AnalysisResult = serde_json::from_value(payload)?;
        assert!(result.validate().is_err());
        Ok(())
    }

    #[test]
    fn serializes_without_absent_optionals() -> anyhow::Result<()> {
        let result: AnalysisResult = serde_json::from_value(sample_payload())?;
        let value = serde_json::to_value(&result)?;
        assert!(value.get("experimentalCorrelationScore").is_none());
        assert_eq!(value["interactingResidues"][0]["type"], json!("Hydrogen Bond"));
        let back: AnalysisResult = serde_json::from_value(value)?;
        assert_eq!(back, result);
        Ok(())
    }
}
