use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::oracle::{ImageOracle, OracleError, TextOracle};

const DRYRUN_IMAGE_SIZE: u32 = 256;

fn prompt_digest(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn short_id(digest: &[u8]) -> String {
    hex::encode(&digest[..4])
}

fn prompt_field<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(label))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Maps a digest byte onto `[low, high]`, two decimals.
fn scaled(byte: u8, low: f64, high: f64) -> f64 {
    let value = low + (high - low) * f64::from(byte) / 255.0;
    (value * 100.0).round() / 100.0
}

/// Offline analysis model: a plausible, schema-conforming report derived
/// from the prompt hash. Same prompt, same report.
#[derive(Debug, Clone)]
pub struct DryrunTextOracle {
    model: String,
}

impl DryrunTextOracle {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn synthesize(&self, prompt: &str) -> Value {
        let digest = prompt_digest(&[&self.model, prompt]);
        let receptor = prompt_field(prompt, "- Receptor Name:").unwrap_or("STAT3");
        let cancer_type = prompt_field(prompt, "- Cancer Type:").unwrap_or("Unknown");
        let cancer_class = prompt_field(prompt, "- Cancer Class:").unwrap_or("Unknown");
        let mutation = prompt_field(prompt, "- Mutation:")
            .filter(|value| *value != "None specified")
            .unwrap_or("");
        let target = receptor.split_whitespace().next().unwrap_or(receptor);

        let best = -scaled(digest[0], 6.5, 11.0);
        let docking_modes: Vec<Value> = (0..5u8)
            .map(|idx| {
                let step = f64::from(idx);
                let affinity = ((best + step * scaled(digest[1 + idx as usize], 0.1, 0.6)) * 100.0)
                    .round()
                    / 100.0;
                let (lower, upper) = if idx == 0 {
                    (0.0, 0.0)
                } else {
                    let lower = scaled(digest[6 + idx as usize], 0.8, 3.0);
                    (lower, lower + scaled(digest[11 + idx as usize], 0.3, 2.5))
                };
                json!({
                    "mode": idx + 1,
                    "affinity": affinity,
                    "rmsdLowerBound": lower,
                    "rmsdUpperBound": upper,
                })
            })
            .collect();

        let center = json!({
            "x": scaled(digest[17], -20.0, 40.0),
            "y": scaled(digest[18], -20.0, 40.0),
            "z": scaled(digest[19], -20.0, 40.0),
        });
        let residue_names = ["ARG 609", "SER 611", "GLU 612", "LYS 591", "VAL 637", "TRP 623"];
        let residue_types = ["Hydrogen Bond", "Hydrophobic", "Pi-Stacking", "Salt Bridge"];
        let interacting_residues: Vec<Value> = (0..3usize)
            .map(|idx| {
                let byte = digest[20 + idx];
                json!({
                    "name": residue_names[(byte as usize + idx) % residue_names.len()],
                    "xyz": format!(
                        "({:.1}, {:.1}, {:.1})",
                        scaled(byte, -20.0, 40.0),
                        scaled(digest[23 + idx], -20.0, 40.0),
                        scaled(digest[26 + idx], -20.0, 40.0)
                    ),
                    "type": residue_types[byte as usize % residue_types.len()],
                })
            })
            .collect();

        let mut report = json!({
            "bindingEnergy": best,
            "rmsd": scaled(digest[29], 0.5, 2.5),
            "ligandCentroid": format!(
                "({}, {}, {})",
                center["x"], center["y"], center["z"]
            ),
            "dockingModes": docking_modes,
            "gridBox": {
                "center": center,
                "size": {
                    "x": scaled(digest[30], 18.0, 30.0),
                    "y": scaled(digest[31], 18.0, 30.0),
                    "z": scaled(digest[2], 18.0, 30.0),
                },
                "spacing": 0.375,
            },
            "interactingResidues": interacting_residues,
            "pathwayName": format!("{target} signaling"),
            "genesActivated": ["CDKN1A", "BAX", "CASP3"],
            "enzymesInvolved": ["JAK2", "Caspase-9"],
            "cellResponse": "Apoptosis",
            "receptor": receptor,
            "cancerType": cancer_type,
            "cancerClass": cancer_class,
            "mutation": mutation,
            "summary": format!(
                "Dryrun {}: ligand docks into the {target} active site at {best} kcal/mol.",
                short_id(&digest)
            ),
            "detailedAnalysis": format!(
                "Offline dryrun report for {receptor} in {cancer_type} ({cancer_class}). Values are derived from the request hash and carry no biological meaning."
            ),
            "imagePrompts": {
                "molecularViz": format!("Thick cartoon render of {target} with the ligand bound, ball-and-stick ligand"),
                "pathwayMap": format!("Box-and-arrow diagram of {target} signaling in {cancer_type}"),
                "cellularResponse": format!("3D illustration of apoptosis in {cancer_class} cells"),
            },
        });

        if prompt.contains("Experimental Data Provided:") {
            if let Some(object) = report.as_object_mut() {
                object.insert(
                    "experimentalCorrelationScore".to_string(),
                    json!(scaled(digest[3], 0.4, 0.95)),
                );
                object.insert(
                    "correlationSummary".to_string(),
                    json!("Predicted affinity ranking is consistent with the supplied assay trend."),
                );
            }
        }
        report
    }
}

impl TextOracle for DryrunTextOracle {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete_json(&self, prompt: &str, _schema: &Value) -> Result<String, OracleError> {
        Ok(self.synthesize(prompt).to_string())
    }
}

/// Offline image model: a solid-colour PNG whose colour comes from the
/// prompt hash.
#[derive(Debug, Clone)]
pub struct DryrunImageOracle {
    model: String,
}

impl DryrunImageOracle {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

pub fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let digest = prompt_digest(&[prompt]);
    (digest[0], digest[1], digest[2])
}

pub fn encode_solid_png(width: u32, height: u32, color: (u8, u8, u8)) -> anyhow::Result<Vec<u8>> {
    let (r, g, b) = color;
    let image = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

impl ImageOracle for DryrunImageOracle {
    fn name(&self) -> &str {
        &self.model
    }

    fn render(
        &self,
        prompt: &str,
        _system_instruction: &str,
    ) -> Result<Option<String>, OracleError> {
        let png = encode_solid_png(DRYRUN_IMAGE_SIZE, DRYRUN_IMAGE_SIZE, color_from_prompt(prompt))
            .map_err(|err| OracleError::payload("dryrun", err.to_string()))?;
        Ok(Some(BASE64.encode(png)))
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use oncointeract_contracts::analysis::ReceptorChoice;
    use serde_json::json;

    use super::{color_from_prompt, DryrunImageOracle, DryrunTextOracle};
    use crate::analysis::tests::sample_request;
    use crate::analysis::{analysis_response_schema, build_analysis_prompt, parse_analysis_response};
    use crate::oracle::{ImageOracle, TextOracle};

    #[test]
    fn dryrun_report_parses_and_echoes_request() -> anyhow::Result<()> {
        let oracle = DryrunTextOracle::new("dryrun-text-1");
        let prompt = build_analysis_prompt(&sample_request());
        let text = oracle.complete_json(&prompt, &analysis_response_schema())?;
        let result = parse_analysis_response(&text)?;

        assert_eq!(result.cancer_type, "Breast Cancer");
        assert_eq!(result.cancer_class, "Triple-Negative Breast Cancer");
        assert_eq!(result.mutation, "");
        assert_eq!(result.docking_modes.len(), 5);
        assert!((result.binding_energy - result.docking_modes[0].affinity).abs() < 1e-9);
        assert!(result.experimental_correlation_score.is_none());
        assert_eq!(oracle.complete_json(&prompt, &json!({}))?, text);
        Ok(())
    }

    #[test]
    fn dryrun_report_scores_experimental_data() -> anyhow::Result<()> {
        let mut request = sample_request();
        request.receptor = ReceptorChoice::Custom {
            file_name: "t.pdb".to_string(),
            content: "ATOM".to_string(),
        };
        request.mutation = Some("Y705F".to_string());
        request.experimental_data = Some("compound,ic50\nA,0.3".to_string());

        let oracle = DryrunTextOracle::new("dryrun-text-1");
        let text = oracle.complete_json(&build_analysis_prompt(&request), &json!({}))?;
        let result = parse_analysis_response(&text)?;
        let score = result.experimental_correlation_score.unwrap_or(-1.0);
        assert!((0.0..=1.0).contains(&score));
        assert!(result.correlation_summary.is_some());
        assert_eq!(result.receptor, "Custom Receptor: t.pdb");
        assert_eq!(result.mutation, "Y705F");
        Ok(())
    }

    #[test]
    fn dryrun_image_is_png_coloured_by_prompt() -> anyhow::Result<()> {
        let oracle = DryrunImageOracle::new("dryrun-image-1");
        let payload = oracle.render("pathway", "")?.unwrap_or_default();
        let bytes = BASE64.decode(payload.as_bytes())?;
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = image::load_from_memory(&bytes)?.to_rgb8();
        let (r, g, b) = color_from_prompt("pathway");
        assert_eq!(decoded.get_pixel(0, 0).0, [r, g, b]);
        Ok(())
    }
}
