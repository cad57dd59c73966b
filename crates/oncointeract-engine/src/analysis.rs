use oncointeract_contracts::analysis::{AnalysisRequest, AnalysisResult};
use serde_json::{json, Value};
use thiserror::Error;

use crate::oracle::{OracleError, TextOracle};

pub const LIGAND_SNIPPET_CHARS: usize = 4000;
pub const RECEPTOR_SNIPPET_CHARS: usize = 4000;
pub const EXPERIMENTAL_SNIPPET_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Remote(#[from] OracleError),
    #[error("analysis response could not be parsed: {0}")]
    Parse(String),
}

/// First `max_chars` characters of `value`.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

pub fn build_analysis_prompt(request: &AnalysisRequest) -> String {
    let receptor_name = request.receptor_name();
    let mutation = request
        .mutation
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("None specified");

    let receptor_structure = match request.custom_receptor_content() {
        Some(content) if !content.is_empty() => format!(
            "- Custom Receptor PDB (Snippet):\n```\n{}\n```",
            truncate_chars(content, RECEPTOR_SNIPPET_CHARS)
        ),
        _ => format!(
            "- Standard Receptor Structure (Assume canonical structure for {receptor_name}, focus on the primary active site)."
        ),
    };

    let experimental = match request.experimental_data.as_deref() {
        Some(data) if !data.is_empty() => format!(
            "Experimental Data Provided:\n{}",
            truncate_chars(data, EXPERIMENTAL_SNIPPET_CHARS)
        ),
        _ => "No experimental data provided.".to_string(),
    };

    let mut lines = vec![
        "You are OncoInteract AI, an expert computational biology system specializing in Molecular Docking and Drug Discovery.".to_string(),
        String::new(),
        "**TASK:** Perform a full **AutoDock Vina** style virtual screening simulation and analysis.".to_string(),
        String::new(),
        "**Input Context:**".to_string(),
        format!("- Cancer Type: {}", request.cancer_type.label()),
        format!("- Cancer Class: {}", request.cancer_class.label()),
        format!("- Mutation: {mutation}"),
        format!("- Receptor Name: {receptor_name}"),
        String::new(),
        "**Structure Data:**".to_string(),
        "- Ligand PDB (Snippet):".to_string(),
        "```".to_string(),
        truncate_chars(&request.ligand_content, LIGAND_SNIPPET_CHARS).to_string(),
        "```".to_string(),
        receptor_structure,
        String::new(),
        "**Experimental Validation:**".to_string(),
        experimental,
        String::new(),
    ];
    lines.extend(ANALYSIS_REQUIREMENTS.iter().map(|line| line.to_string()));
    lines.join("\n")
}

const ANALYSIS_REQUIREMENTS: &[&str] = &[
    "**Analysis Requirements:**",
    "1. **Grid Box Estimation:** Calculate the center (X, Y, Z) and size (Angstroms) of the search space grid box covering the active site.",
    "2. **Docking Simulation:** Simulate the scoring of at least 5 binding modes. Report Affinity (kcal/mol) and RMSD (lb/ub).",
    "3. **Interaction Profiling:** Identify residues interacting via Hydrogen Bonds, Hydrophobic contacts, Pi-Stacking, etc.",
    "4. **Pathway Analysis:** Predict downstream effects (e.g., Inhibition of STAT3 phosphorylation -> Reduced Bcl-xl -> Apoptosis).",
    "5. **Scientific Report:** Summarize the binding mechanism and therapeutic potential in technical language suitable for a journal.",
    "",
    "**Image Prompts:**",
    "- 'molecularViz': **High-Quality PyMOL 3D Render.** Thick Cartoon protein (Helices as coiled ribbons, Beta sheets as arrows) in shades of Teal and Deep Blue. Ligand in the binding pocket as a **Ball-and-Stick model** (Carbon=Dark Grey, Oxygen=Red, Nitrogen=Blue, Sulfur=Yellow). Light blue dashed lines for hydrogen bonds. Text labels with leader lines on key interacting residues (e.g., 'ARG 32', 'GLU 91'). Solid neutral grey background (#888888), soft studio lighting.",
    "- 'pathwayMap': Detailed biological signaling pathway. Box-and-arrow style. Professional scientific publication standard.",
    "- 'cellularResponse': 3D Biomedical illustration of the cellular phenotype change (e.g. Apoptosis, Cell Cycle Arrest).",
    "",
    "Return ONLY JSON matching the response schema. Report at least 5 docking modes; experimentalCorrelationScore is a number in [0, 1] and, with correlationSummary, is only present when experimental data was provided.",
];

fn number() -> Value {
    json!({ "type": "NUMBER" })
}

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn string_list() -> Value {
    json!({ "type": "ARRAY", "items": string() })
}

fn vec3() -> Value {
    json!({
        "type": "OBJECT",
        "properties": { "x": number(), "y": number(), "z": number() },
        "required": ["x", "y", "z"],
    })
}

/// Structured-output schema sent with every analysis request.
pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "bindingEnergy": number(),
            "rmsd": number(),
            "ligandCentroid": string(),
            "dockingModes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "mode": number(),
                        "affinity": number(),
                        "rmsdLowerBound": number(),
                        "rmsdUpperBound": number(),
                    },
                    "required": ["mode", "affinity", "rmsdLowerBound", "rmsdUpperBound"],
                },
            },
            "gridBox": {
                "type": "OBJECT",
                "properties": { "center": vec3(), "size": vec3(), "spacing": number() },
                "required": ["center", "size", "spacing"],
            },
            "interactingResidues": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": { "name": string(), "xyz": string(), "type": string() },
                    "required": ["name", "xyz", "type"],
                },
            },
            "pathwayName": string(),
            "genesActivated": string_list(),
            "enzymesInvolved": string_list(),
            "cellResponse": string(),
            "receptor": string(),
            "cancerType": string(),
            "cancerClass": string(),
            "mutation": string(),
            "experimentalCorrelationScore": number(),
            "correlationSummary": string(),
            "summary": string(),
            "detailedAnalysis": string(),
            "imagePrompts": {
                "type": "OBJECT",
                "properties": {
                    "molecularViz": string(),
                    "pathwayMap": string(),
                    "cellularResponse": string(),
                },
                "required": ["molecularViz", "pathwayMap", "cellularResponse"],
            },
        },
        "required": [
            "bindingEnergy", "rmsd", "ligandCentroid", "dockingModes", "gridBox",
            "interactingResidues", "pathwayName", "genesActivated", "enzymesInvolved",
            "cellResponse", "receptor", "cancerType", "cancerClass", "mutation",
            "summary", "detailedAnalysis", "imagePrompts",
        ],
    })
}

/// Strips markdown code fences the model sometimes wraps JSON in.
pub fn clean_model_json(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

pub fn parse_analysis_response(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let cleaned = clean_model_json(text);
    if cleaned.is_empty() {
        return Err(AnalysisError::Parse("empty response".to_string()));
    }
    let result: AnalysisResult =
        serde_json::from_str(&cleaned).map_err(|err| AnalysisError::Parse(err.to_string()))?;
    result.validate().map_err(AnalysisError::Parse)?;
    Ok(result)
}

/// One oracle call, no retry.
pub fn analyze_interaction(
    oracle: &dyn TextOracle,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, AnalysisError> {
    let prompt = build_analysis_prompt(request);
    let text = oracle.complete_json(&prompt, &analysis_response_schema())?;
    parse_analysis_response(&text)
}
