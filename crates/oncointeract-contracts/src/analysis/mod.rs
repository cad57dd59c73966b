mod images;
mod request;
mod result;

pub use images::{GeneratedImages, VisualizationKey};
pub use request::{AnalysisRequest, ReceptorChoice};
pub use result::{
    AnalysisResult, BindingMode, GridBox, ImagePrompts, InteractingResidue, Vec3,
    CORRELATION_SCORE_RANGE,
};

#[cfg(test)]
pub(crate) fn sample_result_payload() -> serde_json::Value {
    serde_json::json!({
        "bindingEnergy": -9.45,
        "rmsd": 1.2,
        "ligandCentroid": "(12.1, 40.2, -5.3)",
        "dockingModes": [
            { "mode": 1, "affinity": -9.45, "rmsdLowerBound": 0.0, "rmsdUpperBound": 0.0 },
            { "mode": 2.0, "affinity": -9.1, "rmsdLowerBound": 1.2345, "rmsdUpperBound": 1.8 }
        ],
        "gridBox": {
            "center": { "x": 12.5, "y": 40.25, "z": -5.125 },
            "size": { "x": 22.0, "y": 24.0, "z": 20.5 },
            "spacing": 0.375
        },
        "interactingResidues": [
            { "name": "ARG 32", "xyz": "(11.0, 39.5, -4.0)", "type": "Hydrogen Bond" }
        ],
        "pathwayName": "JAK/STAT3",
        "genesActivated": ["BCL2L1", "MCL1"],
        "enzymesInvolved": ["JAK2"],
        "cellResponse": "Apoptosis",
        "receptor": "STAT3",
        "cancerType": "Lung Cancer",
        "cancerClass": "Adenocarcinoma",
        "mutation": "",
        "summary": "Strong binder.",
        "detailedAnalysis": "Long discussion.",
        "imagePrompts": {
            "molecularViz": "render complex",
            "pathwayMap": "draw pathway",
            "cellularResponse": "draw cell"
        }
    })
}
