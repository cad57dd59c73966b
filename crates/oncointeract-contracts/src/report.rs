use std::path::Path;

use anyhow::Context;

use crate::analysis::AnalysisResult;

pub const DEFAULT_REPORT_FILE_NAME: &str = "oncointeract_docking_report.json";

/// Writes the result as pretty-printed JSON, creating parent directories.
pub fn write_report(path: &Path, result: &AnalysisResult) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(result)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_report(path: &Path) -> anyhow::Result<AnalysisResult> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let result: AnalysisResult = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a docking report", path.display()))?;
    result
        .validate()
        .map_err(|reason| anyhow::anyhow!("{}: {reason}", path.display()))?;
    Ok(result)
}
