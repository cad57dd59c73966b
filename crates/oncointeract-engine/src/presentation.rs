use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use oncointeract_contracts::analysis::{AnalysisResult, GeneratedImages, VisualizationKey};

pub const IMAGE_PLACEHOLDER: &str = "Generating visualization...";

/// Fixed-point rendering with half-away-from-zero rounding applied to the
/// shortest decimal form of `value`, so `-9.45` becomes `-9.5` at one place.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let repr = format!("{}", value.abs());
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part.bytes().collect();
    let kept = frac_part.len().min(decimals);
    digits.extend(frac_part.bytes().take(kept));
    digits.extend(std::iter::repeat(b'0').take(decimals - kept));

    let round_up = frac_part
        .as_bytes()
        .get(decimals)
        .map(|next| *next >= b'5')
        .unwrap_or(false);
    if round_up {
        let mut idx = digits.len();
        loop {
            if idx == 0 {
                digits.insert(0, b'1');
                break;
            }
            idx -= 1;
            if digits[idx] == b'9' {
                digits[idx] = b'0';
            } else {
                digits[idx] += 1;
                break;
            }
        }
    }

    let split = digits.len() - decimals;
    let mut out = String::with_capacity(digits.len() + 2);
    if value.is_sign_negative() && digits.iter().any(|digit| *digit != b'0') {
        out.push('-');
    }
    out.push_str(&String::from_utf8_lossy(&digits[..split]));
    if decimals > 0 {
        out.push('.');
        out.push_str(&String::from_utf8_lossy(&digits[split..]));
    }
    out
}

pub fn format_affinity(value: f64) -> String {
    format_fixed(value, 1)
}

pub fn format_rmsd(value: f64) -> String {
    format_fixed(value, 3)
}

pub fn format_coordinate(value: f64) -> String {
    format_fixed(value, 3)
}

pub fn format_box_size(value: f64) -> String {
    format_fixed(value, 1)
}

pub fn format_correlation_percent(score: f64) -> String {
    format!("{}%", format_fixed(score * 100.0, 1))
}

fn approx_decoded_kib(payload: &str) -> usize {
    let padding = payload.bytes().rev().take_while(|byte| *byte == b'=').count();
    (payload.len() / 4 * 3).saturating_sub(padding).div_ceil(1024)
}

fn push_heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{title}\n{}", "-".repeat(title.chars().count()));
}

/// Plain-text dashboard. Missing images render as a placeholder tile.
pub fn render_text_report(result: &AnalysisResult, images: &GeneratedImages) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Docking Simulation Summary\n==========================");
    let _ = writeln!(out, "{}", result.summary);

    let mut chips = vec![
        format!("Type: {}", result.cancer_type),
        format!("Class: {}", result.cancer_class),
    ];
    if !result.mutation.is_empty() {
        chips.push(format!("Mutation: {}", result.mutation));
    }
    let _ = writeln!(out, "[{}]", chips.join("] ["));
    let _ = writeln!(out, "Receptor: {}", result.receptor);

    push_heading(&mut out, "AutoDock Vina Results");
    let _ = writeln!(
        out,
        "{:>4}  {:>19}  {:>9}  {:>9}",
        "Mode", "Affinity (kcal/mol)", "RMSD l.b.", "RMSD u.b."
    );
    for mode in &result.docking_modes {
        let _ = writeln!(
            out,
            "{:>4}  {:>19}  {:>9}  {:>9}",
            mode.mode,
            format_affinity(mode.affinity),
            format_rmsd(mode.rmsd_lower_bound),
            format_rmsd(mode.rmsd_upper_bound)
        );
    }
    let _ = writeln!(
        out,
        "Binding energy {} kcal/mol, RMSD {}, ligand centroid {}",
        format_affinity(result.binding_energy),
        format_rmsd(result.rmsd),
        result.ligand_centroid
    );

    push_heading(&mut out, "Grid Configuration");
    let grid = &result.grid_box;
    for (axis, center, size) in [
        ("x", grid.center.x, grid.size.x),
        ("y", grid.center.y, grid.size.y),
        ("z", grid.center.z, grid.size.z),
    ] {
        let _ = writeln!(
            out,
            "center_{axis} = {:<10} size_{axis} = {}",
            format_coordinate(center),
            format_box_size(size)
        );
    }
    let _ = writeln!(out, "spacing = {} Å", grid.spacing);

    if let Some(score) = result.experimental_correlation_score {
        push_heading(&mut out, "Experimental Validation Analysis");
        let _ = writeln!(out, "Correlation: {}", format_correlation_percent(score));
        if let Some(summary) = result.correlation_summary.as_deref() {
            let _ = writeln!(out, "{summary}");
        }
    }

    push_heading(&mut out, "Molecular Interactions");
    for residue in &result.interacting_residues {
        let _ = writeln!(
            out,
            "{:<10} {:<18} {}",
            residue.name, residue.interaction_type, residue.xyz
        );
    }

    push_heading(&mut out, "Predicted Pathway Modulation");
    let _ = writeln!(out, "Signal Transduction: {}", result.pathway_name);
    let _ = writeln!(out, "Targeted Genes: {}", result.genes_activated.join(", "));
    let _ = writeln!(
        out,
        "Key Proteins/Enzymes: {}",
        result.enzymes_involved.join(", ")
    );
    let _ = writeln!(out, "Cell Response: {}", result.cell_response);

    push_heading(&mut out, "Discussion & Therapeutic Implications");
    let _ = writeln!(out, "{}", result.detailed_analysis);

    push_heading(&mut out, "Structural & Biological Visualizations");
    for key in VisualizationKey::ALL {
        let tile = match images.get(key) {
            Some(payload) => format!(
                "ready, ~{} KiB ({})",
                approx_decoded_kib(payload),
                key.file_name()
            ),
            None => IMAGE_PLACEHOLDER.to_string(),
        };
        let _ = writeln!(out, "{:<32} {tile}", key.title());
    }
    out
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn html_chips(items: &[String], class: &str) -> String {
    items
        .iter()
        .map(|item| format!("<span class='{class}'>{}</span>", escape_html(item)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Standalone HTML report with images inlined as data URIs.
pub fn render_html_report(result: &AnalysisResult, images: &GeneratedImages) -> String {
    let mut chips = vec![
        format!("Type: {}", result.cancer_type),
        format!("Class: {}", result.cancer_class),
    ];
    if !result.mutation.is_empty() {
        chips.push(format!("Mutation: {}", result.mutation));
    }

    let mut mode_rows = String::new();
    for mode in &result.docking_modes {
        let _ = write!(
            mode_rows,
            "<tr><td>{}</td><td class='num'>{}</td><td class='num'>{}</td><td class='num'>{}</td></tr>",
            mode.mode,
            format_affinity(mode.affinity),
            format_rmsd(mode.rmsd_lower_bound),
            format_rmsd(mode.rmsd_upper_bound)
        );
    }

    let grid = &result.grid_box;
    let grid_block = format!(
        "center_x = {}\ncenter_y = {}\ncenter_z = {}\nsize_x = {}\nsize_y = {}\nsize_z = {}\nspacing = {} Å",
        format_coordinate(grid.center.x),
        format_coordinate(grid.center.y),
        format_coordinate(grid.center.z),
        format_box_size(grid.size.x),
        format_box_size(grid.size.y),
        format_box_size(grid.size.z),
        grid.spacing
    );

    let validation = match result.experimental_correlation_score {
        Some(score) => format!(
            "<section class='validation'><h3>Experimental Validation Analysis</h3><div class='score'>{}</div><p>{}</p></section>",
            format_correlation_percent(score),
            escape_html(result.correlation_summary.as_deref().unwrap_or_default())
        ),
        None => String::new(),
    };

    let residues = result
        .interacting_residues
        .iter()
        .map(|residue| {
            format!(
                "<li><b>{}</b> <span class='chip'>{}</span> <code>{}</code></li>",
                escape_html(&residue.name),
                escape_html(&residue.interaction_type),
                escape_html(&residue.xyz)
            )
        })
        .collect::<String>();

    let mut tiles = String::new();
    for key in VisualizationKey::ALL {
        let body = match images.get(key) {
            Some(payload) => format!(
                "<img src='data:image/png;base64,{}' alt='{}'>",
                escape_html(payload),
                escape_html(key.title())
            ),
            None => format!("<span class='pending'>{IMAGE_PLACEHOLDER}</span>"),
        };
        let _ = write!(
            tiles,
            "<div class='tile'><div class='thumb'>{body}</div><div class='caption'>{}</div></div>",
            escape_html(key.title())
        );
    }

    format!(
        "<!doctype html>\n<html>\n<head>\n  <meta charset='utf-8'>\n  <title>OncoInteract Docking Report</title>\n  <style>\n    body {{ font-family: Arial, sans-serif; background: #f6f6f6; margin: 0; padding: 20px; color: #1e293b; }}\n    section {{ background: white; border-radius: 10px; padding: 16px 20px; margin-bottom: 16px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }}\n    .chip {{ display: inline-block; background: #eef2ff; border-radius: 999px; padding: 2px 10px; font-size: 12px; }}\n    table {{ border-collapse: collapse; width: 100%; }}\n    td, th {{ padding: 6px 10px; border-bottom: 1px solid #e2e8f0; text-align: left; }}\n    .num {{ text-align: right; font-family: monospace; }}\n    pre {{ background: #0f172a; color: #a7f3d0; padding: 12px; border-radius: 8px; }}\n    .score {{ font-size: 28px; font-weight: bold; color: #047857; }}\n    .tiles {{ display: grid; grid-template-columns: repeat(3, 1fr); gap: 16px; }}\n    .thumb {{ height: 200px; background: #eee; display: flex; align-items: center; justify-content: center; }}\n    .thumb img {{ max-width: 100%; max-height: 100%; }}\n    .pending {{ color: #94a3b8; font-style: italic; }}\n    .caption {{ font-weight: bold; font-size: 13px; padding: 8px 0; }}\n  </style>\n</head>\n<body>\n  <section>\n    <h1>Docking Simulation Summary</h1>\n    <p>{summary}</p>\n    <div>{chips}</div>\n    <p>Receptor: {receptor}</p>\n  </section>\n  <section>\n    <h3>AutoDock Vina Results</h3>\n    <table><tr><th>Mode</th><th class='num'>Affinity (kcal/mol)</th><th class='num'>RMSD l.b.</th><th class='num'>RMSD u.b.</th></tr>{mode_rows}</table>\n    <h3>Grid Configuration</h3>\n    <pre>{grid_block}</pre>\n  </section>\n  {validation}\n  <section>\n    <h3>Molecular Interactions</h3>\n    <ul>{residues}</ul>\n    <h3>Predicted Pathway Modulation</h3>\n    <p>{pathway}</p>\n    <div>{genes}</div>\n    <div>{enzymes}</div>\n    <p>{cell_response}</p>\n  </section>\n  <section>\n    <h3>Discussion &amp; Therapeutic Implications</h3>\n    <p style='white-space: pre-line'>{detailed}</p>\n  </section>\n  <section>\n    <h3>Structural &amp; Biological Visualizations</h3>\n    <div class='tiles'>{tiles}</div>\n  </section>\n</body>\n</html>\n",
        summary = escape_html(&result.summary),
        chips = html_chips(&chips, "chip"),
        receptor = escape_html(&result.receptor),
        pathway = escape_html(&result.pathway_name),
        genes = html_chips(&result.genes_activated, "chip"),
        enzymes = html_chips(&result.enzymes_involved, "chip"),
        cell_response = escape_html(&result.cell_response),
        detailed = escape_html(&result.detailed_analysis),
    )
}

pub fn write_html_report(
    out_path: &Path,
    result: &AnalysisResult,
    images: &GeneratedImages,
) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(out_path, render_html_report(result, images))
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(())
}

/// Decodes a base64 image payload and writes the raw bytes.
pub fn export_image(path: &Path, payload: &str) -> Result<()> {
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .context("image payload is not valid base64")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Writes every present image under its standard file name.
pub fn export_images(dir: &Path, images: &GeneratedImages) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (key, payload) in images.iter() {
        let path = dir.join(key.file_name());
        export_image(&path, payload)?;
        written.push(path);
    }
    Ok(written)
}

/// Reads previously exported images back from `dir`, skipping missing files.
pub fn load_images(dir: &Path) -> Result<GeneratedImages> {
    let mut images = GeneratedImages::new();
    for key in VisualizationKey::ALL {
        let path = dir.join(key.file_name());
        if !path.is_file() {
            continue;
        }
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        images.insert(key, BASE64.encode(bytes));
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use oncointeract_contracts::analysis::{AnalysisResult, GeneratedImages, VisualizationKey};
    use serde_json::json;

    use super::{
        escape_html, export_image, export_images, format_correlation_percent, format_fixed,
        load_images, render_html_report, render_text_report, IMAGE_PLACEHOLDER,
    };
    use crate::analysis::tests::sample_response;

    fn sample_result() -> anyhow::Result<AnalysisResult> {
        let mut payload = sample_response();
        payload["dockingModes"] = json!([
            { "mode": 1, "affinity": -9.45, "rmsdLowerBound": 0.0, "rmsdUpperBound": 0.0 },
            { "mode": 2, "affinity": -9.1, "rmsdLowerBound": 1.2345, "rmsdUpperBound": 1.8 }
        ]);
        payload["gridBox"]["size"]["x"] = json!(22.0);
        payload["mutation"] = json!("");
        Ok(serde_json::from_value(payload)?)
    }

    #[test]
    fn fixed_formatting_rounds_half_away_from_zero() {
        assert_eq!(format_fixed(-9.45, 1), "-9.5");
        assert_eq!(format_fixed(1.2345, 3), "1.235");
        assert_eq!(format_fixed(22.0, 1), "22.0");
        assert_eq!(format_fixed(9.96, 1), "10.0");
        assert_eq!(format_fixed(-0.04, 1), "0.0");
        assert_eq!(format_fixed(0.375, 0), "0");
        assert_eq!(format_fixed(2.5, 0), "3");
        assert_eq!(format_fixed(12.5, 3), "12.500");
        assert_eq!(format_correlation_percent(0.8125), "81.3%");
    }

    #[test]
    fn text_report_formats_table_and_hides_empty_mutation() -> anyhow::Result<()> {
        let result = sample_result()?;
        let report = render_text_report(&result, &GeneratedImages::new());
        assert!(report.contains("-9.5"));
        assert!(report.contains("1.235"));
        assert!(report.contains("size_x = 22.0"));
        assert!(!report.contains("Mutation:"));
        assert!(!report.contains("Experimental Validation Analysis"));
        assert_eq!(report.matches(IMAGE_PLACEHOLDER).count(), 3);
        Ok(())
    }

    #[test]
    fn text_report_shows_validation_and_partial_images() -> anyhow::Result<()> {
        let mut result = sample_result()?;
        result.mutation = "Y705F".to_string();
        result.experimental_correlation_score = Some(0.8125);
        result.correlation_summary = Some("Trend agrees.".to_string());
        let mut images = GeneratedImages::new();
        images.insert(VisualizationKey::PathwayMap, BASE64.encode([1u8; 2048]));

        let report = render_text_report(&result, &images);
        assert!(report.contains("[Mutation: Y705F]"));
        assert!(report.contains("Correlation: 81.3%"));
        assert!(report.contains("Trend agrees."));
        assert!(report.contains("ready, ~2 KiB (pathway_map.png)"));
        assert_eq!(report.matches(IMAGE_PLACEHOLDER).count(), 2);
        Ok(())
    }

    #[test]
    fn html_report_escapes_text_and_embeds_images() -> anyhow::Result<()> {
        let mut result = sample_result()?;
        result.summary = "<script>alert('x')</script> & more".to_string();
        let mut images = GeneratedImages::new();
        images.insert(VisualizationKey::MolecularViz, "iVBORw0KGgo=");

        let html = render_html_report(&result, &images);
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt; &amp; more"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("src='data:image/png;base64,iVBORw0KGgo='"));
        assert_eq!(html.matches(IMAGE_PLACEHOLDER).count(), 2);
        assert_eq!(escape_html("a\"b"), "a&quot;b");
        Ok(())
    }

    #[test]
    fn export_image_decodes_and_rejects_bad_base64() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("docking_complex.png");
        export_image(&path, &BASE64.encode(b"\x89PNG-bytes"))?;
        assert_eq!(std::fs::read(&path)?, b"\x89PNG-bytes");

        let bad = temp.path().join("bad.png");
        assert!(export_image(&bad, "not base64 !!").is_err());
        assert!(!bad.exists());
        Ok(())
    }

    #[test]
    fn export_images_writes_present_keys_and_reloads_them() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut images = GeneratedImages::new();
        images.insert(VisualizationKey::CellularResponse, BASE64.encode(b"cell"));
        images.insert(VisualizationKey::PathwayMap, BASE64.encode(b"path"));

        let written = export_images(temp.path(), &images)?;
        assert_eq!(written.len(), 2);
        assert!(temp.path().join("cellular_response.png").is_file());
        assert!(!temp.path().join("docking_complex.png").exists());

        assert_eq!(load_images(temp.path())?, images);
        Ok(())
    }
}
