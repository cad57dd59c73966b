use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::analysis::{AnalysisRequest, ReceptorChoice};
use crate::catalog::{CancerClass, CancerType, ReceptorOption};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a Ligand PDB file.")]
    MissingLigand,
    #[error("Please upload a Custom Receptor PDB file.")]
    MissingCustomReceptor,
    #[error("Could not read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// A text file the user attached, decoded to memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub name: String,
    pub path: PathBuf,
    pub content: String,
}

impl LoadedFile {
    pub fn read(path: &Path) -> Result<Self, ValidationError> {
        let bytes = std::fs::read(path).map_err(|err| ValidationError::Unreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .filter(|value| !value.is_empty())
            .unwrap_or("upload")
            .to_string();
        Ok(Self {
            name,
            path: path.to_path_buf(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Input collection state. Nothing leaves the form until `submit` validates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisForm {
    pub ligand: Option<LoadedFile>,
    pub receptor: ReceptorOption,
    pub custom_receptor: Option<LoadedFile>,
    pub cancer_type: CancerType,
    pub cancer_class: CancerClass,
    pub mutation: String,
    pub experimental: Option<LoadedFile>,
}

impl AnalysisForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_ligand(&mut self, path: &Path) -> Result<&LoadedFile, ValidationError> {
        Ok(self.ligand.insert(LoadedFile::read(path)?))
    }

    pub fn load_custom_receptor(&mut self, path: &Path) -> Result<&LoadedFile, ValidationError> {
        Ok(self.custom_receptor.insert(LoadedFile::read(path)?))
    }

    pub fn load_experimental(&mut self, path: &Path) -> Result<&LoadedFile, ValidationError> {
        Ok(self.experimental.insert(LoadedFile::read(path)?))
    }

    pub fn set_mutation(&mut self, mutation: &str) {
        self.mutation = mutation.trim().to_string();
    }

    pub fn clear_experimental(&mut self) {
        self.experimental = None;
    }

    pub fn submit(&self) -> Result<AnalysisRequest, ValidationError> {
        let ligand = self
            .ligand
            .as_ref()
            .filter(|file| file.has_content())
            .ok_or(ValidationError::MissingLigand)?;

        let receptor = if self.receptor.is_custom() {
            let custom = self
                .custom_receptor
                .as_ref()
                .filter(|file| file.has_content())
                .ok_or(ValidationError::MissingCustomReceptor)?;
            ReceptorChoice::Custom {
                file_name: custom.name.clone(),
                content: custom.content.clone(),
            }
        } else {
            ReceptorChoice::Catalog(self.receptor)
        };

        let mutation = Some(self.mutation.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let experimental_data = self
            .experimental
            .as_ref()
            .filter(|file| file.has_content())
            .map(|file| file.content.clone());

        Ok(AnalysisRequest {
            ligand_content: ligand.content.clone(),
            receptor,
            cancer_type: self.cancer_type,
            cancer_class: self.cancer_class,
            mutation,
            experimental_data,
        })
    }

    /// One line per field, for status displays.
    pub fn describe(&self) -> Vec<String> {
        let file_label = |file: &Option<LoadedFile>| {
            file.as_ref()
                .map(|file| format!("{} ({} chars)", file.name, file.content.chars().count()))
                .unwrap_or_else(|| "(none)".to_string())
        };
        let mut lines = vec![
            format!("ligand: {}", file_label(&self.ligand)),
            format!("receptor: {}", self.receptor.label()),
        ];
        if self.receptor.is_custom() {
            lines.push(format!("custom receptor: {}", file_label(&self.custom_receptor)));
        }
        lines.push(format!("cancer type: {}", self.cancer_type.label()));
        lines.push(format!("cancer class: {}", self.cancer_class.label()));
        lines.push(format!(
            "mutation: {}",
            if self.mutation.is_empty() {
                "(none)"
            } else {
                self.mutation.as_str()
            }
        ));
        lines.push(format!("experimental data: {}", file_label(&self.experimental)));
        lines
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{AnalysisForm, ValidationError};
    use crate::analysis::ReceptorChoice;
    use crate::catalog::ReceptorOption;

    #[test]
    fn submit_requires_loaded_ligand() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut form = AnalysisForm::new();
        assert_eq!(form.submit(), Err(ValidationError::MissingLigand));

        let empty = temp.path().join("empty.pdb");
        fs::write(&empty, "")?;
        form.load_ligand(&empty)?;
        assert_eq!(form.submit(), Err(ValidationError::MissingLigand));
        Ok(())
    }

    #[test]
    fn custom_receptor_without_file_is_rejected() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let ligand = temp.path().join("ligand.pdb");
        fs::write(&ligand, "HETATM    1  C1  LIG A   1")?;

        let mut form = AnalysisForm::new();
        form.load_ligand(&ligand)?;
        form.receptor = ReceptorOption::Custom;
        assert_eq!(form.submit(), Err(ValidationError::MissingCustomReceptor));
        assert_eq!(
            ValidationError::MissingCustomReceptor.to_string(),
            "Please upload a Custom Receptor PDB file."
        );

        let receptor = temp.path().join("target.pdb");
        fs::write(&receptor, "ATOM      1  N   MET A   1")?;
        form.load_custom_receptor(&receptor)?;
        let request = form.submit()?;
        assert_eq!(request.receptor_name(), "Custom Receptor: target.pdb");
        assert_eq!(
            request.custom_receptor_content(),
            Some("ATOM      1  N   MET A   1")
        );
        Ok(())
    }

    #[test]
    fn optional_fields_collapse_to_none() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let ligand = temp.path().join("ligand.pdb");
        fs::write(&ligand, "HETATM")?;
        let receptor = temp.path().join("ignored.pdb");
        fs::write(&receptor, "ATOM")?;

        let mut form = AnalysisForm::new();
        form.load_ligand(&ligand)?;
        form.load_custom_receptor(&receptor)?;
        form.set_mutation("   ");
        let request = form.submit()?;
        assert_eq!(request.mutation, None);
        assert_eq!(request.experimental_data, None);
        assert_eq!(request.receptor, ReceptorChoice::Catalog(ReceptorOption::Stat3));
        Ok(())
    }

    #[test]
    fn unreadable_file_is_a_validation_error() {
        let mut form = AnalysisForm::new();
        let err = form
            .load_experimental(std::path::Path::new("/definitely/missing/data.csv"))
            .err();
        assert!(matches!(err, Some(ValidationError::Unreadable { .. })));
        assert!(form.experimental.is_none());
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("ligand.pdb");
        fs::write(&path, [b'H', 0xff, b'X'])?;
        let mut form = AnalysisForm::new();
        let loaded = form.load_ligand(&path)?;
        assert_eq!(loaded.content, "H\u{fffd}X");
        Ok(())
    }
}
