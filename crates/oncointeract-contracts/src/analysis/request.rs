use crate::catalog::{CancerClass, CancerType, ReceptorOption};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceptorChoice {
    Catalog(ReceptorOption),
    Custom { file_name: String, content: String },
}

impl ReceptorChoice {
    pub fn name(&self) -> String {
        match self {
            Self::Catalog(option) => option.label().to_string(),
            Self::Custom { file_name, .. } => format!("Custom Receptor: {file_name}"),
        }
    }

    pub fn custom_content(&self) -> Option<&str> {
        match self {
            Self::Catalog(_) => None,
            Self::Custom { content, .. } => Some(content.as_str()),
        }
    }
}

/// One submitted analysis. Built by the form and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub ligand_content: String,
    pub receptor: ReceptorChoice,
    pub cancer_type: CancerType,
    pub cancer_class: CancerClass,
    pub mutation: Option<String>,
    pub experimental_data: Option<String>,
}

impl AnalysisRequest {
    pub fn receptor_name(&self) -> String {
        self.receptor.name()
    }

    pub fn custom_receptor_content(&self) -> Option<&str> {
        self.receptor.custom_content()
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisRequest, ReceptorChoice};
    use crate::catalog::{CancerClass, CancerType, ReceptorOption};

    #[test]
    fn receptor_name_uses_label_or_upload_file_name() {
        let mut request = AnalysisRequest {
            ligand_content: "HETATM".to_string(),
            receptor: ReceptorChoice::Catalog(ReceptorOption::Braf),
            cancer_type: CancerType::Melanoma,
            cancer_class: CancerClass::CutaneousMelanoma,
            mutation: None,
            experimental_data: None,
        };
        assert_eq!(request.receptor_name(), "BRAF (V600E)");
        assert_eq!(request.custom_receptor_content(), None);

        request.receptor = ReceptorChoice::Custom {
            file_name: "1abc.pdb".to_string(),
            content: "ATOM".to_string(),
        };
        assert_eq!(request.receptor_name(), "Custom Receptor: 1abc.pdb");
        assert_eq!(request.custom_receptor_content(), Some("ATOM"));
    }
}
