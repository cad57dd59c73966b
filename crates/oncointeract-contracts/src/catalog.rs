use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CancerType {
    #[default]
    Lung,
    Breast,
    Prostate,
    Colorectal,
    Pancreatic,
    Leukemia,
    Glioblastoma,
    Melanoma,
    Ovarian,
    Liver,
    Lymphoma,
    Kidney,
}

impl CancerType {
    pub const ALL: &'static [CancerType] = &[
        CancerType::Lung,
        CancerType::Breast,
        CancerType::Prostate,
        CancerType::Colorectal,
        CancerType::Pancreatic,
        CancerType::Leukemia,
        CancerType::Glioblastoma,
        CancerType::Melanoma,
        CancerType::Ovarian,
        CancerType::Liver,
        CancerType::Lymphoma,
        CancerType::Kidney,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Lung => "lung",
            Self::Breast => "breast",
            Self::Prostate => "prostate",
            Self::Colorectal => "colorectal",
            Self::Pancreatic => "pancreatic",
            Self::Leukemia => "leukemia",
            Self::Glioblastoma => "glioblastoma",
            Self::Melanoma => "melanoma",
            Self::Ovarian => "ovarian",
            Self::Liver => "liver",
            Self::Lymphoma => "lymphoma",
            Self::Kidney => "kidney",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Lung => "Lung Cancer",
            Self::Breast => "Breast Cancer",
            Self::Prostate => "Prostate Cancer",
            Self::Colorectal => "Colorectal Cancer",
            Self::Pancreatic => "Pancreatic Cancer",
            Self::Leukemia => "Leukemia",
            Self::Glioblastoma => "Glioblastoma",
            Self::Melanoma => "Melanoma",
            Self::Ovarian => "Ovarian Cancer",
            Self::Liver => "Liver Cancer (HCC)",
            Self::Lymphoma => "Lymphoma",
            Self::Kidney => "Renal Cell Carcinoma",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CancerClass {
    #[default]
    Adenocarcinoma,
    SquamousCell,
    SmallCell,
    LargeCell,
    TripleNegative,
    Her2Positive,
    Luminal,
    GlioblastomaMultiforme,
    Astrocytoma,
    AcuteMyeloid,
    ChronicMyeloid,
    AcuteLymphoblastic,
    CutaneousMelanoma,
    SerousCarcinoma,
    Hepatocellular,
    ClearCell,
}

impl CancerClass {
    pub const ALL: &'static [CancerClass] = &[
        CancerClass::Adenocarcinoma,
        CancerClass::SquamousCell,
        CancerClass::SmallCell,
        CancerClass::LargeCell,
        CancerClass::TripleNegative,
        CancerClass::Her2Positive,
        CancerClass::Luminal,
        CancerClass::GlioblastomaMultiforme,
        CancerClass::Astrocytoma,
        CancerClass::AcuteMyeloid,
        CancerClass::ChronicMyeloid,
        CancerClass::AcuteLymphoblastic,
        CancerClass::CutaneousMelanoma,
        CancerClass::SerousCarcinoma,
        CancerClass::Hepatocellular,
        CancerClass::ClearCell,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Adenocarcinoma => "adenocarcinoma",
            Self::SquamousCell => "squamous_cell",
            Self::SmallCell => "small_cell",
            Self::LargeCell => "large_cell",
            Self::TripleNegative => "tnbc",
            Self::Her2Positive => "her2_positive",
            Self::Luminal => "luminal",
            Self::GlioblastomaMultiforme => "gbm",
            Self::Astrocytoma => "astrocytoma",
            Self::AcuteMyeloid => "aml",
            Self::ChronicMyeloid => "cml",
            Self::AcuteLymphoblastic => "all",
            Self::CutaneousMelanoma => "cutaneous_melanoma",
            Self::SerousCarcinoma => "serous_carcinoma",
            Self::Hepatocellular => "hepatocellular",
            Self::ClearCell => "clear_cell",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Adenocarcinoma => "Adenocarcinoma",
            Self::SquamousCell => "Squamous Cell Carcinoma",
            Self::SmallCell => "Small Cell Carcinoma",
            Self::LargeCell => "Large Cell Carcinoma",
            Self::TripleNegative => "Triple-Negative Breast Cancer",
            Self::Her2Positive => "HER2-Positive",
            Self::Luminal => "Luminal A/B",
            Self::GlioblastomaMultiforme => "Glioblastoma Multiforme (GBM)",
            Self::Astrocytoma => "Astrocytoma",
            Self::AcuteMyeloid => "Acute Myeloid Leukemia (AML)",
            Self::ChronicMyeloid => "Chronic Myeloid Leukemia (CML)",
            Self::AcuteLymphoblastic => "Acute Lymphoblastic Leukemia (ALL)",
            Self::CutaneousMelanoma => "Cutaneous Melanoma",
            Self::SerousCarcinoma => "High-Grade Serous Carcinoma",
            Self::Hepatocellular => "Hepatocellular Carcinoma",
            Self::ClearCell => "Clear Cell Renal Cell Carcinoma",
        }
    }
}

/// Receptor picker. `Custom` is the upload marker: the receptor structure
/// then comes from a user file instead of a canonical target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReceptorOption {
    #[default]
    Stat3,
    Egfr,
    Vegfr,
    PdL1,
    Kras,
    Braf,
    Alk,
    Custom,
}

impl ReceptorOption {
    pub const ALL: &'static [ReceptorOption] = &[
        ReceptorOption::Stat3,
        ReceptorOption::Egfr,
        ReceptorOption::Vegfr,
        ReceptorOption::PdL1,
        ReceptorOption::Kras,
        ReceptorOption::Braf,
        ReceptorOption::Alk,
        ReceptorOption::Custom,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Stat3 => "stat3",
            Self::Egfr => "egfr",
            Self::Vegfr => "vegfr",
            Self::PdL1 => "pdl1",
            Self::Kras => "kras",
            Self::Braf => "braf",
            Self::Alk => "alk",
            Self::Custom => "custom",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stat3 => "STAT3 (Signal Transducer and Activator of Transcription 3)",
            Self::Egfr => "EGFR (Epidermal Growth Factor Receptor)",
            Self::Vegfr => "VEGFR (Vascular Endothelial Growth Factor Receptor)",
            Self::PdL1 => "PD-L1",
            Self::Kras => "KRAS (G12C mutant)",
            Self::Braf => "BRAF (V600E)",
            Self::Alk => "ALK (Anaplastic Lymphoma Kinase)",
            Self::Custom => "Upload Custom PDB",
        }
    }

    pub fn is_custom(self) -> bool {
        matches!(self, Self::Custom)
    }
}

fn lookup<T: Copy>(
    raw: &str,
    all: &[T],
    key: fn(T) -> &'static str,
    label: fn(T) -> &'static str,
    kind: &str,
) -> Result<T, String> {
    let needle = raw.trim();
    all.iter()
        .copied()
        .find(|item| {
            key(*item).eq_ignore_ascii_case(needle) || label(*item).eq_ignore_ascii_case(needle)
        })
        .ok_or_else(|| {
            let keys = all.iter().map(|item| key(*item)).collect::<Vec<_>>();
            format!("unknown {kind} '{needle}' (expected one of: {})", keys.join(", "))
        })
}

impl FromStr for CancerType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        lookup(raw, Self::ALL, Self::key, Self::label, "cancer type")
    }
}

impl FromStr for CancerClass {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        lookup(raw, Self::ALL, Self::key, Self::label, "cancer class")
    }
}

impl FromStr for ReceptorOption {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        lookup(raw, Self::ALL, Self::key, Self::label, "receptor")
    }
}

impl fmt::Display for CancerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for CancerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ReceptorOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
