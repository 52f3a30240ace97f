use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Closed set of trial categories a quotation request can name.
///
/// Internal logic branches on the variant; the localized label is only used
/// when reading form answers and writing output fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrialType {
    InvestigatorInitiatedTrial,
    SpecifiedClinicalTrial,
    InterventionStudies,
    ObservationalStudiesAndRegistries,
    AdvancedMedical,
}

impl TrialType {
    pub const ALL: [TrialType; 5] = [
        TrialType::InvestigatorInitiatedTrial,
        TrialType::SpecifiedClinicalTrial,
        TrialType::InterventionStudies,
        TrialType::ObservationalStudiesAndRegistries,
        TrialType::AdvancedMedical,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::InvestigatorInitiatedTrial => "investigatorInitiatedTrial",
            Self::SpecifiedClinicalTrial => "specifiedClinicalTrial",
            Self::InterventionStudies => "interventionStudies",
            Self::ObservationalStudiesAndRegistries => "observationalStudiesAndRegistries",
            Self::AdvancedMedical => "advancedMedical",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::InvestigatorInitiatedTrial => "医師主導治験",
            Self::SpecifiedClinicalTrial => "特定臨床研究",
            Self::InterventionStudies => "介入研究（特定臨床研究以外）",
            Self::ObservationalStudiesAndRegistries => "観察研究・レジストリ",
            Self::AdvancedMedical => "先進",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|trial_type| trial_type.label() == label)
    }

    /// Lead time before FPI, in months.
    pub fn setup_months(self) -> u32 {
        match self {
            Self::ObservationalStudiesAndRegistries => 3,
            _ => 6,
        }
    }

    /// Trail time after LPO, in months. Always equal to the setup lead time.
    pub fn closing_months(self) -> u32 {
        self.setup_months()
    }

    pub fn final_analysis_count(self) -> i64 {
        match self {
            Self::InvestigatorInitiatedTrial => 100,
            _ => 50,
        }
    }

    /// Default number of years the workbook's Trial sheet spreads the quote over.
    pub fn default_sheet_years(self) -> u32 {
        match self {
            Self::ObservationalStudiesAndRegistries => 1,
            Self::InterventionStudies => 2,
            Self::SpecifiedClinicalTrial => 3,
            Self::InvestigatorInitiatedTrial | Self::AdvancedMedical => 5,
        }
    }
}

impl fmt::Display for TrialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TrialType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_label(value).ok_or_else(|| DomainError::UnknownTrialType(value.trim().to_owned()))
    }
}
