use serde::{Deserialize, Serialize};

use crate::domain::trial::TrialType;

const SUPPORT_TEXT_SEPARATOR: &str = ", ";

/// Service categories a quotation can include, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SupportItem {
    ProtocolDevelopmentSupport,
    ClinicalTrialOffice,
    Datacenter,
    Monitoring,
    StatisticalAnalysis,
    Csr,
}

impl SupportItem {
    pub const ALL: [SupportItem; 6] = [
        SupportItem::ProtocolDevelopmentSupport,
        SupportItem::ClinicalTrialOffice,
        SupportItem::Datacenter,
        SupportItem::Monitoring,
        SupportItem::StatisticalAnalysis,
        SupportItem::Csr,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::ProtocolDevelopmentSupport => "protocolDevelopmentSupport",
            Self::ClinicalTrialOffice => "clinicalTrialOffice",
            Self::Datacenter => "datacenter",
            Self::Monitoring => "monitoring",
            Self::StatisticalAnalysis => "statisticalAnalysis",
            Self::Csr => "csr",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ProtocolDevelopmentSupport => "プロトコル作成支援",
            Self::ClinicalTrialOffice => "調整事務局",
            Self::Datacenter => "データセンター",
            Self::Monitoring => "実地モニタリング",
            Self::StatisticalAnalysis => "統計解析",
            Self::Csr => "CSR作成",
        }
    }

    /// Trial types this item is quoted for.
    pub fn targets(self) -> &'static [TrialType] {
        const OFFICE_AND_MONITORING: &[TrialType] =
            &[TrialType::InvestigatorInitiatedTrial, TrialType::AdvancedMedical];
        const REPORTING: &[TrialType] = &[
            TrialType::InvestigatorInitiatedTrial,
            TrialType::AdvancedMedical,
            TrialType::SpecifiedClinicalTrial,
        ];

        match self {
            Self::ProtocolDevelopmentSupport | Self::Datacenter | Self::StatisticalAnalysis => {
                &TrialType::ALL
            }
            Self::ClinicalTrialOffice | Self::Monitoring => OFFICE_AND_MONITORING,
            Self::Csr => REPORTING,
        }
    }

    pub fn applies_to(self, trial_type: TrialType) -> bool {
        self.targets().contains(&trial_type)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportEntry {
    pub item: SupportItem,
    pub applicable: bool,
}

/// Every support item with its resolved flag for one trial type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportRange {
    pub trial_type: TrialType,
    pub entries: Vec<SupportEntry>,
}

impl SupportRange {
    pub fn resolve(trial_type: TrialType) -> Self {
        let entries = SupportItem::ALL
            .into_iter()
            .map(|item| SupportEntry { item, applicable: item.applies_to(trial_type) })
            .collect();
        Self { trial_type, entries }
    }

    /// Applicable item labels joined in declaration order.
    pub fn display_text(&self) -> String {
        self.entries
            .iter()
            .filter(|entry| entry.applicable)
            .map(|entry| entry.item.label())
            .collect::<Vec<_>>()
            .join(SUPPORT_TEXT_SEPARATOR)
    }

    pub fn flags(&self) -> Vec<(&'static str, bool)> {
        self.entries.iter().map(|entry| (entry.item.key(), entry.applicable)).collect()
    }

    pub fn is_applicable(&self, item: SupportItem) -> bool {
        self.entries.iter().any(|entry| entry.item == item && entry.applicable)
    }
}
