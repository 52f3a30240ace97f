//! Localized field labels shared by form answers, derived fields and sheets.
//!
//! Every label string used elsewhere in the crate comes from this module or
//! from [`TrialType`](crate::domain::trial::TrialType).

use serde::{Deserialize, Serialize};

/// Business fields a submission can carry, keyed by their form label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommonItem {
    FacilitiesItemName,
    CasesItemName,
    CrfItemName,
    TrialTypeItemName,
    SupportRangeItemName,
    Fpi,
    Lpo,
    TreatmentTerm,
    ReplyToEmailAddress,
}

impl CommonItem {
    pub const ALL: [CommonItem; 9] = [
        CommonItem::FacilitiesItemName,
        CommonItem::CasesItemName,
        CommonItem::CrfItemName,
        CommonItem::TrialTypeItemName,
        CommonItem::SupportRangeItemName,
        CommonItem::Fpi,
        CommonItem::Lpo,
        CommonItem::TreatmentTerm,
        CommonItem::ReplyToEmailAddress,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::FacilitiesItemName => "facilitiesItemName",
            Self::CasesItemName => "casesItemName",
            Self::CrfItemName => "crfItemName",
            Self::TrialTypeItemName => "trialTypeItemName",
            Self::SupportRangeItemName => "supportRangeItemName",
            Self::Fpi => "fpi",
            Self::Lpo => "lpo",
            Self::TreatmentTerm => "treatmentTerm",
            Self::ReplyToEmailAddress => "replyToEmailAddress",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FacilitiesItemName => "施設数",
            Self::CasesItemName => "目標症例数",
            Self::CrfItemName => "CRF項目数",
            Self::TrialTypeItemName => "試験種別",
            Self::SupportRangeItemName => "支援範囲",
            Self::Fpi => "FPI (First Patient In)",
            Self::Lpo => "LPO (Last Patient Out)",
            Self::TreatmentTerm => "治療期間",
            Self::ReplyToEmailAddress => "返信先メールアドレス",
        }
    }
}

/// Keys written by the transformation that have no form label of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DerivedKey {
    FinalAnalysisCount,
    FpiToLpo,
    MonthsOfTreatment,
    SetupMonths,
    ClosingMonths,
    TotalMonths,
    TreatmentYears,
    TotalYears,
    TotalYearsText,
    TotalMonthsText,
    Comments,
}

impl DerivedKey {
    pub fn key(self) -> &'static str {
        match self {
            Self::FinalAnalysisCount => "finalAnalysisCount",
            Self::FpiToLpo => "fpiToLpo",
            Self::MonthsOfTreatment => "monthsOfTreatment",
            Self::SetupMonths => "setupMonths",
            Self::ClosingMonths => "closingMonths",
            Self::TotalMonths => "totalMonths",
            Self::TreatmentYears => "treatmentYears",
            Self::TotalYears => "totalYears",
            Self::TotalYearsText => "totalYearsText",
            Self::TotalMonthsText => "totalMonthsText",
            Self::Comments => "comments",
        }
    }
}

/// Form question deciding whether case registration / research fees apply.
pub const REGISTRATION_FEE_LABEL: &str = "症例登録費/研究費";
/// Answer to [`REGISTRATION_FEE_LABEL`] meaning the fee applies.
pub const REGISTRATION_FEE_APPLICABLE: &str = "あり";

/// Header of the Trial sheet row holding the issue date.
pub const ISSUE_DATE_LABEL: &str = "発行年月日";
/// Header of the Trial sheet row holding the price coefficient.
pub const COEFFICIENT_LABEL: &str = "係数";

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{CommonItem, DerivedKey};
    use crate::domain::trial::TrialType;

    #[test]
    fn labels_are_unique_across_tables() {
        let mut seen = HashSet::new();
        for item in CommonItem::ALL {
            assert!(seen.insert(item.label()), "duplicate label {}", item.label());
        }
        for trial_type in TrialType::ALL {
            assert!(seen.insert(trial_type.label()), "duplicate label {}", trial_type.label());
        }
    }

    #[test]
    fn derived_keys_do_not_collide_with_form_labels() {
        let labels: HashSet<_> = CommonItem::ALL.iter().map(|item| item.label()).collect();
        for key in [DerivedKey::FinalAnalysisCount, DerivedKey::TotalMonths, DerivedKey::Comments] {
            assert!(!labels.contains(key.key()));
        }
    }
}
