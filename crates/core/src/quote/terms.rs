use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::{
    ceil_years, first_day_of_month, last_day_of_month, month_diff, round_year, split_years_months,
};
use crate::domain::fields::{FieldValue, SubmissionFields};
use crate::domain::labels::CommonItem;
use crate::domain::trial::TrialType;
use crate::errors::DomainError;
use crate::text::normalize_digits;

pub const DEFAULT_CASES: i64 = 50;
pub const DEFAULT_FACILITIES: i64 = 10;
pub const DEFAULT_CRF_ITEMS: i64 = 3500;

const MONTH_UNITS: [&str; 7] = ["ヶ月", "ケ月", "か月", "カ月", "ヵ月", "箇月", "月"];
const RANGE_SEPARATORS: [&str; 6] = ["〜", "～", "~", "-", "－", "から"];

/// Contract-period lengths derived from the trial type and FPI/LPO.
///
/// `total_months` is always `fpi_to_lpo + setup_months + closing_months`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSet {
    pub fpi_to_lpo: i64,
    pub setup_months: i64,
    pub closing_months: i64,
    pub total_months: i64,
    pub total_years: i64,
    pub months_of_treatment: Option<i64>,
    pub treatment_years: Option<i64>,
}

impl TermSet {
    pub fn compute(
        trial_type: TrialType,
        fpi: NaiveDate,
        lpo: NaiveDate,
        months_of_treatment: Option<i64>,
    ) -> Result<Self, DomainError> {
        let fpi_to_lpo = month_diff(first_day_of_month(fpi), last_day_of_month(lpo)?);
        if fpi_to_lpo <= 0 {
            warn!(
                event_name = "quote.terms.lpo_before_fpi",
                fpi = %fpi,
                lpo = %lpo,
                fpi_to_lpo,
                "LPO precedes FPI; enrolment span is not positive"
            );
        }

        let setup_months = i64::from(trial_type.setup_months());
        let closing_months = i64::from(trial_type.closing_months());
        let total_months = fpi_to_lpo + setup_months + closing_months;

        Ok(Self {
            fpi_to_lpo,
            setup_months,
            closing_months,
            total_months,
            total_years: ceil_years(total_months),
            months_of_treatment,
            treatment_years: round_year(months_of_treatment),
        })
    }

    /// Whole years and leftover months of the total contract period.
    pub fn period_breakdown(&self) -> (i64, i64) {
        split_years_months(self.total_months)
    }
}

/// Values that scale the quoted work, after defaults are applied.
///
/// Submitted values are kept as answered; only missing ones are defaulted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostDrivers {
    pub cases: FieldValue,
    pub facilities: FieldValue,
    pub crf_items: FieldValue,
    pub final_analysis_count: i64,
}

impl CostDrivers {
    pub fn resolve(trial_type: TrialType, input: &SubmissionFields) -> Self {
        let or_default = |item: CommonItem, default: i64| {
            input.answered(item.label()).cloned().unwrap_or(FieldValue::Number(default))
        };

        Self {
            cases: or_default(CommonItem::CasesItemName, DEFAULT_CASES),
            facilities: or_default(CommonItem::FacilitiesItemName, DEFAULT_FACILITIES),
            crf_items: or_default(CommonItem::CrfItemName, DEFAULT_CRF_ITEMS),
            final_analysis_count: trial_type.final_analysis_count(),
        }
    }

    /// `(label, value)` pairs in the order the workbook lists them.
    pub fn fields(&self) -> [(&'static str, &FieldValue); 3] {
        [
            (CommonItem::CasesItemName.label(), &self.cases),
            (CommonItem::FacilitiesItemName.label(), &self.facilities),
            (CommonItem::CrfItemName.label(), &self.crf_items),
        ]
    }
}

/// Treatment duration in months from the submitted treatment-term answer.
///
/// Returns `None` when the field is absent or holds no recognizable number.
pub fn months_of_treatment(input: &SubmissionFields) -> Option<i64> {
    let value = input.answered(CommonItem::TreatmentTerm.label())?;
    let months = match value {
        FieldValue::Number(months) => Some(*months),
        FieldValue::Text(text) => extract_months(text),
        _ => None,
    };

    if months.is_none() {
        warn!(
            event_name = "quote.terms.treatment_term_unparsed",
            value = %value,
            "treatment term carries no month count; treatment years left blank"
        );
    }
    months
}

/// Reads a month count out of free text such as `13`, `１３ヶ月` or `1年6ヶ月`.
///
/// Numbers followed by `年` count as years, numbers followed by a month unit or
/// nothing count as months. A range such as `1〜2年` is read at its upper bound.
/// Any other unit (`週`, `日`, ...) makes the whole term unreadable.
pub fn extract_months(text: &str) -> Option<i64> {
    let normalized = normalize_digits(text);
    let mut rest = upper_bound(&normalized);
    let mut total: Option<f64> = None;

    while let Some(start) = rest.find(|ch: char| ch.is_ascii_digit()) {
        let tail = &rest[start..];
        let mut end = tail.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(tail.len());
        if let Some(fraction) = tail[end..].strip_prefix('.') {
            let digits = fraction.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(fraction.len());
            if digits > 0 {
                end += 1 + digits;
            }
        }

        let value: f64 = tail[..end].parse().ok()?;
        let after = tail[end..].trim_start();
        let months = if after.starts_with('年') {
            value * 12.0
        } else if MONTH_UNITS.iter().any(|unit| after.starts_with(unit))
            || !after.starts_with(char::is_alphanumeric)
        {
            value
        } else {
            debug!(text, unit = after, "treatment term uses a unit other than years or months");
            return None;
        };

        total = Some(total.unwrap_or(0.0) + months);
        rest = &tail[end..];
    }

    total.map(|months| months.round() as i64)
}

/// The part of a range after its last separator that still holds a number.
fn upper_bound(text: &str) -> &str {
    let split = RANGE_SEPARATORS
        .iter()
        .filter_map(|separator| text.rfind(separator).map(|at| (at, at + separator.len())))
        .max();

    match split {
        Some((_, end)) if text[end..].contains(|ch: char| ch.is_ascii_digit()) => &text[end..],
        Some((at, _)) => upper_bound(&text[..at]),
        None => text,
    }
}
