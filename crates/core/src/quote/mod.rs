pub mod comments;
pub mod sheets;
pub mod support;
pub mod terms;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::calendar::{first_day_of_month, last_day_of_month, parse_date};
use crate::domain::fields::{FieldValue, QuotationFields, SubmissionFields};
use crate::domain::labels::{CommonItem, DerivedKey};
use crate::domain::trial::TrialType;
use crate::errors::DomainError;

use self::comments::{magnitude_text, CommentList, ContractPeriod, MONTH_UNIT, YEAR_UNIT};
use self::support::SupportRange;
use self::terms::{months_of_treatment, CostDrivers, TermSet};

/// Derives quotation fields from one submission.
pub trait QuoteEngine: Send + Sync {
    fn derive(&self, input: &SubmissionFields) -> Result<QuotationFields, DomainError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicQuoteEngine;

impl QuoteEngine for DeterministicQuoteEngine {
    fn derive(&self, input: &SubmissionFields) -> Result<QuotationFields, DomainError> {
        transform(input)
    }
}

/// Builds the output mapping: every input field plus the derived ones.
///
/// Derived keys overwrite same-named input keys. Either every field is
/// derived or an error is returned; the input is never modified.
pub fn transform(input: &SubmissionFields) -> Result<QuotationFields, DomainError> {
    let trial_type = read_trial_type(input)?;
    debug!(
        event_name = "quote.transform.started",
        trial_type = trial_type.key(),
        field_count = input.len(),
        "deriving quotation fields"
    );

    let support = SupportRange::resolve(trial_type);
    let fpi = read_date(input, CommonItem::Fpi)?;
    let lpo = read_date(input, CommonItem::Lpo)?;
    let normalized_fpi = first_day_of_month(fpi);
    let normalized_lpo = last_day_of_month(lpo)?;

    let terms = TermSet::compute(trial_type, fpi, lpo, months_of_treatment(input))?;
    let drivers = CostDrivers::resolve(trial_type, input);
    let period = ContractPeriod::around(fpi, lpo, &terms)?;
    let comments = CommentList::generate(period, &terms, &drivers);

    let mut output = QuotationFields::from_submission(input);
    output.set(CommonItem::Fpi.label(), normalized_fpi);
    output.set(CommonItem::Lpo.label(), normalized_lpo);
    output.set(CommonItem::SupportRangeItemName.label(), support.display_text());
    output.set(DerivedKey::FinalAnalysisCount.key(), drivers.final_analysis_count);
    for (key, applicable) in support.flags() {
        output.set(key, applicable);
    }
    for (label, value) in drivers.fields() {
        output.set(label, value.clone());
    }

    let (years, months) = terms.period_breakdown();
    output.set(DerivedKey::FpiToLpo.key(), terms.fpi_to_lpo);
    output.set(DerivedKey::SetupMonths.key(), terms.setup_months);
    output.set(DerivedKey::ClosingMonths.key(), terms.closing_months);
    output.set(DerivedKey::TotalMonths.key(), terms.total_months);
    output.set(DerivedKey::TotalYears.key(), terms.total_years);
    output.set(DerivedKey::MonthsOfTreatment.key(), terms.months_of_treatment);
    output.set(DerivedKey::TreatmentYears.key(), terms.treatment_years);
    output.set(DerivedKey::TotalYearsText.key(), magnitude_text(years, YEAR_UNIT));
    output.set(DerivedKey::TotalMonthsText.key(), magnitude_text(months, MONTH_UNIT));
    output.set(DerivedKey::Comments.key(), &comments);

    info!(
        event_name = "quote.transform.completed",
        trial_type = trial_type.key(),
        total_months = terms.total_months,
        total_years = terms.total_years,
        "quotation fields derived"
    );
    Ok(output)
}

fn read_trial_type(input: &SubmissionFields) -> Result<TrialType, DomainError> {
    let label = CommonItem::TrialTypeItemName.label();
    match input.answered(label) {
        None => Err(DomainError::MissingRequiredField { field: label.to_string() }),
        Some(FieldValue::Text(text)) => text.parse(),
        Some(other) => Err(DomainError::UnknownTrialType(other.to_string())),
    }
}

fn read_date(input: &SubmissionFields, item: CommonItem) -> Result<NaiveDate, DomainError> {
    let label = item.label();
    let invalid = |value: &FieldValue| DomainError::InvalidDate {
        field: label.to_string(),
        value: value.to_string(),
    };

    let value = input
        .answered(label)
        .ok_or_else(|| DomainError::MissingRequiredField { field: label.to_string() })?;
    match value {
        FieldValue::Date(date) => Ok(*date),
        FieldValue::Text(text) => parse_date(text).ok_or_else(|| invalid(value)),
        _ => Err(invalid(value)),
    }
}
