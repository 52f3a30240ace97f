use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{ago_date, format_japanese, future_date};
use crate::domain::fields::FieldValue;
use crate::errors::DomainError;
use crate::quote::terms::{CostDrivers, TermSet};

pub const COMMENT_COUNT: usize = 7;
pub(crate) const YEAR_UNIT: &str = "年";
pub(crate) const MONTH_UNIT: &str = "ヶ月";

const COMMENT_TEMPLATES: [&str; COMMENT_COUNT] = [
    "契約期間は{{start}}〜{{end}} ({{years}}{{months}}間）を想定しております。",
    "参加施設数を{{facilities}}施設と想定しております。",
    "CRFのべ項目数を一症例あたり{{crf_items}}項目と想定しております。",
    "目標症例数を{{cases}}例と想定しております。",
    "解析帳票数を{{final_analysis_count}}表と想定しております。",
    "諸経費・間接経費は全て各項目の見積に含まれています。",
    "試験開始後のEDC(eCRF)変更・修正の費用を含みません。",
];

/// Contract window quoted in the first comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ContractPeriod {
    /// Setup lead before FPI through the closing trail after LPO.
    pub fn around(fpi: NaiveDate, lpo: NaiveDate, terms: &TermSet) -> Result<Self, DomainError> {
        let setup = u32::try_from(terms.setup_months).map_err(|_| DomainError::DateOutOfRange)?;
        let closing =
            u32::try_from(terms.closing_months).map_err(|_| DomainError::DateOutOfRange)?;
        Ok(Self { start: ago_date(fpi, setup)?, end: future_date(lpo, closing)? })
    }
}

/// Fixed business sentences printed under the quotation, one per row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentList {
    comments: Vec<String>,
}

impl CommentList {
    pub fn generate(period: ContractPeriod, terms: &TermSet, drivers: &CostDrivers) -> Self {
        let (years, months) = terms.period_breakdown();
        let variables = HashMap::from([
            ("start".to_string(), format_japanese(period.start)),
            ("end".to_string(), format_japanese(period.end)),
            ("years".to_string(), magnitude_text(years, YEAR_UNIT)),
            ("months".to_string(), magnitude_text(months, MONTH_UNIT)),
            ("facilities".to_string(), drivers.facilities.to_string()),
            ("crf_items".to_string(), drivers.crf_items.to_string()),
            ("cases".to_string(), drivers.cases.to_string()),
            ("final_analysis_count".to_string(), drivers.final_analysis_count.to_string()),
        ]);

        let comments = COMMENT_TEMPLATES
            .iter()
            .map(|template| substitute_variables(template, &variables))
            .collect();
        Self { comments }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.comments
    }

    /// One single-cell row per comment, the shape the Trial sheet pastes.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.comments.iter().map(|comment| vec![comment.clone()]).collect()
    }
}

impl From<&CommentList> for FieldValue {
    fn from(value: &CommentList) -> Self {
        FieldValue::Rows(value.rows())
    }
}

pub(crate) fn magnitude_text(value: i64, unit: &str) -> String {
    if value > 0 {
        format!("{value}{unit}")
    } else {
        String::new()
    }
}

fn substitute_variables(template: &str, variables: &HashMap<String, String>) -> String {
    let mut output = template.to_string();
    for (key, value) in variables {
        output = output.replace(&format!("{{{{{key}}}}}"), value);
    }
    output
}
