//! Values the workbook writer places on the Setup, Trial and Input Data sheets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::fields::{FieldValue, QuotationFields};
use crate::domain::labels::{
    CommonItem, DerivedKey, COEFFICIENT_LABEL, ISSUE_DATE_LABEL, REGISTRATION_FEE_APPLICABLE,
    REGISTRATION_FEE_LABEL,
};
use crate::domain::trial::TrialType;
use crate::errors::DomainError;
use crate::quote::support::SupportItem;

/// Name of the per-year sheet the cost quantities are written to.
pub const SETUP_SHEET_NAME: &str = "Setup";
/// Case monitoring visits per case per treatment year.
pub const MONITORING_VISITS_PER_CASE_YEAR: i64 = 4;
const PRICE_COEFFICIENT: i64 = 1;

const PROTOCOL_REVIEW: &str = "プロトコルレビュー・作成支援（図表案、統計解析計画書案を含む）";
const STUDY_MEETINGS: &str = "検討会実施（TV会議等）";
const OFFICE_BEFORE_START: &str = "事務局運営（試験開始前）";
const SOP_AND_TMF: &str = "SOP一式、CTR登録案、TMF管理";
const IRB_PREPARATION: &str = "IRB準備・承認確認";
const DRUG_HANDLING: &str = "薬剤対応";
const OFFICE_DURING_TRIAL: &str = "事務局運営（試験開始後から試験終了まで）";
const OFFICE_AT_CLOSE: &str = "事務局運営（試験終了時）";
const MONITORING_PREPARATION: &str = "モニタリング準備業務（関連資料作成）";
const PRE_START_MONITORING: &str = "開始前モニタリング・必須文書確認";
const CASE_MONITORING: &str = "症例モニタリング・SAE対応";
const DATABASE_FEE: &str = "データベース管理料";
const EDC_LICENSE: &str = "EDCライセンス・データベースセットアップ";
const DM_PLANNING: &str = "業務分析・DM計画書の作成・CTR登録案の作成";
const DB_BUILD: &str = "DB作成・eCRF作成・バリデーション";
const VALIDATION_REPORT: &str = "バリデーション報告書";
const ACCOUNT_SETUP: &str = "初期アカウント設定（施設・ユーザー）、IRB承認確認";
const ENTRY_GUIDE: &str = "入力の手引作成";
const DATA_CHECKS: &str = "ロジカルチェック、マニュアルチェック、クエリ対応";
const DATA_CLEANING: &str = "データクリーニング";
const DATABASE_LOCK: &str = "データベース固定作業、クロージング";
const ANALYSIS_PLANNING: &str = "統計解析計画書・出力計画書・解析データセット定義書・解析仕様書作成";
const FINAL_ANALYSIS: &str = "最終解析プログラム作成、解析実施（シングル）";
const FINAL_ANALYSIS_REPORT: &str = "最終解析報告書作成（出力結果＋表紙）";
const STUDY_REPORT: &str = "研究結果報告書の作成";
const PROJECT_MANAGEMENT: &str = "プロジェクト管理";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLine {
    pub item: String,
    pub quantity: i64,
}

/// Quantities for the cost items that apply to a quotation.
///
/// Items whose support category does not apply are absent; the workbook
/// filters those rows out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupSheet {
    pub lines: Vec<CostLine>,
}

impl SetupSheet {
    pub fn build(fields: &QuotationFields) -> Result<Self, DomainError> {
        let mut sheet = Self::default();
        let facilities = required_count(fields, CommonItem::FacilitiesItemName.label())?;

        if fields.flag(SupportItem::ProtocolDevelopmentSupport.key()) {
            sheet.push(PROTOCOL_REVIEW, 1);
            sheet.push(STUDY_MEETINGS, 4);
        }

        if fields.flag(SupportItem::ClinicalTrialOffice.key()) || registration_fee_applies(fields) {
            sheet.push(OFFICE_BEFORE_START, required_count(fields, DerivedKey::SetupMonths.key())?);
            sheet.push(SOP_AND_TMF, 1);
            sheet.push(IRB_PREPARATION, facilities);
            sheet.push(DRUG_HANDLING, facilities);
            sheet.push(OFFICE_DURING_TRIAL, required_count(fields, DerivedKey::FpiToLpo.key())?);
            sheet.push(OFFICE_AT_CLOSE, 1);
        }

        if fields.flag(SupportItem::Monitoring.key()) {
            let cases = required_count(fields, CommonItem::CasesItemName.label())?;
            let treatment_years = fields.count(DerivedKey::TreatmentYears.key()).unwrap_or(0);
            sheet.push(MONITORING_PREPARATION, 1);
            sheet.push(PRE_START_MONITORING, facilities);
            let visits = treatment_years
                .checked_mul(cases)
                .and_then(|visits| visits.checked_mul(MONITORING_VISITS_PER_CASE_YEAR))
                .ok_or_else(|| DomainError::InvalidFieldValue {
                    field: CommonItem::CasesItemName.label().to_string(),
                    value: cases.to_string(),
                })?;
            sheet.push(CASE_MONITORING, visits);
        }

        if fields.flag(SupportItem::Datacenter.key()) {
            let fpi_to_lpo = required_count(fields, DerivedKey::FpiToLpo.key())?;
            sheet.push(DATABASE_FEE, fpi_to_lpo);
            sheet.push(EDC_LICENSE, 1);
            sheet.push(DM_PLANNING, 1);
            sheet.push(DB_BUILD, 1);
            sheet.push(VALIDATION_REPORT, 1);
            sheet.push(ACCOUNT_SETUP, facilities);
            sheet.push(ENTRY_GUIDE, 1);
            sheet.push(DATA_CHECKS, fpi_to_lpo);
            sheet.push(DATA_CLEANING, 1);
            sheet.push(DATABASE_LOCK, 1);
        }

        if fields.flag(SupportItem::StatisticalAnalysis.key()) {
            sheet.push(ANALYSIS_PLANNING, 1);
            sheet.push(
                FINAL_ANALYSIS,
                required_count(fields, DerivedKey::FinalAnalysisCount.key())?,
            );
            sheet.push(FINAL_ANALYSIS_REPORT, 1);
        }

        if fields.flag(SupportItem::Csr.key()) {
            sheet.push(STUDY_REPORT, 1);
        }

        if !sheet.lines.is_empty() {
            sheet.push(PROJECT_MANAGEMENT, required_count(fields, DerivedKey::TotalMonths.key())?);
        }

        Ok(sheet)
    }

    pub fn quantity(&self, item: &str) -> Option<i64> {
        self.lines.iter().find(|line| line.item == item).map(|line| line.quantity)
    }

    fn push(&mut self, item: &str, quantity: i64) {
        self.lines.push(CostLine { item: item.to_string(), quantity });
    }
}

/// Whether the submission asked for case registration / research fees.
pub fn registration_fee_applies(fields: &QuotationFields) -> bool {
    fields.text(REGISTRATION_FEE_LABEL).map(str::trim) == Some(REGISTRATION_FEE_APPLICABLE)
}

fn required_count(fields: &QuotationFields, key: &str) -> Result<i64, DomainError> {
    match fields.get(key) {
        None => Err(DomainError::MissingRequiredField { field: key.to_string() }),
        Some(value) => value
            .as_count()
            .ok_or_else(|| DomainError::InvalidFieldValue { field: key.to_string(), value: value.to_string() }),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    pub header: String,
    pub value: FieldValue,
}

/// Header/value rows of the Trial sheet plus the comment block beneath them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSheet {
    pub rows: Vec<SheetRow>,
    pub years: u32,
    pub comments: Vec<Vec<String>>,
}

impl TrialSheet {
    pub fn build(fields: &QuotationFields, issued_on: NaiveDate) -> Result<Self, DomainError> {
        let trial_type_label = CommonItem::TrialTypeItemName.label();
        let trial_type = fields
            .text(trial_type_label)
            .ok_or_else(|| DomainError::MissingRequiredField { field: trial_type_label.to_string() })?
            .parse::<TrialType>()?;

        let mut rows = vec![SheetRow { header: ISSUE_DATE_LABEL.to_string(), value: issued_on.into() }];
        for item in [
            CommonItem::TrialTypeItemName,
            CommonItem::CrfItemName,
            CommonItem::FacilitiesItemName,
            CommonItem::CasesItemName,
        ] {
            rows.push(SheetRow {
                header: item.label().to_string(),
                value: fields.get(item.label()).cloned().unwrap_or(FieldValue::Empty),
            });
        }
        rows.push(SheetRow { header: SETUP_SHEET_NAME.to_string(), value: SETUP_SHEET_NAME.into() });
        rows.push(SheetRow { header: COEFFICIENT_LABEL.to_string(), value: PRICE_COEFFICIENT.into() });

        let comments = match fields.get(DerivedKey::Comments.key()) {
            Some(FieldValue::Rows(rows)) => rows.clone(),
            _ => Vec::new(),
        };

        Ok(Self { rows, years: trial_type.default_sheet_years(), comments })
    }

    pub fn value(&self, header: &str) -> Option<&FieldValue> {
        self.rows.iter().find(|row| row.header == header).map(|row| &row.value)
    }
}

/// The business fields echoed back on a leading "Input Data" sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDataSheet {
    pub rows: Vec<SheetRow>,
}

impl InputDataSheet {
    pub fn build(fields: &QuotationFields) -> Self {
        let rows = CommonItem::ALL
            .into_iter()
            .map(|item| SheetRow {
                header: item.label().to_string(),
                value: fields.get(item.label()).cloned().unwrap_or(FieldValue::Empty),
            })
            .collect();
        Self { rows }
    }
}
