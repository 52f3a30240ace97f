//! Printable HTML rendering of a quotation document.

use serde::Serialize;
use tera::{Context, Tera};
use trialquote_core::pipeline::QuotationDocument;
use trialquote_core::quote::sheets::{SheetRow, SETUP_SHEET_NAME};

const QUOTATION_TEMPLATE: &str = "quotation.html.tera";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
}

#[derive(Debug, Serialize)]
struct DisplayRow {
    header: String,
    value: String,
}

impl From<&SheetRow> for DisplayRow {
    fn from(row: &SheetRow) -> Self {
        Self { header: row.header.clone(), value: row.value.to_string() }
    }
}

#[derive(Clone, Debug)]
pub struct QuotationRenderer {
    tera: Tera,
}

impl QuotationRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html.tera"]);
        tera.add_raw_template(
            QUOTATION_TEMPLATE,
            include_str!("../templates/quotation.html.tera"),
        )
        .map_err(|error| RenderError::Template(error.to_string()))?;
        Ok(Self { tera })
    }

    pub fn render(&self, document: &QuotationDocument) -> Result<String, RenderError> {
        let trial_rows: Vec<DisplayRow> = document.trial.rows.iter().map(DisplayRow::from).collect();
        let input_rows: Vec<DisplayRow> =
            document.input_data.rows.iter().map(DisplayRow::from).collect();
        let comments: Vec<String> =
            document.trial.comments.iter().map(|row| row.join(" ")).collect();

        let mut context = Context::new();
        context.insert("title", &document.title);
        context.insert("issued_on", &document.issued_on.format("%Y-%m-%d").to_string());
        context.insert("trial_rows", &trial_rows);
        context.insert("sheet_years", &document.trial.years);
        context.insert("setup_sheet_name", SETUP_SHEET_NAME);
        context.insert("setup_lines", &document.setup.lines);
        context.insert("comments", &comments);
        context.insert("input_rows", &input_rows);

        self.tera
            .render(QUOTATION_TEMPLATE, &context)
            .map_err(|error| RenderError::Template(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use trialquote_core::pipeline::build_document;
    use trialquote_core::{transform, SubmissionFields, TrialType};

    use super::QuotationRenderer;

    #[test]
    fn renders_every_sheet_section() {
        let fields = transform(
            &SubmissionFields::new()
                .with("試験種別", TrialType::InvestigatorInitiatedTrial.label())
                .with("FPI (First Patient In)", "2024-04-01")
                .with("LPO (Last Patient Out)", "2026-03-31"),
        )
        .expect("transform");
        let issued_on = NaiveDate::from_ymd_opt(2026, 1, 5).expect("date");
        let document = build_document("研究相談用見積", fields, issued_on).expect("document");

        let html = QuotationRenderer::new().expect("template").render(&document).expect("render");

        assert!(html.contains("<title>研究相談用見積 20260105</title>"));
        assert!(html.contains("医師主導治験"));
        assert!(html.contains("プロジェクト管理"));
        assert!(html.contains("解析帳票数を100表と想定しております。"));
        assert!(html.contains("返信先メールアドレス"));
    }
}
