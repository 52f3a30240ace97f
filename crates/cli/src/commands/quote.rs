use std::path::Path;

use chrono::{Local, NaiveDate};
use trialquote_core::config::{AppConfig, LoadOptions};
use trialquote_core::pipeline::{DeliverySettings, QuotationPipeline, RetryPolicy};
use uuid::Uuid;

use super::CommandResult;
use crate::adapters::{JsonDocumentWriter, JsonFileSource, OutboxNotifier};
use crate::render::QuotationRenderer;

const COMMAND: &str = "quote";

pub fn run(input: &Path, issued_on: Option<NaiveDate>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, error.to_string()),
    };
    run_with_config(&config, input, issued_on)
}

pub fn run_with_config(
    config: &AppConfig,
    input: &Path,
    issued_on: Option<NaiveDate>,
) -> CommandResult {
    let renderer = match QuotationRenderer::new() {
        Ok(renderer) => renderer,
        Err(error) => return CommandResult::failure(COMMAND, "template", error.to_string(), 1),
    };

    let pipeline = QuotationPipeline::new(
        JsonFileSource::new(input),
        JsonDocumentWriter::new(&config.output.directory, renderer),
        OutboxNotifier::new(&config.notifier.outbox_dir),
    )
    .with_retry(RetryPolicy::from(&config.retry))
    .with_settings(DeliverySettings::from_config(config));

    let issued_on = issued_on.unwrap_or_else(|| Local::now().date_naive());
    let correlation_id = Uuid::new_v4().to_string();
    match pipeline.process_with_correlation_id(issued_on, &correlation_id) {
        Ok(report) => CommandResult::success(
            COMMAND,
            format!(
                "quotation `{}` for submission `{}` written to {} and sent to {} (correlation_id={})",
                report.title,
                report.submission_id,
                report.document.location,
                report.recipient,
                report.correlation_id
            ),
        ),
        Err(error) => CommandResult::from_application_error(COMMAND, &error, &correlation_id),
    }
}
