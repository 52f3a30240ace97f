use std::path::Path;

use trialquote_core::errors::ApplicationError;
use trialquote_core::pipeline::SubmissionSource;
use trialquote_core::transform;
use uuid::Uuid;

use super::{CommandResult, EXIT_INPUT_FAILURE};
use crate::adapters::JsonFileSource;

const COMMAND: &str = "transform";

/// Prints the derived quotation fields for the latest submission in `input`.
///
/// On success the output is the field mapping itself rather than an outcome
/// envelope, so it can be piped into other tools.
pub fn run(input: &Path) -> CommandResult {
    let correlation_id = Uuid::new_v4().to_string();
    let submission = match JsonFileSource::new(input).latest() {
        Ok(submission) => submission,
        Err(ApplicationError::Integration(message)) => {
            return CommandResult::failure(COMMAND, "input_unreadable", message, EXIT_INPUT_FAILURE);
        }
        Err(error) => {
            return CommandResult::from_application_error(COMMAND, &error, &correlation_id);
        }
    };

    let fields = match transform(&submission.fields) {
        Ok(fields) => fields,
        Err(error) => {
            let error = ApplicationError::from(error);
            return CommandResult::from_application_error(COMMAND, &error, &correlation_id);
        }
    };

    match serde_json::to_string_pretty(&fields) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure(
            COMMAND,
            "serialization",
            format!("could not serialize quotation fields: {error}"),
            EXIT_INPUT_FAILURE,
        ),
    }
}
