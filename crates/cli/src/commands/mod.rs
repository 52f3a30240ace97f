pub mod config;
pub mod doctor;
pub mod quote;
pub mod transform;

use serde::Serialize;
use trialquote_core::errors::{ApplicationError, InterfaceError};

pub const EXIT_CONFIG_FAILURE: u8 = 2;
pub const EXIT_INPUT_FAILURE: u8 = 3;
pub const EXIT_INTEGRATION_FAILURE: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn config_failure(command: &str, message: impl Into<String>) -> Self {
        Self::failure(command, "config_validation", message, EXIT_CONFIG_FAILURE)
    }

    /// Reports a failed run through its interface error, keeping the correlation
    /// id so the envelope can be matched against the run's log events.
    pub fn from_application_error(
        command: &str,
        error: &ApplicationError,
        correlation_id: &str,
    ) -> Self {
        let interface = error.clone().into_interface(correlation_id);
        let (error_class, exit_code) = match &interface {
            InterfaceError::BadRequest { .. } => ("input_validation", EXIT_INPUT_FAILURE),
            InterfaceError::ServiceUnavailable { .. } => ("integration", EXIT_INTEGRATION_FAILURE),
            InterfaceError::Internal { .. } => ("config_validation", EXIT_CONFIG_FAILURE),
        };

        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: format!("{} ({})", interface.user_message(), interface.detail()),
            correlation_id: Some(interface.correlation_id().to_string()),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
