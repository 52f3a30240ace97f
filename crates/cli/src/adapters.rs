//! File-backed collaborators for the delivery pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use trialquote_core::errors::ApplicationError;
use trialquote_core::pipeline::{
    DocumentHandle, DocumentWriter, Notification, Notifier, QuotationDocument, Submission,
    SubmissionSource,
};
use trialquote_core::SubmissionFields;
use uuid::Uuid;

use crate::render::QuotationRenderer;

/// Accepted shapes of a submission file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubmissionFile {
    Responses(Vec<Submission>),
    Single(Submission),
    Fields(SubmissionFields),
}

/// Reads submissions from a JSON file; the last response is the latest.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bare_submission_id(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "submission".to_string())
    }
}

impl SubmissionSource for JsonFileSource {
    fn latest(&self) -> Result<Submission, ApplicationError> {
        let raw = fs::read_to_string(&self.path).map_err(|error| {
            ApplicationError::Integration(format!(
                "could not read submissions from `{}`: {error}",
                self.path.display()
            ))
        })?;
        let parsed: SubmissionFile = serde_json::from_str(&raw).map_err(|error| {
            ApplicationError::Integration(format!(
                "could not parse submissions in `{}`: {error}",
                self.path.display()
            ))
        })?;

        match parsed {
            SubmissionFile::Responses(responses) => responses.into_iter().last().ok_or_else(|| {
                ApplicationError::Integration(format!(
                    "`{}` contains no submissions",
                    self.path.display()
                ))
            }),
            SubmissionFile::Single(submission) => Ok(submission),
            SubmissionFile::Fields(fields) => Ok(Submission {
                id: self.bare_submission_id(),
                respondent_email: None,
                edit_url: None,
                fields,
            }),
        }
    }
}

/// Writes `<title>.json` and a printable `<title>.html` into one directory.
#[derive(Clone, Debug)]
pub struct JsonDocumentWriter {
    directory: PathBuf,
    renderer: QuotationRenderer,
}

impl JsonDocumentWriter {
    pub fn new(directory: impl Into<PathBuf>, renderer: QuotationRenderer) -> Self {
        Self { directory: directory.into(), renderer }
    }
}

impl DocumentWriter for JsonDocumentWriter {
    fn write(&self, document: &QuotationDocument) -> Result<DocumentHandle, ApplicationError> {
        fs::create_dir_all(&self.directory).map_err(|error| io_failure(&self.directory, error))?;

        let payload = serde_json::to_string_pretty(document)
            .map_err(|error| ApplicationError::Integration(format!("serialize document: {error}")))?;
        let json_path = self.directory.join(format!("{}.json", document.title));
        fs::write(&json_path, payload).map_err(|error| io_failure(&json_path, error))?;

        let html = self
            .renderer
            .render(document)
            .map_err(|error| ApplicationError::Integration(error.to_string()))?;
        let name = format!("{}.html", document.title);
        let html_path = self.directory.join(&name);
        fs::write(&html_path, html).map_err(|error| io_failure(&html_path, error))?;

        Ok(DocumentHandle { name, location: html_path.display().to_string() })
    }
}

/// Drops each notification as a JSON file into an outbox directory.
#[derive(Clone, Debug)]
pub struct OutboxNotifier {
    outbox_dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(outbox_dir: impl Into<PathBuf>) -> Self {
        Self { outbox_dir: outbox_dir.into() }
    }
}

impl Notifier for OutboxNotifier {
    fn send(&self, notification: &Notification) -> Result<(), ApplicationError> {
        fs::create_dir_all(&self.outbox_dir).map_err(|error| io_failure(&self.outbox_dir, error))?;

        let payload = serde_json::to_string_pretty(notification).map_err(|error| {
            ApplicationError::Integration(format!("serialize notification: {error}"))
        })?;
        let path = self.outbox_dir.join(format!("notification-{}.json", Uuid::new_v4()));
        fs::write(&path, payload).map_err(|error| io_failure(&path, error))
    }
}

fn io_failure(path: &Path, error: std::io::Error) -> ApplicationError {
    ApplicationError::Integration(format!("`{}`: {error}", path.display()))
}
