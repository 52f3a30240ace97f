//! Submission-to-notification delivery around the quote transformation.
//!
//! The pipeline owns no I/O itself; reading submissions, writing documents and
//! sending notifications are delegated to the collaborator traits below.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar::format_compact;
use crate::config::{AppConfig, RetryConfig};
use crate::domain::fields::{QuotationFields, SubmissionFields};
use crate::domain::labels::CommonItem;
use crate::errors::ApplicationError;
use crate::quote::sheets::{InputDataSheet, SetupSheet, TrialSheet};
use crate::quote::{DeterministicQuoteEngine, QuoteEngine};

/// One form response as delivered by a [`SubmissionSource`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    #[serde(default)]
    pub respondent_email: Option<String>,
    #[serde(default)]
    pub edit_url: Option<String>,
    pub fields: SubmissionFields,
}

pub trait SubmissionSource {
    fn latest(&self) -> Result<Submission, ApplicationError>;
}

/// Everything the document writer lays out for one quotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationDocument {
    pub title: String,
    pub issued_on: NaiveDate,
    pub fields: QuotationFields,
    pub setup: SetupSheet,
    pub trial: TrialSheet,
    pub input_data: InputDataSheet,
}

/// Where a written document ended up; attached to the notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub name: String,
    pub location: String,
}

pub trait DocumentWriter {
    fn write(&self, document: &QuotationDocument) -> Result<DocumentHandle, ApplicationError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: DocumentHandle,
    pub no_reply: bool,
}

pub trait Notifier {
    fn send(&self, notification: &Notification) -> Result<(), ApplicationError>;
}

/// Fixed-backoff retry for flaky collaborator calls.
///
/// Only [`ApplicationError::Integration`] failures are retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }

    pub fn run<T>(
        &self,
        operation: &str,
        mut call: impl FnMut() -> Result<T, ApplicationError>,
    ) -> Result<T, ApplicationError> {
        let mut attempt = 1;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(ApplicationError::Integration(message)) if attempt < self.max_attempts => {
                    warn!(
                        event_name = "pipeline.retry.attempt_failed",
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %message,
                        "retrying after backoff"
                    );
                    thread::sleep(self.backoff);
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig { max_attempts: 2, backoff_ms: 1000 })
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff())
    }
}

/// Title prefix and message texts used when delivering a quotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverySettings {
    pub title_prefix: String,
    pub subject: String,
    pub body: String,
    pub no_reply: bool,
}

impl DeliverySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            title_prefix: config.output.title_prefix.clone(),
            subject: config.notifier.subject.clone(),
            body: config.notifier.body.clone(),
            no_reply: config.notifier.no_reply,
        }
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub correlation_id: String,
    pub submission_id: String,
    pub title: String,
    pub document: DocumentHandle,
    pub recipient: String,
}

pub struct QuotationPipeline<S, W, N, E = DeterministicQuoteEngine> {
    source: S,
    writer: W,
    notifier: N,
    engine: E,
    retry: RetryPolicy,
    settings: DeliverySettings,
}

impl<S, W, N> QuotationPipeline<S, W, N, DeterministicQuoteEngine> {
    pub fn new(source: S, writer: W, notifier: N) -> Self {
        Self::with_engine(source, writer, notifier, DeterministicQuoteEngine)
    }
}

impl<S, W, N, E> QuotationPipeline<S, W, N, E> {
    pub fn with_engine(source: S, writer: W, notifier: N, engine: E) -> Self {
        Self {
            source,
            writer,
            notifier,
            engine,
            retry: RetryPolicy::default(),
            settings: DeliverySettings::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_settings(mut self, settings: DeliverySettings) -> Self {
        self.settings = settings;
        self
    }
}

impl<S, W, N, E> QuotationPipeline<S, W, N, E>
where
    S: SubmissionSource,
    W: DocumentWriter,
    N: Notifier,
    E: QuoteEngine,
{
    /// Quotes the latest submission, writes the document and notifies the requester.
    ///
    /// A failure at any step stops the run; nothing is sent for a quotation
    /// whose document was not written.
    pub fn process(&self, issued_on: NaiveDate) -> Result<DeliveryReport, ApplicationError> {
        self.process_with_correlation_id(issued_on, &Uuid::new_v4().to_string())
    }

    /// Same as [`Self::process`], tagging every event with the caller's correlation id.
    pub fn process_with_correlation_id(
        &self,
        issued_on: NaiveDate,
        correlation_id: &str,
    ) -> Result<DeliveryReport, ApplicationError> {
        let submission = self.retry.run("submission_source.latest", || self.source.latest())?;
        info!(
            event_name = "pipeline.submission.received",
            correlation_id = %correlation_id,
            submission_id = %submission.id,
            "quoting latest submission"
        );

        let result = self.deliver(&submission, issued_on, correlation_id);
        if let Err(error) = &result {
            warn!(
                event_name = "pipeline.delivery.failed",
                correlation_id = %correlation_id,
                submission_id = %submission.id,
                edit_url = submission.edit_url.as_deref().unwrap_or_default(),
                error = %error,
                "quotation was not delivered"
            );
        }
        result
    }

    fn deliver(
        &self,
        submission: &Submission,
        issued_on: NaiveDate,
        correlation_id: &str,
    ) -> Result<DeliveryReport, ApplicationError> {
        let fields = self.engine.derive(&submission.fields)?;
        let recipient = resolve_recipient(submission)?;
        let document = build_document(&self.settings.title_prefix, fields, issued_on)?;

        let handle = self.writer.write(&document)?;
        info!(
            event_name = "pipeline.document.written",
            correlation_id,
            submission_id = %submission.id,
            title = %document.title,
            location = %handle.location,
            "quotation document written"
        );

        let notification = Notification {
            recipient: recipient.clone(),
            subject: self.settings.subject.clone(),
            body: self.settings.body.clone(),
            attachment: handle.clone(),
            no_reply: self.settings.no_reply,
        };
        self.notifier.send(&notification)?;
        info!(
            event_name = "pipeline.notification.sent",
            correlation_id,
            submission_id = %submission.id,
            "requester notified"
        );

        Ok(DeliveryReport {
            correlation_id: correlation_id.to_string(),
            submission_id: submission.id.clone(),
            title: document.title,
            document: handle,
            recipient,
        })
    }
}

/// Lays out the sheets for already-derived quotation fields.
pub fn build_document(
    title_prefix: &str,
    fields: QuotationFields,
    issued_on: NaiveDate,
) -> Result<QuotationDocument, ApplicationError> {
    let setup = SetupSheet::build(&fields)?;
    let trial = TrialSheet::build(&fields, issued_on)?;
    let input_data = InputDataSheet::build(&fields);

    Ok(QuotationDocument {
        title: document_title(title_prefix, issued_on),
        issued_on,
        fields,
        setup,
        trial,
        input_data,
    })
}

pub fn document_title(title_prefix: &str, issued_on: NaiveDate) -> String {
    format!("{title_prefix} {}", format_compact(issued_on))
}

/// Reply-to answer when given, otherwise the address the form collected.
pub fn resolve_recipient(submission: &Submission) -> Result<String, ApplicationError> {
    let reply_to = submission
        .fields
        .answered(CommonItem::ReplyToEmailAddress.label())
        .map(|value| value.to_string().trim().to_string());
    let respondent = submission.respondent_email.as_deref().map(str::trim).map(str::to_string);

    reply_to.into_iter().chain(respondent).find(|address| !address.is_empty()).ok_or_else(|| {
        ApplicationError::Integration(format!(
            "submission `{}` has neither a reply-to address nor a respondent email",
            submission.id
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    use chrono::NaiveDate;

    use super::{
        document_title, resolve_recipient, DeliverySettings, DocumentHandle, DocumentWriter,
        Notification, Notifier, QuotationDocument, QuotationPipeline, RetryPolicy, Submission,
        SubmissionSource,
    };
    use crate::domain::fields::SubmissionFields;
    use crate::domain::trial::TrialType;
    use crate::errors::{ApplicationError, DomainError};

    struct FlakySource {
        failures_before_success: u32,
        calls: Cell<u32>,
        submission: Submission,
    }

    impl SubmissionSource for FlakySource {
        fn latest(&self) -> Result<Submission, ApplicationError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call <= self.failures_before_success {
                return Err(ApplicationError::Integration("form responses unavailable".to_owned()));
            }
            Ok(self.submission.clone())
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        written: RefCell<Vec<QuotationDocument>>,
    }

    impl DocumentWriter for RecordingWriter {
        fn write(&self, document: &QuotationDocument) -> Result<DocumentHandle, ApplicationError> {
            self.written.borrow_mut().push(document.clone());
            Ok(DocumentHandle {
                name: format!("{}.json", document.title),
                location: format!("memory://{}", document.title),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<Notification>>,
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, notification: &Notification) -> Result<(), ApplicationError> {
            self.sent.borrow_mut().push(notification.clone());
            Ok(())
        }
    }

    fn issued_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid test date")
    }

    fn submission(fields: SubmissionFields) -> Submission {
        Submission {
            id: "resp-1".to_owned(),
            respondent_email: Some("respondent@example.org".to_owned()),
            edit_url: None,
            fields,
        }
    }

    fn valid_fields() -> SubmissionFields {
        SubmissionFields::new()
            .with("試験種別", TrialType::SpecifiedClinicalTrial.label())
            .with("FPI (First Patient In)", "2024-01-01")
            .with("LPO (Last Patient Out)", "2025-12-31")
    }

    fn source(failures: u32, fields: SubmissionFields) -> FlakySource {
        FlakySource { failures_before_success: failures, calls: Cell::new(0), submission: submission(fields) }
    }

    fn no_backoff(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn flaky_source_succeeds_on_second_attempt() {
        let pipeline = QuotationPipeline::new(
            source(1, valid_fields()),
            RecordingWriter::default(),
            RecordingNotifier::default(),
        )
        .with_retry(no_backoff(2));

        let report = pipeline.process(issued_on()).expect("delivered");

        assert_eq!(pipeline.source.calls.get(), 2);
        assert_eq!(report.title, "研究相談用見積 20260401");
        assert_eq!(report.recipient, "respondent@example.org");
        assert_eq!(pipeline.writer.written.borrow().len(), 1);

        let sent = pipeline.notifier.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "概算見積の作成が完了しました");
        assert_eq!(sent[0].body, "概算見積の作成が完了しました。\n添付ファイルをご確認ください。");
        assert!(sent[0].no_reply);
        assert_eq!(sent[0].attachment, report.document);
    }

    #[test]
    fn source_failures_stop_after_max_attempts() {
        let pipeline = QuotationPipeline::new(
            source(5, valid_fields()),
            RecordingWriter::default(),
            RecordingNotifier::default(),
        )
        .with_retry(no_backoff(2));

        let error = pipeline.process(issued_on()).expect_err("source never recovers");

        assert!(matches!(error, ApplicationError::Integration(_)));
        assert_eq!(pipeline.source.calls.get(), 2);
        assert!(pipeline.writer.written.borrow().is_empty());
        assert!(pipeline.notifier.sent.borrow().is_empty());
    }

    #[test]
    fn transform_failure_writes_nothing_and_sends_nothing() {
        let fields = SubmissionFields::new().with("試験種別", "先進");
        let pipeline = QuotationPipeline::new(
            source(0, fields),
            RecordingWriter::default(),
            RecordingNotifier::default(),
        )
        .with_retry(no_backoff(2));

        let error = pipeline.process(issued_on()).expect_err("missing dates");

        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::MissingRequiredField {
                field: "FPI (First Patient In)".to_owned()
            })
        );
        assert_eq!(pipeline.source.calls.get(), 1);
        assert!(pipeline.writer.written.borrow().is_empty());
        assert!(pipeline.notifier.sent.borrow().is_empty());
    }

    #[test]
    fn caller_correlation_id_is_reported() {
        let pipeline = QuotationPipeline::new(
            source(0, valid_fields()),
            RecordingWriter::default(),
            RecordingNotifier::default(),
        );

        let report =
            pipeline.process_with_correlation_id(issued_on(), "run-42").expect("delivered");
        assert_eq!(report.correlation_id, "run-42");
    }

    #[test]
    fn reply_to_address_takes_precedence() {
        let with_reply_to = submission(valid_fields().with("返信先メールアドレス", " pi@example.org "));
        assert_eq!(resolve_recipient(&with_reply_to), Ok("pi@example.org".to_owned()));

        let blank_reply_to = submission(valid_fields().with("返信先メールアドレス", ""));
        assert_eq!(resolve_recipient(&blank_reply_to), Ok("respondent@example.org".to_owned()));

        let mut anonymous = submission(valid_fields());
        anonymous.respondent_email = None;
        assert!(matches!(resolve_recipient(&anonymous), Err(ApplicationError::Integration(_))));
    }

    #[test]
    fn written_document_carries_all_sheets() {
        let pipeline = QuotationPipeline::new(
            source(0, valid_fields()),
            RecordingWriter::default(),
            RecordingNotifier::default(),
        )
        .with_settings(DeliverySettings {
            title_prefix: "概算見積".to_owned(),
            ..DeliverySettings::default()
        });

        pipeline.process(issued_on()).expect("delivered");

        let written = pipeline.writer.written.borrow();
        let document = &written[0];
        assert_eq!(document.title, "概算見積 20260401");
        assert_eq!(document.fields.count("totalMonths"), Some(36));
        assert_eq!(document.trial.years, 3);
        assert_eq!(document.input_data.rows.len(), 9);
        assert!(!document.setup.lines.is_empty());
    }

    #[test]
    fn document_title_uses_compact_issue_date() {
        assert_eq!(document_title("研究相談用見積", issued_on()), "研究相談用見積 20260401");
    }
}
